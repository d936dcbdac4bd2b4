//! Tremor detection.
//!
//! Detects sustained rhythmic oscillation in linear acceleration:
//! - Per-axis high-pass filter strips posture and slow drift
//! - Trailing time window of high-passed samples (3s)
//! - RMS energy of the high-passed magnitude
//! - Zero-crossing rate of the high-passed x axis as a rhythm proxy
//! - Leaky-bucket voting across evaluation cycles
//!
//! Evaluation is throttled to one vote per cycle (500ms of sample time),
//! never one per sample, so the vote count measures how long the rhythm
//! has been sustained.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::ConfigError;
use crate::signal::HighPassFilter3;
use crate::types::{magnitude, EventEvidence};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for tremor detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TremorConfig {
    /// Retention weight of the low-pass inside the high-pass filter.
    /// 0.9 at 50Hz puts the cutoff near 0.8Hz.
    pub high_pass_retention: f32,
    /// Trailing window length (ms).
    pub window_ms: u64,
    /// Minimum sample time between evaluations (ms).
    pub eval_interval_ms: u64,
    /// Windows with fewer points than this are not judged.
    pub min_active_samples: usize,
    /// |hp_x| below this neither counts as a crossing nor resets the sign (m/s²).
    pub deadzone: f32,
    /// Minimum RMS of the high-passed magnitude (m/s²).
    pub min_rms: f32,
    /// Zero-crossing band, inclusive. 16..=85 over 3s covers ~2.5–14Hz.
    pub min_zero_crossings: u32,
    pub max_zero_crossings: u32,
    /// Vote count that triggers an event.
    pub sustained_windows: u32,
}

impl Default for TremorConfig {
    fn default() -> Self {
        Self {
            high_pass_retention: 0.90,
            window_ms: 3000,
            eval_interval_ms: 500,
            min_active_samples: 50,
            deadzone: 0.2,
            min_rms: 1.5,
            min_zero_crossings: 16,
            max_zero_crossings: 85,
            sustained_windows: 3,
        }
    }
}

impl TremorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range(
            "tremor.high_pass_retention",
            self.high_pass_retention as f64,
            0.0,
            1.0,
        )?;
        ConfigError::check_range("tremor.window_ms", self.window_ms as f64, 1.0, f64::MAX)?;
        ConfigError::check_range(
            "tremor.eval_interval_ms",
            self.eval_interval_ms as f64,
            1.0,
            f64::MAX,
        )?;
        ConfigError::check_range("tremor.deadzone", self.deadzone as f64, 0.0, f64::MAX)?;
        ConfigError::check_range("tremor.min_rms", self.min_rms as f64, 0.0, f64::MAX)?;
        ConfigError::check_order(
            "tremor.min_zero_crossings",
            self.min_zero_crossings as f64,
            "tremor.max_zero_crossings",
            self.max_zero_crossings as f64 + 1.0,
        )?;
        ConfigError::check_range(
            "tremor.sustained_windows",
            self.sustained_windows as f64,
            1.0,
            f64::MAX,
        )
    }
}

/// One high-passed observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TremorPoint {
    pub timestamp_ms: u64,
    /// High-passed x axis (m/s²).
    pub hp_x: f32,
    /// Magnitude of the high-passed vector (m/s²).
    pub hp_magnitude: f32,
}

/// Upper bound on the points reserved up front by [`TremorWindow::new`].
const MAX_PREALLOCATED: u64 = 4096;

/// Age-bounded, time-ordered buffer of [`TremorPoint`]s.
///
/// Invariant: after every push, the oldest retained timestamp is
/// `>= newest − window_ms`, where `newest` is the largest timestamp seen
/// since the last clear.  Points already older than that are dropped.
#[derive(Debug, Clone)]
pub struct TremorWindow {
    points: VecDeque<TremorPoint>,
    window_ms: u64,
}

impl TremorWindow {
    pub fn new(window_ms: u64) -> Self {
        // 50Hz baseline with headroom for faster sensors; the deque grows
        // on demand past the cap
        let capacity = (window_ms / 20 + 1).saturating_mul(2).min(MAX_PREALLOCATED) as usize;
        Self {
            points: VecDeque::with_capacity(capacity),
            window_ms,
        }
    }

    /// Append a point and prune everything older than the window.
    ///
    /// Returns `false` when the point is itself older than the window
    /// and was dropped.
    pub fn push(&mut self, point: TremorPoint) -> bool {
        let newest = self
            .newest_ms()
            .map_or(point.timestamp_ms, |n| n.max(point.timestamp_ms));
        let cutoff = newest.saturating_sub(self.window_ms);
        if point.timestamp_ms < cutoff {
            return false;
        }

        if point.timestamp_ms >= newest {
            self.points.push_back(point);
        } else {
            // Late arrival inside the window: keep time order
            let at = self
                .points
                .partition_point(|p| p.timestamp_ms <= point.timestamp_ms);
            self.points.insert(at, point);
        }
        while self.points.front().is_some_and(|p| p.timestamp_ms < cutoff) {
            self.points.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn oldest_ms(&self) -> Option<u64> {
        self.points.front().map(|p| p.timestamp_ms)
    }

    pub fn newest_ms(&self) -> Option<u64> {
        self.points.back().map(|p| p.timestamp_ms)
    }

    /// Time covered by the retained points (ms).
    pub fn span_ms(&self) -> u64 {
        match (self.oldest_ms(), self.newest_ms()) {
            (Some(a), Some(b)) => b.saturating_sub(a),
            _ => 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TremorPoint> {
        self.points.iter()
    }
}

/// Counts sign reversals, ignoring values with `|v| < deadzone`.
///
/// Deadzone values neither count as a crossing nor reset the sign tracker,
/// so `+1, 0, -1` is one crossing.
pub fn count_zero_crossings<I>(values: I, deadzone: f32) -> u32
where
    I: IntoIterator<Item = f32>,
{
    let mut last_positive: Option<bool> = None;
    let mut crossings = 0;

    for v in values {
        if v.abs() < deadzone {
            continue;
        }
        let positive = v > 0.0;
        if let Some(prev) = last_positive {
            if prev != positive {
                crossings += 1;
            }
        }
        last_positive = Some(positive);
    }

    crossings
}

/// Root mean square; zero for an empty input.
pub fn rms<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(s, n), v| (s + (v as f64) * (v as f64), n + 1));
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt() as f32
}

/// Measurements of one evaluated window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAssessment {
    pub rms: f32,
    pub zero_crossings: u32,
    pub hit: bool,
}

/// Tremor detector with throttled evaluation and leaky-bucket voting.
pub struct TremorDetector {
    config: TremorConfig,
    filter: HighPassFilter3,
    window: TremorWindow,
    hits: u32,
    last_eval_ms: Option<u64>,
    tremors_detected: u64,
}

impl TremorDetector {
    pub fn new(config: TremorConfig) -> Self {
        Self {
            filter: HighPassFilter3::new(config.high_pass_retention),
            window: TremorWindow::new(config.window_ms),
            config,
            hits: 0,
            last_eval_ms: None,
            tremors_detected: 0,
        }
    }

    /// Process one linear-acceleration vector.
    ///
    /// Returns tremor evidence when the vote count reaches the sustained
    /// threshold; the window and counter are then cleared.
    pub fn observe(&mut self, timestamp_ms: u64, linear: [f32; 3]) -> Option<EventEvidence> {
        let restarted = self
            .window
            .newest_ms()
            .or(self.last_eval_ms)
            .is_some_and(|newest| timestamp_ms.saturating_add(self.config.window_ms) < newest);
        if restarted {
            debug!(
                t = timestamp_ms,
                newest = ?self.window.newest_ms(),
                "clock jumped back past the window, restarting tremor evaluation"
            );
            self.window.clear();
            self.hits = 0;
            self.last_eval_ms = None;
        }

        let hp = self.filter.update(linear);
        self.window.push(TremorPoint {
            timestamp_ms,
            hp_x: hp[0],
            hp_magnitude: magnitude(hp),
        });

        if let Some(last) = self.last_eval_ms {
            if timestamp_ms.saturating_sub(last) < self.config.eval_interval_ms {
                return None;
            }
        }
        self.last_eval_ms = Some(timestamp_ms);
        self.evaluate(timestamp_ms)
    }

    fn evaluate(&mut self, timestamp_ms: u64) -> Option<EventEvidence> {
        if self.window.len() < self.config.min_active_samples {
            self.hits = self.hits.saturating_sub(1);
            return None;
        }

        let assessment = self.assess();
        if assessment.hit {
            self.hits += 1;
        } else {
            self.hits = self.hits.saturating_sub(1);
        }
        debug!(
            t = timestamp_ms,
            rms = assessment.rms,
            zero_crossings = assessment.zero_crossings,
            hit = assessment.hit,
            hits = self.hits,
            "tremor window evaluated"
        );

        if self.hits < self.config.sustained_windows {
            return None;
        }

        let span_s = self.window.span_ms() as f32 / 1000.0;
        let estimated_hz = if span_s > 0.0 {
            assessment.zero_crossings as f32 / (2.0 * span_s)
        } else {
            0.0
        };

        // Hard reset so the same episode cannot trigger again.
        self.hits = 0;
        self.window.clear();
        self.tremors_detected += 1;

        Some(EventEvidence::Tremor {
            rms: assessment.rms,
            zero_crossings: assessment.zero_crossings,
            estimated_hz,
        })
    }

    /// Measure the current window without voting.
    pub fn assess(&self) -> WindowAssessment {
        let rms = rms(self.window.iter().map(|p| p.hp_magnitude));
        let zero_crossings =
            count_zero_crossings(self.window.iter().map(|p| p.hp_x), self.config.deadzone);
        let hit = rms >= self.config.min_rms
            && zero_crossings >= self.config.min_zero_crossings
            && zero_crossings <= self.config.max_zero_crossings;
        WindowAssessment {
            rms,
            zero_crossings,
            hit,
        }
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.window.clear();
        self.hits = 0;
        self.last_eval_ms = None;
        self.tremors_detected = 0;
    }

    /// Current leaky-bucket vote count.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn window(&self) -> &TremorWindow {
        &self.window
    }

    pub fn tremors_detected(&self) -> u64 {
        self.tremors_detected
    }

    pub fn config(&self) -> &TremorConfig {
        &self.config
    }
}
