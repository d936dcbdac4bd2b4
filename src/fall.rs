//! Fall detection state machine.
//!
//! A fall is only confirmed when three things happen in order:
//! 1. **Free-fall**: smoothed raw magnitude stays near zero long enough
//! 2. **Impact**: a large spike follows within a bounded window
//! 3. **Stillness**: linear acceleration stays low-energy and low-peak
//!    for a fixed window after the impact
//!
//! Free-fall alone fires on dropped phones; impact alone fires on jumping
//! and running. Requiring stillness afterwards separates "fell and stayed
//! down" from "got up immediately" or "device thrown, not person".
//!
//! The stage is a single tagged union so invalid combinations (an impact
//! without a confirmed free-fall, accumulators outside the post-impact
//! stage) cannot be represented.

use tracing::debug;

use crate::error::ConfigError;
use crate::signal::LowPassFilter;
use crate::types::EventEvidence;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Thresholds for the fall state machine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FallConfig {
    /// Retention weight of the raw-magnitude smoother: `s = r·s + (1 − r)·|a|`.
    pub magnitude_retention: f32,
    /// Smoothed magnitude at or below this counts as free-fall (m/s²).
    pub free_fall_threshold: f32,
    /// Free-fall must persist this long to be confirmed (ms).
    pub free_fall_min_ms: u64,
    /// Smoothed magnitude at or above this counts as impact (m/s²).
    pub impact_threshold: f32,
    /// Impact must arrive within this long after confirmation (ms).
    pub impact_window_ms: u64,
    /// Stillness is judged this long after impact (ms).
    pub stillness_window_ms: u64,
    /// Maximum linear magnitude allowed during stillness (m/s²).
    pub stillness_max_linear: f32,
    /// Maximum RMS linear magnitude allowed during stillness (m/s²).
    pub stillness_rms_linear: f32,
    /// Linear samples this soon after impact are not accumulated (ms).
    /// Zero accumulates every subsequent sample.
    pub post_impact_settle_ms: u64,
    /// Settle interval applied when linear acceleration is derived as
    /// `raw − gravity` (ms). The gravity estimate drifts toward zero during
    /// free-fall and needs this long to reconverge after the impact.
    pub derived_settle_ms: u64,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            magnitude_retention: 0.15,
            free_fall_threshold: 3.0,
            free_fall_min_ms: 200,
            impact_threshold: 22.0,
            impact_window_ms: 1500,
            stillness_window_ms: 3000,
            stillness_max_linear: 2.0,
            stillness_rms_linear: 1.2,
            post_impact_settle_ms: 0,
            derived_settle_ms: 1000,
        }
    }
}

impl FallConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range(
            "fall.magnitude_retention",
            self.magnitude_retention as f64,
            0.0,
            1.0,
        )?;
        ConfigError::check_range(
            "fall.free_fall_threshold",
            self.free_fall_threshold as f64,
            0.0,
            f64::MAX,
        )?;
        ConfigError::check_order(
            "fall.free_fall_threshold",
            self.free_fall_threshold as f64,
            "fall.impact_threshold",
            self.impact_threshold as f64,
        )?;
        ConfigError::check_range(
            "fall.impact_window_ms",
            self.impact_window_ms as f64,
            1.0,
            f64::MAX,
        )?;
        ConfigError::check_range(
            "fall.stillness_window_ms",
            self.stillness_window_ms as f64,
            1.0,
            f64::MAX,
        )?;
        ConfigError::check_order(
            "fall.post_impact_settle_ms",
            self.post_impact_settle_ms as f64,
            "fall.stillness_window_ms",
            self.stillness_window_ms as f64,
        )?;
        ConfigError::check_order(
            "fall.derived_settle_ms",
            self.derived_settle_ms as f64,
            "fall.stillness_window_ms",
            self.stillness_window_ms as f64,
        )?;
        ConfigError::check_range(
            "fall.stillness_max_linear",
            self.stillness_max_linear as f64,
            0.0,
            f64::MAX,
        )?;
        ConfigError::check_range(
            "fall.stillness_rms_linear",
            self.stillness_rms_linear as f64,
            0.0,
            f64::MAX,
        )
    }
}

/// Running statistics of linear acceleration after an impact.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StillnessAccumulator {
    sample_count: u32,
    energy_sum: f64,
    peak: f32,
}

impl StillnessAccumulator {
    /// Accumulate one linear magnitude.
    pub fn observe(&mut self, linear_mag: f32) {
        self.sample_count += 1;
        self.energy_sum += (linear_mag as f64) * (linear_mag as f64);
        self.peak = self.peak.max(linear_mag);
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn energy_sum(&self) -> f64 {
        self.energy_sum
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// RMS of accumulated magnitudes; `None` when nothing was accumulated.
    pub fn rms(&self) -> Option<f32> {
        if self.sample_count == 0 {
            return None;
        }
        Some((self.energy_sum / self.sample_count as f64).sqrt() as f32)
    }
}

/// Where a linear-acceleration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearSource {
    /// Dedicated linear-acceleration sensor.
    Dedicated,
    /// `raw − gravity` from the estimator.
    Derived,
}

/// Current stage of the fall state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallStage {
    /// No stage active.
    Idle,
    /// Magnitude dropped below the free-fall threshold at `start_ms`.
    FreeFallCandidate { start_ms: u64 },
    /// Free-fall lasted long enough; waiting for impact.
    FreeFallConfirmed { start_ms: u64, confirmed_ms: u64 },
    /// Impact seen; accumulating stillness evidence.
    PostImpact {
        impact_ms: u64,
        impact_magnitude: f32,
        stillness: StillnessAccumulator,
    },
}

impl FallStage {
    pub fn is_idle(&self) -> bool {
        matches!(self, FallStage::Idle)
    }
}

/// Staged fall classifier.
pub struct FallDetector {
    config: FallConfig,
    magnitude_filter: LowPassFilter,
    stage: FallStage,
    falls_detected: u64,
}

impl FallDetector {
    pub fn new(config: FallConfig) -> Self {
        Self {
            magnitude_filter: LowPassFilter::new(config.magnitude_retention),
            config,
            stage: FallStage::Idle,
            falls_detected: 0,
        }
    }

    /// Process one raw accelerometer magnitude.
    ///
    /// Drives the free-fall and impact transitions and may complete a
    /// pending stillness evaluation. Returns fall evidence when a fall is
    /// confirmed.
    pub fn update_magnitude(&mut self, timestamp_ms: u64, raw_magnitude: f32) -> Option<EventEvidence> {
        let smoothed = self.magnitude_filter.update(raw_magnitude);
        let outcome = self.check_deadlines(timestamp_ms);

        match self.stage {
            FallStage::Idle => {
                if smoothed <= self.config.free_fall_threshold {
                    debug!(t = timestamp_ms, smoothed, "free-fall candidate");
                    self.stage = FallStage::FreeFallCandidate {
                        start_ms: timestamp_ms,
                    };
                }
            }
            FallStage::FreeFallCandidate { start_ms } => {
                if smoothed > self.config.free_fall_threshold {
                    debug!(t = timestamp_ms, smoothed, "free-fall recovered before confirmation");
                    self.stage = FallStage::Idle;
                } else if timestamp_ms.saturating_sub(start_ms) >= self.config.free_fall_min_ms {
                    debug!(t = timestamp_ms, start_ms, "free-fall confirmed");
                    self.stage = FallStage::FreeFallConfirmed {
                        start_ms,
                        confirmed_ms: timestamp_ms,
                    };
                }
            }
            FallStage::FreeFallConfirmed { .. } => {
                if smoothed >= self.config.impact_threshold {
                    debug!(t = timestamp_ms, smoothed, "impact detected");
                    self.stage = FallStage::PostImpact {
                        impact_ms: timestamp_ms,
                        impact_magnitude: smoothed,
                        stillness: StillnessAccumulator::default(),
                    };
                }
            }
            FallStage::PostImpact { .. } => {}
        }

        outcome
    }

    /// Process one linear-acceleration magnitude.
    ///
    /// Only meaningful after an impact; otherwise it just applies deadlines.
    /// Derived values are skipped for at least `derived_settle_ms` after
    /// the impact.
    pub fn observe_linear(
        &mut self,
        timestamp_ms: u64,
        linear_magnitude: f32,
        source: LinearSource,
    ) -> Option<EventEvidence> {
        if let Some(evidence) = self.check_deadlines(timestamp_ms) {
            return Some(evidence);
        }

        let settle_ms = match source {
            LinearSource::Dedicated => self.config.post_impact_settle_ms,
            LinearSource::Derived => self
                .config
                .post_impact_settle_ms
                .max(self.config.derived_settle_ms),
        };
        if let FallStage::PostImpact {
            impact_ms,
            ref mut stillness,
            ..
        } = self.stage
        {
            if timestamp_ms > impact_ms && timestamp_ms - impact_ms >= settle_ms {
                stillness.observe(linear_magnitude);
            }
        }
        None
    }

    /// Apply time-based transitions without new data.
    pub fn poll(&mut self, timestamp_ms: u64) -> Option<EventEvidence> {
        self.check_deadlines(timestamp_ms)
    }

    fn check_deadlines(&mut self, timestamp_ms: u64) -> Option<EventEvidence> {
        match self.stage {
            FallStage::FreeFallConfirmed { confirmed_ms, .. }
                if timestamp_ms.saturating_sub(confirmed_ms) > self.config.impact_window_ms =>
            {
                debug!(t = timestamp_ms, confirmed_ms, "impact window elapsed");
                self.reset_stage();
                None
            }
            FallStage::PostImpact {
                impact_ms,
                impact_magnitude,
                stillness,
            } if timestamp_ms.saturating_sub(impact_ms) >= self.config.stillness_window_ms => {
                self.reset_stage();
                self.evaluate_stillness(timestamp_ms, impact_magnitude, &stillness)
            }
            _ => None,
        }
    }

    /// Single-shot stillness verdict. The caller has already reset the stage.
    fn evaluate_stillness(
        &mut self,
        timestamp_ms: u64,
        impact_magnitude: f32,
        stillness: &StillnessAccumulator,
    ) -> Option<EventEvidence> {
        // No samples means no proof of stillness.
        let rms = stillness.rms()?;
        let peak = stillness.peak();

        let still = peak <= self.config.stillness_max_linear && rms <= self.config.stillness_rms_linear;
        debug!(
            t = timestamp_ms,
            peak,
            rms,
            samples = stillness.sample_count(),
            still,
            "stillness evaluated"
        );
        if !still {
            return None;
        }

        self.falls_detected += 1;
        Some(EventEvidence::Fall {
            impact_magnitude,
            stillness_peak: peak,
            stillness_rms: rms,
            stillness_samples: stillness.sample_count(),
        })
    }

    /// Return to `Idle`, clearing every stage timestamp and accumulator.
    pub fn reset_stage(&mut self) {
        self.stage = FallStage::Idle;
    }

    /// Full reset including the magnitude smoother.
    pub fn reset(&mut self) {
        self.reset_stage();
        self.magnitude_filter.reset();
        self.falls_detected = 0;
    }

    pub fn stage(&self) -> FallStage {
        self.stage
    }

    pub fn smoothed_magnitude(&self) -> Option<f32> {
        self.magnitude_filter.value()
    }

    pub fn free_fall_start(&self) -> Option<u64> {
        match self.stage {
            FallStage::FreeFallCandidate { start_ms } | FallStage::FreeFallConfirmed { start_ms, .. } => {
                Some(start_ms)
            }
            _ => None,
        }
    }

    pub fn free_fall_confirmed(&self) -> Option<u64> {
        match self.stage {
            FallStage::FreeFallConfirmed { confirmed_ms, .. } => Some(confirmed_ms),
            _ => None,
        }
    }

    pub fn impact_at(&self) -> Option<u64> {
        match self.stage {
            FallStage::PostImpact { impact_ms, .. } => Some(impact_ms),
            _ => None,
        }
    }

    /// Stillness accumulators; zeroed outside the post-impact stage.
    pub fn stillness(&self) -> StillnessAccumulator {
        match self.stage {
            FallStage::PostImpact { stillness, .. } => stillness,
            _ => StillnessAccumulator::default(),
        }
    }

    pub fn falls_detected(&self) -> u64 {
        self.falls_detected
    }

    pub fn config(&self) -> &FallConfig {
        &self.config
    }
}
