/// Complete detection pipeline integrating all processing stages.
///
/// This module orchestrates the data flow from tagged sensor samples
/// through gravity separation, the fall state machine, the tremor
/// evaluator and the alert gate.
///
/// # Architecture
///
/// 1. **Validation**: reject non-finite or out-of-range samples before any
///    filter sees them
/// 2. **Routing**: raw, gravity and linear streams each update their own
///    consumers; the derived linear signal is only used while no dedicated
///    linear sensor has been seen
/// 3. **Detection**: fall state machine and tremor evaluator
/// 4. **Gating**: global alert cooldown
///
/// Single-threaded and synchronous: each sample runs to completion before
/// the next one is accepted. One pipeline per monitoring session.

use tracing::warn;

use crate::alert::{AlertConfig, AlertGate, AlertSink};
use crate::error::{ConfigError, Result, SampleError};
use crate::fall::{FallConfig, FallDetector, FallStage, LinearSource};
use crate::signal::{GravityConfig, GravityEstimator};
use crate::tremor::{TremorConfig, TremorDetector};
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the complete detection pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Largest accepted absolute axis value (m/s²). Phone accelerometers
    /// saturate around ±16g.
    pub max_abs_axis: f32,
    pub gravity: GravityConfig,
    pub fall: FallConfig,
    pub tremor: TremorConfig,
    pub alert: AlertConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_abs_axis: 160.0,
            gravity: GravityConfig::default(),
            fall: FallConfig::default(),
            tremor: TremorConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        ConfigError::check_range("max_abs_axis", self.max_abs_axis as f64, f64::MIN_POSITIVE, f64::MAX)?;
        ConfigError::check_range("gravity.alpha", self.gravity.alpha as f64, 0.0, 1.0)?;
        self.fall.validate()?;
        self.tremor.validate()?;
        self.alert.validate()
    }

    /// Parse a JSON document; missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Running counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineStats {
    pub samples_processed: u64,
    pub samples_rejected: u64,
    pub falls_emitted: u64,
    pub tremors_emitted: u64,
    pub alerts_suppressed: u64,
}

/// Events that passed the alert gate on one sample.
///
/// Both detectors can complete on the same sample; each result is gated in
/// turn so neither is silently dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleOutcome {
    pub fall: Option<DetectionEvent>,
    pub tremor: Option<DetectionEvent>,
}

impl SampleOutcome {
    pub fn is_empty(&self) -> bool {
        self.fall.is_none() && self.tremor.is_none()
    }

    /// Gated events, fall first.
    pub fn events(&self) -> impl Iterator<Item = DetectionEvent> + '_ {
        self.fall.iter().chain(self.tremor.iter()).copied()
    }

    /// First gated event, if any.
    pub fn first(&self) -> Option<DetectionEvent> {
        self.fall.or(self.tremor)
    }
}

/// Evidence produced by the detectors for one sample, before gating.
#[derive(Debug, Default)]
struct Detections {
    fall: Option<EventEvidence>,
    tremor: Option<EventEvidence>,
}

/// Fall and tremor detection over a tagged 3-axis sample stream.
pub struct DetectionPipeline {
    config: PipelineConfig,

    // Processing stages
    gravity: GravityEstimator,
    fall: FallDetector,
    tremor: TremorDetector,
    gate: AlertGate,

    // Source tracking
    dedicated_linear: bool,

    stats: PipelineStats,
}

impl DetectionPipeline {
    /// Creates a new pipeline after validating the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates a pipeline with the calibrated default thresholds.
    pub fn with_defaults() -> Self {
        Self::build(PipelineConfig::default())
    }

    fn build(config: PipelineConfig) -> Self {
        Self {
            gravity: GravityEstimator::new(&config.gravity),
            fall: FallDetector::new(config.fall.clone()),
            tremor: TremorDetector::new(config.tremor.clone()),
            gate: AlertGate::new(&config.alert),
            config,
            dedicated_linear: false,
            stats: PipelineStats::default(),
        }
    }

    /// Processes a single sample through the entire pipeline.
    ///
    /// Returns the events that passed the alert gate (usually none). A
    /// rejected sample returns an error and leaves every filter and stage
    /// untouched.
    pub fn process_sample(&mut self, sample: &Sample) -> Result<SampleOutcome> {
        if let Err(err) = self.validate_sample(sample) {
            self.stats.samples_rejected += 1;
            warn!(%err, "sample rejected");
            return Err(err.into());
        }
        self.stats.samples_processed += 1;

        let t = sample.timestamp_ms;
        let detections = match sample.kind {
            SensorKind::Accelerometer => {
                self.gravity.update(sample.values);
                let fall = self.fall.update_magnitude(t, sample.magnitude());
                if self.dedicated_linear {
                    Detections { fall, tremor: None }
                } else {
                    let linear = self.gravity.extract_linear_accel(sample.values);
                    let mut routed = self.route_linear(t, linear, LinearSource::Derived);
                    routed.fall = fall.or(routed.fall);
                    routed
                }
            }
            SensorKind::Gravity => {
                self.gravity.set_from_sensor(sample.values);
                Detections {
                    fall: self.fall.poll(t),
                    tremor: None,
                }
            }
            SensorKind::LinearAcceleration => {
                self.dedicated_linear = true;
                self.route_linear(t, sample.values, LinearSource::Dedicated)
            }
        };

        Ok(SampleOutcome {
            fall: detections.fall.and_then(|e| self.gate_event(t, e)),
            tremor: detections.tremor.and_then(|e| self.gate_event(t, e)),
        })
    }

    /// Processes a sample and hands every gated event to `sink`.
    pub fn feed<S: AlertSink + ?Sized>(&mut self, sample: &Sample, sink: &mut S) -> Result<()> {
        for event in self.process_sample(sample)?.events() {
            sink.deliver(&event);
        }
        Ok(())
    }

    /// Feeds linear acceleration to the stillness accumulator and the tremor
    /// evaluator. Both run every time so neither starves the other.
    fn route_linear(&mut self, t: u64, linear: [f32; 3], source: LinearSource) -> Detections {
        Detections {
            fall: self.fall.observe_linear(t, magnitude(linear), source),
            tremor: self.tremor.observe(t, linear),
        }
    }

    fn gate_event(&mut self, t: u64, evidence: EventEvidence) -> Option<DetectionEvent> {
        let event = DetectionEvent::new(t, evidence);
        match self.gate.try_emit(event) {
            Some(event) => {
                match event.kind() {
                    EventKind::Fall => self.stats.falls_emitted += 1,
                    EventKind::Tremor => self.stats.tremors_emitted += 1,
                }
                Some(event)
            }
            None => {
                self.stats.alerts_suppressed += 1;
                None
            }
        }
    }

    fn validate_sample(&self, sample: &Sample) -> std::result::Result<(), SampleError> {
        let limit = self.config.max_abs_axis;
        for &v in &sample.values {
            if !v.is_finite() {
                return Err(SampleError::NonFinite {
                    kind: sample.kind,
                    timestamp_ms: sample.timestamp_ms,
                });
            }
            if v.abs() > limit {
                return Err(SampleError::OutOfRange {
                    kind: sample.kind,
                    timestamp_ms: sample.timestamp_ms,
                    value: v,
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Clears every filter, stage, window, counter and the cooldown.
    pub fn reset(&mut self) {
        self.gravity.reset();
        self.fall.reset();
        self.tremor.reset();
        self.gate.reset();
        self.dedicated_linear = false;
        self.stats = PipelineStats::default();
    }

    /// Returns the current fall stage.
    pub fn fall_stage(&self) -> FallStage {
        self.fall.stage()
    }

    /// Returns the tremor vote count.
    pub fn tremor_hits(&self) -> u32 {
        self.tremor.hits()
    }

    /// Returns the number of points in the tremor window.
    pub fn tremor_window_len(&self) -> usize {
        self.tremor.window().len()
    }

    /// Returns the gravity vector in use (estimated or sensor-provided).
    pub fn gravity(&self) -> [f32; 3] {
        self.gravity.gravity()
    }

    /// Whether a dedicated linear-acceleration stream has been seen.
    pub fn has_dedicated_linear(&self) -> bool {
        self.dedicated_linear
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn fall_detector(&self) -> &FallDetector {
        &self.fall
    }

    pub fn tremor_detector(&self) -> &TremorDetector {
        &self.tremor
    }

    pub fn alert_gate(&self) -> &AlertGate {
        &self.gate
    }
}

impl Default for DetectionPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}
