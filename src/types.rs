//! Core data types for the detection pipeline.
//!
//! Inputs are timestamped 3-axis samples tagged with the sensor stream they
//! came from. Outputs are discrete emergency events, each carrying the
//! evidence that triggered it.
//!
//! Design principle: if a concept exists, it gets a type. Never pass raw
//! tuples across module boundaries.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Euclidean norm of a 3-axis vector. Sign-invariant per axis.
#[inline]
pub fn magnitude(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Which sensor stream produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorKind {
    /// Raw accelerometer, gravity included (m/s²).
    Accelerometer,
    /// Dedicated gravity sensor (m/s²).
    Gravity,
    /// Dedicated linear-acceleration sensor, gravity already removed (m/s²).
    LinearAcceleration,
}

/// A single 3-axis measurement.
///
/// Ephemeral: produced by the acquisition layer and consumed immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Source stream.
    pub kind: SensorKind,
    /// Axis values [x, y, z] in m/s².
    pub values: [f32; 3],
}

impl Sample {
    /// Creates a new sample.
    pub fn new(timestamp_ms: u64, kind: SensorKind, values: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            kind,
            values,
        }
    }

    /// Raw accelerometer sample.
    pub fn accelerometer(timestamp_ms: u64, values: [f32; 3]) -> Self {
        Self::new(timestamp_ms, SensorKind::Accelerometer, values)
    }

    /// Gravity sensor sample.
    pub fn gravity(timestamp_ms: u64, values: [f32; 3]) -> Self {
        Self::new(timestamp_ms, SensorKind::Gravity, values)
    }

    /// Linear-acceleration sensor sample.
    pub fn linear(timestamp_ms: u64, values: [f32; 3]) -> Self {
        Self::new(timestamp_ms, SensorKind::LinearAcceleration, values)
    }

    /// Magnitude of the sample vector in m/s².
    pub fn magnitude(&self) -> f32 {
        magnitude(self.values)
    }
}

/// Tag of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventKind {
    /// Free-fall, impact, then immobility.
    Fall,
    /// Sustained rhythmic oscillation.
    Tremor,
}

impl EventKind {
    /// Stable wire code used by the C ABI (0 is reserved for "no event").
    pub fn code(&self) -> i32 {
        match self {
            EventKind::Fall => 1,
            EventKind::Tremor => 2,
        }
    }
}

/// Measurements that justified an event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventEvidence {
    Fall {
        /// Smoothed raw magnitude that qualified as the impact (m/s²).
        impact_magnitude: f32,
        /// Largest linear magnitude seen during the stillness window (m/s²).
        stillness_peak: f32,
        /// RMS linear magnitude over the stillness window (m/s²).
        stillness_rms: f32,
        /// Linear samples accumulated during the stillness window.
        stillness_samples: u32,
    },
    Tremor {
        /// RMS of high-passed magnitude over the window (m/s²).
        rms: f32,
        /// Zero crossings of the high-passed x axis.
        zero_crossings: u32,
        /// Rough oscillation frequency derived from the crossing count.
        estimated_hz: f32,
    },
}

/// A detected emergency event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectionEvent {
    /// Timestamp of the sample that completed the detection.
    pub timestamp_ms: u64,
    pub evidence: EventEvidence,
}

impl DetectionEvent {
    /// Creates a new event.
    pub fn new(timestamp_ms: u64, evidence: EventEvidence) -> Self {
        Self {
            timestamp_ms,
            evidence,
        }
    }

    /// The event tag.
    pub fn kind(&self) -> EventKind {
        match self.evidence {
            EventEvidence::Fall { .. } => EventKind::Fall,
            EventEvidence::Tremor { .. } => EventKind::Tremor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_magnitude_basic() {
        assert_relative_eq!(magnitude([3.0, 4.0, 0.0]), 5.0);
        assert_eq!(magnitude([0.0, 0.0, 0.0]), 0.0);
        assert_relative_eq!(magnitude([-3.0, -4.0, 0.0]), 5.0);
    }

    #[test]
    fn test_sample_constructors() {
        let s = Sample::accelerometer(10, [0.0, 0.0, 9.81]);
        assert_eq!(s.kind, SensorKind::Accelerometer);
        assert_eq!(Sample::gravity(10, [0.0; 3]).kind, SensorKind::Gravity);
        assert_eq!(Sample::linear(10, [0.0; 3]).kind, SensorKind::LinearAcceleration);
        assert_relative_eq!(s.magnitude(), 9.81);
    }

    #[test]
    fn test_event_kind_from_evidence() {
        let fall = DetectionEvent::new(
            100,
            EventEvidence::Fall {
                impact_magnitude: 30.0,
                stillness_peak: 0.5,
                stillness_rms: 0.2,
                stillness_samples: 150,
            },
        );
        assert_eq!(fall.kind(), EventKind::Fall);
        assert_eq!(fall.kind().code(), 1);

        let tremor = DetectionEvent::new(
            200,
            EventEvidence::Tremor {
                rms: 2.0,
                zero_crossings: 30,
                estimated_hz: 5.0,
            },
        );
        assert_eq!(tremor.kind(), EventKind::Tremor);
        assert_eq!(tremor.kind().code(), 2);
    }

    proptest! {
        #[test]
        fn prop_magnitude_sign_invariant(
            x in -200.0f32..200.0,
            y in -200.0f32..200.0,
            z in -200.0f32..200.0,
        ) {
            let m = magnitude([x, y, z]);
            prop_assert!(m >= 0.0);
            prop_assert_eq!(m, magnitude([-x, -y, -z]));
            prop_assert_eq!(m, magnitude([x.abs(), y.abs(), z.abs()]));
        }
    }
}
