//! Signal filtering and gravity separation.
//!
//! This module provides the low-level numeric stages of the pipeline:
//! - Gravity vector estimation using an incremental low-pass filter
//! - Scalar exponential smoothing (raw-magnitude filter for fall detection)
//! - Per-axis high-pass filtering (tremor rhythm analysis)
//!
//! All filters are O(1) per sample, allocation-free, and seed themselves
//! from their first input so the first samples of a session never look
//! like a step from zero.

use crate::types::magnitude;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for gravity separation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GravityConfig {
    /// Gain of the gravity low-pass: `g += α·(raw − g)`.
    /// Range: [0.0, 1.0]. Typical: 0.08–0.10 at 50Hz.
    pub alpha: f32,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self { alpha: 0.10 }
    }
}

/// Incremental gravity estimate.
///
/// When a dedicated gravity stream exists, [`GravityEstimator::set_from_sensor`]
/// overrides the estimate and latches it so raw updates stop adapting it.
#[derive(Debug, Clone)]
pub struct GravityEstimator {
    gravity: [f32; 3],
    alpha: f32,
    primed: bool,
    dedicated: bool,
    sample_count: u64,
}

impl GravityEstimator {
    /// Create a new gravity estimator.
    pub fn new(config: &GravityConfig) -> Self {
        Self {
            gravity: [0.0; 3],
            alpha: config.alpha,
            primed: false,
            dedicated: false,
            sample_count: 0,
        }
    }

    /// Update gravity estimate with a raw accelerometer sample.
    ///
    /// No-op once a dedicated gravity sensor has been seen.
    pub fn update(&mut self, accel: [f32; 3]) {
        self.sample_count += 1;
        if self.dedicated {
            return;
        }
        if !self.primed {
            self.gravity = accel;
            self.primed = true;
            return;
        }
        for (g, a) in self.gravity.iter_mut().zip(accel) {
            *g += self.alpha * (a - *g);
        }
    }

    /// Replace the estimate with a dedicated gravity sensor reading.
    pub fn set_from_sensor(&mut self, gravity: [f32; 3]) {
        self.gravity = gravity;
        self.primed = true;
        self.dedicated = true;
    }

    /// Current gravity estimate [x, y, z] in m/s².
    pub fn gravity(&self) -> [f32; 3] {
        self.gravity
    }

    /// Gravity magnitude in m/s².
    pub fn gravity_magnitude(&self) -> f32 {
        magnitude(self.gravity)
    }

    /// Whether a dedicated gravity sensor supersedes the estimate.
    pub fn is_dedicated(&self) -> bool {
        self.dedicated
    }

    /// Number of raw samples offered to the estimator.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// linear_accel = measured_accel − gravity_estimate
    pub fn extract_linear_accel(&self, measured_accel: [f32; 3]) -> [f32; 3] {
        [
            measured_accel[0] - self.gravity[0],
            measured_accel[1] - self.gravity[1],
            measured_accel[2] - self.gravity[2],
        ]
    }

    pub fn reset(&mut self) {
        self.gravity = [0.0; 3];
        self.primed = false;
        self.dedicated = false;
        self.sample_count = 0;
    }
}

/// Scalar exponential smoother: `y = r·y + (1 − r)·x`.
///
/// `r` is the retention weight of the previous output. The first input
/// seeds the state directly.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    retention: f32,
    state: Option<f32>,
}

impl LowPassFilter {
    pub fn new(retention: f32) -> Self {
        Self {
            retention,
            state: None,
        }
    }

    /// Feed one value and return the filtered output.
    pub fn update(&mut self, x: f32) -> f32 {
        let y = match self.state {
            Some(prev) => self.retention * prev + (1.0 - self.retention) * x,
            None => x,
        };
        self.state = Some(y);
        y
    }

    /// Last output, if any input has been seen.
    pub fn value(&self) -> Option<f32> {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Per-axis high-pass filter: `hp = x − lpf(x)`.
#[derive(Debug, Clone)]
pub struct HighPassFilter3 {
    axes: [LowPassFilter; 3],
}

impl HighPassFilter3 {
    /// `retention` is the low-pass retention weight; higher values give a
    /// lower cutoff (≈0.8Hz at 0.9 and 50Hz).
    pub fn new(retention: f32) -> Self {
        Self {
            axes: [
                LowPassFilter::new(retention),
                LowPassFilter::new(retention),
                LowPassFilter::new(retention),
            ],
        }
    }

    /// Feed one vector and return its high-passed components.
    pub fn update(&mut self, v: [f32; 3]) -> [f32; 3] {
        std::array::from_fn(|i| v[i] - self.axes[i].update(v[i]))
    }

    pub fn reset(&mut self) {
        self.axes.iter_mut().for_each(LowPassFilter::reset);
    }
}
