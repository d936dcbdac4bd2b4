//! Synthetic sample streams for demos and scenario tests.
//!
//! Produces 50Hz accelerometer streams (optionally paired with a dedicated
//! linear-acceleration stream) for the motion phases the detectors care
//! about: rest, free-fall, impact, lying still, getting up, tremor.

use std::f32::consts::PI;

use crate::types::Sample;

/// Standard gravity (m/s²).
pub const GRAVITY: f32 = 9.81;

/// Builds a time-ordered stream of tagged samples.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    t: u64,
    interval_ms: u64,
    dedicated_linear: bool,
    samples: Vec<Sample>,
}

impl SessionBuilder {
    /// Raw accelerometer only, 50Hz, starting at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            t: start_ms,
            interval_ms: 20,
            dedicated_linear: false,
            samples: Vec::new(),
        }
    }

    /// Also emit a dedicated linear-acceleration sample per tick.
    pub fn with_dedicated_linear(mut self) -> Self {
        self.dedicated_linear = true;
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms.max(1);
        self
    }

    /// Timestamp of the next tick.
    pub fn now_ms(&self) -> u64 {
        self.t
    }

    fn ticks(&self, duration_ms: u64) -> u64 {
        duration_ms / self.interval_ms
    }

    fn push(&mut self, raw: [f32; 3], linear: [f32; 3]) {
        self.samples.push(Sample::accelerometer(self.t, raw));
        if self.dedicated_linear {
            self.samples.push(Sample::linear(self.t, linear));
        }
        self.t += self.interval_ms;
    }

    fn elapsed_s(&self, start_ms: u64) -> f32 {
        (self.t - start_ms) as f32 / 1000.0
    }

    /// Device held upright and motionless.
    pub fn rest(mut self, duration_ms: u64) -> Self {
        for _ in 0..self.ticks(duration_ms) {
            self.push([0.0, 0.0, GRAVITY], [0.02, 0.0, 0.03]);
        }
        self
    }

    /// Unconstrained fall: measured magnitude near zero.
    pub fn free_fall(mut self, duration_ms: u64) -> Self {
        for _ in 0..self.ticks(duration_ms) {
            self.push([0.1, 0.1, 0.4], [0.1, 0.1, -GRAVITY + 0.4]);
        }
        self
    }

    /// One-tick impact spike (about 40 m/s²).
    pub fn impact(mut self) -> Self {
        self.push([12.0, 5.0, 38.0], [12.0, 5.0, 28.0]);
        self
    }

    /// Lying on one side without voluntary movement.
    pub fn lie_still(mut self, duration_ms: u64) -> Self {
        for _ in 0..self.ticks(duration_ms) {
            self.push([GRAVITY, 0.0, 0.1], [0.05, 0.02, 0.0]);
        }
        self
    }

    /// Voluntary movement with linear energy well above stillness limits.
    pub fn get_up(mut self, duration_ms: u64) -> Self {
        let start = self.t;
        for _ in 0..self.ticks(duration_ms) {
            let s = (2.0 * PI * 1.5 * self.elapsed_s(start)).sin();
            let linear = [3.0 * s, 2.0, 1.5 * s];
            self.push([linear[0], linear[1], GRAVITY + linear[2]], linear);
        }
        self
    }

    /// Constant measured magnitude along z, e.g. sustained thrust.
    pub fn sustained(mut self, duration_ms: u64, magnitude: f32) -> Self {
        for _ in 0..self.ticks(duration_ms) {
            self.push([0.0, 0.0, magnitude], [0.0, 0.0, magnitude - GRAVITY]);
        }
        self
    }

    /// Running gait: vertical bounce between roughly 4 and 16 m/s².
    pub fn run(mut self, duration_ms: u64) -> Self {
        let start = self.t;
        for _ in 0..self.ticks(duration_ms) {
            let bounce = 6.0 * (2.0 * PI * 2.8 * self.elapsed_s(start)).sin();
            self.push([0.5, 0.3, GRAVITY + bounce], [0.5, 0.3, bounce]);
        }
        self
    }

    /// Rhythmic oscillation along x at `freq_hz` with `amplitude` m/s².
    pub fn tremor(mut self, duration_ms: u64, freq_hz: f32, amplitude: f32) -> Self {
        let start = self.t;
        for _ in 0..self.ticks(duration_ms) {
            let x = amplitude * (2.0 * PI * freq_hz * self.elapsed_s(start)).sin();
            self.push([x, 0.0, GRAVITY], [x, 0.0, 0.0]);
        }
        self
    }

    pub fn build(self) -> Vec<Sample> {
        self.samples
    }
}
