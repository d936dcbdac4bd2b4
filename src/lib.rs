//! Vigil Sensing Library
//!
//! Fall and tremor detection over streaming 3-axis acceleration from a
//! phone or wearable, intended for unattended monitoring of at-risk users.
//!
//! # Design Philosophy
//!
//! - **Evidence before alarm**: a fall needs free-fall, then impact, then
//!   stillness; a tremor needs several sustained rhythmic windows.
//! - **Fail-loud input handling**: non-finite or saturated samples are
//!   rejected before any filter sees them.
//! - **Sample time only**: every duration is measured on sample
//!   timestamps, so replaying a recording gives the same answer.
//! - **O(1) per sample** apart from a bounded 3s tremor window.
//!
//! # Example
//!
//! ```
//! use vigil_sensing::{DetectionPipeline, Sample};
//!
//! let mut pipeline = DetectionPipeline::with_defaults();
//! let outcome = pipeline
//!     .process_sample(&Sample::accelerometer(0, [0.0, 0.0, 9.81]))
//!     .unwrap();
//! assert!(outcome.is_empty());
//! ```

pub mod alert;
pub mod error;
pub mod fall;
pub mod ffi;
pub mod pipeline;
pub mod signal;
pub mod simulate;
pub mod tremor;
pub mod types;

#[cfg(test)]
mod stress_tests;

// Re-export commonly used types
pub use alert::{AlertConfig, AlertGate, AlertSink};
pub use error::{ConfigError, Result, SampleError, VigilError};
pub use fall::{FallConfig, FallDetector, FallStage, LinearSource};
pub use pipeline::{DetectionPipeline, PipelineConfig, PipelineStats, SampleOutcome};
pub use signal::{GravityConfig, GravityEstimator};
pub use tremor::{TremorConfig, TremorDetector};
pub use types::{DetectionEvent, EventEvidence, EventKind, Sample, SensorKind};
