//! C FFI bindings for the host mobile application.
//!
//! The native bridge forwards every sensor callback to
//! `vigil_pipeline_process_sample()` and raises a notification whenever the
//! output carries an event.
//!
//! Memory Safety:
//! - The pipeline instance must be freed with `vigil_pipeline_destroy()`
//! - NULL checks are performed on all pointer inputs
//!
//! Thread Safety:
//! - A pipeline is NOT thread-safe. Use a single thread or a mutex.

use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{DetectionPipeline, PipelineConfig};
use crate::types::{Sample, SensorKind};

// ============================================================================
// OPAQUE HANDLE TYPES
// ============================================================================

/// Opaque handle to a detection pipeline.
pub struct VigilPipeline {
    pipeline: DetectionPipeline,
}

/// Result status codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VigilStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer provided.
    NullPointer = 1,
    /// Unknown sensor kind or invalid configuration value.
    InvalidParameter = 2,
    /// Sample rejected (non-finite or out of range); state untouched.
    InvalidSample = 3,
}

/// Output from a single sample.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VigilSampleOutput {
    /// 0 = none, 1 = fall, 2 = tremor.
    pub event: i32,
    /// Timestamp of the event, or of the sample when `event == 0`.
    pub timestamp_ms: u64,
    /// A tremor that passed the gate on the same sample as a fall
    /// (only possible with a zero cooldown): 2, otherwise 0.
    pub second_event: i32,
}

/// Tunables exposed to the host. Everything else uses the calibrated
/// defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VigilConfig {
    /// Global alert cooldown (ms).
    pub cooldown_ms: u64,
    /// Linear samples this soon after impact are ignored (ms).
    pub post_impact_settle_ms: u64,
}

impl Default for VigilConfig {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            cooldown_ms: defaults.alert.cooldown_ms,
            post_impact_settle_ms: defaults.fall.post_impact_settle_ms,
        }
    }
}

/// Cumulative counters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VigilStats {
    pub samples_processed: u64,
    pub samples_rejected: u64,
    pub falls_emitted: u64,
    pub tremors_emitted: u64,
    pub alerts_suppressed: u64,
}

fn sensor_kind(code: i32) -> Option<SensorKind> {
    match code {
        0 => Some(SensorKind::Accelerometer),
        1 => Some(SensorKind::Gravity),
        2 => Some(SensorKind::LinearAcceleration),
        _ => None,
    }
}

// ============================================================================
// PIPELINE LIFECYCLE
// ============================================================================

/// Create a new detection pipeline.
///
/// # Safety
/// - `config` may be NULL (calibrated defaults) or a valid `VigilConfig`.
/// - The returned pointer must be freed with `vigil_pipeline_destroy()`.
///
/// # Returns
/// - Pointer to VigilPipeline on success.
/// - NULL if the configuration is rejected.
#[no_mangle]
pub unsafe extern "C" fn vigil_pipeline_create(config: *const VigilConfig) -> *mut VigilPipeline {
    let host = if config.is_null() {
        VigilConfig::default()
    } else {
        *config
    };

    let mut config = PipelineConfig::default();
    config.alert.cooldown_ms = host.cooldown_ms;
    config.fall.post_impact_settle_ms = host.post_impact_settle_ms;

    match DetectionPipeline::new(config) {
        Ok(pipeline) => Box::into_raw(Box::new(VigilPipeline { pipeline })),
        Err(err) => {
            tracing::warn!(%err, "pipeline configuration rejected");
            ptr::null_mut()
        }
    }
}

/// Destroy a pipeline instance.
///
/// # Safety
/// - `pipeline` must be a valid pointer from `vigil_pipeline_create()`.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn vigil_pipeline_destroy(pipeline: *mut VigilPipeline) {
    if !pipeline.is_null() {
        drop(Box::from_raw(pipeline));
    }
}

/// Reset all detection state and the alert cooldown.
///
/// # Safety
/// - `pipeline` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn vigil_pipeline_reset(pipeline: *mut VigilPipeline) -> VigilStatus {
    if pipeline.is_null() {
        return VigilStatus::NullPointer;
    }
    (*pipeline).pipeline.reset();
    VigilStatus::Ok
}

// ============================================================================
// SAMPLE PROCESSING
// ============================================================================

/// Process a single tagged sample.
///
/// # Safety
/// - `pipeline` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
///
/// # Parameters
/// - `timestamp_ms`: Sample timestamp in milliseconds.
/// - `kind`: 0 = accelerometer, 1 = gravity, 2 = linear acceleration.
/// - `x/y/z`: Axis values in m/s² (device frame).
#[no_mangle]
pub unsafe extern "C" fn vigil_pipeline_process_sample(
    pipeline: *mut VigilPipeline,
    timestamp_ms: u64,
    kind: i32,
    x: f32,
    y: f32,
    z: f32,
    output: *mut VigilSampleOutput,
) -> VigilStatus {
    if pipeline.is_null() || output.is_null() {
        return VigilStatus::NullPointer;
    }

    let pipeline = &mut (*pipeline).pipeline;
    let output = &mut *output;
    *output = VigilSampleOutput {
        event: 0,
        timestamp_ms,
        second_event: 0,
    };

    let kind = match sensor_kind(kind) {
        Some(kind) => kind,
        None => return VigilStatus::InvalidParameter,
    };

    match pipeline.process_sample(&Sample::new(timestamp_ms, kind, [x, y, z])) {
        Ok(outcome) => {
            let mut events = outcome.events();
            if let Some(event) = events.next() {
                output.event = event.kind().code();
                output.timestamp_ms = event.timestamp_ms;
            }
            if let Some(event) = events.next() {
                output.second_event = event.kind().code();
            }
            VigilStatus::Ok
        }
        Err(_) => VigilStatus::InvalidSample,
    }
}

// ============================================================================
// STATUS QUERIES
// ============================================================================

/// Copy the cumulative counters into `stats`.
///
/// # Safety
/// - `pipeline` and `stats` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn vigil_pipeline_stats(
    pipeline: *const VigilPipeline,
    stats: *mut VigilStats,
) -> VigilStatus {
    if pipeline.is_null() || stats.is_null() {
        return VigilStatus::NullPointer;
    }
    let s = (*pipeline).pipeline.stats();
    *stats = VigilStats {
        samples_processed: s.samples_processed,
        samples_rejected: s.samples_rejected,
        falls_emitted: s.falls_emitted,
        tremors_emitted: s.tremors_emitted,
        alerts_suppressed: s.alerts_suppressed,
    };
    VigilStatus::Ok
}

/// Current fall stage: 0 idle, 1 free-fall candidate, 2 free-fall
/// confirmed, 3 post-impact. -1 on NULL.
///
/// # Safety
/// - `pipeline` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn vigil_pipeline_fall_stage(pipeline: *const VigilPipeline) -> i32 {
    use crate::fall::FallStage;

    if pipeline.is_null() {
        return -1;
    }
    match (*pipeline).pipeline.fall_stage() {
        FallStage::Idle => 0,
        FallStage::FreeFallCandidate { .. } => 1,
        FallStage::FreeFallConfirmed { .. } => 2,
        FallStage::PostImpact { .. } => 3,
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Get the library version string.
///
/// # Returns
/// - Static string, do NOT free.
#[no_mangle]
pub extern "C" fn vigil_version() -> *const c_char {
    static VERSION: &[u8] = concat!("vigil-sensing/", env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
