//! Alert gate and delivery seam.
//!
//! One global cooldown governs every event kind. Requests arriving inside
//! the cooldown are dropped: no queuing, no retry, no escalation.

use tracing::{info, trace};

use crate::error::ConfigError;
use crate::types::DetectionEvent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cooldown configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlertConfig {
    /// Minimum time between two emitted alerts of any kind (ms).
    pub cooldown_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { cooldown_ms: 15_000 }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("alert.cooldown_ms", self.cooldown_ms as f64, 0.0, f64::MAX)
    }
}

/// Deduplicates emissions via a global cooldown.
#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown_ms: u64,
    last_alert_ms: Option<u64>,
    emitted: u64,
    suppressed: u64,
}

impl AlertGate {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            cooldown_ms: config.cooldown_ms,
            last_alert_ms: None,
            emitted: 0,
            suppressed: 0,
        }
    }

    /// Pass the event through if the cooldown has elapsed.
    pub fn try_emit(&mut self, event: DetectionEvent) -> Option<DetectionEvent> {
        let now = event.timestamp_ms;
        if let Some(last) = self.last_alert_ms {
            if now.saturating_sub(last) < self.cooldown_ms {
                self.suppressed += 1;
                trace!(t = now, kind = ?event.kind(), last, "alert suppressed by cooldown");
                return None;
            }
        }

        self.last_alert_ms = Some(now);
        self.emitted += 1;
        info!(t = now, kind = ?event.kind(), "alert emitted");
        Some(event)
    }

    pub fn last_alert_ms(&self) -> Option<u64> {
        self.last_alert_ms
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn reset(&mut self) {
        self.last_alert_ms = None;
        self.emitted = 0;
        self.suppressed = 0;
    }
}

/// Receiver of gated events (the notification collaborator).
///
/// Delivery is fire-and-forget: the pipeline never waits on it and never
/// learns whether it succeeded.
pub trait AlertSink {
    fn deliver(&mut self, event: &DetectionEvent);
}

impl AlertSink for Vec<DetectionEvent> {
    fn deliver(&mut self, event: &DetectionEvent) {
        self.push(*event);
    }
}

impl<F> AlertSink for F
where
    F: FnMut(&DetectionEvent),
{
    fn deliver(&mut self, event: &DetectionEvent) {
        self(event)
    }
}
