//! Session telemetry.
//!
//! Write-only from the orchestrator's point of view: nothing in the decision
//! path reads it back. Events never carry user content (utterances, replies,
//! audio); only states, scores, counts and durations.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{SessionEndReason, TelemetryEvent};
pub use metrics::{compute_snapshot, TelemetrySnapshot};
pub use recorder::{SharedTelemetry, TelemetryRecorder};
