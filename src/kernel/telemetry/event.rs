use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::types::RouteMode;
use crate::kernel::context::MicOwner;
use crate::kernel::presence::SessionState;
use crate::planner::types::Tool;

// Allowed: IDs, durations, counts, enums, scores.
// Forbidden: utterance text, replies, audio.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    StateTransition {
        from: SessionState,
        to: SessionState,
    },

    MicHandoff {
        owner: MicOwner,
    },

    Verification {
        accepted: bool,
        score: f32,
    },

    Enrollment {
        samples: usize,
        succeeded: bool,
    },

    RouteDecision {
        mode: RouteMode,
        matched: bool,
        score: f32,
    },

    PlannerCall {
        resolved: bool,
        latency_ms: u64,
    },

    HandlerOutcome {
        tool: Tool,
        ok: bool,
        latency_ms: u64,
    },

    SessionStarted {
        session_id: Uuid,
    },

    SessionEnded {
        session_id: Uuid,
        turns: u32,
        reason: SessionEndReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEndReason {
    StopPhrase,
    ForceStop,
    Shutdown,
    DeviceFailure,
}
