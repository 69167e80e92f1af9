use std::collections::VecDeque;

use super::event::{SessionEndReason, TelemetryEvent};
use crate::intent::types::RouteMode;
use crate::kernel::context::MicOwner;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub transitions: u64,
    pub verification: VerificationStats,
    pub routing: RoutingStats,
    pub planner: PlannerStats,
    pub handlers: HandlerStats,
    pub sessions: SessionStats,
    pub mic: MicStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationStats {
    pub accepted: u64,
    pub rejected: u64,
    pub enrollments: u64,
    pub failed_enrollments: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingStats {
    pub embedding_hits: u64,
    pub embedding_misses: u64,
    pub keyword_hits: u64,
    pub keyword_misses: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerStats {
    pub calls: u64,
    pub resolved: u64,
    pub total_latency_ms: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerStats {
    pub invocations: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub started: u64,
    pub ended_by_stop_phrase: u64,
    pub ended_by_force_stop: u64,
    pub ended_by_shutdown: u64,
    pub ended_by_device_failure: u64,
    pub total_turns: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MicStats {
    pub handoffs_to_wake: u64,
    pub handoffs_to_recorder: u64,
    pub releases: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::StateTransition { .. } => snap.transitions += 1,
            TelemetryEvent::MicHandoff { owner } => match owner {
                MicOwner::WakeListener => snap.mic.handoffs_to_wake += 1,
                MicOwner::Recorder => snap.mic.handoffs_to_recorder += 1,
                MicOwner::Nobody => snap.mic.releases += 1,
            },
            TelemetryEvent::Verification { accepted, .. } => {
                if *accepted {
                    snap.verification.accepted += 1;
                } else {
                    snap.verification.rejected += 1;
                }
            }
            TelemetryEvent::Enrollment { succeeded, .. } => {
                if *succeeded {
                    snap.verification.enrollments += 1;
                } else {
                    snap.verification.failed_enrollments += 1;
                }
            }
            TelemetryEvent::RouteDecision { mode, matched, .. } => match (mode, matched) {
                (RouteMode::Embedding, true) => snap.routing.embedding_hits += 1,
                (RouteMode::Embedding, false) => snap.routing.embedding_misses += 1,
                (RouteMode::Keyword, true) => snap.routing.keyword_hits += 1,
                (RouteMode::Keyword, false) => snap.routing.keyword_misses += 1,
            },
            TelemetryEvent::PlannerCall { resolved, latency_ms } => {
                snap.planner.calls += 1;
                if *resolved {
                    snap.planner.resolved += 1;
                }
                snap.planner.total_latency_ms += latency_ms;
                snap.planner.max_latency_ms = snap.planner.max_latency_ms.max(*latency_ms);
            }
            TelemetryEvent::HandlerOutcome { ok, .. } => {
                snap.handlers.invocations += 1;
                if !*ok {
                    snap.handlers.failures += 1;
                }
            }
            TelemetryEvent::SessionStarted { .. } => snap.sessions.started += 1,
            TelemetryEvent::SessionEnded { turns, reason, .. } => {
                snap.sessions.total_turns += *turns as u64;
                match reason {
                    SessionEndReason::StopPhrase => snap.sessions.ended_by_stop_phrase += 1,
                    SessionEndReason::ForceStop => snap.sessions.ended_by_force_stop += 1,
                    SessionEndReason::Shutdown => snap.sessions.ended_by_shutdown += 1,
                    SessionEndReason::DeviceFailure => snap.sessions.ended_by_device_failure += 1,
                }
            }
        }
    }

    if snap.planner.calls > 0 {
        snap.planner.avg_latency_ms = snap.planner.total_latency_ms as f64 / snap.planner.calls as f64;
    }

    snap
}
