use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one orchestrator. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Wake listener armed, no recognizer open.
    Sleeping,
    /// Wake heard; recording and checking the speaker.
    VerifyingSpeaker,
    /// Command loop running, recognizer owns the mic.
    Listening,
    /// A reply is being synthesised; mic input paused.
    Speaking,
    /// Tearing down after a force-stop signal.
    ForceStopping,
    /// Terminal.
    Shutdown,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Sleeping
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Sleeping => "sleeping",
            SessionState::VerifyingSpeaker => "verifying_speaker",
            SessionState::Listening => "listening",
            SessionState::Speaking => "speaking",
            SessionState::ForceStopping => "force_stopping",
            SessionState::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Requests for a state change. The graph decides whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTrigger {
    WakeDetected,
    SpeakerAccepted,
    SpeakerRejected,
    ReplyStarted,
    ReplyFinished,
    StopPhrase,
    /// The loop ended without a stop phrase (device gone, verification aborted).
    SessionEnded,
    ForceStop,
    Settled,
    Shutdown,
}

pub struct SessionGraph;

impl SessionGraph {
    /// Pure function: (current, trigger) -> next. `None` means ignored.
    pub fn transition(current: SessionState, trigger: SessionTrigger) -> Option<SessionState> {
        use SessionState::*;
        use SessionTrigger as T;

        match (current, trigger) {
            (Shutdown, _) => None,
            (_, T::Shutdown) => Some(Shutdown),
            (_, T::ForceStop) => Some(ForceStopping),

            (Sleeping, T::WakeDetected) => Some(VerifyingSpeaker),

            (VerifyingSpeaker, T::SpeakerAccepted) => Some(Listening),
            (VerifyingSpeaker, T::SpeakerRejected) => Some(Sleeping),

            (Listening, T::ReplyStarted) => Some(Speaking),
            (Speaking, T::ReplyFinished) => Some(Listening),

            (Listening | Speaking, T::StopPhrase) => Some(Sleeping),
            (VerifyingSpeaker | Listening | Speaking, T::SessionEnded) => Some(Sleeping),

            (ForceStopping, T::Settled) => Some(Sleeping),

            _ => None,
        }
    }
}
