use super::presence::SessionState;

/// Inputs to the orchestrator loop, produced by the wake listener and the
/// session handle. Force-stop and shutdown travel as cancellation, not events.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    WakeDetected,
    /// Input level, 0..=100.
    MicLevel(u8),
    /// Text submitted outside a voice session.
    Typed(String),
}

/// What observers (a UI, the console printer) are told.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    StateChanged { from: SessionState, to: SessionState },
    /// Caption of a captured utterance.
    Heard(String),
    /// Text handed to the synthesizer.
    Reply(String),
    System(String),
    MicLevel(u8),
}
