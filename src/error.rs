use std::path::PathBuf;
use thiserror::Error;

use crate::planner::types::Tool;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding backend failed: {0}")]
    Backend(String),
    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    Dimension { expected: usize, found: usize },
    #[error("nothing to embed")]
    Empty,
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner request timed out")]
    Timeout,
    #[error("planner transport failure: {0}")]
    Transport(String),
    #[error("planner host returned status {0}")]
    Status(u16),
    #[error("unreadable planner envelope: {0}")]
    Envelope(String),
}

impl From<reqwest::Error> for PlannerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlannerError::Timeout
        } else if err.is_decode() {
            PlannerError::Envelope(err.to_string())
        } else {
            PlannerError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no voice profile at {0}")]
    ArtifactMissing(PathBuf),
    #[error("enrollment needs at least one sample")]
    NoSamples,
    #[error("incompatible voice profile: {0}")]
    Incompatible(String),
    #[error("voice profile io: {0}")]
    Io(#[from] std::io::Error),
    #[error("voice profile encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unknown tool label '{0}'")]
    UnknownTool(String),
    #[error("no handler registered for {0}")]
    Unregistered(Tool),
    #[error("'none' cannot be bound to a handler")]
    Reserved,
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("handler for {0} panicked")]
    Panicked(Tool),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio device: {0}")]
    Device(String),
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
}
