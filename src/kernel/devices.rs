//! Collaborator seams. The orchestrator only ever talks to the microphone,
//! the recognizer and the synthesizer through these.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::event::SessionEvent;
use crate::error::AudioError;

/// Always-on wake phrase detector.
#[async_trait]
pub trait WakeListener: Send {
    /// Begin listening; detections go to `sink` as `WakeDetected`, input
    /// levels as `MicLevel`.
    async fn start(&mut self, sink: mpsc::Sender<SessionEvent>) -> Result<(), AudioError>;

    /// Stop listening. The microphone must be released when this returns.
    async fn stop(&mut self);
}

/// One open speech-to-text stream.
#[async_trait]
pub trait Recognizer: Send {
    /// Blocks until one utterance is captured; empty text means nothing was heard.
    async fn listen_once(&mut self) -> Result<String, AudioError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Releases the microphone. Must be idempotent.
    fn close(&mut self);
}

pub trait RecognizerFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn Recognizer>, AudioError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Completes when playback has finished or was stopped.
    async fn speak(&self, text: &str) -> Result<(), AudioError>;

    /// Halts any playback in progress.
    fn stop_all(&self);
}

/// Fixed-length microphone capture used for verification and enrollment.
#[async_trait]
pub trait SampleRecorder: Send + Sync {
    /// Mono samples at 16 kHz.
    async fn record(&self, seconds: f32) -> Result<Vec<f32>, AudioError>;
}
