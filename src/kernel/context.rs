use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::devices::{Recognizer, RecognizerFactory, WakeListener};
use super::event::SessionEvent;
use crate::error::AudioError;

/// Who currently holds the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MicOwner {
    Nobody,
    WakeListener,
    Recorder,
}

/// Owns the wake listener and the active recorder. Every method that
/// acquires one side releases the other first.
pub struct SessionContext {
    wake: Box<dyn WakeListener>,
    wake_armed: bool,
    recorder: Option<Box<dyn Recognizer>>,
    sink: mpsc::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn new(wake: Box<dyn WakeListener>, sink: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            wake,
            wake_armed: false,
            recorder: None,
            sink,
        }
    }

    pub fn mic_owner(&self) -> MicOwner {
        match (self.wake_armed, self.recorder.is_some()) {
            (_, true) => MicOwner::Recorder,
            (true, false) => MicOwner::WakeListener,
            (false, false) => MicOwner::Nobody,
        }
    }

    pub fn wake_armed(&self) -> bool {
        self.wake_armed
    }

    /// (Re)starts the wake listener after closing any recorder.
    pub async fn arm_wake(&mut self) -> Result<(), AudioError> {
        self.close_recorder();
        self.disarm_wake().await;

        self.wake.start(self.sink.clone()).await?;
        self.wake_armed = true;
        debug!("Wake listener armed");
        Ok(())
    }

    pub async fn disarm_wake(&mut self) {
        if self.wake_armed {
            self.wake.stop().await;
            self.wake_armed = false;
            debug!("Wake listener stopped");
        }
    }

    /// Opens a fresh recorder after stopping the wake listener.
    pub async fn open_recorder(&mut self, factory: &dyn RecognizerFactory) -> Result<(), AudioError> {
        self.disarm_wake().await;
        self.close_recorder();

        self.recorder = Some(factory.open()?);
        debug!("Recorder opened");
        Ok(())
    }

    pub fn close_recorder(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.close();
            debug!("Recorder closed");
        }
    }

    pub fn recorder_mut(&mut self) -> Option<&mut (dyn Recognizer + 'static)> {
        self.recorder.as_deref_mut()
    }

    pub fn pause_mic(&mut self) {
        if let Some(recorder) = self.recorder.as_deref_mut() {
            recorder.pause();
        }
    }

    pub fn resume_mic(&mut self) {
        if let Some(recorder) = self.recorder.as_deref_mut() {
            recorder.resume();
        }
    }

    /// Stops everything. Safe to call repeatedly.
    pub async fn release_all(&mut self) {
        self.close_recorder();
        self.disarm_wake().await;
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if self.recorder.is_some() {
            warn!("Session context dropped with an open recorder");
            self.close_recorder();
        }
    }
}
