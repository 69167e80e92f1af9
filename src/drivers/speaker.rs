use async_trait::async_trait;
use std::sync::Mutex;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::SpeechSettings;
use crate::error::AudioError;
use crate::kernel::devices::SpeechSynthesizer;

/// Speaks by running an external TTS program (`espeak-ng`, `say`, `piper`..)
/// with the text as its last argument.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    active: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandSpeaker {
    pub fn new(settings: &SpeechSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            active: Mutex::new(None),
        }
    }

    fn swap_active(&self, next: Option<oneshot::Sender<()>>) -> Option<oneshot::Sender<()>> {
        let mut slot = self.active.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, next)
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), AudioError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::Playback(format!("failed to spawn '{}': {}", self.program, e)))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        if let Some(previous) = self.swap_active(Some(stop_tx)) {
            let _ = previous.send(());
        }

        tokio::select! {
            status = child.wait() => {
                self.swap_active(None);
                let status = status.map_err(|e| AudioError::Playback(e.to_string()))?;
                if !status.success() {
                    warn!("'{}' exited with {}", self.program, status);
                }
            }
            Ok(()) = stop_rx => {
                let _ = child.kill().await;
                debug!("Playback interrupted");
            }
        }
        Ok(())
    }

    fn stop_all(&self) {
        if let Some(stop) = self.swap_active(None) {
            let _ = stop.send(());
        }
    }
}
