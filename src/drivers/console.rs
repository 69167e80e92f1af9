use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::AudioError;
use crate::kernel::devices::{Recognizer, RecognizerFactory, WakeListener};
use crate::kernel::event::SessionEvent;

/// Stdin lines, consumed by whichever of the wake listener or the
/// recognizer currently holds the "mic".
#[derive(Clone)]
pub struct ConsoleFeed {
    lines: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl ConsoleFeed {
    /// Spawns the stdin reader; `on_eof` runs once input closes.
    pub fn stdin<F>(on_eof: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                debug!("Console input: '{}'", line);
                if let Err(e) = tx.send(line).await {
                    error!("Failed to forward console input: {}", e);
                    break;
                }
            }
            info!("Console input closed");
            on_eof();
        });

        Self::from_receiver(rx)
    }

    pub fn from_receiver(rx: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(rx)),
        }
    }

    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}

/// Treats a typed line containing the wake word as a detection; any other
/// line is forwarded as typed input.
pub struct ConsoleWake {
    feed: ConsoleFeed,
    wake_word: String,
    task: Option<JoinHandle<()>>,
}

impl ConsoleWake {
    pub fn new(feed: ConsoleFeed, wake_word: &str) -> Self {
        Self {
            feed,
            wake_word: wake_word.to_lowercase(),
            task: None,
        }
    }
}

#[async_trait]
impl WakeListener for ConsoleWake {
    async fn start(&mut self, sink: mpsc::Sender<SessionEvent>) -> Result<(), AudioError> {
        self.stop().await;

        let feed = self.feed.clone();
        let wake_word = self.wake_word.clone();
        self.task = Some(tokio::spawn(async move {
            while let Some(line) = feed.next_line().await {
                let event = if line.to_lowercase().contains(&wake_word) {
                    SessionEvent::WakeDetected
                } else {
                    SessionEvent::Typed(line)
                };
                let detected = event == SessionEvent::WakeDetected;
                if sink.send(event).await.is_err() || detected {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

pub struct ConsoleRecognizer {
    feed: ConsoleFeed,
    paused: bool,
    closed: bool,
}

#[async_trait]
impl Recognizer for ConsoleRecognizer {
    async fn listen_once(&mut self) -> Result<String, AudioError> {
        if self.closed {
            return Err(AudioError::Capture("recognizer closed".to_string()));
        }
        self.feed
            .next_line()
            .await
            .ok_or_else(|| AudioError::Capture("console input closed".to_string()))
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

pub struct ConsoleRecognizers {
    feed: ConsoleFeed,
}

impl ConsoleRecognizers {
    pub fn new(feed: ConsoleFeed) -> Self {
        Self { feed }
    }
}

impl RecognizerFactory for ConsoleRecognizers {
    fn open(&self) -> Result<Box<dyn Recognizer>, AudioError> {
        Ok(Box::new(ConsoleRecognizer {
            feed: self.feed.clone(),
            paused: false,
            closed: false,
        }))
    }
}
