#![allow(dead_code)]

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use auris::error::AudioError;
use auris::intent::{default_intents, IntentRouter, RouterThresholds};
use auris::kernel::{
    Devices, Recognizer, RecognizerFactory, SampleRecorder, SessionEvent, SessionNotice,
    SessionState, SpeechSynthesizer, WakeListener,
};
use auris::planner::{CommandPlanner, PlannerResult};
use auris::voice_auth::gate::synthetic_noise;
use auris::voice_auth::VerificationGate;
use auris::Settings;

pub const SAMPLE_RATE: usize = 16_000;

// === SYNTHETIC AUDIO ===

/// Two seconds of a voiced, harmonic-rich tone around `f0`, with a syllable
/// envelope and a little seeded noise.
pub fn synthetic_voice(seed: u64, f0: f32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..SAMPLE_RATE * 2)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE as f32;
            let envelope = 0.6 + 0.4 * (TAU * 4.0 * t).sin().abs();
            let voiced: f32 = (1..=8)
                .map(|k| (TAU * f0 * k as f32 * t).sin() / k as f32)
                .sum();
            0.25 * envelope * voiced + rng.gen_range(-0.005..0.005)
        })
        .collect()
}

pub fn enrollment_set() -> Vec<Vec<f32>> {
    [130.0, 135.0, 140.0, 145.0, 150.0]
        .iter()
        .enumerate()
        .map(|(i, f0)| synthetic_voice(i as u64 + 1, *f0))
        .collect()
}

pub fn impostor_sample(seed: u64) -> Vec<f32> {
    synthetic_noise(&mut StdRng::seed_from_u64(seed), 0.3)
}

/// Enrolls the synthetic speaker into `path`.
pub fn enrolled_gate(path: &Path) -> VerificationGate {
    let gate = VerificationGate::new(path, 0.55);
    gate.enroll(&enrollment_set()).expect("enrollment should succeed");
    gate
}

// === MIC PROBE ===

/// Counts concurrent microphone holders across every fake device.
#[derive(Clone, Default)]
pub struct MicProbe {
    inner: Arc<Mutex<ProbeState>>,
}

#[derive(Default)]
struct ProbeState {
    holders: usize,
    max_concurrent: usize,
}

impl MicProbe {
    pub fn acquire(&self) {
        let mut state = self.inner.lock().unwrap();
        state.holders += 1;
        state.max_concurrent = state.max_concurrent.max(state.holders);
    }

    pub fn release(&self) {
        let mut state = self.inner.lock().unwrap();
        state.holders = state.holders.saturating_sub(1);
    }

    pub fn holders(&self) -> usize {
        self.inner.lock().unwrap().holders
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.lock().unwrap().max_concurrent
    }
}

// === DEVICE LOG ===

/// One ordered record of recorder and speaker calls, shared by the fakes.
#[derive(Clone, Default)]
pub struct DeviceLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl DeviceLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == entry)
    }
}

/// Every utterance spoken while a recorder is open starts after a pause,
/// and a resume follows before the next listen or the close.
pub fn assert_speech_inside_pause(log: &[String]) {
    let mut recording = false;
    let mut paused = false;
    let mut awaiting_resume = false;

    for (i, entry) in log.iter().enumerate() {
        match entry.as_str() {
            "open" => {
                recording = true;
                paused = false;
            }
            "pause" => paused = true,
            "resume" => {
                paused = false;
                awaiting_resume = false;
            }
            "listen" => {
                assert!(!paused, "listen #{} started while paused: {:?}", i, log);
                assert!(!awaiting_resume, "listen #{} before resume: {:?}", i, log);
            }
            "close" => {
                assert!(!awaiting_resume, "recorder closed mid-speech at #{}: {:?}", i, log);
                recording = false;
            }
            spoken if spoken.starts_with("speak:") && recording => {
                assert!(paused, "'{}' spoken with the mic live: {:?}", spoken, log);
                awaiting_resume = true;
            }
            _ => {}
        }
    }
}

// === FAKE DEVICES ===

pub struct FakeWake {
    probe: MicProbe,
    armed: bool,
    pub starts: Arc<AtomicUsize>,
}

impl FakeWake {
    pub fn new(probe: MicProbe) -> Self {
        Self {
            probe,
            armed: false,
            starts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl WakeListener for FakeWake {
    async fn start(&mut self, _sink: mpsc::Sender<SessionEvent>) -> Result<(), AudioError> {
        assert!(!self.armed, "wake listener started twice");
        self.probe.acquire();
        self.armed = true;
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) {
        if self.armed {
            self.probe.release();
            self.armed = false;
        }
    }
}

#[derive(Debug, Clone)]
pub enum Utterance {
    Text(String),
    Fail,
}

/// Recognizers that replay a shared script; an exhausted script waits
/// for more lines, like a quiet room.
#[derive(Clone, Default)]
pub struct ScriptedRecognizers {
    script: Arc<Mutex<VecDeque<Utterance>>>,
    probe: MicProbe,
    log: DeviceLog,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl ScriptedRecognizers {
    pub fn new(probe: MicProbe, log: DeviceLog) -> Self {
        Self {
            probe,
            log,
            ..Self::default()
        }
    }

    pub fn push(&self, text: &str) {
        self.script.lock().unwrap().push_back(Utterance::Text(text.to_string()));
    }

    pub fn push_failure(&self) {
        self.script.lock().unwrap().push_back(Utterance::Fail);
    }
}

impl RecognizerFactory for ScriptedRecognizers {
    fn open(&self) -> Result<Box<dyn Recognizer>, AudioError> {
        self.probe.acquire();
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.log.push("open");
        Ok(Box::new(ScriptedRecognizer {
            source: self.clone(),
            open: true,
        }))
    }
}

pub struct ScriptedRecognizer {
    source: ScriptedRecognizers,
    open: bool,
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn listen_once(&mut self) -> Result<String, AudioError> {
        self.source.log.push("listen");
        loop {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let next = self.source.script.lock().unwrap().pop_front();
            match next {
                Some(Utterance::Text(text)) => return Ok(text),
                Some(Utterance::Fail) => return Err(AudioError::Capture("scripted failure".to_string())),
                None => continue,
            }
        }
    }

    fn pause(&mut self) {
        self.source.log.push("pause");
    }

    fn resume(&mut self) {
        self.source.log.push("resume");
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.source.log.push("close");
            self.source.probe.release();
            self.source.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Records what it is asked to say. Text matching `stall_on` never
/// finishes playing, so only a stop can end it.
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub stops: Arc<AtomicUsize>,
    stall_on: Arc<Mutex<Option<String>>>,
    log: DeviceLog,
}

impl RecordingSpeaker {
    pub fn new(log: DeviceLog) -> Self {
        Self { log, ..Self::default() }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stall_on(&self, text: &str) {
        *self.stall_on.lock().unwrap() = Some(text.to_string());
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<(), AudioError> {
        self.spoken.lock().unwrap().push(text.to_string());
        self.log.push(format!("speak:{}", text));
        let stalls = self.stall_on.lock().unwrap().as_deref() == Some(text);
        if stalls {
            std::future::pending::<()>().await;
        }
        self.log.push(format!("spoken:{}", text));
        Ok(())
    }

    fn stop_all(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns a fixed sample, holding the mic while "recording".
pub struct FakeSampler {
    sample: Vec<f32>,
    probe: MicProbe,
    pub recordings: Arc<AtomicUsize>,
}

impl FakeSampler {
    pub fn new(sample: Vec<f32>, probe: MicProbe) -> Self {
        Self {
            sample,
            probe,
            recordings: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SampleRecorder for FakeSampler {
    async fn record(&self, _seconds: f32) -> Result<Vec<f32>, AudioError> {
        self.probe.acquire();
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.probe.release();
        self.recordings.fetch_add(1, Ordering::SeqCst);
        Ok(self.sample.clone())
    }
}

// === PLANNER ===

pub struct ScriptedPlanner {
    answer: Option<PlannerResult>,
    pub calls: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn answering(answer: PlannerResult) -> Self {
        Self { answer: Some(answer), calls: AtomicUsize::new(0) }
    }

    pub fn exhausted() -> Self {
        Self { answer: None, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl CommandPlanner for ScriptedPlanner {
    async fn plan(&self, _text: &str) -> Option<PlannerResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

// === HARNESS ===

pub fn keyword_router() -> Arc<IntentRouter> {
    let mut router = IntentRouter::new(RouterThresholds::default());
    router.register_all(default_intents());
    router.build();
    Arc::new(router)
}

pub fn settings_with_profile(path: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.auth.model_path = path.to_path_buf();
    settings.session.capture_retry_ms = 10;
    settings.session.max_speech_secs = 2;
    settings
}

pub struct Rig {
    pub probe: MicProbe,
    pub wake_starts: Arc<AtomicUsize>,
    pub recognizers: ScriptedRecognizers,
    pub speaker: RecordingSpeaker,
    pub sampler_recordings: Arc<AtomicUsize>,
    pub log: DeviceLog,
}

/// Fake devices wired to one probe; `sample` is what verification hears.
pub fn rig(sample: Vec<f32>) -> (Devices, Rig) {
    let probe = MicProbe::default();
    let log = DeviceLog::default();
    let wake = FakeWake::new(probe.clone());
    let wake_starts = wake.starts.clone();
    let recognizers = ScriptedRecognizers::new(probe.clone(), log.clone());
    let speaker = RecordingSpeaker::new(log.clone());
    let sampler = FakeSampler::new(sample, probe.clone());
    let sampler_recordings = sampler.recordings.clone();

    let devices = Devices {
        wake: Box::new(wake),
        recognizers: Arc::new(recognizers.clone()),
        speaker: Arc::new(speaker.clone()),
        sampler: Arc::new(sampler),
    };
    let rig = Rig {
        probe,
        wake_starts,
        recognizers,
        speaker,
        sampler_recordings,
        log,
    };
    (devices, rig)
}

/// Reads notices until `from -> to` is observed.
pub async fn wait_for_transition(
    notices: &mut broadcast::Receiver<SessionNotice>,
    from: SessionState,
    to: SessionState,
) {
    let seen = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match notices.recv().await {
                Ok(SessionNotice::StateChanged { from: f, to: t }) if f == from && t == to => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("notice channel closed"),
            }
        }
    })
    .await;
    assert!(seen.is_ok(), "timed out waiting for {} -> {}", from, to);
}

/// Reads notices until a reply containing `fragment` is spoken.
pub async fn wait_for_reply(notices: &mut broadcast::Receiver<SessionNotice>, fragment: &str) -> String {
    let reply = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match notices.recv().await {
                Ok(SessionNotice::Reply(text)) if text.contains(fragment) => break text,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("notice channel closed"),
            }
        }
    })
    .await;
    reply.unwrap_or_else(|_| panic!("timed out waiting for a reply containing '{}'", fragment))
}

/// Collects every state change until `from -> to`, inclusive.
pub async fn transitions_until(
    notices: &mut broadcast::Receiver<SessionNotice>,
    from: SessionState,
    to: SessionState,
) -> Vec<(SessionState, SessionState)> {
    let seen = tokio::time::timeout(Duration::from_secs(10), async {
        let mut seen = Vec::new();
        loop {
            match notices.recv().await {
                Ok(SessionNotice::StateChanged { from: f, to: t }) => {
                    seen.push((f, t));
                    if f == from && t == to {
                        break seen;
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("notice channel closed"),
            }
        }
    })
    .await;
    seen.unwrap_or_else(|_| panic!("timed out waiting for {} -> {}", from, to))
}

/// Polls until the shared device log holds `entry`.
pub async fn wait_for_log(log: &DeviceLog, entry: &str) {
    let seen = tokio::time::timeout(Duration::from_secs(10), async {
        while !log.contains(entry) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(seen.is_ok(), "device log never recorded '{}'", entry);
}

/// Polls until the fake wake listener has been started `count` times.
pub async fn wait_for_wake_starts(starts: &AtomicUsize, count: usize) {
    let armed = tokio::time::timeout(Duration::from_secs(10), async {
        while starts.load(Ordering::SeqCst) < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(armed.is_ok(), "wake listener was not armed {} times", count);
}
