use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cancel::SessionSignals;
use super::command::{extract_app_name, is_stop_phrase, looks_like_question};
use super::context::{MicOwner, SessionContext};
use super::devices::{RecognizerFactory, SampleRecorder, SpeechSynthesizer, WakeListener};
use super::event::{SessionEvent, SessionNotice};
use super::presence::{SessionGraph, SessionState, SessionTrigger};
use super::telemetry::{SessionEndReason, SharedTelemetry, TelemetryEvent};
use crate::config::{AuthSettings, SessionSettings, Settings};
use crate::error::{HandlerError, VerifyError};
use crate::intent::{IntentRouter, RouteResult};
use crate::planner::{CommandPlanner, PlannerResult, Tool};
use crate::tools::ToolRegistry;
use crate::voice_auth::{VerificationGate, Verdict};

pub const NOT_SURE: &str = "Sorry, I'm not sure what you mean.";
pub const HANDLER_FAILED: &str = "Something went wrong handling that request.";
pub const ACCESS_GRANTED: &str = "Access granted.";
pub const ACCESS_DENIED: &str = "Access denied.";

const EVENT_CAPACITY: usize = 64;
const NOTICE_CAPACITY: usize = 256;

/// The hardware-facing collaborators.
pub struct Devices {
    pub wake: Box<dyn WakeListener>,
    pub recognizers: Arc<dyn RecognizerFactory>,
    pub speaker: Arc<dyn SpeechSynthesizer>,
    pub sampler: Arc<dyn SampleRecorder>,
}

/// Cloneable control surface for a running orchestrator.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    signals: SessionSignals,
    notices: broadcast::Sender<SessionNotice>,
    state: watch::Receiver<SessionState>,
    telemetry: SharedTelemetry,
}

impl SessionHandle {
    /// Injects a wake detection, as a wake listener would.
    pub async fn wake(&self) -> bool {
        self.events.send(SessionEvent::WakeDetected).await.is_ok()
    }

    pub async fn submit_text(&self, text: impl Into<String>) -> bool {
        self.events.send(SessionEvent::Typed(text.into())).await.is_ok()
    }

    /// Interrupts capture and speech and returns to sleep.
    pub fn force_stop(&self) {
        self.signals.force_stop();
    }

    pub fn shutdown(&self) {
        self.signals.shutdown();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn telemetry(&self) -> SharedTelemetry {
        self.telemetry.clone()
    }
}

/// Owns the session state machine, the microphone hand-off and every
/// cancellation point. Runs as a single task via [`SessionOrchestrator::run`].
pub struct SessionOrchestrator {
    state: SessionState,
    wake_word: String,
    session: SessionSettings,
    auth: AuthSettings,

    router: Arc<IntentRouter>,
    planner: Arc<dyn CommandPlanner>,
    tools: Arc<ToolRegistry>,
    gate: VerificationGate,

    context: SessionContext,
    recognizers: Arc<dyn RecognizerFactory>,
    speaker: Arc<dyn SpeechSynthesizer>,
    sampler: Arc<dyn SampleRecorder>,

    events_rx: mpsc::Receiver<SessionEvent>,
    signals: SessionSignals,
    notices: broadcast::Sender<SessionNotice>,
    state_tx: watch::Sender<SessionState>,
    telemetry: SharedTelemetry,
    last_mic: MicOwner,
}

impl SessionOrchestrator {
    pub fn new(
        settings: &Settings,
        router: Arc<IntentRouter>,
        planner: Arc<dyn CommandPlanner>,
        tools: Arc<ToolRegistry>,
        devices: Devices,
    ) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Sleeping);
        let signals = SessionSignals::new();
        let telemetry = SharedTelemetry::new();

        let handle = SessionHandle {
            events: events_tx.clone(),
            signals: signals.clone(),
            notices: notices.clone(),
            state: state_rx,
            telemetry: telemetry.clone(),
        };

        let orchestrator = Self {
            state: SessionState::Sleeping,
            wake_word: settings.wake_word.clone(),
            session: settings.session.clone(),
            auth: settings.auth.clone(),
            router,
            planner,
            tools,
            gate: VerificationGate::from_settings(&settings.auth),
            context: SessionContext::new(devices.wake, events_tx),
            recognizers: devices.recognizers,
            speaker: devices.speaker,
            sampler: devices.sampler,
            events_rx,
            signals,
            notices,
            state_tx,
            telemetry,
            last_mic: MicOwner::Nobody,
        };

        (orchestrator, handle)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Async driver loop. Returns after shutdown with every device released.
    pub async fn run(mut self) {
        info!("Session orchestrator started (router mode: {:?})", self.router.mode());

        if self.auth.enabled && !self.gate.has_profile() {
            self.enroll().await;
        }
        self.rearm_wake().await;

        let shutdown = self.signals.shutdown_token();
        loop {
            let idle = self.signals.current();
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = idle.cancelled() => self.settle_force_stop().await,
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }

        self.shutdown_all().await;
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::WakeDetected => {
                if self.state == SessionState::Sleeping {
                    self.on_wake().await;
                } else {
                    debug!(state = %self.state, "wake ignored");
                }
            }
            SessionEvent::MicLevel(level) => self.notify(SessionNotice::MicLevel(level.min(100))),
            SessionEvent::Typed(text) => self.on_typed(text).await,
        }
    }

    // === WAKE -> VERIFY ===

    async fn on_wake(&mut self) {
        let cancel = self.signals.begin_session();
        self.transition(SessionTrigger::WakeDetected);
        self.context.disarm_wake().await;
        self.record_mic();

        let verdict = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            verdict = self.verify_speaker() => Some(verdict),
        };

        let Some(verdict) = verdict else {
            if !self.signals.is_shutdown() {
                self.settle_force_stop().await;
            }
            return;
        };

        self.telemetry.record(TelemetryEvent::Verification {
            accepted: verdict.accepted,
            score: verdict.score,
        });
        info!(
            score = verdict.score,
            threshold = verdict.threshold,
            accepted = verdict.accepted,
            "speaker verification"
        );

        if verdict.accepted {
            self.notify(SessionNotice::System(format!("Access granted (score={:.2}).", verdict.score)));
            self.say(ACCESS_GRANTED, &cancel).await;
            self.transition(SessionTrigger::SpeakerAccepted);
            self.command_session(cancel).await;
        } else {
            self.notify(SessionNotice::System(format!("Access denied (score={:.2}).", verdict.score)));
            self.say(ACCESS_DENIED, &cancel).await;
            self.transition(SessionTrigger::SpeakerRejected);
            self.rearm_wake().await;
        }
    }

    async fn verify_speaker(&mut self) -> Verdict {
        let threshold = self.gate.threshold();
        if !self.auth.enabled {
            return Verdict { accepted: true, score: 1.0, threshold };
        }
        let rejected = Verdict { accepted: false, score: 0.0, threshold };

        let sample = match self.sampler.record(self.auth.verify_seconds).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Verification capture failed, scoring silence: {}", e);
                Vec::new()
            }
        };

        match score_sample(self.gate.clone(), sample.clone()).await {
            Ok(verdict) => verdict,
            Err(VerifyError::ArtifactMissing(path)) => {
                warn!("No voice profile at {}, enrolling first", path.display());
                if !self.enroll().await {
                    return rejected;
                }
                score_sample(self.gate.clone(), sample).await.unwrap_or_else(|e| {
                    warn!("Verification failed after enrollment: {}", e);
                    rejected
                })
            }
            Err(e) => {
                warn!("Verification failed: {}", e);
                rejected
            }
        }
    }

    /// Records the configured number of samples and trains a new profile.
    async fn enroll(&mut self) -> bool {
        let count = self.auth.enroll_samples;
        let seconds = self.auth.enroll_seconds;
        let token = self.signals.current();

        self.context.disarm_wake().await;
        self.record_mic();
        self.say(
            &format!("Let's set up voice verification. I'll record {} short samples.", count),
            &token,
        )
        .await;

        let mut samples = Vec::with_capacity(count);
        for i in 1..=count {
            self.say(&format!("Sample {} of {}. Please speak now.", i, count), &token).await;
            let recorded = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                recorded = self.sampler.record(seconds) => recorded,
            };
            match recorded {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!("Enrollment sample {} failed: {}", i, e),
            }
        }

        let taken = samples.len();
        let gate = self.gate.clone();
        let succeeded = match tokio::task::spawn_blocking(move || gate.enroll(&samples)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                error!("Enrollment failed: {}", e);
                false
            }
            Err(e) => {
                error!("Enrollment task failed: {}", e);
                false
            }
        };

        self.telemetry.record(TelemetryEvent::Enrollment { samples: taken, succeeded });
        let closing = if succeeded { "Voice enrollment complete." } else { "Voice enrollment failed." };
        self.say(closing, &token).await;
        succeeded
    }

    // === COMMAND LOOP ===

    async fn command_session(&mut self, cancel: CancellationToken) {
        let session_id = Uuid::new_v4();
        self.telemetry.record(TelemetryEvent::SessionStarted { session_id });

        if let Err(e) = self.context.open_recorder(self.recognizers.as_ref()).await {
            error!("Could not open recognizer: {}", e);
            self.record_mic();
            self.say("I couldn't open the microphone.", &cancel).await;
            self.end_session(session_id, 0, SessionEndReason::DeviceFailure).await;
            return;
        }
        self.record_mic();
        self.notify(SessionNotice::System("Listening for commands.".to_string()));

        let mut turns = 0u32;
        let reason = loop {
            if self.signals.is_shutdown() {
                break SessionEndReason::Shutdown;
            }
            if cancel.is_cancelled() {
                break SessionEndReason::ForceStop;
            }

            let heard = {
                let Some(recorder) = self.context.recorder_mut() else {
                    break SessionEndReason::DeviceFailure;
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    heard = recorder.listen_once() => Some(heard),
                }
            };
            let Some(heard) = heard else {
                continue;
            };

            self.context.pause_mic();
            let text = match heard {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    warn!("Capture failed, treating as silence: {}", e);
                    self.context.resume_mic();
                    backoff(Duration::from_millis(self.session.capture_retry_ms), &cancel).await;
                    continue;
                }
            };

            if text.is_empty() {
                self.context.resume_mic();
                continue;
            }

            turns += 1;
            self.notify(SessionNotice::Heard(text.clone()));

            if is_stop_phrase(&text, &self.session.stop_phrases) {
                break SessionEndReason::StopPhrase;
            }

            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                reply = self.respond(&text) => Some(reply),
            };
            if let Some(reply) = reply {
                self.say(&reply, &cancel).await;
            }
            self.context.resume_mic();
        };

        self.end_session(session_id, turns, reason).await;
    }

    async fn end_session(&mut self, session_id: Uuid, turns: u32, reason: SessionEndReason) {
        self.context.close_recorder();
        self.record_mic();
        self.telemetry.record(TelemetryEvent::SessionEnded { session_id, turns, reason });

        match reason {
            SessionEndReason::StopPhrase => {
                self.transition(SessionTrigger::StopPhrase);
                self.rearm_wake().await;
            }
            SessionEndReason::ForceStop => self.settle_force_stop().await,
            SessionEndReason::DeviceFailure => {
                self.transition(SessionTrigger::SessionEnded);
                self.rearm_wake().await;
            }
            SessionEndReason::Shutdown => {}
        }
    }

    // === UNDERSTAND -> DISPATCH ===

    /// Produces the reply for one utterance. Never fails.
    async fn respond(&mut self, text: &str) -> String {
        let question = looks_like_question(text);
        let route = if question { None } else { Some(self.classify(text)) };

        if let Some(RouteResult { label: Some(label), score }) = &route {
            if *score >= self.session.confidence_floor {
                if let Some(tool) = self.tool_for_label(label) {
                    return self.dispatch(tool, text.to_string()).await;
                }
            }
        }

        let started = Instant::now();
        let plan = self.planner.plan(text).await;
        self.telemetry.record(TelemetryEvent::PlannerCall {
            resolved: plan.is_some(),
            latency_ms: started.elapsed().as_millis() as u64,
        });

        match plan {
            Some(plan) => self.act_on_plan(plan, text).await,
            None => {
                // Planner unavailable: fall back to whatever the router offers.
                let route = match route {
                    Some(route) => route,
                    None => self.classify(text),
                };
                match route.label.as_deref().and_then(|label| self.tool_for_label(label)) {
                    Some(tool) => self.dispatch(tool, text.to_string()).await,
                    None => NOT_SURE.to_string(),
                }
            }
        }
    }

    fn classify(&self, text: &str) -> RouteResult {
        let route = self.router.route(text);
        debug!(label = ?route.label, score = route.score, "route");
        self.telemetry.record(TelemetryEvent::RouteDecision {
            mode: self.router.mode(),
            matched: route.label.is_some(),
            score: route.score,
        });
        route
    }

    fn tool_for_label(&self, label: &str) -> Option<Tool> {
        let resolved = match self.router.handler_for(label) {
            Some(tool) if self.tools.contains(tool) => Ok(tool),
            Some(tool) => Err(HandlerError::Unregistered(tool)),
            None => self.tools.resolve(label),
        };
        match resolved {
            Ok(tool) => Some(tool),
            Err(e) => {
                warn!("Cannot dispatch '{}': {}", label, e);
                None
            }
        }
    }

    async fn act_on_plan(&mut self, plan: PlannerResult, text: &str) -> String {
        if plan.tool != Tool::None {
            if self.tools.contains(plan.tool) {
                let arg = plan_argument(&plan, text);
                return self.dispatch(plan.tool, arg).await;
            }
            warn!("Planner chose {} but no handler is registered", plan.tool);
        }

        match plan.say {
            Some(say) if !say.trim().is_empty() => say.trim().to_string(),
            _ => NOT_SURE.to_string(),
        }
    }

    async fn dispatch(&mut self, tool: Tool, arg: String) -> String {
        let started = Instant::now();
        let result = self.tools.invoke(tool, arg).await;
        self.telemetry.record(TelemetryEvent::HandlerOutcome {
            tool,
            ok: result.is_ok(),
            latency_ms: started.elapsed().as_millis() as u64,
        });

        match result {
            Ok(reply) => reply,
            Err(e) => {
                error!("Handler {} failed: {}", tool, e);
                HANDLER_FAILED.to_string()
            }
        }
    }

    // === SPEAK ===

    /// Speaks with the mic paused; resumes it whether playback finished,
    /// failed, timed out or was cancelled.
    async fn say(&mut self, text: &str, cancel: &CancellationToken) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        self.context.pause_mic();
        self.notify(SessionNotice::Reply(text.to_string()));
        let in_session = self.state == SessionState::Listening;
        if in_session {
            self.transition(SessionTrigger::ReplyStarted);
        }

        let speaker = Arc::clone(&self.speaker);
        let limit = Duration::from_secs(self.session.max_speech_secs.max(1));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                speaker.stop_all();
                debug!("speech cancelled");
            }
            result = tokio::time::timeout(limit, speaker.speak(text)) => match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Speech failed: {}", e),
                Err(_) => {
                    warn!("Speech exceeded {:?}, stopping playback", limit);
                    speaker.stop_all();
                }
            },
        }

        if in_session && self.state == SessionState::Speaking {
            self.transition(SessionTrigger::ReplyFinished);
        }
        self.context.resume_mic();
    }

    // === TYPED INPUT ===

    async fn on_typed(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.state != SessionState::Sleeping {
            debug!(state = %self.state, "typed input ignored");
            return;
        }

        self.notify(SessionNotice::Heard(text.clone()));
        if is_stop_phrase(&text, &self.session.stop_phrases) {
            self.rearm_wake().await;
            return;
        }

        let idle = self.signals.current();
        let reply = tokio::select! {
            biased;
            _ = idle.cancelled() => return,
            reply = self.respond(&text) => reply,
        };
        self.say(&reply, &idle).await;
    }

    // === SLEEP / STOP / SHUTDOWN ===

    async fn settle_force_stop(&mut self) {
        self.transition(SessionTrigger::ForceStop);
        self.context.close_recorder();
        self.record_mic();
        self.speaker.stop_all();
        // Fresh token, or the idle loop would see the old cancellation again.
        self.signals.begin_session();
        self.notify(SessionNotice::System("Stopped.".to_string()));
        self.transition(SessionTrigger::Settled);
        self.rearm_wake().await;
    }

    async fn rearm_wake(&mut self) {
        if self.signals.is_shutdown() {
            return;
        }
        self.discard_stale_events();
        if let Err(e) = self.context.arm_wake().await {
            error!("Wake listener failed to start: {}", e);
        }
        self.record_mic();
        self.notify(SessionNotice::System(format!(
            "Sleeping. Say '{}' to wake me.",
            self.wake_word
        )));
    }

    /// Wake detections and typed lines queued while the listener was
    /// disarmed belong to a session that has ended. Only a detection from
    /// the re-armed listener may start the next one.
    fn discard_stale_events(&mut self) {
        let mut dropped = 0usize;
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SessionEvent::MicLevel(level) => self.notify(SessionNotice::MicLevel(level.min(100))),
                SessionEvent::WakeDetected | SessionEvent::Typed(_) => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(dropped, "discarded events queued during the session");
        }
    }

    async fn shutdown_all(&mut self) {
        self.speaker.stop_all();
        self.context.release_all().await;
        self.record_mic();
        self.transition(SessionTrigger::Shutdown);
        self.notify(SessionNotice::System("Shutting down.".to_string()));
        info!("Session orchestrator stopped");
    }

    // === BOOKKEEPING ===

    fn transition(&mut self, trigger: SessionTrigger) -> bool {
        match SessionGraph::transition(self.state, trigger) {
            Some(next) => {
                let from = self.state;
                self.state = next;
                info!(from = %from, to = %next, ?trigger, "state transition");
                self.telemetry.record(TelemetryEvent::StateTransition { from, to: next });
                self.state_tx.send_replace(next);
                self.notify(SessionNotice::StateChanged { from, to: next });
                true
            }
            None => {
                debug!(state = %self.state, ?trigger, "transition ignored");
                false
            }
        }
    }

    fn record_mic(&mut self) {
        let owner = self.context.mic_owner();
        if owner != self.last_mic {
            self.last_mic = owner;
            self.telemetry.record(TelemetryEvent::MicHandoff { owner });
        }
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }
}

/// The argument a planner-selected tool is invoked with.
pub fn plan_argument(plan: &PlannerResult, text: &str) -> String {
    if let Some(arg) = plan.argument(&["name", "filter", "percent"]) {
        return arg;
    }
    if plan.tool.targets_app() {
        if let Some(app) = extract_app_name(text) {
            return app;
        }
    }
    text.to_string()
}

async fn score_sample(gate: VerificationGate, sample: Vec<f32>) -> Result<Verdict, VerifyError> {
    tokio::task::spawn_blocking(move || gate.verify(&sample))
        .await
        .map_err(|e| VerifyError::Io(std::io::Error::other(e.to_string())))?
}

/// Short pause after a failed capture so a dead device does not spin the loop.
async fn backoff(pause: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(pause) => {}
    }
}
