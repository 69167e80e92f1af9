use anyhow::Context;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use auris::audio::MicRecorder;
use auris::drivers::{CommandSpeaker, ConsoleFeed, ConsoleRecognizers, ConsoleWake};
use auris::error::HandlerError;
use auris::intent::{default_intents, IntentRouter, RouterThresholds};
use auris::kernel::{Devices, SessionNotice, SessionOrchestrator};
use auris::planner::{PlannerFallback, Tool};
use auris::tools::{builtin, ToolRegistry};
use auris::voice_auth::VerificationGate;
use auris::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("failed to load settings")?;
    tracing::info!("{} booting (wake word '{}')", settings.assistant_name, settings.wake_word);

    // `auris enroll a.wav b.wav ..` trains the voice profile from files and exits.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("enroll") {
        return enroll_from_files(&settings, &args[1..]).await;
    }

    let router = Arc::new(build_router(&settings));
    let planner = Arc::new(PlannerFallback::new(&settings.planner));
    let tools = Arc::new(build_tools().context("failed to register tool handlers")?);

    let (stdin_closed_tx, stdin_closed_rx) = tokio::sync::oneshot::channel::<()>();
    let feed = ConsoleFeed::stdin(move || {
        let _ = stdin_closed_tx.send(());
    });

    let devices = Devices {
        wake: Box::new(ConsoleWake::new(feed.clone(), &settings.wake_word)),
        recognizers: Arc::new(ConsoleRecognizers::new(feed)),
        speaker: Arc::new(CommandSpeaker::new(&settings.speech)),
        sampler: Arc::new(MicRecorder::new(settings.auth.input_device.clone())),
    };

    let (orchestrator, handle) = SessionOrchestrator::new(&settings, router, planner, tools, devices);

    // Notice printer: the console's only stdout writer.
    let mut notices = handle.subscribe();
    let name = settings.assistant_name.clone();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(SessionNotice::StateChanged { to, .. }) => println!("[{}] state: {}", name, to),
                Ok(SessionNotice::Heard(text)) => println!("[you] {}", text),
                Ok(SessionNotice::Reply(text)) => println!("[{}] {}", name, text),
                Ok(SessionNotice::System(text)) => println!("[system] {}", text),
                Ok(SessionNotice::MicLevel(_)) => {}
                Err(RecvError::Lagged(skipped)) => tracing::debug!("Notice printer lagged by {}", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let control = handle.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                }
                tracing::info!("Ctrl+C received");
            }
            _ = stdin_closed_rx => {}
        }
        control.shutdown();
    });

    tracing::info!("Type '{}' to wake, or any command while asleep. Ctrl+C to quit.", settings.wake_word);
    orchestrator.run().await;

    let snapshot = handle.telemetry().snapshot();
    tracing::info!(
        sessions = snapshot.sessions.started,
        turns = snapshot.sessions.total_turns,
        planner_calls = snapshot.planner.calls,
        handler_failures = snapshot.handlers.failures,
        "session summary"
    );
    Ok(())
}

fn build_router(settings: &Settings) -> IntentRouter {
    let mut router = with_embedder(IntentRouter::new(RouterThresholds::from(&settings.router)), settings);
    router.register_all(default_intents());
    router.build();
    router
}

#[cfg(feature = "embeddings")]
fn with_embedder(router: IntentRouter, settings: &Settings) -> IntentRouter {
    if settings.router.force_keywords {
        return router;
    }
    let Some(dir) = settings.router.embed_model_path.as_deref() else {
        return router;
    };
    match auris::intent::bert::BertEmbedder::load(dir) {
        Ok(embedder) => router.with_embedder(Box::new(embedder)),
        Err(e) => {
            tracing::warn!("Embedding model unavailable, using keywords: {}", e);
            router
        }
    }
}

#[cfg(not(feature = "embeddings"))]
fn with_embedder(router: IntentRouter, settings: &Settings) -> IntentRouter {
    if settings.router.embed_model_path.is_some() && !settings.router.force_keywords {
        tracing::warn!("Built without the 'embeddings' feature, using keyword routing");
    }
    router
}

/// Builtins plus console stand-ins for the application tools.
fn build_tools() -> Result<ToolRegistry, HandlerError> {
    let mut registry = ToolRegistry::new();
    builtin::register_builtins(&mut registry)?;

    for tool in [Tool::OpenApp, Tool::CloseApp, Tool::CloseAllApps, Tool::RescanApps, Tool::ListApps] {
        registry.register(tool, move |arg: &str| -> Result<String, HandlerError> {
            let target = arg.trim();
            if target.is_empty() {
                Ok(format!("Application control ({}) isn't available in the console.", tool))
            } else {
                Ok(format!("Application control ({}) isn't available in the console, so I can't handle '{}'.", tool, target))
            }
        })?;
    }

    Ok(registry)
}

async fn enroll_from_files(settings: &Settings, paths: &[String]) -> anyhow::Result<()> {
    anyhow::ensure!(!paths.is_empty(), "usage: auris enroll <sample.wav>...");

    let gate = VerificationGate::from_settings(&settings.auth);
    let paths = paths.to_vec();
    let target = gate.model_path().to_path_buf();
    tokio::task::spawn_blocking(move || gate.enroll_from_wavs(&paths))
        .await
        .context("enrollment task failed")?
        .context("enrollment failed")?;

    tracing::info!("Voice profile written to {}", target.display());
    Ok(())
}
