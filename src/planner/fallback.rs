use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::parse::interpret;
use super::types::{PlannerResult, Tool};
use crate::config::PlannerSettings;
use crate::services::llm::client::{
    ChatMessage, ChatOptions, ChatRequest, ModelAvailability, OllamaClient,
};

/// Anything that can turn an unmatched utterance into a tool choice.
#[async_trait]
pub trait CommandPlanner: Send + Sync {
    async fn plan(&self, text: &str) -> Option<PlannerResult>;
}

/// Walks an ordered chain of candidate models on an Ollama host and returns
/// the first usable, normalised answer.
pub struct PlannerFallback {
    client: OllamaClient,
    candidates: Vec<String>,
    options: ChatOptions,
    keep_alive: String,
    timeout: Duration,
    probe_timeout: Duration,
    attempts: u32,
    retry_delay: Duration,
}

impl PlannerFallback {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self {
            client: OllamaClient::new(&settings.host),
            candidates: candidate_chain(&settings.model, &settings.fallback_models),
            options: ChatOptions {
                temperature: settings.temperature,
                num_ctx: settings.num_ctx,
                num_thread: settings.num_thread,
            },
            keep_alive: settings.keep_alive.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
            attempts: settings.attempts.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    fn request_for(&self, model: &str, text: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::system(instruction()), ChatMessage::user(text)],
            stream: false,
            options: self.options.clone(),
            keep_alive: self.keep_alive.clone(),
        }
    }

    /// `None` when every candidate was skipped, failed, or stayed silent.
    pub async fn plan(&self, text: &str) -> Option<PlannerResult> {
        'models: for model in &self.candidates {
            match self.client.probe_model(model, self.probe_timeout).await {
                ModelAvailability::Present => {}
                ModelAvailability::Absent => {
                    info!("Planner model '{}' is not pulled, skipping", model);
                    continue;
                }
                ModelAvailability::Unreachable(reason) => {
                    warn!("Planner host {} unreachable while probing '{}': {}", self.client.base_url(), model, reason);
                    continue;
                }
            }

            let request = self.request_for(model, text);

            for attempt in 1..=self.attempts {
                let started = Instant::now();
                match self.client.chat(&request, self.timeout).await {
                    Ok(content) => {
                        debug!("Planner '{}' answered in {}ms", model, started.elapsed().as_millis());
                        match interpret(&content) {
                            Some(result) => return Some(result),
                            None => {
                                info!("Planner '{}' returned no content, trying next model", model);
                                continue 'models;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Planner '{}' attempt {}/{} failed: {}", model, attempt, self.attempts, e);
                        if attempt < self.attempts {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }
        }

        warn!("All planner models exhausted");
        None
    }
}

#[async_trait]
impl CommandPlanner for PlannerFallback {
    async fn plan(&self, text: &str) -> Option<PlannerResult> {
        PlannerFallback::plan(self, text).await
    }
}

/// Primary first, then fallbacks; blanks dropped, first occurrence kept.
pub fn candidate_chain(primary: &str, fallbacks: &[String]) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    for name in std::iter::once(primary).chain(fallbacks.iter().map(String::as_str)) {
        let name = name.trim();
        if !name.is_empty() && !chain.iter().any(|existing| existing == name) {
            chain.push(name.to_string());
        }
    }
    chain
}

/// The routing instruction sent with every request.
pub fn instruction() -> String {
    let mut tools = String::new();
    for tool in Tool::DISPATCHABLE {
        tools.push_str(&format!("- {} {}\n", tool.as_str(), tool.arg_hint()));
    }

    let names: Vec<&str> = Tool::DISPATCHABLE.iter().map(|t| t.as_str()).collect();

    format!(
        "You route requests for a local desktop assistant to exactly one tool.\n\
         Available tools:\n{}\n\
         Reply with JSON only, no commentary and no code fences, using this shape:\n\
         {{\"tool\":\"<{}|none>\",\"args\":{{...}},\"say\":\"<optional short reply>\"}}\n\
         For general questions set \"tool\" to \"none\" and put the answer in \"say\".",
        tools,
        names.join("|")
    )
}
