use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Runtime settings, layered: built-in defaults, `Auris.*` in the working
/// directory, `<config_dir>/auris/Auris.*`, then `AURIS_*` environment
/// variables (`__` separates sections, e.g. `AURIS_PLANNER__MODEL`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub assistant_name: String,
    pub wake_word: String,
    pub router: RouterSettings,
    pub planner: PlannerSettings,
    pub auth: AuthSettings,
    pub session: SessionSettings,
    pub speech: SpeechSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Local directory with `config.json`, `tokenizer.json` and `model.safetensors`.
    pub embed_model_path: Option<PathBuf>,
    pub force_keywords: bool,
    pub embed_threshold: f32,
    pub keyword_min_score: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub host: String,
    pub model: String,
    pub fallback_models: Vec<String>,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub temperature: f32,
    pub num_ctx: u32,
    pub num_thread: u32,
    pub keep_alive: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub enabled: bool,
    pub model_path: PathBuf,
    pub verify_threshold: f32,
    pub verify_seconds: f32,
    pub enroll_samples: usize,
    pub enroll_seconds: f32,
    pub input_device: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub stop_phrases: Vec<String>,
    pub confidence_floor: f32,
    pub max_speech_secs: u64,
    pub capture_retry_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// External synthesizer invoked as `<program> <args..> <text>`.
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            assistant_name: "AURIS".to_string(),
            wake_word: "torque".to_string(),
            router: RouterSettings::default(),
            planner: PlannerSettings::default(),
            auth: AuthSettings::default(),
            session: SessionSettings::default(),
            speech: SpeechSettings::default(),
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            embed_model_path: None,
            force_keywords: false,
            embed_threshold: 0.52,
            keyword_min_score: 0.15,
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5:14b-instruct-q4_K_M".to_string(),
            fallback_models: vec![
                "qwen2.5:7b-instruct-q5_K_M".to_string(),
                "llama3.2:3b-instruct-q4_K_M".to_string(),
                "qwen2.5:3b-instruct-q4_K_M".to_string(),
                "llama3.2:1b-instruct-q4_0".to_string(),
            ],
            timeout_secs: 60,
            probe_timeout_secs: 6,
            attempts: 2,
            retry_delay_ms: 500,
            temperature: 0.2,
            num_ctx: 1024,
            num_thread: 0,
            keep_alive: "30s".to_string(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        let model_path = dirs::data_dir()
            .map(|dir| dir.join("auris").join("voice_profile.json"))
            .unwrap_or_else(|| PathBuf::from("voice_profile.json"));

        Self {
            enabled: true,
            model_path,
            verify_threshold: 0.55,
            verify_seconds: 2.0,
            enroll_samples: 5,
            enroll_seconds: 2.0,
            input_device: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stop_phrases: [
                "sleep",
                "stop listening",
                "hide window",
                "goodbye",
                "bye",
                "quit",
                "exit",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            confidence_floor: 0.55,
            max_speech_secs: 30,
            capture_retry_ms: 250,
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::with_name("Auris").required(false));

        if let Some(dir) = dirs::config_dir() {
            let user_file = dir.join("auris").join("Auris");
            builder = builder.add_source(File::with_name(&user_file.to_string_lossy()).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("AURIS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("session.stop_phrases")
                    .with_list_parse_key("planner.fallback_models")
                    .with_list_parse_key("speech.args"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Message(format!(
                    "Invalid {}: {}. Must be between 0.0 and 1.0",
                    name, value
                )))
            }
        };

        unit("router.embed_threshold", self.router.embed_threshold)?;
        unit("router.keyword_min_score", self.router.keyword_min_score)?;
        unit("auth.verify_threshold", self.auth.verify_threshold)?;
        unit("session.confidence_floor", self.session.confidence_floor)?;

        if self.wake_word.trim().is_empty() {
            return Err(ConfigError::Message("wake_word must not be empty".to_string()));
        }
        if self.planner.attempts == 0 {
            return Err(ConfigError::Message(
                "planner.attempts must be greater than 0".to_string(),
            ));
        }
        if self.auth.enroll_samples == 0 {
            return Err(ConfigError::Message(
                "auth.enroll_samples must be greater than 0".to_string(),
            ));
        }
        if self.auth.enroll_seconds <= 0.0 || self.auth.verify_seconds <= 0.0 {
            return Err(ConfigError::Message(
                "auth sample durations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
