//! Configuration management
//!
//! Defaults, then an optional TOML file, then environment variables.
//! Everything is read once at startup.

use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::agent::router::{KeywordTable, Persona};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Assistant identity and console behaviour
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Local chat endpoint and model names
    #[serde(default)]
    pub model: ModelConfig,
    /// Persona keyword table
    #[serde(default)]
    pub router: KeywordTable,
    /// Speech capture, transcription and playback
    #[serde(default)]
    pub voice: VoiceConfig,
    /// HTTP service variant
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Name the assistant answers to; also the natural-action name token
    #[serde(default = "default_name")]
    pub name: String,
    /// How the assistant greets the user
    #[serde(default)]
    pub user_name: Option<String>,
    /// Character that marks a slash command
    #[serde(default = "default_command_prefix")]
    pub command_prefix: char,
    /// Global key that triggers look-and-speak
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
}

fn default_name() -> String {
    "Saba".to_string()
}

fn default_command_prefix() -> char {
    '/'
}

fn default_hotkey() -> String {
    "F8".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            user_name: None,
            command_prefix: default_command_prefix(),
            hotkey: default_hotkey(),
        }
    }
}

impl AssistantConfig {
    /// Greeting used by `/talk` and at startup
    pub fn greeting(&self) -> String {
        match &self.user_name {
            Some(user) => format!("Hello {}, I am {}, your AI assistant.", user, self.name),
            None => format!("Hello, I am {}, your AI assistant.", self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Chat endpoint (Ollama `/api/chat` wire format)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model used by every persona unless overridden
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Model used for screen descriptions
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    /// Per-persona overrides
    #[serde(default)]
    pub personas: PersonaModels,
}

fn default_endpoint() -> String {
    crate::agent::llm::DEFAULT_CHAT_URL.to_string()
}

fn default_chat_model() -> String {
    "llama3.1".to_string()
}

fn default_vision_model() -> String {
    "llama3.2-vision".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_chat_model(),
            vision_model: default_vision_model(),
            personas: PersonaModels::default(),
        }
    }
}

impl ModelConfig {
    /// Model name a persona resolves to
    pub fn model_for(&self, persona: Persona) -> &str {
        let over = match persona {
            Persona::Coding => &self.personas.coding,
            Persona::Reasoning => &self.personas.reasoning,
            Persona::Fast => &self.personas.fast,
            Persona::General => &self.personas.general,
        };
        over.as_deref().unwrap_or(&self.model)
    }
}

/// Optional model override for each persona
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaModels {
    #[serde(default)]
    pub coding: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub fast: Option<String>,
    #[serde(default)]
    pub general: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// OpenAI-compatible transcription endpoint
    #[serde(default = "default_stt_url")]
    pub stt_url: String,
    /// Transcription model name
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    /// Bearer token for the transcription endpoint
    #[serde(default)]
    pub stt_api_key: String,
    /// Spoken language hint
    #[serde(default = "default_language")]
    pub language: String,
    /// Length of one capture in seconds
    #[serde(default = "default_record_secs")]
    pub record_secs: u64,
    /// Speech command override; an unquoted `{text}` marks where the line goes, else it is appended
    #[serde(default)]
    pub tts_command: Option<String>,
}

fn default_stt_url() -> String {
    "https://api.groq.com/openai/v1/audio/transcriptions".to_string()
}

fn default_stt_model() -> String {
    "whisper-large-v3-turbo".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_record_secs() -> u64 {
    4
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_url: default_stt_url(),
            stt_model: default_stt_model(),
            stt_api_key: String::new(),
            language: default_language(),
            record_secs: default_record_secs(),
            tts_command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
    /// Shared secret for `x-api-key`; empty disables the gate
    #[serde(default)]
    pub api_key: String,
    /// Extra browser origin allowed by CORS
    #[serde(default)]
    pub frontend_origin: Option<String>,
    /// Model reported by `/api/status` and used for `/api/chat`
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Per-request timeout for the chat endpoint
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            api_key: String::new(),
            frontend_origin: None,
            model: default_chat_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load the config file (if any) and overlay the process environment
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Ok(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup; empty values count as unset
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(k));

        if let Some(v) = get("SABA_NAME") {
            self.assistant.name = v;
        }
        if let Some(v) = get("SABA_USER") {
            self.assistant.user_name = Some(v);
        }
        if let Some(v) = get("SABA_HOTKEY") {
            self.assistant.hotkey = v;
        }

        if let Some(v) = get("OLLAMA_URL") {
            self.model.endpoint = v;
        }
        if let Some(v) = get("SABA_CHAT_MODEL") {
            self.model.model = v;
        }
        if let Some(v) = get("SABA_VISION_MODEL") {
            self.model.vision_model = v;
        }

        if let Some(v) = get("SABA_STT_URL") {
            self.voice.stt_url = v;
        }
        if let Some(v) = get("SABA_STT_MODEL") {
            self.voice.stt_model = v;
        }
        if let Some(v) = first(&["SABA_STT_API_KEY", "GROQ_API_KEY"]) {
            self.voice.stt_api_key = v;
        }
        if let Some(v) = get("SABA_TTS_COMMAND") {
            self.voice.tts_command = Some(v);
        }

        if let Some(v) = first(&["SABA_MODEL", "MODEL_NAME"]) {
            self.server.model = v;
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v.trim().parse()
                .with_context(|| format!("Invalid PORT value: {}", v))?;
        }
        if let Some(debug) = debug_flag(&lookup) {
            self.server.debug = debug;
        }
        if let Some(v) = get("SABA_API_KEY") {
            self.server.api_key = v;
        }
        if let Some(v) = get("FRONTEND_ORIGIN") {
            self.server.frontend_origin = Some(v);
        }

        Ok(())
    }
}

/// `1`, `true` and `yes` (any case) switch a flag on
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// First non-empty of `DEBUG`, `SABA_DEBUG`, `FLASK_DEBUG`, as a flag
pub fn debug_flag(lookup: impl Fn(&str) -> Option<String>) -> Option<bool> {
    ["DEBUG", "SABA_DEBUG", "FLASK_DEBUG"]
        .iter()
        .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()))
        .map(|v| is_truthy(&v))
}

/// Debug flag straight from the environment, for use before config is loaded
pub fn debug_from_env() -> bool {
    debug_flag(|key| std::env::var(key).ok()).unwrap_or(false)
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "saba", "saba")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}****", crate::truncate_safe(secret, 2))
    }
}

/// Show the effective configuration
pub fn show_config(config: &Config) -> Result<()> {
    let path = config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unavailable)".to_string());

    println!("Config file: {}", path);
    println!();
    println!("Assistant:");
    println!("  name:            {}", config.assistant.name);
    println!("  user:            {}", config.assistant.user_name.as_deref().unwrap_or("(not set)"));
    println!("  command prefix:  {}", config.assistant.command_prefix);
    println!("  hotkey:          {}", config.assistant.hotkey);
    println!("Models:");
    println!("  endpoint:        {}", config.model.endpoint);
    for persona in Persona::ALL {
        println!("  {:<16} {}", format!("{}:", persona), config.model.model_for(persona));
    }
    println!("  vision:          {}", config.model.vision_model);
    println!("Voice:");
    println!("  stt endpoint:    {}", config.voice.stt_url);
    println!("  stt model:       {}", config.voice.stt_model);
    println!("  stt api key:     {}", mask(&config.voice.stt_api_key));
    println!("  capture:         {}s", config.voice.record_secs);
    println!("Server:");
    println!("  bind:            {}:{}", config.server.host, config.server.port);
    println!("  model:           {}", config.server.model);
    println!("  api key:         {}", mask(&config.server.api_key));
    println!("  frontend origin: {}", config.server.frontend_origin.as_deref().unwrap_or("(not set)"));
    println!("  debug:           {}", config.server.debug);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.assistant.name, "Saba");
        assert_eq!(config.assistant.command_prefix, '/');
        assert_eq!(config.model.model, "llama3.1");
        assert_eq!(config.server.port, 5000);
        assert!(config.server.api_key.is_empty());
        assert_eq!(config.voice.record_secs, 4);
    }

    #[test]
    fn test_env_overlay() {
        let mut config = Config::default();
        config.apply_env_with(env(&[
            ("SABA_MODEL", "gpt-oss:120b-cloud"),
            ("PORT", "8080"),
            ("SABA_API_KEY", "s3cret"),
            ("FRONTEND_ORIGIN", "https://saba.example"),
            ("FLASK_DEBUG", "1"),
        ])).unwrap();

        assert_eq!(config.server.model, "gpt-oss:120b-cloud");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.api_key, "s3cret");
        assert_eq!(config.server.frontend_origin.as_deref(), Some("https://saba.example"));
        assert!(config.server.debug);
    }

    #[test]
    fn test_first_debug_variable_decides() {
        let lookup = env(&[("DEBUG", "0"), ("FLASK_DEBUG", "1")]);
        assert_eq!(debug_flag(&lookup), Some(false));

        let mut config = Config::default();
        config.server.debug = true;
        config.apply_env_with(lookup).unwrap();
        assert!(!config.server.debug);

        let lookup = env(&[("DEBUG", " "), ("SABA_DEBUG", "yes")]);
        assert_eq!(debug_flag(&lookup), Some(true));
        assert_eq!(debug_flag(env(&[])), None);
    }

    #[test]
    fn test_model_name_fallback() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("MODEL_NAME", "mistral")])).unwrap();
        assert_eq!(config.server.model, "mistral");

        // SABA_MODEL wins over MODEL_NAME
        let mut config = Config::default();
        config.apply_env_with(env(&[("MODEL_NAME", "mistral"), ("SABA_MODEL", "qwen")])).unwrap();
        assert_eq!(config.server.model, "qwen");
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("HOST", ""), ("SABA_API_KEY", "  ")])).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.server.api_key.is_empty());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_env_with(env(&[("PORT", "abc")])).is_err());
    }

    #[test]
    fn test_persona_model_override() {
        let mut config = Config::default();
        config.model.personas.coding = Some("qwen2.5-coder".to_string());
        assert_eq!(config.model.model_for(Persona::Coding), "qwen2.5-coder");
        assert_eq!(config.model.model_for(Persona::General), "llama3.1");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"
[assistant]
name = "Nova"
user_name = "Sam"

[router]
coding = ["rust"]

[server]
port = 7000
"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.assistant.name, "Nova");
        assert_eq!(config.assistant.user_name.as_deref(), Some("Sam"));
        assert_eq!(config.router.coding, vec!["rust".to_string()]);
        // Unspecified router lists keep their defaults
        assert!(config.router.fast.contains(&"tl;dr".to_string()));
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_greeting() {
        let mut assistant = AssistantConfig::default();
        assert_eq!(assistant.greeting(), "Hello, I am Saba, your AI assistant.");
        assistant.user_name = Some("Sabarish".to_string());
        assert_eq!(assistant.greeting(), "Hello Sabarish, I am Saba, your AI assistant.");
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("YES"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
    }
}
