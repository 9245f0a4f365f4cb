use crate::core::error::{GenerateError, PilotError};
use crate::core::persona::Persona;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Mistral,
    OpenAI,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Mistral, Provider::OpenAI, Provider::Anthropic];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Mistral => "mistral",
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Mistral => "https://api.mistral.ai/v1",
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Mistral => "mistral-large-latest",
            Provider::OpenAI => "gpt-4-turbo-preview",
            Provider::Anthropic => "claude-3-opus-20240229",
        }
    }

    /// Environment variable holding the credential for this provider.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Mistral => "MISTRAL_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Mistral => "Mistral",
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == s.trim().to_lowercase())
            .ok_or_else(|| {
                PilotError::Config(format!(
                    "Unsupported provider: {} (expected mistral, openai or anthropic)",
                    s
                ))
            })
    }
}

/// Per-provider settings as written in the config file. Everything is
/// optional; missing values fall back to the provider defaults.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
}

impl ProviderSettings {
    pub fn model_or_default(&self, provider: Provider) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    /// Resolve the configuration for one call. The credential is looked up
    /// now, not at startup: the environment variable first, then the file.
    pub fn resolve(&self, provider: Provider) -> Result<ProviderConfig, GenerateError> {
        self.resolve_with(provider, |var| std::env::var(var).ok())
    }

    /// A blank variable (`MISTRAL_API_KEY=` in a `.env` template) does not
    /// shadow the key from the file.
    fn resolve_with(
        &self,
        provider: Provider,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ProviderConfig, GenerateError> {
        let var = self
            .api_key_env
            .as_deref()
            .unwrap_or_else(|| provider.api_key_var());

        let non_blank = |key: String| {
            let key = key.trim().to_string();
            (!key.is_empty()).then_some(key)
        };
        let api_key = lookup(var)
            .and_then(non_blank)
            .or_else(|| self.api_key.clone().and_then(non_blank))
            .ok_or(GenerateError::Config { provider })?;

        Ok(ProviderConfig {
            provider,
            api_key,
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            model: self.model_or_default(provider),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
        })
    }
}

/// Fully resolved settings for a single generation call.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("presence_penalty", &self.presence_penalty)
            .field("frequency_penalty", &self.frequency_penalty)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub active_provider: Option<Provider>,
    #[serde(default = "default_true")]
    pub stream: bool,
    pub persona: Persona,
    pub system_prompt: Option<String>,
    pub providers: HashMap<Provider, ProviderSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_provider: None,
            stream: true,
            persona: Persona::default(),
            system_prompt: None,
            providers: HashMap::new(),
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dpilot")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("history.txt")
    }

    /// Load `~/.dpilot/config.yaml`, writing a default file on first run.
    pub fn load() -> Result<Config, PilotError> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }

        let config = Config::default();
        if let Err(e) = config.save_to(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not write default config");
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, PilotError> {
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yml::from_str::<Config>(&contents)
            .map_err(|e| PilotError::Config(format!("Parse {}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PilotError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    pub fn provider(&self) -> Provider {
        self.active_provider.unwrap_or_default()
    }

    pub fn settings_for(&self, provider: Provider) -> ProviderSettings {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }
}
