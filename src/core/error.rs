use crate::config::Provider;
use crate::providers::ProviderError;
use std::io;
use thiserror::Error;

/// Application-level error type for dpilot
#[derive(Error, Debug)]
pub enum PilotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A generation that failed and was not recovered by the controller
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl From<serde_yml::Error> for PilotError {
    fn from(err: serde_yml::Error) -> Self {
        PilotError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<rustyline::error::ReadlineError> for PilotError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        PilotError::Input(format!("Readline error: {}", err))
    }
}

/// Failure of a single generation. The `Display` output is the message shown
/// to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Invalid API key. Please check your {provider} API key.")]
    Auth { provider: Provider },

    #[error("Rate limit exceeded. Please try again in a few moments.")]
    RateLimit { provider: Provider },

    #[error("{provider} API service error. Please try again later.")]
    ProviderService { provider: Provider },

    #[error("{provider} API key is not configured. Set {} in your environment or .env file.", .provider.api_key_var())]
    Config { provider: Provider },

    #[error("No response received from {provider} API.")]
    EmptyResponse { provider: Provider },

    #[error("{0}")]
    Unknown(String),
}

impl GenerateError {
    /// Map a raw transport failure onto the error taxonomy. The HTTP status
    /// wins when present; otherwise the message is matched case-insensitively.
    pub fn classify(provider: Provider, failure: &ProviderError) -> Self {
        if let Some(status) = failure.status {
            match status {
                401 | 403 => return GenerateError::Auth { provider },
                429 => return GenerateError::RateLimit { provider },
                500..=599 => return GenerateError::ProviderService { provider },
                _ => {}
            }
        }

        // A status outside the arms above is authoritative; digits in the
        // body are not re-read as a status code.
        let bare = failure.status.is_none();
        let text = failure.message.to_lowercase();

        if bare && has_code(&text, |code| code == 401)
            || ["unauthorized", "invalid api key", "invalid_api_key", "authentication"]
                .iter()
                .any(|needle| text.contains(needle))
        {
            GenerateError::Auth { provider }
        } else if bare && has_code(&text, |code| code == 429)
            || text.contains("rate limit")
            || text.contains("rate_limit")
        {
            GenerateError::RateLimit { provider }
        } else if bare && has_code(&text, |code| (500..=599).contains(&code))
            || text.contains("service unavailable")
            || text.contains("overloaded")
        {
            GenerateError::ProviderService { provider }
        } else if text.contains("api key") {
            GenerateError::Config { provider }
        } else {
            GenerateError::Unknown(failure.message.clone())
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// True if `text` contains a standalone three-digit number accepted by `pred`.
/// "HTTP 429" and "status=503," match; "15003" does not.
fn has_code(text: &str, pred: impl Fn(u16) -> bool) -> bool {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .any(pred)
}
