//! Configuration types for Sentence Drill.
//!
//! Settings are read from `drill.json` in the working directory. Every field
//! has a default, so a missing file is not an error. Provider credentials
//! never live in the file; [`ProviderConfig::api_key_env`] names the
//! environment variable that holds them.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DrillError, Result};
use crate::tier::DifficultyTier;
use crate::websocket::DEFAULT_EVENT_CAPACITY;

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "drill.json";

/// Default HTTP port for serve mode.
const fn default_port() -> u16 {
    3000
}

const fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "DRILL_API_KEY".to_string()
}

fn default_native_language() -> String {
    "Spanish".to_string()
}

/// Accepts tier names in any case, with `-` or `_`, or a level number.
fn deserialize_tier<'de, D>(deserializer: D) -> std::result::Result<DifficultyTier, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(|_| {
        serde::de::Error::custom(format!(
            "invalid tier '{s}': expected one of 'beginner', 'elementary', 'intermediate', 'upper_intermediate', 'advanced'"
        ))
    })
}

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Tier a new session starts at.
    #[serde(default, deserialize_with = "deserialize_tier")]
    pub default_tier: DifficultyTier,

    /// Port the HTTP API listens on in serve mode.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-subscriber buffer size of the event broadcaster.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Content provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_tier: DifficultyTier::default(),
            port: default_port(),
            event_capacity: default_event_capacity(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `drill.json` exists but is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            DrillError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads `drill.json` from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::ConfigParseError` if the file cannot be read or
    /// parsed, and `DrillError::ConfigValidationError` if a value is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(DrillError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| DrillError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::ConfigValidationError` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(DrillError::config_validation(
                "port must be greater than 0",
                "Set port to a free TCP port (for example 3000) in your drill.json",
            ));
        }

        if self.event_capacity == 0 {
            return Err(DrillError::config_validation(
                "eventCapacity must be greater than 0",
                "Set eventCapacity to at least 1 in your drill.json",
            ));
        }

        self.provider.validate()
    }
}

/// Content provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Chat model used for batches and feedback.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the chat completions API.
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Language translations are written in.
    #[serde(default = "default_native_language")]
    pub native_language: String,

    /// Per-request timeout. Unset means no client-side timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_endpoint: default_api_endpoint(),
            api_key_env: default_api_key_env(),
            native_language: default_native_language(),
            request_timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    /// Reads the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::MissingCredentials` when the variable is unset or
    /// blank.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(DrillError::missing_credentials(&self.api_key_env)),
        }
    }

    /// The request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(DrillError::config_validation(
                "provider.model must not be empty",
                "Set provider.model to a chat model name in your drill.json",
            ));
        }

        let endpoint = self.api_endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(DrillError::config_validation(
                format!("provider.apiEndpoint '{endpoint}' is not an http(s) URL"),
                "Set provider.apiEndpoint to a URL such as https://api.openai.com/v1",
            ));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(DrillError::config_validation(
                "provider.apiKeyEnv must not be empty",
                "Name the environment variable holding your API key, for example DRILL_API_KEY",
            ));
        }

        if self.native_language.trim().is_empty() {
            return Err(DrillError::config_validation(
                "provider.nativeLanguage must not be empty",
                "Set provider.nativeLanguage to the language translations should use",
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(DrillError::config_validation(
                "provider.requestTimeoutSecs must be greater than 0",
                "Remove provider.requestTimeoutSecs or set it to at least 1 second",
            ));
        }

        Ok(())
    }
}
