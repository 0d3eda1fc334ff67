//! Chat-completions client for an OpenAI-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use drill_session::{
    ContentProvider, DifficultyTier, ProviderConfig, ProviderError, ProviderErrorKind, WordBatch,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::parse::{parse_batch, parse_feedback};
use crate::prompt::{batch_prompt, feedback_prompt, Prompt};

/// Longest slice of an error body kept in a `HttpStatus` message.
const ERROR_BODY_LIMIT: usize = 200;

// ============================================================================
// Settings
// ============================================================================

/// Everything needed to talk to the chat endpoint.
#[derive(Clone)]
pub struct OpenAiSettings {
    /// Chat model name.
    pub model: String,
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Language translations are written in.
    pub native_language: String,
    /// Client-side timeout for one request.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("model", &self.model)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"<redacted>")
            .field("native_language", &self.native_language)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiSettings {
    /// Builds settings from the config section and an API key.
    #[must_use]
    pub fn from_config(config: &ProviderConfig, api_key: impl Into<String>) -> Self {
        Self {
            model: config.model.clone(),
            api_endpoint: config.api_endpoint.clone(),
            api_key: api_key.into(),
            native_language: config.native_language.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.api_endpoint.trim().trim_end_matches('/')
        )
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// OpenAiProvider
// ============================================================================

/// [`ContentProvider`] backed by a chat-completions API.
///
/// Each call is a single HTTP request. Failures are classified into
/// [`ProviderErrorKind`]s and never retried.
///
/// # Example
///
/// ```no_run
/// use drill_provider::{OpenAiProvider, OpenAiSettings};
/// use drill_session::{ContentProvider, DifficultyTier, ProviderConfig};
///
/// # async fn example() -> Result<(), drill_session::ProviderError> {
/// let settings = OpenAiSettings::from_config(&ProviderConfig::default(), "sk-test");
/// let provider = OpenAiProvider::new(settings)?;
/// let batch = provider.fetch_batch("river", DifficultyTier::Beginner).await?;
/// println!("{}", batch.slots()[0].sentence);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a `Network` error if the HTTP client cannot be built.
    pub fn new(settings: OpenAiSettings) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    /// Builds a provider from the config section, reading the key from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` when the key is absent.
    pub fn from_config(config: &ProviderConfig) -> drill_session::Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self::new(OpenAiSettings::from_config(config, api_key))?)
    }

    /// The active settings.
    #[must_use]
    pub const fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    /// Sends one chat request and returns the first choice's content.
    async fn complete(&self, prompt: &Prompt, json_mode: bool) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.settings.completions_url())
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::malformed(format!("chat response is not valid JSON: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::malformed("chat response has no content"))
    }
}

#[async_trait]
impl ContentProvider for OpenAiProvider {
    #[instrument(skip(self), fields(model = %self.settings.model))]
    async fn fetch_batch(
        &self,
        word: &str,
        tier: DifficultyTier,
    ) -> Result<WordBatch, ProviderError> {
        let prompt = batch_prompt(word, tier, &self.settings.native_language);
        let content = self.complete(&prompt, true).await?;
        let batch = parse_batch(&content, word, tier).map_err(|e| {
            warn!(kind = %e.kind, "Batch reply rejected");
            e
        })?;
        debug!(examples = batch.slots().len(), "Batch parsed");
        Ok(batch)
    }

    #[instrument(skip(self, reference, learner_text), fields(model = %self.settings.model))]
    async fn fetch_feedback(
        &self,
        reference: &str,
        learner_text: &str,
    ) -> Result<String, ProviderError> {
        let prompt = feedback_prompt(reference, learner_text);
        let content = self.complete(&prompt, false).await?;
        parse_feedback(&content)
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::network(format!("request timed out: {err}"))
    } else {
        ProviderError::network(err.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let snippet: String = body.trim().chars().take(ERROR_BODY_LIMIT).collect();
    let kind = if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ProviderErrorKind::Authentication
    } else {
        ProviderErrorKind::HttpStatus
    };
    if snippet.is_empty() {
        ProviderError::new(kind, format!("HTTP {status}"))
    } else {
        ProviderError::new(kind, format!("HTTP {status}: {snippet}"))
    }
}
