//! Error types for Sentence Drill sessions.
//!
//! Errors fall into three families:
//!
//! - configuration errors, which are fatal for the session and surfaced once
//!   at startup,
//! - provider errors from the content gateway, which are recoverable and never
//!   retried automatically,
//! - precondition violations, which indicate a caller bug rather than a
//!   user-facing condition.

use std::path::PathBuf;

/// A specialized `Result` type for session operations.
pub type Result<T> = std::result::Result<T, DrillError>;

/// Errors that can occur while running a drill session.
#[derive(Debug, thiserror::Error)]
pub enum DrillError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your drill.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// Provider credentials are not present in the environment.
    #[error("Provider credentials missing: environment variable '{env_var}' is not set\n\nSuggestion: Export {env_var} or add it to a .env file, then restart")]
    MissingCredentials {
        /// Name of the environment variable that should hold the API key.
        env_var: String,
    },

    /// The session was started without a content provider.
    ///
    /// Every load request is refused until the process is restarted with
    /// valid credentials.
    #[error("Content provider unavailable\n\nSuggestion: Configure provider credentials and restart the session")]
    ProviderUnavailable,

    // ========================================================================
    // Provider Errors
    // ========================================================================
    /// The content provider failed to produce a usable response.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // ========================================================================
    // Precondition Violations
    // ========================================================================
    /// A slot index outside the batch was used.
    #[error("Slot index {index} out of range (batch has {len} slots)")]
    SlotOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of slots in a batch.
        len: usize,
    },

    /// The operation requires a loaded batch.
    #[error("Session is not ready (current status: {status})")]
    NotReady {
        /// The status the session was in.
        status: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DrillError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingCredentials` error.
    #[must_use]
    pub fn missing_credentials(env_var: impl Into<String>) -> Self {
        Self::MissingCredentials {
            env_var: env_var.into(),
        }
    }

    /// Creates a new `SlotOutOfRange` error.
    #[must_use]
    pub const fn slot_out_of_range(index: usize, len: usize) -> Self {
        Self::SlotOutOfRange { index, len }
    }

    /// Creates a new `NotReady` error.
    #[must_use]
    pub fn not_ready(status: impl std::fmt::Display) -> Self {
        Self::NotReady {
            status: status.to_string(),
        }
    }

    /// Returns `true` if the session cannot continue without reconfiguration.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::MissingCredentials { .. }
                | Self::ProviderUnavailable
        )
    }

    /// Returns `true` if this error reports an invalid call rather than a
    /// runtime condition.
    #[must_use]
    pub const fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::SlotOutOfRange { .. } | Self::NotReady { .. })
    }
}

// ============================================================================
// ProviderError
// ============================================================================

/// Categories of content provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The service could not be reached.
    Network,
    /// The service answered with a non-success HTTP status.
    HttpStatus,
    /// Credentials were rejected.
    Authentication,
    /// The response body could not be parsed.
    Malformed,
    /// The response parsed but did not match the expected shape or arity.
    Schema,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::HttpStatus => write!(f, "http_status"),
            Self::Authentication => write!(f, "authentication"),
            Self::Malformed => write!(f, "malformed"),
            Self::Schema => write!(f, "schema"),
        }
    }
}

impl ProviderErrorKind {
    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Network => "Check your network connection and try again",
            Self::HttpStatus => "The provider may be overloaded; try again in a moment",
            Self::Authentication => "Check the provider API key",
            Self::Malformed | Self::Schema => {
                "The provider returned an unexpected answer; request the word again"
            }
        }
    }
}

/// Failure reported by the content provider gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Provider error ({kind}): {message}\n\nSuggestion: {}", .kind.suggestion())]
pub struct ProviderError {
    /// What went wrong.
    pub kind: ProviderErrorKind,
    /// Detail from the transport or parser.
    pub message: String,
}

impl ProviderError {
    /// Creates a provider error of the given kind.
    #[must_use]
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a `Network` provider error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    /// Creates a `Malformed` provider error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Malformed, message)
    }

    /// Creates a `Schema` provider error.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Schema, message)
    }
}
