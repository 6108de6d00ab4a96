//! Error taxonomy shared by the catalog, resolver, dispatch engine and chat store.
//!
//! `AiError` is what the core returns; `ErrorKind` is the copyable tag that
//! travels inside a `DispatchResult` so a failed target can be reported next to
//! its successful siblings.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = AiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AiError {
    /// Token is neither a known alias nor a `provider:model` pair, and no default is set.
    #[error("unknown alias '{0}'. Run 'ai list' to see available models.")]
    UnknownAlias(String),

    /// External call failed: non-zero exit, HTTP error, malformed response.
    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("{provider} timed out after {}s", .after.as_secs())]
    Timeout { provider: String, after: Duration },

    #[error("{what} '{id}' not found")]
    NotFound { what: &'static str, id: String },

    /// A request or catalog entry violates a provider policy (e.g. non-free model).
    #[error("policy violation: {0}")]
    Policy(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

impl AiError {
    pub fn provider(provider: impl fmt::Display, message: impl Into<String>) -> Self {
        AiError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AiError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::UnknownAlias(_) => ErrorKind::UnknownAlias,
            AiError::Provider { .. } => ErrorKind::Provider,
            AiError::Timeout { .. } => ErrorKind::Timeout,
            AiError::NotFound { .. } => ErrorKind::NotFound,
            AiError::Policy(_) => ErrorKind::Policy,
            AiError::Config(_) => ErrorKind::Config,
            AiError::Io { .. } => ErrorKind::Io,
            AiError::Usage(_) => ErrorKind::Usage,
        }
    }

    /// Optional follow-up tip printed under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AiError::UnknownAlias(_) => {
                Some("Set a default with 'ai default <alias>' to use 'ai \"prompt\"' directly.")
            }
            AiError::NotFound { what: "chat session", .. } => {
                Some("Run 'ai chat list' to see saved chat sessions.")
            }
            AiError::Provider { .. } => Some("Run 'ai init' to check available tools."),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownAlias,
    Provider,
    Timeout,
    NotFound,
    Policy,
    Config,
    Io,
    Usage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::UnknownAlias => "unknown_alias",
            ErrorKind::Provider => "provider",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Policy => "policy",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Usage => "usage",
        };
        f.write_str(s)
    }
}
