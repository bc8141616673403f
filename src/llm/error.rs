//! Chat error types

use thiserror::Error;

/// Chat error with classification.
///
/// The kind only matters for diagnostics: every kind ends up as the same
/// fallback bubble on screen.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NetworkTimeout, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::AuthFailure, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::RateLimited, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::MalformedResponse, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::ProviderUnavailable, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::auth(format!("Authentication failed: {message}")),
            429 => Self::rate_limited(format!("Rate limit exceeded: {message}")),
            500..=599 => Self::unavailable(format!("Server error: {message}")),
            _ => Self::malformed(format!("HTTP {status}: {message}")),
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    NetworkTimeout,
    AuthFailure,
    RateLimited,
    MalformedResponse,
    /// Endpoint unreachable or failing (5xx, connection refused)
    ProviderUnavailable,
}

impl std::fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NetworkTimeout => "network timeout",
            Self::AuthFailure => "auth failure",
            Self::RateLimited => "rate limited",
            Self::MalformedResponse => "malformed response",
            Self::ProviderUnavailable => "provider unavailable",
        };
        f.write_str(name)
    }
}
