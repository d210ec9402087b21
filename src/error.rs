//! Error taxonomy shared by agents, the cache and the orchestrator.
//!
//! Agents never swallow errors. The cache retries only the transient
//! classes, and the orchestrator routes everything else through the
//! [`ErrorPolicy`](crate::core::ErrorPolicy).

use thiserror::Error;

use crate::domain::Platform;

/// Result alias used across agents and collaborators
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Failures raised by agents, collaborators and the cache
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// Local validation failed; the underlying call was never attempted
    #[error("Invalid input for {agent}: {reason}")]
    InvalidInput { agent: String, reason: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Platform '{0}' is not enabled")]
    PlatformDisabled(Platform),

    #[error("Topic '{0}' is not in the current trend set")]
    UnknownTopic(String),

    /// The publish sink answered but refused the draft
    #[error("Publish rejected on {platform}: {reason}")]
    PublishRejected { platform: Platform, reason: String },

    /// A metrics source answered with a snapshot that cannot be used
    #[error("Invalid metrics for {platform}: {reason}")]
    InvalidMetrics { platform: Platform, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Build an `InvalidInput` error for the named agent
    pub fn invalid_input(agent: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            agent: agent.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the cache layer may retry this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transient(_))
    }

    /// Stable snake_case name of the error class (used in cycle summaries)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Auth(_) => "auth",
            Self::Configuration(_) => "configuration",
            Self::RateLimited(_) => "rate_limited",
            Self::Transient(_) => "transient",
            Self::PlatformDisabled(_) => "platform_disabled",
            Self::UnknownTopic(_) => "unknown_topic",
            Self::PublishRejected { .. } => "publish_rejected",
            Self::InvalidMetrics { .. } => "invalid_metrics",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_classes_are_retryable() {
        assert!(AgentError::RateLimited("429".into()).is_retryable());
        assert!(AgentError::Transient("reset".into()).is_retryable());

        assert!(!AgentError::Auth("bad key".into()).is_retryable());
        assert!(!AgentError::invalid_input("trend", "limit is zero").is_retryable());
        assert!(!AgentError::UnknownTopic("AI".into()).is_retryable());
        assert!(!AgentError::PlatformDisabled(Platform::Tiktok).is_retryable());
        assert!(!AgentError::InvalidMetrics {
            platform: Platform::Twitter,
            reason: "rate is NaN".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = AgentError::PublishRejected {
            platform: Platform::Linkedin,
            reason: "duplicate post".into(),
        };
        assert_eq!(err.to_string(), "Publish rejected on linkedin: duplicate post");
        assert_eq!(err.kind(), "publish_rejected");
    }
}
