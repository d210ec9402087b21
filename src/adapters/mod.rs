//! Collaborator interfaces for external systems.
//!
//! The orchestration core never talks to a trend API, an LLM, a social
//! network or an analytics backend directly. It goes through these traits,
//! which concrete adapters implement.

pub mod openai;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ContentDraft, EngagementSnapshot, Platform, Trend};
use crate::error::AgentResult;

pub use openai::OpenAiBackend;
pub use simulated::{InMemoryPublishSink, SimulatedMetricsSource, StaticTrendSource, TemplateBackend};

/// Source of trending topics.
///
/// May fail with `RateLimited`, `Transient` or `Auth`.
#[async_trait]
pub trait TrendSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, limit: usize, language: &str) -> AgentResult<Vec<Trend>>;
}

/// Text-generation backend.
///
/// Errors surface as `Transient` unless clearly authentication-related.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> AgentResult<String>;
}

/// Answer from a publish sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub success: bool,
    pub id: Option<String>,
}

impl PublishReceipt {
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
        }
    }

    pub fn rejected() -> Self {
        Self {
            success: false,
            id: None,
        }
    }
}

/// Destination drafts are published to
#[async_trait]
pub trait PublishSink: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, draft: &ContentDraft) -> AgentResult<PublishReceipt>;
}

/// Source of engagement metrics
#[async_trait]
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, platform: Platform, window_days: u32) -> AgentResult<EngagementSnapshot>;
}

/// The full set of collaborators an orchestrator is built from
#[derive(Clone)]
pub struct Collaborators {
    pub trends: Arc<dyn TrendSource>,
    pub content: Arc<dyn ContentBackend>,
    pub publisher: Arc<dyn PublishSink>,
    pub metrics: Arc<dyn MetricsSource>,
}

impl Collaborators {
    /// Deterministic in-memory collaborators (demo mode and tests)
    pub fn simulated() -> Self {
        Self {
            trends: Arc::new(StaticTrendSource::default()),
            content: Arc::new(TemplateBackend),
            publisher: Arc::new(InMemoryPublishSink::default()),
            metrics: Arc::new(SimulatedMetricsSource::default()),
        }
    }

    pub fn with_trends(mut self, trends: Arc<dyn TrendSource>) -> Self {
        self.trends = trends;
        self
    }

    pub fn with_content(mut self, content: Arc<dyn ContentBackend>) -> Self {
        self.content = content;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn PublishSink>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSource>) -> Self {
        self.metrics = metrics;
        self
    }
}
