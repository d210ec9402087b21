//! Deterministic in-memory collaborators.
//!
//! Used by `trendcast run` when no live backend is configured, and by the
//! test suites. Nothing here touches the network.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ContentBackend, MetricsSource, PublishReceipt, PublishSink, TrendSource};
use crate::domain::{
    engagement_rate, ContentDraft, ContentEngagement, EngagementSnapshot, Momentum, Platform,
    Sentiment, Trend,
};
use crate::error::AgentResult;

/// Trend source serving a fixed trend list
#[derive(Debug, Clone)]
pub struct StaticTrendSource {
    trends: Vec<Trend>,
}

impl StaticTrendSource {
    pub fn new(trends: Vec<Trend>) -> Self {
        Self { trends }
    }
}

impl Default for StaticTrendSource {
    fn default() -> Self {
        Self::new(vec![
            Trend::new("#AIRevolution", 125_000)
                .with_momentum(Momentum::Rising)
                .with_sentiment(Sentiment::Positive)
                .with_related(["#MachineLearning", "#FutureOfWork"]),
            Trend::new("#GenerativeAI", 98_000)
                .with_momentum(Momentum::Stable)
                .with_sentiment(Sentiment::Mixed)
                .with_related(["#LLM"]),
            Trend::new("#TechInnovation", 87_000)
                .with_momentum(Momentum::Rising)
                .with_sentiment(Sentiment::Positive),
        ])
    }
}

#[async_trait]
impl TrendSource for StaticTrendSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, limit: usize, _language: &str) -> AgentResult<Vec<Trend>> {
        Ok(self.trends.iter().take(limit).cloned().collect())
    }
}

/// Content backend that fills a template from the prompt's fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateBackend;

impl TemplateBackend {
    fn field<'a>(prompt: &'a str, name: &str) -> Option<&'a str> {
        prompt.lines().find_map(|line| {
            line.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::trim)
        })
    }
}

#[async_trait]
impl ContentBackend for TemplateBackend {
    fn name(&self) -> &str {
        "template"
    }

    async fn complete(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> AgentResult<String> {
        let topic = Self::field(prompt, "Topic").unwrap_or("this");
        let opening = Self::field(prompt, "Opening").unwrap_or("");
        let tone = Self::field(prompt, "Tone").unwrap_or("professional");
        let values = Self::field(prompt, "Brand values").unwrap_or("");
        let variant = Self::field(prompt, "Variant").unwrap_or("1");

        let mood = match tone {
            "technical" => "worth a closer technical look",
            "casual" => "everywhere right now",
            "creative" => "sparking wild new ideas",
            _ => "shaping the conversation",
        };

        Ok(format!(
            "{} {} is {}. Take #{}: here is why it matters to us. We care about {}.",
            opening, topic, mood, variant, values
        )
        .trim()
        .to_string())
    }
}

/// Publish sink that records drafts in memory
#[derive(Debug, Default)]
pub struct InMemoryPublishSink {
    published: Mutex<Vec<ContentDraft>>,
    rejected_platforms: HashSet<Platform>,
}

impl InMemoryPublishSink {
    /// Refuse every draft for `platform` (answers `success: false`)
    pub fn rejecting(mut self, platform: Platform) -> Self {
        self.rejected_platforms.insert(platform);
        self
    }

    /// Drafts accepted so far
    pub fn published(&self) -> Vec<ContentDraft> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PublishSink for InMemoryPublishSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, draft: &ContentDraft) -> AgentResult<PublishReceipt> {
        if self.rejected_platforms.contains(&draft.platform) {
            return Ok(PublishReceipt::rejected());
        }

        let mut published = self
            .published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        published.push(draft.clone());
        Ok(PublishReceipt::accepted(format!(
            "{}-{}",
            draft.platform,
            published.len()
        )))
    }
}

/// Metrics source producing fixed per-platform rates
#[derive(Debug, Clone, Default)]
pub struct SimulatedMetricsSource {
    rates: HashMap<Platform, f64>,
}

impl SimulatedMetricsSource {
    const IMPRESSIONS: u64 = 12_500;
    // likes + comments + shares of the sample post
    const SAMPLE_INTERACTIONS: u64 = 450 + 120 + 85;

    /// Report `rate` for `platform` instead of the sample rate
    pub fn with_rate(mut self, platform: Platform, rate: f64) -> Self {
        self.rates.insert(platform, rate);
        self
    }
}

#[async_trait]
impl MetricsSource for SimulatedMetricsSource {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn fetch(&self, platform: Platform, window_days: u32) -> AgentResult<EngagementSnapshot> {
        let interactions = match self.rates.get(&platform) {
            Some(rate) => (rate * Self::IMPRESSIONS as f64).round() as u64,
            None => Self::SAMPLE_INTERACTIONS,
        };
        let rate = self
            .rates
            .get(&platform)
            .copied()
            .unwrap_or_else(|| engagement_rate(interactions, Self::IMPRESSIONS));

        Ok(EngagementSnapshot {
            platform: platform.to_string(),
            window_days,
            total_engagements: interactions,
            engagement_rate: rate,
            top_content: vec![ContentEngagement {
                content_id: format!("{}-1", platform),
                engagement_count: interactions,
            }],
            audience_growth: (interactions / 10) as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_template_backend_uses_prompt_fields() {
        let prompt = "Write a post.\nTopic: Rust\nTone: casual\nOpening: Did you know?\nVariant: 2\n";
        let body = TemplateBackend.complete(prompt, 100, 0.5).await.unwrap();

        assert!(body.starts_with("Did you know? Rust is everywhere right now."));
        assert!(body.contains("Take #2"));
    }

    #[tokio::test]
    async fn test_sample_metrics_rate() {
        let snapshot = SimulatedMetricsSource::default()
            .fetch(Platform::Twitter, 7)
            .await
            .unwrap();

        assert_eq!(snapshot.total_engagements, 655);
        assert!((snapshot.engagement_rate - 0.0524).abs() < 1e-9);
        assert_eq!(snapshot.window_days, 7);
    }

    #[tokio::test]
    async fn test_rejecting_sink() {
        let sink = InMemoryPublishSink::default().rejecting(Platform::Linkedin);
        let draft = ContentDraft {
            topic: "AI".into(),
            platform: Platform::Linkedin,
            body: "hello".into(),
            hashtags: Default::default(),
            format: Platform::Linkedin.default_format(),
            cta: None,
            tone: Default::default(),
            truncated: false,
        };

        let receipt = sink.publish(&draft).await.unwrap();
        assert!(!receipt.success);
        assert!(sink.published().is_empty());
    }
}
