//! Trend agent: ranked trending topics and per-topic analysis.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::Agent;
use crate::adapters::TrendSource;
use crate::domain::{
    sort_trends, EngagementPotential, Momentum, Sentiment, Trend, TrendAnalysis, TrendReport,
};
use crate::error::{AgentError, AgentResult};

/// Input for a trend fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrendQuery {
    pub limit: usize,
    pub language: String,
}

/// Fetches, ranks and remembers the current trend set
pub struct TrendAgent {
    source: Arc<dyn TrendSource>,

    /// Trend set from the most recent successful fetch
    current: RwLock<Vec<Trend>>,
}

impl TrendAgent {
    pub fn new(source: Arc<dyn TrendSource>) -> Self {
        Self {
            source,
            current: RwLock::new(Vec::new()),
        }
    }

    /// Top `limit` trends, by volume descending then topic ascending
    pub async fn get_trending_topics(&self, limit: usize, language: &str) -> AgentResult<Vec<Trend>> {
        self.execute(TrendQuery {
            limit,
            language: language.to_string(),
        })
        .await
    }

    /// Analysis of a topic from the current trend set
    pub fn analyze_trend(&self, topic: &str) -> AgentResult<TrendAnalysis> {
        if topic.trim().is_empty() {
            return Err(AgentError::invalid_input(self.name(), "topic is empty"));
        }

        let current = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        current
            .iter()
            .find(|t| t.topic == topic)
            .map(TrendAnalysis::from)
            .ok_or_else(|| AgentError::UnknownTopic(topic.to_string()))
    }

    /// Trend set from the most recent fetch
    pub fn current_trends(&self) -> Vec<Trend> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the current trend set (e.g. with a cached fetch result)
    pub fn observe(&self, trends: &[Trend]) {
        let mut current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = trends.to_vec();
    }

    /// Aggregate sentiment, momentum and volume over a trend set
    pub fn summarize(trends: &[Trend]) -> TrendReport {
        let total = trends.len();
        let ratio = |count: usize| if total == 0 { 0.0 } else { count as f64 / total as f64 };

        let positive = trends.iter().filter(|t| t.sentiment == Sentiment::Positive).count();
        let rising = trends.iter().filter(|t| t.momentum == Momentum::Rising).count();
        let avg_volume = if total == 0 {
            0.0
        } else {
            trends.iter().map(|t| t.volume as f64).sum::<f64>() / total as f64
        };

        let positive_ratio = ratio(positive);
        let rising_ratio = ratio(rising);

        let mut insights = Vec::new();
        if positive_ratio > 0.6 {
            insights.push("Strong positive sentiment detected - optimal for brand promotion".to_string());
        }
        if rising_ratio > 0.5 {
            insights.push("Multiple rising trends identified - recommend content alignment".to_string());
        }
        if avg_volume > 90_000.0 {
            insights.push("High engagement volume detected - prioritize relevant content".to_string());
        }
        if insights.is_empty() {
            insights.push("Monitor trends closely for emerging opportunities".to_string());
        }

        TrendReport {
            total,
            positive_ratio,
            rising_ratio,
            avg_volume,
            engagement_potential: if rising * 2 > total {
                EngagementPotential::High
            } else {
                EngagementPotential::Medium
            },
            insights,
        }
    }
}

#[async_trait]
impl Agent for TrendAgent {
    type Input = TrendQuery;
    type Output = Vec<Trend>;

    fn name(&self) -> &'static str {
        "trend"
    }

    fn validate(&self, input: &TrendQuery) -> bool {
        input.limit > 0 && !input.language.trim().is_empty()
    }

    async fn perform(&self, input: TrendQuery) -> AgentResult<Vec<Trend>> {
        let mut trends = self.source.fetch(input.limit, &input.language).await?;

        sort_trends(&mut trends);
        trends.truncate(input.limit);

        debug!(
            source = self.source.name(),
            count = trends.len(),
            language = %input.language,
            "Fetched trends"
        );

        self.observe(&trends);
        Ok(trends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticTrendSource;

    fn agent(trends: Vec<Trend>) -> TrendAgent {
        TrendAgent::new(Arc::new(StaticTrendSource::new(trends)))
    }

    #[tokio::test]
    async fn test_invalid_query_rejected() {
        let agent = agent(vec![Trend::new("AI", 1)]);
        let result = agent.get_trending_topics(0, "en").await;
        assert!(matches!(result, Err(AgentError::InvalidInput { .. })));

        let result = agent.get_trending_topics(5, "  ").await;
        assert!(matches!(result, Err(AgentError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_analyze_requires_current_topic() {
        let agent = agent(vec![Trend::new("AI", 10).with_sentiment(Sentiment::Positive)]);
        assert!(matches!(agent.analyze_trend("AI"), Err(AgentError::UnknownTopic(_))));

        agent.get_trending_topics(5, "en").await.unwrap();
        let analysis = agent.analyze_trend("AI").unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.volume, 10);
        assert!(matches!(agent.analyze_trend("Web3"), Err(AgentError::UnknownTopic(_))));
    }

    #[test]
    fn test_summarize_default_trends() {
        let trends = vec![
            Trend::new("a", 125_000).with_momentum(Momentum::Rising).with_sentiment(Sentiment::Positive),
            Trend::new("b", 98_000),
            Trend::new("c", 87_000).with_momentum(Momentum::Rising).with_sentiment(Sentiment::Positive),
        ];
        let report = TrendAgent::summarize(&trends);

        assert_eq!(report.total, 3);
        assert_eq!(report.engagement_potential, EngagementPotential::High);
        assert!((report.avg_volume - 103_333.333).abs() < 0.01);
        assert_eq!(report.insights.len(), 3);
    }

    #[test]
    fn test_summarize_empty() {
        let report = TrendAgent::summarize(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.engagement_potential, EngagementPotential::Medium);
        assert_eq!(report.insights.len(), 1);
    }
}
