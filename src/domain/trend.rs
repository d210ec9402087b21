//! Trend records produced by the trend agent.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Rising,
    Stable,
    Falling,
}

impl Default for Momentum {
    fn default() -> Self {
        Self::Stable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Mixed,
    Negative,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Mixed => "mixed",
            Self::Negative => "negative",
        }
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::Mixed
    }
}

/// A trending topic as reported by a trend source. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub topic: String,
    pub volume: u64,
    #[serde(default)]
    pub momentum: Momentum,
    #[serde(default)]
    pub related_topics: Vec<String>,
    #[serde(default)]
    pub sentiment: Sentiment,
}

impl Trend {
    /// Create a stable, mixed-sentiment trend
    pub fn new(topic: impl Into<String>, volume: u64) -> Self {
        Self {
            topic: topic.into(),
            volume,
            momentum: Momentum::default(),
            related_topics: Vec::new(),
            sentiment: Sentiment::default(),
        }
    }

    pub fn with_momentum(mut self, momentum: Momentum) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.related_topics = related.into_iter().map(Into::into).collect();
        self
    }
}

/// Ranking order: volume descending, then topic ascending
pub fn rank_order(a: &Trend, b: &Trend) -> Ordering {
    b.volume.cmp(&a.volume).then_with(|| a.topic.cmp(&b.topic))
}

/// Sort trends into ranking order in place
pub fn sort_trends(trends: &mut [Trend]) {
    trends.sort_by(rank_order);
}

/// Detail for a single topic in the current trend set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub topic: String,
    pub sentiment: Sentiment,
    pub volume: u64,
    pub momentum: Momentum,
    pub related_topics: Vec<String>,
}

impl From<&Trend> for TrendAnalysis {
    fn from(trend: &Trend) -> Self {
        Self {
            topic: trend.topic.clone(),
            sentiment: trend.sentiment,
            volume: trend.volume,
            momentum: trend.momentum,
            related_topics: trend.related_topics.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementPotential {
    High,
    Medium,
}

/// Aggregate view over a whole trend set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub total: usize,
    pub positive_ratio: f64,
    pub rising_ratio: f64,
    pub avg_volume: f64,
    pub engagement_potential: EngagementPotential,
    pub insights: Vec<String>,
}
