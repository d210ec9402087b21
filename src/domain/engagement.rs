//! Engagement snapshots and performance grading.

use serde::{Deserialize, Serialize};

/// Interactions recorded for one piece of published content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEngagement {
    pub content_id: String,
    pub engagement_count: u64,
}

/// Point-in-time engagement aggregate for one platform and window.
/// Immutable; one per (platform, window) query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    /// Platform name, or `all` for cross-platform aggregates
    pub platform: String,
    pub window_days: u32,
    pub total_engagements: u64,
    pub engagement_rate: f64,
    #[serde(default)]
    pub top_content: Vec<ContentEngagement>,
    #[serde(default)]
    pub audience_growth: i64,
}

impl EngagementSnapshot {
    /// Snapshot with no recorded activity
    pub fn empty(platform: impl Into<String>, window_days: u32) -> Self {
        Self {
            platform: platform.into(),
            window_days,
            total_engagements: 0,
            engagement_rate: 0.0,
            top_content: Vec::new(),
            audience_growth: 0,
        }
    }
}

/// Interactions divided by impressions; zero when nothing was shown
pub fn engagement_rate(interactions: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    interactions as f64 / impressions as f64
}

/// Coarse grade of an engagement rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceStatus {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 0.08 {
            Self::Excellent
        } else if rate >= 0.05 {
            Self::Good
        } else if rate >= 0.03 {
            Self::Average
        } else {
            Self::NeedsImprovement
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent engagement! Continue current strategy.",
            Self::Good => "Good performance. Consider A/B testing new content formats.",
            Self::Average => "Average engagement. Try increasing content frequency.",
            Self::NeedsImprovement => "Low engagement. Review content quality and posting times.",
        }
    }
}
