//! Engagement agent: per-platform and aggregated metrics.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::debug;

use super::Agent;
use crate::adapters::MetricsSource;
use crate::config::Config;
use crate::domain::{EngagementSnapshot, PerformanceStatus, Platform};
use crate::error::{AgentError, AgentResult};

/// Platform label used for cross-platform aggregates
pub const ALL_PLATFORMS: &str = "all";

/// Input for a metrics fetch; `platform: None` aggregates all enabled platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricsQuery {
    pub platform: Option<Platform>,
    pub window_days: u32,
}

pub struct EngagementAgent {
    source: Arc<dyn MetricsSource>,
    config: Arc<Config>,
}

impl EngagementAgent {
    pub fn new(source: Arc<dyn MetricsSource>, config: Arc<Config>) -> Self {
        Self { source, config }
    }

    /// Aggregate across all enabled platforms over `window_days`
    pub async fn analyze_metrics(&self, window_days: u32) -> AgentResult<EngagementSnapshot> {
        self.execute(MetricsQuery {
            platform: None,
            window_days,
        })
        .await
    }

    /// One platform over the configured analysis window
    pub async fn get_platform_stats(&self, platform: Platform) -> AgentResult<EngagementSnapshot> {
        self.execute(MetricsQuery {
            platform: Some(platform),
            window_days: self.config.engagement.analysis_window_days,
        })
        .await
    }

    /// Grade a snapshot and pick the matching recommendation
    pub fn assess(snapshot: &EngagementSnapshot) -> (PerformanceStatus, &'static str) {
        let status = PerformanceStatus::from_rate(snapshot.engagement_rate);
        (status, status.recommendation())
    }

    async fn fetch_one(&self, platform: Platform, window_days: u32) -> AgentResult<EngagementSnapshot> {
        if !self.config.is_enabled(platform) {
            return Err(AgentError::PlatformDisabled(platform));
        }

        let snapshot = self.source.fetch(platform, window_days).await?;
        if snapshot.engagement_rate.is_nan() || snapshot.engagement_rate < 0.0 {
            return Err(AgentError::InvalidMetrics {
                platform,
                reason: format!(
                    "{} reported engagement rate {}",
                    self.source.name(),
                    snapshot.engagement_rate
                ),
            });
        }

        debug!(
            source = self.source.name(),
            %platform,
            window_days,
            rate = snapshot.engagement_rate,
            "Fetched engagement snapshot"
        );
        Ok(snapshot)
    }

    /// Sum totals and growth, average rates, merge top content
    fn aggregate(&self, window_days: u32, snapshots: Vec<EngagementSnapshot>) -> EngagementSnapshot {
        let mut merged = EngagementSnapshot::empty(ALL_PLATFORMS, window_days);
        if snapshots.is_empty() {
            return merged;
        }

        let count = snapshots.len() as f64;
        for snapshot in snapshots {
            merged.total_engagements += snapshot.total_engagements;
            merged.audience_growth += snapshot.audience_growth;
            merged.engagement_rate += snapshot.engagement_rate / count;
            merged.top_content.extend(snapshot.top_content);
        }

        merged.top_content.sort_by(|a, b| {
            b.engagement_count
                .cmp(&a.engagement_count)
                .then_with(|| a.content_id.cmp(&b.content_id))
        });
        merged.top_content.truncate(self.config.engagement.top_content_limit);
        merged
    }
}

#[async_trait]
impl Agent for EngagementAgent {
    type Input = MetricsQuery;
    type Output = EngagementSnapshot;

    fn name(&self) -> &'static str {
        "engagement"
    }

    fn validate(&self, input: &MetricsQuery) -> bool {
        input.window_days > 0
    }

    async fn perform(&self, input: MetricsQuery) -> AgentResult<EngagementSnapshot> {
        match input.platform {
            Some(platform) => self.fetch_one(platform, input.window_days).await,
            None => {
                let fetches = self
                    .config
                    .platforms
                    .iter()
                    .map(|&platform| self.fetch_one(platform, input.window_days));

                let snapshots = join_all(fetches)
                    .await
                    .into_iter()
                    .collect::<AgentResult<Vec<_>>>()?;

                Ok(self.aggregate(input.window_days, snapshots))
            }
        }
    }
}
