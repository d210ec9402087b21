//! Cycle state machine states and cycle records.
//!
//! A cycle walks `Idle → Monitoring → Generating → Publishing → Tracking →
//! Adapting → Idle`. Every finished cycle leaves a [`CycleSummary`] in the
//! run history, including the units that were skipped and why.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{Platform, Tone};
use super::trend::TrendReport;

/// States of the orchestration cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Monitoring,
    Generating,
    Publishing,
    Tracking,
    Adapting,
    /// Terminal: explicit stop or unrecoverable error
    Stopped,
}

impl CycleState {
    /// The state that follows on the normal path
    pub fn successor(self) -> Option<CycleState> {
        match self {
            Self::Idle => Some(Self::Monitoring),
            Self::Monitoring => Some(Self::Generating),
            Self::Generating => Some(Self::Publishing),
            Self::Publishing => Some(Self::Tracking),
            Self::Tracking => Some(Self::Adapting),
            Self::Adapting => Some(Self::Idle),
            Self::Stopped => None,
        }
    }

    /// Whether the machine may move from `self` to `next`.
    ///
    /// Besides the normal path, any live state may stop, and any phase may
    /// fall back to `Idle` when its cycle is aborted.
    pub fn can_transition_to(self, next: CycleState) -> bool {
        if self == Self::Stopped {
            return false;
        }
        next == Self::Stopped || next == Self::Idle || self.successor() == Some(next)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Monitoring => "monitoring",
            Self::Generating => "generating",
            Self::Publishing => "publishing",
            Self::Tracking => "tracking",
            Self::Adapting => "adapting",
            Self::Stopped => "stopped",
        }
    }
}

impl Default for CycleState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the orchestrator reacts to a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Abort the whole run
    Fatal,
    /// Abort the current cycle, continue with the next one
    CycleAbort,
    /// Skip the affected platform/topic, continue the cycle
    Degrade,
}

/// A platform or topic dropped from a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub phase: CycleState,
    pub platform: Option<Platform>,
    pub topic: Option<String>,
    pub disposition: Disposition,
    /// Error class, e.g. `publish_rejected`
    pub kind: String,
    pub cause: String,
}

/// Tone adjustment decided in the adapting phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneChange {
    pub platform: Platform,
    pub from: Tone,
    pub to: Tone,
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CycleOutcome {
    /// All phases ran (possibly with skipped units)
    Completed,

    /// A phase hit a cycle-abort failure
    Aborted { phase: CycleState, error: String },

    /// A stop signal was observed after `phase`
    Stopped { phase: CycleState },

    /// A fatal failure ended the run
    Fatal { phase: CycleState, error: String },
}

/// Append-only record of one finished cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub run_id: Uuid,
    pub cycle_id: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,

    /// Aggregate view of the trend set the cycle worked from
    #[serde(default)]
    pub trend_report: Option<TrendReport>,

    /// Topics that reached content generation
    pub topics: Vec<String>,

    pub drafts_generated: usize,
    pub drafts_published: usize,

    /// Publish receipt ids per platform
    #[serde(default)]
    pub published_ids: BTreeMap<Platform, Vec<String>>,

    #[serde(default)]
    pub skipped: Vec<SkippedUnit>,

    #[serde(default)]
    pub engagement_rates: BTreeMap<Platform, f64>,

    /// Rate change against the previous snapshot of the same platform
    #[serde(default)]
    pub engagement_deltas: BTreeMap<Platform, f64>,

    #[serde(default)]
    pub tone_changes: Vec<ToneChange>,

    #[serde(default)]
    pub recommendations: BTreeMap<Platform, String>,
}

impl CycleSummary {
    /// Empty summary for a cycle starting now
    pub fn start(run_id: Uuid, cycle_id: u64) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            cycle_id,
            started_at: now,
            finished_at: now,
            outcome: CycleOutcome::Completed,
            trend_report: None,
            topics: Vec::new(),
            drafts_generated: 0,
            drafts_published: 0,
            published_ids: BTreeMap::new(),
            skipped: Vec::new(),
            engagement_rates: BTreeMap::new(),
            engagement_deltas: BTreeMap::new(),
            tone_changes: Vec::new(),
            recommendations: BTreeMap::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Completed)
    }

    /// Skipped units recorded for a platform
    pub fn skipped_for(&self, platform: Platform) -> Vec<&SkippedUnit> {
        self.skipped
            .iter()
            .filter(|s| s.platform == Some(platform))
            .collect()
    }

    /// Skipped units recorded for a topic
    pub fn skipped_topic(&self, topic: &str) -> Vec<&SkippedUnit> {
        self.skipped
            .iter()
            .filter(|s| s.topic.as_deref() == Some(topic))
            .collect()
    }
}

/// Why a continuous run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    MaxIterations,
    StopSignal,
    Fatal { error: String },
}

/// Result of [`Orchestrator::run`](crate::core::Orchestrator::run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub cycles: u32,
    pub stop_reason: StopReason,
}
