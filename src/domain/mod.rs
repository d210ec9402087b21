//! Domain types for the trendcast orchestrator.
//!
//! This module contains the core data structures:
//! - Trend: Topics reported by trend sources
//! - Content: Platforms, tones and generated drafts
//! - Engagement: Metrics snapshots
//! - Cycle: State machine states and cycle summaries

pub mod content;
pub mod cycle;
pub mod engagement;
pub mod trend;

// Re-export commonly used types
pub use content::{truncate_at_word_boundary, ContentDraft, ContentFormat, Platform, Tone, ELLIPSIS};
pub use cycle::{
    CycleOutcome, CycleState, CycleSummary, Disposition, RunReport, SkippedUnit, StopReason,
    ToneChange,
};
pub use engagement::{engagement_rate, ContentEngagement, EngagementSnapshot, PerformanceStatus};
pub use trend::{
    rank_order, sort_trends, EngagementPotential, Momentum, Sentiment, Trend, TrendAnalysis,
    TrendReport,
};
