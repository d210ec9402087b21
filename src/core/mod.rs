//! Core orchestration logic.
//!
//! This module contains:
//! - ErrorPolicy: Failure classification
//! - FeedbackLoop: Engagement-driven tone adjustment
//! - WorkflowState: Per-cycle working state and history
//! - HistoryStore: Append-only cycle summaries on disk
//! - StopSignal: External stop for continuous runs
//! - Orchestrator: Cycle state machine and run loop

pub mod feedback;
pub mod history;
pub mod orchestrator;
pub mod policy;
pub mod signal;
pub mod workflow;

// Re-export commonly used types
pub use feedback::{FeedbackLoop, Signal};
pub use history::HistoryStore;
pub use orchestrator::{CacheUsage, Orchestrator};
pub use policy::ErrorPolicy;
pub use signal::StopSignal;
pub use workflow::WorkflowState;
