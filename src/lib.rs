//! trendcast - Trend-driven content orchestrator
//!
//! Watches trending topics, drafts platform-sized posts for them, publishes
//! the drafts, and feeds engagement back into the voice used next time.
//!
//! # Architecture
//!
//! The system is a cycle state machine:
//! - Monitoring: fetch and rank trends (cached)
//! - Generating: draft content per enabled platform, concurrently
//! - Publishing: hand drafts to the publish sink, per platform
//! - Tracking: collect engagement snapshots, per platform
//! - Adapting: shift each platform's tone along the tone ladder
//!
//! External calls go through `RateLimitedCache`, which owns all retries.
//! The orchestrator only classifies failures and decides what to skip.
//!
//! # Modules
//!
//! - `adapters`: Collaborator traits and implementations (simulated, OpenAI)
//! - `agents`: Trend, content and engagement agents
//! - `cache`: TTL cache with single-flight computation and backoff
//! - `core`: Orchestration logic (Orchestrator, ErrorPolicy, FeedbackLoop)
//! - `domain`: Data structures (Trend, ContentDraft, CycleSummary)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run continuously with simulated collaborators
//! trendcast run
//!
//! # Run a single cycle
//! trendcast run --once
//!
//! # Show recorded cycles
//! trendcast history --limit 5
//! ```

pub mod adapters;
pub mod agents;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use adapters::Collaborators;
pub use config::Config;
pub use core::{ErrorPolicy, HistoryStore, Orchestrator, StopSignal};
pub use domain::{ContentDraft, CycleState, CycleSummary, Platform, RunReport, Tone, Trend};
pub use error::{AgentError, AgentResult};
