//! Failure classification.
//!
//! The orchestrator never retries. Every error that reaches it from an agent
//! or the cache is classified here, and the disposition decides whether the
//! run, the cycle, or only the affected unit is abandoned.

use crate::domain::{CycleState, Disposition};
use crate::error::AgentError;

/// Maps errors to dispositions, taking the raising phase into account
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPolicy;

impl ErrorPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Classify `error` raised while the cycle was in `phase`.
    ///
    /// Exhausted retries and invalid input abort the cycle during
    /// monitoring (nothing downstream can run without trends) and only
    /// degrade the affected unit in the per-platform phases.
    pub fn classify(&self, error: &AgentError, phase: CycleState) -> Disposition {
        match error {
            AgentError::Auth(_) | AgentError::Configuration(_) => Disposition::Fatal,

            AgentError::PlatformDisabled(_)
            | AgentError::UnknownTopic(_)
            | AgentError::PublishRejected { .. }
            | AgentError::InvalidMetrics { .. } => Disposition::Degrade,

            AgentError::RateLimited(_) | AgentError::Transient(_) | AgentError::InvalidInput { .. } => {
                if Self::is_unit_phase(phase) {
                    Disposition::Degrade
                } else {
                    Disposition::CycleAbort
                }
            }

            AgentError::Internal(_) => Disposition::CycleAbort,
        }
    }

    /// Phases whose work is split into independent platform/topic units
    fn is_unit_phase(phase: CycleState) -> bool {
        matches!(
            phase,
            CycleState::Generating | CycleState::Publishing | CycleState::Tracking
        )
    }
}
