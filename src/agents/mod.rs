//! Agents: validated units of work wrapped around collaborators.
//!
//! Every agent follows the same contract: `validate` is a cheap structural
//! check with no I/O, and `execute` refuses invalid input with
//! `InvalidInput` before the underlying call is attempted.

pub mod content;
pub mod engagement;
pub mod trend;

use async_trait::async_trait;

use crate::error::{AgentError, AgentResult};

pub use content::{ContentAgent, ContentRequest};
pub use engagement::{EngagementAgent, MetricsQuery};
pub use trend::{TrendAgent, TrendQuery};

/// Capability contract shared by the trend, content and engagement agents
#[async_trait]
pub trait Agent: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Agent name used in errors and logs
    fn name(&self) -> &'static str;

    /// Structural check of `input`; never performs I/O
    fn validate(&self, input: &Self::Input) -> bool;

    /// The agent's unit of work, on input that passed `validate`
    async fn perform(&self, input: Self::Input) -> AgentResult<Self::Output>;

    /// Validate, then perform
    async fn execute(&self, input: Self::Input) -> AgentResult<Self::Output> {
        if !self.validate(&input) {
            return Err(AgentError::invalid_input(
                self.name(),
                "input failed structural validation",
            ));
        }
        self.perform(input).await
    }
}
