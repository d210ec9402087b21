//! Per-cycle working state.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ContentDraft, CycleSummary, EngagementSnapshot, Platform, Tone, Trend};

/// Mutable aggregate threaded through one cycle.
///
/// Owned exclusively by the orchestrator. `history` and `tone_overrides`
/// survive across cycles; everything else is reset at cycle start.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub cycle_id: u64,
    pub trends: Vec<Trend>,
    /// Topics selected for generation this cycle
    pub topics: Vec<String>,
    pub drafts: Vec<ContentDraft>,
    pub snapshots: BTreeMap<Platform, EngagementSnapshot>,
    /// Platforms whose snapshot this cycle came from the cache, not a new fetch
    pub reused_snapshots: BTreeSet<Platform>,
    pub tone_overrides: BTreeMap<Platform, Tone>,
    history: Vec<CycleSummary>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tone for `platform`: its override if one exists, else `default`
    pub fn tone_for(&self, platform: Platform, default: Tone) -> Tone {
        self.tone_overrides.get(&platform).copied().unwrap_or(default)
    }

    pub fn drafts_for(&self, platform: Platform) -> impl Iterator<Item = &ContentDraft> {
        self.drafts.iter().filter(move |d| d.platform == platform)
    }

    /// Clear everything scoped to a single cycle
    pub fn reset_cycle(&mut self) {
        self.trends.clear();
        self.topics.clear();
        self.drafts.clear();
        self.snapshots.clear();
        self.reused_snapshots.clear();
    }

    /// Record a finished cycle and move to the next cycle id
    pub fn finish_cycle(&mut self, summary: CycleSummary) {
        self.history.push(summary);
        self.reset_cycle();
        self.cycle_id += 1;
    }

    /// All summaries, oldest first
    pub fn history(&self) -> &[CycleSummary] {
        &self.history
    }

    /// The most recent `limit` summaries, oldest first
    pub fn recent(&self, limit: usize) -> &[CycleSummary] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn summary(cycle_id: u64) -> CycleSummary {
        let mut summary = CycleSummary::start(Uuid::nil(), cycle_id);
        summary.topics = vec!["AI".into()];
        summary
    }

    #[test]
    fn test_finish_cycle_keeps_history_and_overrides() {
        let mut state = WorkflowState::new();
        state.trends.push(Trend::new("AI", 1));
        state.topics.push("AI".into());
        state.tone_overrides.insert(Platform::Twitter, Tone::Casual);

        state.finish_cycle(summary(0));

        assert_eq!(state.cycle_id, 1);
        assert!(state.trends.is_empty());
        assert!(state.topics.is_empty());
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.tone_for(Platform::Twitter, Tone::Professional), Tone::Casual);
        assert_eq!(state.tone_for(Platform::Linkedin, Tone::Professional), Tone::Professional);
    }

    #[test]
    fn test_recent() {
        let mut state = WorkflowState::new();
        for id in 0..5 {
            state.finish_cycle(summary(id));
        }
        let ids: Vec<u64> = state.recent(2).iter().map(|s| s.cycle_id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(state.recent(10).len(), 5);
    }
}
