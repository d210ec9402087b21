//! Main orchestrator: the cycle state machine and the continuous run loop.
//!
//! Coordinates the trend, content and engagement agents through the cache,
//! routes every failure through the error policy, and feeds engagement back
//! into per-platform tone.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{Collaborators, PublishSink};
use crate::agents::{ContentAgent, EngagementAgent, TrendAgent};
use crate::cache::{CacheStats, RateLimitedCache};
use crate::config::Config;
use crate::domain::{
    ContentDraft, CycleOutcome, CycleState, CycleSummary, Disposition, EngagementSnapshot,
    Platform, RunReport, SkippedUnit, StopReason, Tone, ToneChange, Trend, TrendAnalysis,
};
use crate::error::{AgentError, AgentResult};

use super::feedback::FeedbackLoop;
use super::history::HistoryStore;
use super::policy::ErrorPolicy;
use super::signal::StopSignal;
use super::workflow::WorkflowState;

type TrendKey = (usize, String);
type DraftKey = (String, Platform, Tone, usize);
type MetricsKey = (Platform, u32);

/// Why a cycle left the normal path
#[derive(Debug)]
enum Interrupt {
    /// Stop signal observed after the given phase
    Stop(CycleState),
    Abort(CycleState, AgentError),
    Fatal(CycleState, AgentError),
}

/// Counters of the three caches, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUsage {
    pub trends: CacheStats,
    pub drafts: CacheStats,
    pub metrics: CacheStats,
}

/// One platform's generation results
#[derive(Debug, Default)]
struct PlatformDrafts {
    drafts: Vec<ContentDraft>,
    /// (topic, error) per topic that produced no complete batch
    failures: Vec<(String, AgentError)>,
}

/// One platform's publish results
#[derive(Debug, Default)]
struct PlatformPublish {
    ids: Vec<String>,
    fingerprints: Vec<String>,
    duplicates: usize,
    error: Option<AgentError>,
}

/// Drives cycles over a fixed set of collaborators
pub struct Orchestrator {
    run_id: Uuid,
    config: Arc<Config>,

    trend_agent: TrendAgent,
    content_agent: ContentAgent,
    engagement_agent: EngagementAgent,
    publisher: Arc<dyn PublishSink>,

    policy: ErrorPolicy,
    feedback: FeedbackLoop,

    trend_cache: RateLimitedCache<TrendKey, Vec<Trend>>,
    draft_cache: RateLimitedCache<DraftKey, ContentDraft>,
    metrics_cache: RateLimitedCache<MetricsKey, EngagementSnapshot>,

    workflow: WorkflowState,
    state: CycleState,

    /// Latest engagement rate per platform, for cycle deltas
    last_rates: BTreeMap<Platform, f64>,

    /// Fingerprints of everything published during this run
    published: HashSet<String>,

    history_store: Option<HistoryStore>,
}

impl Orchestrator {
    /// Build an orchestrator from a validated configuration snapshot
    pub fn new(config: Config, collaborators: Collaborators) -> AgentResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let backoff = config.cache.clone();

        Ok(Self {
            run_id: Uuid::new_v4(),
            trend_agent: TrendAgent::new(collaborators.trends),
            content_agent: ContentAgent::new(collaborators.content, Arc::clone(&config)),
            engagement_agent: EngagementAgent::new(collaborators.metrics, Arc::clone(&config)),
            publisher: collaborators.publisher,
            policy: ErrorPolicy::new(),
            feedback: FeedbackLoop::from_config(&config),
            trend_cache: RateLimitedCache::new("trends", backoff.clone()),
            draft_cache: RateLimitedCache::new("drafts", backoff.clone()),
            metrics_cache: RateLimitedCache::new("metrics", backoff),
            workflow: WorkflowState::new(),
            state: CycleState::Idle,
            last_rates: BTreeMap::new(),
            published: HashSet::new(),
            history_store: None,
            config,
        })
    }

    /// Persist every cycle summary to `store` as well as in memory
    pub fn with_history_store(mut self, store: HistoryStore) -> Self {
        self.history_store = Some(store);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Id the next cycle will run under
    pub fn cycle_id(&self) -> u64 {
        self.workflow.cycle_id
    }

    /// The most recent `limit` cycle summaries, oldest first
    pub fn history(&self, limit: usize) -> &[CycleSummary] {
        self.workflow.recent(limit)
    }

    /// Tone the next cycle will use for `platform`
    pub fn tone_for(&self, platform: Platform) -> Tone {
        self.workflow
            .tone_for(platform, self.config.content.default_tone)
    }

    pub fn cache_usage(&self) -> CacheUsage {
        CacheUsage {
            trends: self.trend_cache.stats(),
            drafts: self.draft_cache.stats(),
            metrics: self.metrics_cache.stats(),
        }
    }

    /// Repeat cycles until max iterations, a stop signal or a fatal error.
    ///
    /// The inter-cycle interval is measured from the end of each cycle.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run(&mut self, stop: &StopSignal) -> RunReport {
        let max_iterations = self.config.run.max_iterations;
        let reached = |cycles: u32| max_iterations.map_or(false, |max| cycles >= max);
        let mut cycles = 0u32;

        info!(?max_iterations, interval_secs = self.config.run.interval_secs, "Starting run");

        let stop_reason = loop {
            if reached(cycles) {
                break StopReason::MaxIterations;
            }
            if stop.is_stopped() || self.state == CycleState::Stopped {
                break StopReason::StopSignal;
            }

            match self.run_cycle(stop).await {
                Ok(summary) => {
                    cycles += 1;
                    if matches!(summary.outcome, CycleOutcome::Stopped { .. }) {
                        break StopReason::StopSignal;
                    }
                }
                Err(e) => {
                    cycles += 1;
                    break StopReason::Fatal {
                        error: e.to_string(),
                    };
                }
            }

            if reached(cycles) {
                break StopReason::MaxIterations;
            }

            let interrupted = tokio::select! {
                _ = stop.stopped() => true,
                _ = tokio::time::sleep(self.config.interval()) => false,
            };
            if interrupted {
                break StopReason::StopSignal;
            }
        };

        if self.state != CycleState::Stopped {
            self.transition(CycleState::Stopped);
        }

        info!(cycles, ?stop_reason, "Run finished");
        RunReport {
            run_id: self.run_id,
            cycles,
            stop_reason,
        }
    }

    /// Run a single cycle and record its summary.
    ///
    /// Returns `Err` only for fatal failures; the orchestrator is stopped
    /// afterwards. Aborted and stopped cycles still produce a summary.
    #[instrument(skip_all, fields(cycle_id = self.workflow.cycle_id))]
    pub async fn run_cycle(&mut self, stop: &StopSignal) -> AgentResult<CycleSummary> {
        if self.state == CycleState::Stopped {
            return Err(AgentError::Internal("orchestrator has stopped".into()));
        }

        self.workflow.reset_cycle();
        let mut summary = CycleSummary::start(self.run_id, self.workflow.cycle_id);

        let interrupt = self.drive(stop, &mut summary).await.err();

        let mut fatal = None;
        let next_state = match interrupt {
            None => CycleState::Idle,
            Some(Interrupt::Stop(phase)) => {
                info!(%phase, "Stop signal observed, ending cycle");
                summary.outcome = CycleOutcome::Stopped { phase };
                CycleState::Stopped
            }
            Some(Interrupt::Abort(phase, e)) => {
                warn!(%phase, error = %e, "Cycle aborted");
                summary.outcome = CycleOutcome::Aborted {
                    phase,
                    error: e.to_string(),
                };
                CycleState::Idle
            }
            Some(Interrupt::Fatal(phase, e)) => {
                error!(%phase, error = %e, "Fatal error, stopping run");
                summary.outcome = CycleOutcome::Fatal {
                    phase,
                    error: e.to_string(),
                };
                fatal = Some(e);
                CycleState::Stopped
            }
        };

        summary.topics = self.workflow.topics.clone();
        summary.drafts_generated = self.workflow.drafts.len();
        summary.finished_at = Utc::now();

        self.record(summary.clone()).await;
        self.transition(next_state);

        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn drive(&mut self, stop: &StopSignal, summary: &mut CycleSummary) -> Result<(), Interrupt> {
        self.enter(CycleState::Monitoring, stop)?;
        self.monitor(summary).await?;

        self.enter(CycleState::Generating, stop)?;
        self.generate(summary).await?;

        self.enter(CycleState::Publishing, stop)?;
        self.publish(summary).await?;

        self.enter(CycleState::Tracking, stop)?;
        self.track(summary).await?;

        self.enter(CycleState::Adapting, stop)?;
        self.adapt(summary);

        Ok(())
    }

    /// Move to `next` unless a stop was requested
    fn enter(&mut self, next: CycleState, stop: &StopSignal) -> Result<(), Interrupt> {
        if stop.is_stopped() {
            return Err(Interrupt::Stop(self.state));
        }
        self.transition(next);
        Ok(())
    }

    fn transition(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    /// Record a degraded unit, or turn the failure into an interrupt
    fn route(
        &self,
        summary: &mut CycleSummary,
        phase: CycleState,
        platform: Option<Platform>,
        topic: Option<&str>,
        error: AgentError,
    ) -> Result<(), Interrupt> {
        match self.policy.classify(&error, phase) {
            Disposition::Degrade => {
                warn!(
                    %phase,
                    platform = platform.map(Platform::as_str),
                    topic,
                    error = %error,
                    "Skipping unit"
                );
                summary.skipped.push(SkippedUnit {
                    phase,
                    platform,
                    topic: topic.map(str::to_string),
                    disposition: Disposition::Degrade,
                    kind: error.kind().to_string(),
                    cause: error.to_string(),
                });
                Ok(())
            }
            Disposition::CycleAbort => Err(Interrupt::Abort(phase, error)),
            Disposition::Fatal => Err(Interrupt::Fatal(phase, error)),
        }
    }

    async fn monitor(&mut self, summary: &mut CycleSummary) -> Result<(), Interrupt> {
        let limit = self.config.trend.limit;
        let language = self.config.trend.language.as_str();
        let timeout = self.config.operation_timeout();
        let agent = &self.trend_agent;

        let result = self
            .trend_cache
            .get_or_compute(
                (limit, language.to_string()),
                self.config.update_frequency(),
                move || bounded(timeout, "trend fetch", agent.get_trending_topics(limit, language)),
            )
            .await;

        match result {
            Ok(trends) => {
                // A cache hit bypasses the agent, so refresh its view explicitly.
                self.trend_agent.observe(&trends);
                let report = TrendAgent::summarize(&trends);
                info!(
                    count = report.total,
                    potential = ?report.engagement_potential,
                    insights = ?report.insights,
                    "Trends ready"
                );
                summary.trend_report = Some(report);
                self.workflow.trends = trends;
                Ok(())
            }
            Err(e) => self.route(summary, CycleState::Monitoring, None, None, e),
        }
    }

    /// Top `max_topics` trends, then configured focus topics not already present
    fn select_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .workflow
            .trends
            .iter()
            .take(self.config.trend.max_topics)
            .map(|t| t.topic.clone())
            .collect();

        for focus in &self.config.trend.focus_topics {
            if !topics.contains(focus) {
                topics.push(focus.clone());
            }
        }
        topics
    }

    async fn generate(&mut self, summary: &mut CycleSummary) -> Result<(), Interrupt> {
        let mut analyses = Vec::new();
        for topic in self.select_topics() {
            match self.trend_agent.analyze_trend(&topic) {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => self.route(summary, CycleState::Generating, None, Some(&topic), e)?,
            }
        }
        self.workflow.topics = analyses.iter().map(|a| a.topic.clone()).collect();

        if analyses.is_empty() {
            info!("No topics to generate for");
            return Ok(());
        }

        let default_tone = self.config.content.default_tone;
        let this = &*self;
        let analyses = &analyses;
        let jobs = this.config.platforms.iter().map(|&platform| {
            let tone = this.workflow.tone_for(platform, default_tone);
            async move { (platform, this.generate_for(platform, tone, analyses).await) }
        });
        let results = join_all(jobs).await;

        for (platform, batch) in results {
            debug!(%platform, drafts = batch.drafts.len(), "Generation finished");
            self.workflow.drafts.extend(batch.drafts);
            for (topic, e) in batch.failures {
                self.route(summary, CycleState::Generating, Some(platform), Some(&topic), e)?;
            }
        }
        Ok(())
    }

    /// Drafts for every topic on one platform; a failing topic is dropped whole
    async fn generate_for(&self, platform: Platform, tone: Tone, analyses: &[TrendAnalysis]) -> PlatformDrafts {
        let count = self.config.content.drafts_per_topic;
        let ttl = self.config.draft_ttl();
        let timeout = self.config.operation_timeout();
        let agent = &self.content_agent;
        let mut batch = PlatformDrafts::default();

        'topics: for analysis in analyses {
            let mut drafts = Vec::with_capacity(count);
            for variant in 0..count {
                let key = (analysis.topic.clone(), platform, tone, variant);
                let result = self
                    .draft_cache
                    .get_or_compute(key, ttl, move || {
                        bounded(
                            timeout,
                            "content generation",
                            agent.generate_variant(&analysis.topic, platform, tone, variant, Some(analysis)),
                        )
                    })
                    .await;

                match result {
                    Ok(draft) => drafts.push(draft),
                    Err(e) => {
                        batch.failures.push((analysis.topic.clone(), e));
                        continue 'topics;
                    }
                }
            }
            batch.drafts.extend(drafts);
        }
        batch
    }

    async fn publish(&mut self, summary: &mut CycleSummary) -> Result<(), Interrupt> {
        let this = &*self;
        let jobs = this
            .config
            .platforms
            .iter()
            .map(|&platform| async move { (platform, this.publish_for(platform).await) });
        let results = join_all(jobs).await;

        for (platform, outcome) in results {
            if outcome.duplicates > 0 {
                debug!(%platform, duplicates = outcome.duplicates, "Skipped already published drafts");
            }
            summary.drafts_published += outcome.fingerprints.len();
            self.published.extend(outcome.fingerprints);
            if !outcome.ids.is_empty() {
                summary.published_ids.insert(platform, outcome.ids);
            }
            if let Some(e) = outcome.error {
                self.route(summary, CycleState::Publishing, Some(platform), None, e)?;
            }
        }
        Ok(())
    }

    /// Publish one platform's drafts in order, stopping at the first failure
    async fn publish_for(&self, platform: Platform) -> PlatformPublish {
        let timeout = self.config.operation_timeout();
        let mut outcome = PlatformPublish::default();

        for draft in self.workflow.drafts_for(platform) {
            let fingerprint = draft.fingerprint();
            if self.published.contains(&fingerprint) || outcome.fingerprints.contains(&fingerprint) {
                outcome.duplicates += 1;
                continue;
            }

            match bounded(timeout, "publish", self.publisher.publish(draft)).await {
                Ok(receipt) if receipt.success => {
                    debug!(%platform, id = ?receipt.id, topic = %draft.topic, "Published draft");
                    outcome.ids.extend(receipt.id);
                    outcome.fingerprints.push(fingerprint);
                }
                Ok(_) => {
                    outcome.error = Some(AgentError::PublishRejected {
                        platform,
                        reason: format!("{} refused the draft for '{}'", self.publisher.name(), draft.topic),
                    });
                    break;
                }
                Err(e) => {
                    outcome.error = Some(e);
                    break;
                }
            }
        }
        outcome
    }

    /// Snapshots for every enabled platform that did not fail to publish
    async fn track(&mut self, summary: &mut CycleSummary) -> Result<(), Interrupt> {
        let platforms: Vec<Platform> = self
            .config
            .platforms
            .iter()
            .copied()
            .filter(|&p| {
                summary
                    .skipped_for(p)
                    .iter()
                    .all(|s| s.phase != CycleState::Publishing)
            })
            .collect();

        let window = self.config.engagement.analysis_window_days;
        let ttl = self.config.metrics_ttl();
        let timeout = self.config.operation_timeout();
        let this = &*self;
        let jobs = platforms.iter().map(|&platform| {
            let agent = &this.engagement_agent;
            async move {
                let result = this
                    .metrics_cache
                    .fetch((platform, window), ttl, move || {
                        bounded(timeout, "metrics fetch", agent.get_platform_stats(platform))
                    })
                    .await;
                (platform, result)
            }
        });
        let results = join_all(jobs).await;

        for (platform, result) in results {
            match result {
                Ok(cached) => {
                    if !cached.fresh {
                        self.workflow.reused_snapshots.insert(platform);
                    }
                    summary.engagement_rates.insert(platform, cached.value.engagement_rate);
                    self.workflow.snapshots.insert(platform, cached.value);
                }
                Err(e) => self.route(summary, CycleState::Tracking, Some(platform), None, e)?,
            }
        }
        Ok(())
    }

    /// Deltas, recommendations and next-cycle tones from this cycle's snapshots
    fn adapt(&mut self, summary: &mut CycleSummary) {
        let default_tone = self.config.content.default_tone;

        for (&platform, snapshot) in &self.workflow.snapshots {
            let rate = snapshot.engagement_rate;
            if let Some(previous) = self.last_rates.insert(platform, rate) {
                summary.engagement_deltas.insert(platform, rate - previous);
            }

            let (status, advice) = EngagementAgent::assess(snapshot);
            debug!(%platform, rate, ?status, "Assessed engagement");
            summary.recommendations.insert(platform, advice.to_string());

            // A cached snapshot was already acted on when it was fetched.
            if self.workflow.reused_snapshots.contains(&platform) {
                debug!(%platform, "Snapshot reused from cache, tone unchanged");
                continue;
            }

            let current = self
                .workflow
                .tone_overrides
                .get(&platform)
                .copied()
                .unwrap_or(default_tone);
            if let Some(next) = self.feedback.adapt(platform, current, rate) {
                info!(%platform, from = %current, to = %next, rate, "Adjusting tone");
                self.workflow.tone_overrides.insert(platform, next);
                summary.tone_changes.push(ToneChange {
                    platform,
                    from: current,
                    to: next,
                });
            }
        }
    }

    /// Append the summary to history (and the store, if any), then reset
    async fn record(&mut self, summary: CycleSummary) {
        info!(
            outcome = ?summary.outcome,
            topics = summary.topics.len(),
            generated = summary.drafts_generated,
            published = summary.drafts_published,
            skipped = summary.skipped.len(),
            "Cycle finished"
        );

        if let Some(ref store) = self.history_store {
            if let Err(e) = store.append(&summary).await {
                warn!(error = %e, path = %store.path().display(), "Failed to persist cycle summary");
            }
        }
        self.workflow.finish_cycle(summary);
    }
}

/// Bound an external operation; running out of time is a transient failure
async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> AgentResult<T>
where
    F: Future<Output = AgentResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Transient(format!(
            "{} timed out after {}s",
            operation,
            limit.as_secs()
        ))),
    }
}
