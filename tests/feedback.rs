//! Engagement-to-tone feedback across cycles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use trendcast::adapters::{Collaborators, MetricsSource, SimulatedMetricsSource};
use trendcast::config::AdaptationMode;
use trendcast::domain::{EngagementSnapshot, Platform, Tone, ToneChange};
use trendcast::{AgentResult, Config, Orchestrator, StopSignal};

/// Metrics source replaying a fixed sequence of rates
struct RateSequence {
    rates: Vec<f64>,
    next: AtomicUsize,
}

#[async_trait]
impl MetricsSource for RateSequence {
    fn name(&self) -> &str {
        "sequence"
    }

    async fn fetch(&self, platform: Platform, window_days: u32) -> AgentResult<EngagementSnapshot> {
        let index = self.next.fetch_add(1, Ordering::SeqCst).min(self.rates.len() - 1);
        let mut snapshot = EngagementSnapshot::empty(platform.as_str(), window_days);
        snapshot.engagement_rate = self.rates[index];
        Ok(snapshot)
    }
}

fn twitter_only(default_tone: Tone) -> Config {
    let mut config = Config::default();
    config.platforms = vec![Platform::Twitter];
    config.content.default_tone = default_tone;
    config.run.interval_secs = 0;
    // Every cycle observes a new snapshot.
    config.engagement.metrics_ttl_secs = 0;
    config
}

fn orchestrator(config: Config, metrics: Arc<dyn MetricsSource>) -> Orchestrator {
    Orchestrator::new(config, Collaborators::simulated().with_metrics(metrics)).unwrap()
}

async fn run_cycles(orchestrator: &mut Orchestrator, cycles: usize) {
    let stop = StopSignal::new();
    for _ in 0..cycles {
        let summary = orchestrator.run_cycle(&stop).await.unwrap();
        assert!(summary.is_completed());
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_low_cycles_move_two_steps() {
    let metrics = SimulatedMetricsSource::default().with_rate(Platform::Twitter, 0.01);
    let mut orchestrator = orchestrator(twitter_only(Tone::Technical), Arc::new(metrics));

    run_cycles(&mut orchestrator, 2).await;

    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Casual);
    let changes: Vec<ToneChange> = orchestrator
        .history(2)
        .iter()
        .flat_map(|s| s.tone_changes.clone())
        .collect();
    assert_eq!(
        changes,
        vec![
            ToneChange {
                platform: Platform::Twitter,
                from: Tone::Technical,
                to: Tone::Professional
            },
            ToneChange {
                platform: Platform::Twitter,
                from: Tone::Professional,
                to: Tone::Casual
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_low_engagement_stops_at_ladder_end() {
    let metrics = SimulatedMetricsSource::default().with_rate(Platform::Twitter, 0.01);
    let mut orchestrator = orchestrator(twitter_only(Tone::Professional), Arc::new(metrics));

    run_cycles(&mut orchestrator, 3).await;

    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Creative);
    let history = orchestrator.history(3);
    assert_eq!(history[0].tone_changes.len(), 1);
    assert_eq!(history[1].tone_changes.len(), 1);
    assert!(history[2].tone_changes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_high_engagement_keeps_tone() {
    let metrics = SimulatedMetricsSource::default().with_rate(Platform::Twitter, 0.09);
    let mut orchestrator = orchestrator(twitter_only(Tone::Technical), Arc::new(metrics));

    run_cycles(&mut orchestrator, 2).await;

    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Technical);
    assert!(orchestrator.history(2).iter().all(|s| s.tone_changes.is_empty()));
    assert_eq!(
        orchestrator.history(1)[0].recommendations[&Platform::Twitter],
        "Excellent engagement! Continue current strategy."
    );
}

#[tokio::test(start_paused = true)]
async fn test_drafts_follow_the_adjusted_tone() {
    let metrics = SimulatedMetricsSource::default().with_rate(Platform::Twitter, 0.01);
    let mut orchestrator = orchestrator(twitter_only(Tone::Casual), Arc::new(metrics));

    run_cycles(&mut orchestrator, 2).await;

    // Cycle 0 wrote casual drafts; cycle 1 used the shifted tone and so
    // produced new bodies that were published again.
    let history = orchestrator.history(2);
    assert_eq!(history[0].drafts_published, 3);
    assert_eq!(history[1].drafts_published, 3);
    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Creative);
}

#[tokio::test(start_paused = true)]
async fn test_streak_mode_waits_for_consecutive_lows() {
    let mut config = twitter_only(Tone::Technical);
    config.feedback.adaptation = AdaptationMode::Streak { cycles: 2 };
    let metrics = RateSequence {
        rates: vec![0.01, 0.04, 0.01, 0.01],
        next: AtomicUsize::new(0),
    };
    let mut orchestrator = orchestrator(config, Arc::new(metrics));

    run_cycles(&mut orchestrator, 3).await;
    // low, neutral, low: the streak was broken
    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Technical);

    run_cycles(&mut orchestrator, 1).await;
    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Professional);
}

#[tokio::test(start_paused = true)]
async fn test_engagement_deltas_between_cycles() {
    let config = twitter_only(Tone::Professional);
    let metrics = RateSequence {
        rates: vec![0.04, 0.045],
        next: AtomicUsize::new(0),
    };
    let mut orchestrator = orchestrator(config, Arc::new(metrics));

    run_cycles(&mut orchestrator, 2).await;

    let history = orchestrator.history(2);
    assert!(history[0].engagement_deltas.is_empty());
    let delta = history[1].engagement_deltas[&Platform::Twitter];
    assert!((delta - 0.005).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_cached_snapshot_moves_tone_only_once() {
    let mut config = twitter_only(Tone::Technical);
    config.engagement.metrics_ttl_secs = 300;
    let metrics = RateSequence {
        rates: vec![0.01],
        next: AtomicUsize::new(0),
    };
    let metrics = Arc::new(metrics);
    let mut orchestrator = orchestrator(config, metrics.clone());

    run_cycles(&mut orchestrator, 3).await;

    // One fetch, acted on once; later cycles reuse it without stepping again.
    assert_eq!(metrics.next.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Professional);
    let history = orchestrator.history(3);
    assert_eq!(history[0].tone_changes.len(), 1);
    assert!(history[1].tone_changes.is_empty());
    assert!(history[2].tone_changes.is_empty());
    assert_eq!(history[2].engagement_rates[&Platform::Twitter], 0.01);

    // Once the entry expires, the next snapshot counts again.
    tokio::time::advance(std::time::Duration::from_secs(301)).await;
    run_cycles(&mut orchestrator, 1).await;
    assert_eq!(metrics.next.load(Ordering::SeqCst), 2);
    assert_eq!(orchestrator.tone_for(Platform::Twitter), Tone::Casual);
}
