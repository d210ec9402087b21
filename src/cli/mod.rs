//! Command-line interface for trendcast.
//!
//! Provides commands for running the orchestrator, inspecting the
//! resolved configuration, and reading recorded cycle history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::adapters::{Collaborators, OpenAiBackend};
use crate::config::{self, BackendKind, Config};
use crate::core::{HistoryStore, Orchestrator, StopSignal};
use crate::domain::{CycleOutcome, CycleSummary, StopReason};

/// trendcast - Trend-driven content orchestrator
#[derive(Parser, Debug)]
#[command(name = "trendcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run orchestration cycles until stopped
    Run {
        /// Config file (defaults to $TRENDCAST_CONFIG or ./trendcast.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many cycles
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Run a single cycle and exit
        #[arg(long, conflicts_with = "max_iterations")]
        once: bool,
    },

    /// Show resolved configuration
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show recorded cycle summaries
    History {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of cycles to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                config,
                max_iterations,
                once,
            } => {
                let max_iterations = if once { Some(1) } else { max_iterations };
                run(config.as_deref(), max_iterations).await
            }
            Commands::Config { config } => show_config(config.as_deref()),
            Commands::History { config, limit } => show_history(config.as_deref(), limit).await,
        }
    }
}

/// Run the orchestrator until max iterations, Ctrl-C or a fatal error
async fn run(config_path: Option<&Path>, max_iterations: Option<u32>) -> Result<()> {
    let loaded = config::load(config_path)?;
    let mut cfg = loaded.config;
    if max_iterations.is_some() {
        cfg.run.max_iterations = max_iterations;
    }

    let collaborators = collaborators_for(&cfg)?;
    let history = HistoryStore::open(config::history_path(&cfg)?).await?;
    info!(path = %history.path().display(), "Recording cycle history");

    let mut orchestrator = Orchestrator::new(cfg, collaborators)
        .context("Failed to start orchestrator")?
        .with_history_store(history);

    let stop = StopSignal::new();
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current phase");
            on_interrupt.stop();
        }
    });

    let report = orchestrator.run(&stop).await;

    for summary in orchestrator.history(report.cycles as usize) {
        print_summary(summary);
    }
    eprintln!(
        "\n[Run {} finished after {} cycle(s): {}]",
        report.run_id,
        report.cycles,
        describe_stop(&report.stop_reason)
    );

    if let StopReason::Fatal { error } = report.stop_reason {
        anyhow::bail!("Run stopped by a fatal error: {}", error);
    }
    Ok(())
}

/// Simulated collaborators, with the OpenAI content backend when configured
fn collaborators_for(cfg: &Config) -> Result<Collaborators> {
    let collaborators = Collaborators::simulated();

    match cfg.content.backend {
        BackendKind::Simulated => Ok(collaborators),
        BackendKind::Openai => {
            if std::env::var_os("OPENAI_API_KEY").is_none() {
                warn!("content.backend is openai but OPENAI_API_KEY is not set; using the template backend");
                return Ok(collaborators);
            }
            let backend = OpenAiBackend::from_env(cfg.content.model.clone())
                .context("Failed to configure OpenAI backend")?;
            Ok(collaborators.with_content(Arc::new(backend)))
        }
    }
}

fn describe_stop(reason: &StopReason) -> String {
    match reason {
        StopReason::MaxIterations => "max iterations reached".to_string(),
        StopReason::StopSignal => "stop requested".to_string(),
        StopReason::Fatal { error } => format!("fatal error: {}", error),
    }
}

fn print_summary(summary: &CycleSummary) {
    let outcome = match &summary.outcome {
        CycleOutcome::Completed => "completed".to_string(),
        CycleOutcome::Aborted { phase, error } => format!("aborted in {}: {}", phase, error),
        CycleOutcome::Stopped { phase } => format!("stopped after {}", phase),
        CycleOutcome::Fatal { phase, error } => format!("fatal in {}: {}", phase, error),
    };

    println!("Cycle {} ({})", summary.cycle_id, outcome);
    println!("  Topics:    {}", summary.topics.join(", "));
    if let Some(report) = &summary.trend_report {
        for insight in &report.insights {
            println!("  Insight:   {}", insight);
        }
    }
    println!(
        "  Drafts:    {} generated, {} published",
        summary.drafts_generated, summary.drafts_published
    );
    for (platform, rate) in &summary.engagement_rates {
        let delta = summary
            .engagement_deltas
            .get(platform)
            .map(|d| format!(" ({:+.4})", d))
            .unwrap_or_default();
        println!("  {:<10} rate {:.4}{}", platform.as_str(), rate, delta);
        if let Some(advice) = summary.recommendations.get(platform) {
            println!("             {}", advice);
        }
    }
    for change in &summary.tone_changes {
        println!("  Tone:      {} {} -> {}", change.platform, change.from, change.to);
    }
    for skipped in &summary.skipped {
        let unit = match (&skipped.platform, &skipped.topic) {
            (Some(p), Some(t)) => format!("{}/{}", p, t),
            (Some(p), None) => p.to_string(),
            (None, Some(t)) => t.clone(),
            (None, None) => "-".to_string(),
        };
        println!("  Skipped:   {} in {} [{}] {}", unit, skipped.phase, skipped.kind, skipped.cause);
    }
}

/// Show the resolved configuration
fn show_config(config_path: Option<&Path>) -> Result<()> {
    let loaded = config::load(config_path)?;

    println!(
        "Config file: {}",
        loaded
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Home:        {}", config::trendcast_home()?.display());
    println!("History:     {}", config::history_path(&loaded.config)?.display());
    println!();

    let yaml = serde_yaml::to_string(&loaded.config).context("Failed to render config")?;
    print!("{}", yaml);

    Ok(())
}

/// Print the most recent recorded cycles
async fn show_history(config_path: Option<&Path>, limit: usize) -> Result<()> {
    let loaded = config::load(config_path)?;
    let store = HistoryStore::open(config::history_path(&loaded.config)?).await?;
    let summaries = store.last(limit).await?;

    if summaries.is_empty() {
        println!("No cycles recorded in {}", store.path().display());
        return Ok(());
    }

    println!(
        "{:<38} {:<6} {:<11} {:<8} {:<10} {:<8}",
        "RUN ID", "CYCLE", "OUTCOME", "TOPICS", "PUBLISHED", "SKIPPED"
    );
    println!("{}", "-".repeat(86));

    for summary in &summaries {
        let outcome = match summary.outcome {
            CycleOutcome::Completed => "completed",
            CycleOutcome::Aborted { .. } => "aborted",
            CycleOutcome::Stopped { .. } => "stopped",
            CycleOutcome::Fatal { .. } => "fatal",
        };
        println!(
            "{:<38} {:<6} {:<11} {:<8} {:<10} {:<8}",
            summary.run_id,
            summary.cycle_id,
            outcome,
            summary.topics.len(),
            summary.drafts_published,
            summary.skipped.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_once() {
        let cli = Cli::try_parse_from(["trendcast", "run", "--once"]).unwrap();
        match cli.command {
            Commands::Run { once, max_iterations, .. } => {
                assert!(once);
                assert_eq!(max_iterations, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_once_conflicts_with_max_iterations() {
        assert!(Cli::try_parse_from(["trendcast", "run", "--once", "-n", "3"]).is_err());
    }

    #[test]
    fn test_parse_history_limit() {
        let cli = Cli::try_parse_from(["trendcast", "history", "--limit", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::History { limit: 3, .. }));
    }

    #[test]
    fn test_describe_stop() {
        assert_eq!(describe_stop(&StopReason::MaxIterations), "max iterations reached");
        assert!(describe_stop(&StopReason::Fatal { error: "auth".into() }).contains("auth"));
    }
}
