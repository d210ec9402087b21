//! Configuration for trendcast.
//!
//! Configuration sources (highest priority first):
//! 1. Explicit path (`--config`)
//! 2. Environment variable (TRENDCAST_CONFIG)
//! 3. `trendcast.yaml` in the current directory or one of its parents
//! 4. Built-in defaults
//!
//! The loaded [`Config`] is validated once and then shared read-only
//! (`Arc<Config>`) with every component that needs it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::BackoffPolicy;
use crate::domain::{Platform, Tone};
use crate::error::{AgentError, AgentResult};

/// Name of the config file searched for in the working tree
pub const CONFIG_FILE_NAME: &str = "trendcast.yaml";

/// Complete orchestrator configuration (matches YAML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Platforms content is generated for, published to and tracked on
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,

    #[serde(default)]
    pub trend: TrendSettings,

    #[serde(default)]
    pub content: ContentSettings,

    #[serde(default)]
    pub engagement: EngagementSettings,

    /// Backoff applied by the cache to every external call
    #[serde(default)]
    pub cache: BackoffPolicy,

    #[serde(default)]
    pub feedback: FeedbackSettings,

    #[serde(default)]
    pub run: RunSettings,
}

fn default_platforms() -> Vec<Platform> {
    vec![Platform::Twitter, Platform::Linkedin, Platform::Instagram]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
            trend: TrendSettings::default(),
            content: ContentSettings::default(),
            engagement: EngagementSettings::default(),
            cache: BackoffPolicy::default(),
            feedback: FeedbackSettings::default(),
            run: RunSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    /// Trends requested from the source per fetch
    pub limit: usize,
    pub language: String,
    /// Top-N trends whose topics reach content generation
    pub max_topics: usize,
    /// Trend cache TTL
    pub update_frequency_secs: u64,
    /// Topics always considered, as long as they are currently trending
    pub focus_topics: Vec<String>,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            limit: 10,
            language: "en".to_string(),
            max_topics: 3,
            update_frequency_secs: 3600,
            focus_topics: Vec::new(),
        }
    }
}

/// Which content backend the CLI wires in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Simulated,
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    pub backend: BackendKind,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub default_tone: Tone,
    /// Drafts generated per topic and platform
    pub drafts_per_topic: usize,
    pub hashtag_limit: usize,
    /// Draft cache TTL; zero keeps drafts only for the current instant
    pub cache_ttl_secs: u64,
    pub brand_voice: BrandVoice,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Simulated,
            model: "gpt-4".to_string(),
            temperature: 0.8,
            max_tokens: 2048,
            default_tone: Tone::Professional,
            drafts_per_topic: 1,
            hashtag_limit: 10,
            cache_ttl_secs: 0,
            brand_voice: BrandVoice::default(),
        }
    }
}

/// Brand personality threaded into every prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandVoice {
    /// Template style: conversational, educational, inspirational, promotional, news
    pub style: String,
    pub values: String,
    pub cta: Option<String>,
    pub hashtags: Vec<String>,
}

impl Default for BrandVoice {
    fn default() -> Self {
        Self {
            style: "conversational".to_string(),
            values: "innovation, transparency, excellence".to_string(),
            cta: None,
            hashtags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementSettings {
    /// Trailing window for per-platform stats (default: 7 days)
    #[serde(default = "default_analysis_window")]
    pub analysis_window_days: u32,

    /// Below this rate the next cycle's tone moves up the ladder
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,

    /// Above this rate the current tone is reinforced
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,

    /// Metrics cache TTL (default: 5 min)
    #[serde(default = "default_metrics_ttl")]
    pub metrics_ttl_secs: u64,

    /// Entries kept in aggregated top-content lists
    #[serde(default = "default_top_content_limit")]
    pub top_content_limit: usize,
}

fn default_analysis_window() -> u32 {
    7
}
fn default_low_threshold() -> f64 {
    0.03
}
fn default_high_threshold() -> f64 {
    0.05
}
fn default_metrics_ttl() -> u64 {
    300
}
fn default_top_content_limit() -> usize {
    5
}

impl Default for EngagementSettings {
    fn default() -> Self {
        Self {
            analysis_window_days: default_analysis_window(),
            low_threshold: default_low_threshold(),
            high_threshold: default_high_threshold(),
            metrics_ttl_secs: default_metrics_ttl(),
            top_content_limit: default_top_content_limit(),
        }
    }
}

/// How below-threshold cycles translate into tone steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AdaptationMode {
    /// One ladder step per below-threshold cycle
    Step,
    /// One ladder step after `cycles` consecutive below-threshold cycles
    Streak { cycles: u32 },
}

impl Default for AdaptationMode {
    fn default() -> Self {
        Self::Step
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub tone_ladder: Vec<Tone>,
    pub adaptation: AdaptationMode,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            tone_ladder: Tone::default_ladder(),
            adaptation: AdaptationMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Stop after this many cycles (unbounded when unset)
    pub max_iterations: Option<u32>,
    /// Minimum pause between the end of one cycle and the start of the next
    pub interval_secs: u64,
    /// Bound on each per-platform external operation
    pub operation_timeout_secs: u64,
    /// JSONL file cycle summaries are appended to
    pub history_path: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_iterations: None,
            interval_secs: 3600,
            operation_timeout_secs: 60,
            history_path: None,
        }
    }
}

impl Config {
    /// Load a config from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse a config from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse config YAML")
    }

    /// Check the settings the orchestrator relies on
    pub fn validate(&self) -> AgentResult<()> {
        let fail = |msg: String| Err(AgentError::Configuration(msg));

        if self.platforms.is_empty() {
            return fail("at least one platform must be enabled".into());
        }
        for (i, platform) in self.platforms.iter().enumerate() {
            if self.platforms[..i].contains(platform) {
                return fail(format!("platforms lists '{}' twice", platform));
            }
        }
        if !(0.0..=2.0).contains(&self.content.temperature) {
            return fail(format!(
                "content.temperature must be within [0, 2], got {}",
                self.content.temperature
            ));
        }
        if self.trend.limit == 0 || self.trend.max_topics == 0 {
            return fail("trend.limit and trend.max_topics must be positive".into());
        }
        if self.content.drafts_per_topic == 0 {
            return fail("content.drafts_per_topic must be positive".into());
        }
        if self.engagement.analysis_window_days == 0 {
            return fail("engagement.analysis_window_days must be positive".into());
        }
        if self.engagement.low_threshold > self.engagement.high_threshold {
            return fail(format!(
                "engagement.low_threshold ({}) exceeds high_threshold ({})",
                self.engagement.low_threshold, self.engagement.high_threshold
            ));
        }
        if self.run.operation_timeout_secs == 0 {
            return fail("run.operation_timeout_secs must be positive".into());
        }
        if self.cache.max_attempts == 0 {
            return fail("cache.max_attempts must be at least 1".into());
        }

        let ladder = &self.feedback.tone_ladder;
        if ladder.is_empty() {
            return fail("feedback.tone_ladder cannot be empty".into());
        }
        for (i, tone) in ladder.iter().enumerate() {
            if ladder[..i].contains(tone) {
                return fail(format!("feedback.tone_ladder lists '{}' twice", tone));
            }
        }
        if !ladder.contains(&self.content.default_tone) {
            return fail(format!(
                "content.default_tone '{}' is not on the tone ladder",
                self.content.default_tone
            ));
        }
        if let AdaptationMode::Streak { cycles: 0 } = self.feedback.adaptation {
            return fail("feedback.adaptation.cycles must be positive".into());
        }

        Ok(())
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn update_frequency(&self) -> Duration {
        Duration::from_secs(self.trend.update_frequency_secs)
    }

    pub fn draft_ttl(&self) -> Duration {
        Duration::from_secs(self.content.cache_ttl_secs)
    }

    pub fn metrics_ttl(&self) -> Duration {
        Duration::from_secs(self.engagement.metrics_ttl_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.run.interval_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.run.operation_timeout_secs)
    }
}

/// A config together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load configuration from all sources
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var("TRENDCAST_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(find_config_file),
    };

    let config = match source {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };

    config
        .validate()
        .context("Configuration failed validation")?;

    Ok(LoadedConfig { config, source })
}

/// Get the trendcast home directory ($TRENDCAST_HOME or ~/.trendcast)
pub fn trendcast_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("TRENDCAST_HOME") {
        return Ok(PathBuf::from(home));
    }
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".trendcast"))
}

/// History file: configured path, else $TRENDCAST_HOME/history.jsonl
pub fn history_path(config: &Config) -> Result<PathBuf> {
    match config.run.history_path {
        Some(ref path) => Ok(path.clone()),
        None => Ok(trendcast_home()?.join("history.jsonl")),
    }
}
