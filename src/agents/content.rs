//! Content agent: brand-consistent drafts sized for each platform.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Agent;
use crate::adapters::ContentBackend;
use crate::config::Config;
use crate::domain::{truncate_at_word_boundary, ContentDraft, Platform, Tone, TrendAnalysis};
use crate::error::{AgentError, AgentResult};

/// A batch of drafts: `count` per topic, for one platform and tone
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub topics: Vec<String>,
    pub platform: Platform,
    pub tone: Tone,
    pub count: usize,
}

/// Turns topics into drafts through a content backend
pub struct ContentAgent {
    backend: Arc<dyn ContentBackend>,
    config: Arc<Config>,
}

impl ContentAgent {
    pub fn new(backend: Arc<dyn ContentBackend>, config: Arc<Config>) -> Self {
        Self { backend, config }
    }

    /// `count` drafts per topic in the configured default tone, batched by topic
    pub async fn generate_posts(
        &self,
        topics: &[String],
        platform: Platform,
        count: usize,
    ) -> AgentResult<Vec<ContentDraft>> {
        self.execute(ContentRequest {
            topics: topics.to_vec(),
            platform,
            tone: self.config.content.default_tone,
            count,
        })
        .await
    }

    /// A single draft for `topic`, truncated to the platform limit
    pub async fn generate_for_platform(
        &self,
        topic: &str,
        platform: Platform,
        tone: Tone,
    ) -> AgentResult<ContentDraft> {
        self.generate_variant(topic, platform, tone, 0, None).await
    }

    /// Draft number `variant` for `topic`, optionally informed by its trend analysis.
    ///
    /// Checked against [`Agent::validate`] as a one-topic request first.
    pub async fn generate_variant(
        &self,
        topic: &str,
        platform: Platform,
        tone: Tone,
        variant: usize,
        analysis: Option<&TrendAnalysis>,
    ) -> AgentResult<ContentDraft> {
        let request = ContentRequest {
            topics: vec![topic.to_string()],
            platform,
            tone,
            count: 1,
        };
        if !self.validate(&request) {
            return Err(AgentError::invalid_input(self.name(), "topic is empty"));
        }
        self.draft(topic, platform, tone, variant, analysis).await
    }

    async fn draft(
        &self,
        topic: &str,
        platform: Platform,
        tone: Tone,
        variant: usize,
        analysis: Option<&TrendAnalysis>,
    ) -> AgentResult<ContentDraft> {
        let settings = &self.config.content;
        let prompt = self.build_prompt(topic, platform, tone, variant, analysis);
        let completion = self
            .backend
            .complete(&prompt, settings.max_tokens, settings.temperature)
            .await?;

        let text = completion.trim();
        if text.is_empty() {
            return Err(AgentError::Transient(format!(
                "{} returned an empty completion",
                self.backend.name()
            )));
        }

        let decorated = decorate(platform, text);
        let (body, truncated) = truncate_at_word_boundary(&decorated, platform.character_limit());

        debug!(
            backend = self.backend.name(),
            %platform,
            %tone,
            topic,
            variant,
            truncated,
            "Generated draft"
        );

        Ok(ContentDraft {
            topic: topic.to_string(),
            platform,
            body,
            hashtags: self.hashtags_for(topic),
            format: platform.default_format(),
            cta: settings.brand_voice.cta.clone(),
            tone,
            truncated,
        })
    }

    fn build_prompt(
        &self,
        topic: &str,
        platform: Platform,
        tone: Tone,
        variant: usize,
        analysis: Option<&TrendAnalysis>,
    ) -> String {
        let voice = &self.config.content.brand_voice;
        let mut prompt = format!(
            "Write a {tone} {platform} post of at most {limit} characters.\n\
             Topic: {topic}\n\
             Tone: {tone}\n\
             Style: {style}\n\
             Brand values: {values}\n\
             Opening: {opening}\n\
             Variant: {variant}\n",
            tone = tone,
            platform = platform,
            limit = platform.character_limit(),
            topic = topic,
            style = voice.style,
            values = voice.values,
            opening = template_for(&voice.style),
            variant = variant + 1,
        );

        if let Some(analysis) = analysis {
            prompt.push_str(&format!("Sentiment: {}\n", analysis.sentiment.as_str()));
            if !analysis.related_topics.is_empty() {
                prompt.push_str(&format!("Related: {}\n", analysis.related_topics.join(", ")));
            }
        }
        if let Some(ref cta) = voice.cta {
            prompt.push_str(&format!("Call to action: {}\n", cta));
        }

        prompt
    }

    /// Topic tag first, then brand tags, capped at the hashtag limit
    fn hashtags_for(&self, topic: &str) -> BTreeSet<String> {
        let settings = &self.config.content;
        let candidates = std::iter::once(topic).chain(settings.brand_voice.hashtags.iter().map(String::as_str));

        let mut tags = BTreeSet::new();
        for candidate in candidates {
            if tags.len() >= settings.hashtag_limit {
                break;
            }
            if let Some(tag) = to_hashtag(candidate) {
                tags.insert(tag);
            }
        }
        tags
    }
}

#[async_trait]
impl Agent for ContentAgent {
    type Input = ContentRequest;
    type Output = Vec<ContentDraft>;

    fn name(&self) -> &'static str {
        "content"
    }

    fn validate(&self, input: &ContentRequest) -> bool {
        input.count > 0
            && !input.topics.is_empty()
            && input.topics.iter().all(|t| !t.trim().is_empty())
    }

    async fn perform(&self, input: ContentRequest) -> AgentResult<Vec<ContentDraft>> {
        let mut drafts = Vec::with_capacity(input.topics.len() * input.count);

        for topic in &input.topics {
            for variant in 0..input.count {
                let draft = self
                    .draft(topic, input.platform, input.tone, variant, None)
                    .await?;
                drafts.push(draft);
            }
        }

        Ok(drafts)
    }
}

/// Opening line for a brand style
fn template_for(style: &str) -> &'static str {
    match style {
        "educational" => "Did you know?",
        "inspirational" => "Here's something that caught our attention...",
        "promotional" => "Check out what we've been working on...",
        "news" => "Breaking: Latest updates",
        _ => "Let's talk about this...",
    }
}

/// Platform-specific framing, applied before truncation
fn decorate(platform: Platform, text: &str) -> String {
    match platform {
        Platform::Instagram => format!("[Visual: infographic]\n{}", text),
        Platform::Tiktok => format!("Hook: {}", text),
        Platform::Twitter | Platform::Linkedin => text.to_string(),
    }
}

/// `Web 3 News` → `#Web3News`; `None` when nothing alphanumeric remains
fn to_hashtag(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(format!("#{}", cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TemplateBackend;

    fn agent(config: Config) -> ContentAgent {
        ContentAgent::new(Arc::new(TemplateBackend), Arc::new(config))
    }

    #[test]
    fn test_hashtag_normalization() {
        assert_eq!(to_hashtag("Web 3 News"), Some("#Web3News".to_string()));
        assert_eq!(to_hashtag("#AIRevolution"), Some("#AIRevolution".to_string()));
        assert_eq!(to_hashtag("!!"), None);
    }

    #[test]
    fn test_hashtag_limit() {
        let mut config = Config::default();
        config.content.hashtag_limit = 2;
        config.content.brand_voice.hashtags = vec!["Brand".into(), "Launch".into(), "More".into()];

        let tags = agent(config).hashtags_for("AI");
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("#AI"));
        assert!(tags.contains("#Brand"));
    }

    #[test]
    fn test_prompt_carries_voice_and_analysis() {
        let mut config = Config::default();
        config.content.brand_voice.style = "news".into();
        config.content.brand_voice.cta = Some("Subscribe".into());
        let agent = agent(config);

        let analysis = TrendAnalysis {
            topic: "AI".into(),
            sentiment: crate::domain::Sentiment::Positive,
            volume: 1,
            momentum: crate::domain::Momentum::Rising,
            related_topics: vec!["ML".into()],
        };
        let prompt = agent.build_prompt("AI", Platform::Twitter, Tone::Casual, 0, Some(&analysis));

        assert!(prompt.contains("Topic: AI"));
        assert!(prompt.contains("Tone: casual"));
        assert!(prompt.contains("Opening: Breaking: Latest updates"));
        assert!(prompt.contains("Sentiment: positive"));
        assert!(prompt.contains("Related: ML"));
        assert!(prompt.contains("Call to action: Subscribe"));
        assert!(prompt.contains("Variant: 1"));
    }

    #[tokio::test]
    async fn test_decoration_survives_truncation() {
        let draft = agent(Config::default())
            .generate_for_platform("AI", Platform::Tiktok, Tone::Creative)
            .await
            .unwrap();

        assert!(draft.body.starts_with("Hook: "));
        assert!(draft.fits_platform());
    }
}
