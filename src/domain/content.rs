//! Platforms, tones and generated drafts.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Marker appended to a body that had to be shortened
pub const ELLIPSIS: &str = "...";

/// Supported social platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Linkedin,
    Instagram,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Instagram,
        Platform::Tiktok,
    ];

    /// Maximum body length in characters
    pub fn character_limit(self) -> usize {
        match self {
            Self::Twitter => 280,
            Self::Linkedin => 3000,
            Self::Instagram => 2200,
            Self::Tiktok => 150,
        }
    }

    /// Format a draft takes unless the caller asks otherwise
    pub fn default_format(self) -> ContentFormat {
        match self {
            Self::Linkedin => ContentFormat::Article,
            Self::Twitter | Self::Instagram | Self::Tiktok => ContentFormat::Post,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown platform: {}", s))
    }
}

/// Voice tones, in tone-ladder order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Technical,
    Professional,
    Casual,
    Creative,
}

impl Tone {
    /// The ladder the feedback loop walks: technical → creative
    pub fn default_ladder() -> Vec<Tone> {
        vec![Tone::Technical, Tone::Professional, Tone::Casual, Tone::Creative]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Professional => "professional",
            Self::Casual => "casual",
            Self::Creative => "creative",
        }
    }
}

impl Default for Tone {
    fn default() -> Self {
        Self::Professional
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    Post,
    Article,
    Thread,
}

/// A generated post, ready for the publish sink.
///
/// `body` never exceeds the platform's character limit; the content
/// agent truncates before a draft leaves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub topic: String,
    pub platform: Platform,
    pub body: String,
    pub hashtags: BTreeSet<String>,
    pub format: ContentFormat,
    pub cta: Option<String>,

    /// Tone the draft was written in
    pub tone: Tone,

    /// Whether the body was shortened to fit the platform
    #[serde(default)]
    pub truncated: bool,
}

impl ContentDraft {
    /// Body length in characters
    pub fn len(&self) -> usize {
        self.body.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Whether the body respects the platform character limit
    pub fn fits_platform(&self) -> bool {
        self.len() <= self.platform.character_limit()
    }

    /// Stable content hash (first 16 hex chars of SHA-256 over platform + body)
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.body.as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

/// Shorten `text` to at most `limit` characters without splitting a word.
///
/// Cuts at the last whitespace boundary that leaves room for [`ELLIPSIS`],
/// then appends the marker. Returns the text and whether it was cut.
pub fn truncate_at_word_boundary(text: &str, limit: usize) -> (String, bool) {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return (text.to_string(), false);
    }

    let budget = limit.saturating_sub(ELLIPSIS.chars().count());

    // Cutting right before a whitespace keeps the last word whole.
    let cut = if chars[budget].is_whitespace() {
        budget
    } else {
        chars[..budget]
            .iter()
            .rposition(|c| c.is_whitespace())
            .unwrap_or(0)
    };

    let kept: String = chars[..cut].iter().collect();
    (format!("{}{}", kept.trim_end(), ELLIPSIS), true)
}
