pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod entitlement;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod history;
pub mod orchestrator;
pub mod prompts;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub use crate::diagnostics::{DiagnosticsScorer, Provenance};
pub use crate::error::EnhanceError;
pub use crate::fallback::FallbackGenerator;
pub use crate::orchestrator::{EnhancementOrchestrator, EnhancementPhase, Identity};
pub use crate::prompts::PromptBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Business,
    Technology,
    Lifestyle,
    Marketing,
    Creative,
    General,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Business,
        Category::Technology,
        Category::Lifestyle,
        Category::Marketing,
        Category::Creative,
        Category::General,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Lifestyle => "lifestyle",
            Category::Marketing => "marketing",
            Category::Creative => "creative",
            Category::General => "general",
        }
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "business" | "biz" => Ok(Category::Business),
            "technology" | "tech" => Ok(Category::Technology),
            "lifestyle" | "life" => Ok(Category::Lifestyle),
            "marketing" => Ok(Category::Marketing),
            "creative" | "art" => Ok(Category::Creative),
            "general" | "" => Ok(Category::General),
            other => Err(ValidationError::UnknownValue {
                field: "category",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Conversational,
    Enthusiastic,
    Authoritative,
}

impl Tone {
    pub const ALL: [Tone; 4] = [
        Tone::Professional,
        Tone::Conversational,
        Tone::Enthusiastic,
        Tone::Authoritative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Conversational => "conversational",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Authoritative => "authoritative",
        }
    }
}

impl FromStr for Tone {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" => Err(ValidationError::MissingField("tone")),
            "professional" | "pro" => Ok(Tone::Professional),
            "conversational" | "casual" | "friendly" => Ok(Tone::Conversational),
            "enthusiastic" | "excited" | "hype" => Ok(Tone::Enthusiastic),
            "authoritative" | "expert" => Ok(Tone::Authoritative),
            other => Err(ValidationError::UnknownValue {
                field: "tone",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logical target surface. The concrete network behind each slot is decided by
/// whoever renders the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSlot {
    Primary,
    Secondary,
    Tertiary,
    Quaternary,
}

impl PlatformSlot {
    pub const ALL: [PlatformSlot; 4] = [
        PlatformSlot::Primary,
        PlatformSlot::Secondary,
        PlatformSlot::Tertiary,
        PlatformSlot::Quaternary,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PlatformSlot::Primary => "primary",
            PlatformSlot::Secondary => "secondary",
            PlatformSlot::Tertiary => "tertiary",
            PlatformSlot::Quaternary => "quaternary",
        }
    }
}

impl FromStr for PlatformSlot {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "primary" | "linkedin" => Ok(PlatformSlot::Primary),
            "secondary" | "x" | "twitter" => Ok(PlatformSlot::Secondary),
            "tertiary" | "facebook" => Ok(PlatformSlot::Tertiary),
            "quaternary" | "instagram" => Ok(PlatformSlot::Quaternary),
            other => Err(ValidationError::UnknownValue {
                field: "platform",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PlatformSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancementRequest {
    original_text: String,
    category: Category,
    tone: Tone,
    platforms: BTreeSet<PlatformSlot>,
}

impl EnhancementRequest {
    /// An empty platform set means every slot.
    pub fn new(
        original_text: impl Into<String>,
        category: Category,
        tone: Tone,
        platforms: impl IntoIterator<Item = PlatformSlot>,
    ) -> Result<Self, ValidationError> {
        let original_text = original_text.into().trim().to_string();
        if original_text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let mut platforms: BTreeSet<PlatformSlot> = platforms.into_iter().collect();
        if platforms.is_empty() {
            platforms.extend(PlatformSlot::ALL);
        }
        Ok(Self {
            original_text,
            category,
            tone,
            platforms,
        })
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn platforms(&self) -> &BTreeSet<PlatformSlot> {
        &self.platforms
    }

    /// Cache key over the normalized text and category, narrowed by tone and
    /// slot set so a cached result always has the requested shape.
    pub fn fingerprint(&self) -> String {
        let slots: Vec<&str> = self.platforms.iter().map(|slot| slot.key()).collect();
        let payload = format!(
            "{}|{}|{}|{}",
            normalize_text(&self.original_text),
            self.category.label(),
            self.tone.label(),
            slots.join(",")
        );
        format!("req_{:x}", stable_hash64(&payload))
    }
}

/// Generated text per slot. Blank entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformContent(BTreeMap<PlatformSlot, String>);

impl PlatformContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: PlatformSlot, text: impl Into<String>) -> bool {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.0.insert(slot, trimmed.to_string());
        true
    }

    pub fn get(&self, slot: PlatformSlot) -> Option<&str> {
        self.0.get(&slot).map(String::as_str)
    }

    pub fn has_content(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformSlot, &str)> {
        self.0.iter().map(|(slot, text)| (*slot, text.as_str()))
    }

    pub fn retain_slots(&mut self, slots: &BTreeSet<PlatformSlot>) {
        self.0.retain(|slot, _| slots.contains(slot));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub comments: u8,
    pub likes: u8,
    pub shares: u8,
    pub views: u8,
    pub time_spent: u8,
    pub click_through: u8,
    pub save_rate: u8,
    pub viral_coefficient: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub virality_score: u8,
    pub insights: Vec<String>,
    pub view_reasons: Vec<String>,
    pub quick_wins: Vec<String>,
    pub highlights: Vec<String>,
    pub engagement_metrics: EngagementMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Remote,
    Fallback,
}

impl ContentSource {
    pub fn label(self) -> &'static str {
        match self {
            ContentSource::Remote => "remote",
            ContentSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub platform_content: PlatformContent,
    pub diagnostics: Diagnostics,
    pub source: ContentSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    pub current_usage: u32,
    /// `-1` means unlimited.
    pub monthly_limit: i64,
    pub plan_name: String,
    pub can_use: bool,
    pub is_admin: bool,
}

impl UsageState {
    pub const UNLIMITED: i64 = -1;

    pub fn admin() -> Self {
        Self {
            current_usage: 0,
            monthly_limit: Self::UNLIMITED,
            plan_name: "admin".to_string(),
            can_use: true,
            is_admin: true,
        }
    }

    pub fn permissive(monthly_limit: i64, plan_name: &str) -> Self {
        Self {
            current_usage: 0,
            monthly_limit,
            plan_name: plan_name.to_string(),
            can_use: true,
            is_admin: false,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.monthly_limit < 0
    }

    pub fn record_use(&mut self) {
        self.current_usage = self.current_usage.saturating_add(1);
        if !self.is_unlimited() && i64::from(self.current_usage) >= self.monthly_limit {
            self.can_use = false;
        }
    }
}

pub(crate) fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn stable_hash64(value: &str) -> u64 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
