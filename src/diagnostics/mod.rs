pub mod metrics;
pub mod rules;

use serde::{Deserialize, Serialize};

pub use metrics::engagement_metrics;
pub use rules::{extract_signals, length_base, Rule, Severity, TextSignals, RULES};

use crate::{Category, Diagnostics, PlatformContent, Tone};

pub const AUTHORED_BAND: (i32, i32) = (45, 98);
pub const ENHANCED_BAND: (i32, i32) = (90, 97);

pub const MAX_INSIGHTS: usize = 3;
pub const MAX_VIEW_REASONS: usize = 4;
pub const MAX_QUICK_WINS: usize = 4;
pub const MAX_HIGHLIGHTS: usize = 3;

/// Whether the scored text was written by the user or has already been
/// restructured by an enhancement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Authored,
    Enhanced,
}

impl Provenance {
    pub fn band(self) -> (i32, i32) {
        match self {
            Provenance::Authored => AUTHORED_BAND,
            Provenance::Enhanced => ENHANCED_BAND,
        }
    }
}

/// Which rules fired and what they were worth, before banding.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub signals: TextSignals,
    pub length_base: i32,
    pub applied: Vec<(&'static str, i32)>,
    pub raw: i32,
}

impl Evaluation {
    pub fn fired(&self, rule_id: &str) -> bool {
        self.applied.iter().any(|(id, _)| *id == rule_id)
    }
}

const QUICK_WINS: [&str; MAX_QUICK_WINS] = [
    "Test a first line that leads with the result, then explains how you got there",
    "Reply to every comment in the first hour to keep the post in circulation",
    "Pin a follow-up comment with one extra detail, resource or example",
    "Publish a variant at a different hour and compare first-hour engagement",
];

pub struct DiagnosticsScorer;

impl DiagnosticsScorer {
    pub fn evaluate(text: &str, category: Category, tone: Tone) -> Evaluation {
        let signals = extract_signals(text, category, tone);
        let base = length_base(signals.char_count);
        let applied: Vec<(&'static str, i32)> = RULES
            .iter()
            .filter(|rule| rule.delta != 0 && (rule.present)(&signals))
            .map(|rule| (rule.id, rule.delta))
            .collect();
        let raw = base + applied.iter().map(|(_, delta)| delta).sum::<i32>();
        Evaluation {
            signals,
            length_base: base,
            applied,
            raw,
        }
    }

    /// Scores user-authored text. Generated content, when given, only feeds
    /// the highlights.
    pub fn score(
        text: &str,
        category: Category,
        tone: Tone,
        content: Option<&PlatformContent>,
    ) -> Diagnostics {
        Self::score_with(text, category, tone, content, Provenance::Authored)
    }

    pub fn score_with(
        text: &str,
        category: Category,
        tone: Tone,
        content: Option<&PlatformContent>,
        provenance: Provenance,
    ) -> Diagnostics {
        let evaluation = Self::evaluate(text, category, tone);
        let virality_score = banded_score(evaluation.raw, provenance);
        let signals = &evaluation.signals;

        Diagnostics {
            virality_score,
            insights: build_insights(signals),
            view_reasons: build_view_reasons(signals),
            quick_wins: QUICK_WINS.iter().map(|win| win.to_string()).collect(),
            highlights: content.map(build_highlights).unwrap_or_default(),
            engagement_metrics: engagement_metrics(virality_score, signals),
        }
    }
}

/// Authored text is clamped to its band. Enhanced text is mapped linearly
/// from the authored band into the narrower enhanced band.
pub fn banded_score(raw: i32, provenance: Provenance) -> u8 {
    let (low, high) = AUTHORED_BAND;
    let clamped = raw.clamp(low, high);
    let score = match provenance {
        Provenance::Authored => clamped,
        Provenance::Enhanced => {
            let (target_low, target_high) = ENHANCED_BAND;
            let span = high - low;
            let target_span = target_high - target_low;
            target_low + ((clamped - low) * target_span + span / 2) / span
        }
    };
    score as u8
}

fn build_insights(signals: &TextSignals) -> Vec<String> {
    let (gaps, credits): (Vec<&Rule>, Vec<&Rule>) = RULES
        .iter()
        .partition(|rule| !(rule.present)(signals));
    gaps.iter()
        .map(|rule| rule.gap)
        .chain(credits.iter().map(|rule| rule.credit))
        .take(MAX_INSIGHTS)
        .map(str::to_string)
        .collect()
}

fn build_view_reasons(signals: &TextSignals) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| !(rule.present)(signals))
        .filter_map(|rule| rule.view_reason)
        .take(MAX_VIEW_REASONS)
        .map(|(severity, message)| severity.format(message))
        .collect()
}

fn build_highlights(content: &PlatformContent) -> Vec<String> {
    let variants: Vec<&str> = content.iter().map(|(_, text)| text).collect();
    let mut highlights = Vec::new();

    let action_markers = ["\u{2192}", "\u{1f449}", "\u{2705}", "next move"];
    if variants.iter().any(|text| {
        let lowercase = text.to_lowercase();
        action_markers.iter().any(|marker| lowercase.contains(marker))
    }) {
        highlights.push("Explicit action markers walk readers to the next step".to_string());
    }

    let energy_markers = ['!', '\u{1f680}', '\u{1f525}', '\u{26a1}'];
    if variants
        .iter()
        .any(|text| text.chars().any(|ch| energy_markers.contains(&ch)))
    {
        highlights.push("Energy markers keep the pace up through the read".to_string());
    }

    if variants.iter().any(|text| text.chars().count() > 600) {
        highlights.push("The long-form variant has room for real depth".to_string());
    }

    if variants
        .iter()
        .any(|text| text.split_whitespace().filter(|word| word.starts_with('#')).count() >= 3)
    {
        highlights.push("Hashtag set is dense enough to reach new audiences".to_string());
    }

    highlights.truncate(MAX_HIGHLIGHTS);
    highlights
}
