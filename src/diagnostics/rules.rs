use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::{Category, Tone};

lazy_static! {
    /// Percentages, currency amounts, multipliers and durations.
    pub(crate) static ref METRIC: Regex = Regex::new(
        r"(?i)(\d+(?:\.\d+)?\s?%|[$€£]\s?\d[\d,]*(?:\.\d+)?\s?[kmb]?\b|\b\d+(?:\.\d+)?x\b|\b\d+\s?(?:minutes?|hours?|days?|weeks?|months?|years?)\b)"
    )
    .unwrap();
    static ref HASHTAG: Regex = Regex::new(r"#[\p{L}\p{N}_]+").unwrap();
    static ref BULLET_LINE: Regex = Regex::new(r"^\s*(?:[-*•→▸✦✅👉]|\d+[.)])\s*").unwrap();
}

const HOOK_OPENERS: [&str; 16] = [
    "how ", "why ", "what ", "stop ", "here's", "here is", "the secret", "most people", "unpopular opinion",
    "hot take", "breaking", "new:", "i was wrong", "nobody", "the truth", "this is",
];

const CTA_PHRASES: [&str; 18] = [
    "comment", "share this", "follow ", "let me know", "tell me", "what do you think", "thoughts?", "drop a",
    "dm me", "link in", "save this", "repost", "subscribe", "sign up", "join us", "click", "reply", "tag someone",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSignals {
    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub hashtags: usize,
    pub questions: usize,
    pub exclamations: usize,
    pub emoji_count: usize,
    pub has_hook: bool,
    pub has_structure: bool,
    pub has_cta: bool,
    pub has_metric: bool,
    pub tone_aligned: bool,
    pub category_aligned: bool,
}

impl TextSignals {
    pub fn has_question(&self) -> bool {
        self.questions > 0
    }

    pub fn has_hashtags(&self) -> bool {
        self.hashtags > 0
    }

    pub fn has_emoji(&self) -> bool {
        self.emoji_count > 0
    }

    /// At least two independent reasons for someone to pass the post on.
    pub fn is_shareable(&self) -> bool {
        [
            self.has_hook,
            self.has_structure,
            self.has_metric,
            self.has_hashtags(),
            self.has_question(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
            >= 2
    }
}

pub fn extract_signals(text: &str, category: Category, tone: Tone) -> TextSignals {
    let lowercase = text.to_lowercase();
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|line| !line.is_empty()).collect();

    let mut questions = 0usize;
    let mut exclamations = 0usize;
    let mut emoji_count = 0usize;
    for ch in text.chars() {
        match ch {
            '?' => questions += 1,
            '!' => exclamations += 1,
            _ if is_emoji(ch) => emoji_count += 1,
            _ => {}
        }
    }

    let words: HashSet<String> = lowercase
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();
    let word_count = text.split_whitespace().count();

    let has_metric = METRIC.is_match(text);
    let has_structure = lines.len() >= 3
        || text.contains("\n\n")
        || lines.iter().any(|line| BULLET_LINE.is_match(line));

    TextSignals {
        char_count: text.chars().count(),
        word_count,
        line_count: lines.len(),
        hashtags: HASHTAG.find_iter(text).count(),
        questions,
        exclamations,
        emoji_count,
        has_hook: detect_hook(lines.first().copied().unwrap_or("")),
        has_structure,
        has_cta: detect_cta(&lowercase),
        has_metric,
        tone_aligned: tone_aligned(tone, &words, exclamations, has_metric),
        category_aligned: category_aligned(category, &words),
    }
}

fn detect_hook(first_line: &str) -> bool {
    let line = first_line.trim().to_lowercase();
    if line.is_empty() {
        return false;
    }
    line.starts_with(|c: char| c.is_ascii_digit())
        || METRIC.is_match(&line)
        || line.ends_with('?')
        || line.ends_with('!')
        || HOOK_OPENERS.iter().any(|opener| line.starts_with(opener))
}

fn detect_cta(lowercase: &str) -> bool {
    if CTA_PHRASES.iter().any(|phrase| lowercase.contains(phrase)) {
        return true;
    }
    // A closing question aimed at the reader works as a call-to-action.
    let Some(end) = lowercase.rfind('?') else {
        return false;
    };
    let start = lowercase[..end]
        .rfind(|c: char| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let sentence = &lowercase[start..end];
    sentence.contains("you")
}

fn tone_aligned(tone: Tone, words: &HashSet<String>, exclamations: usize, has_metric: bool) -> bool {
    let vocabulary: &[&str] = match tone {
        Tone::Professional => &[
            "results", "strategy", "insight", "insights", "team", "learned", "process", "impact", "growth",
            "clients", "delivered", "outcome",
        ],
        Tone::Conversational => &["you", "your", "honestly", "let's", "i'm", "we're", "here's", "love", "so"],
        Tone::Enthusiastic => &["excited", "amazing", "love", "thrilled", "incredible", "huge", "finally"],
        Tone::Authoritative => &["data", "research", "proven", "evidence", "study", "framework", "benchmark"],
    };
    let keyword_hit = vocabulary.iter().any(|word| words.contains(*word));
    match tone {
        Tone::Enthusiastic => keyword_hit || exclamations > 0,
        Tone::Authoritative => keyword_hit || has_metric,
        _ => keyword_hit,
    }
}

fn category_aligned(category: Category, words: &HashSet<String>) -> bool {
    let vocabulary: &[&str] = match category {
        Category::Business => &[
            "revenue", "growth", "customers", "clients", "team", "strategy", "profit", "market", "sales",
            "leadership", "business", "startup",
        ],
        Category::Technology => &[
            "software", "code", "ai", "api", "product", "feature", "engineering", "data", "cloud", "app",
            "developer", "developers",
        ],
        Category::Lifestyle => &[
            "health", "habit", "habits", "morning", "routine", "travel", "fitness", "family", "sleep", "food",
            "wellness",
        ],
        Category::Marketing => &[
            "brand", "audience", "campaign", "content", "engagement", "leads", "conversion", "conversions",
            "funnel", "seo", "marketing",
        ],
        Category::Creative => &[
            "design", "art", "story", "creative", "music", "writing", "photo", "craft", "studio", "draw",
        ],
        Category::General => return true,
    };
    vocabulary.iter().any(|word| words.contains(*word))
}

pub(crate) fn is_emoji(ch: char) -> bool {
    matches!(ch as u32, 0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F000..=0x1F2FF)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    FixNow,
    Boost,
    Keep,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::FixNow => "Fix now",
            Severity::Boost => "Boost",
            Severity::Keep => "Keep",
        }
    }

    pub fn format(self, message: &str) -> String {
        format!("{} \u{2192} {}", self.label(), message)
    }
}

/// One entry of the scoring table. The same row drives the score delta, the
/// insight wording and the view reason, so they cannot drift apart.
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub delta: i32,
    pub present: fn(&TextSignals) -> bool,
    pub credit: &'static str,
    pub gap: &'static str,
    pub view_reason: Option<(Severity, &'static str)>,
}

pub static RULES: [Rule; 9] = [
    Rule {
        id: "hook",
        delta: 6,
        present: |s| s.has_hook,
        credit: "Your opening line already earns the scroll-stop",
        gap: "Add a hook: open with a number, a bold claim or a question",
        view_reason: Some((
            Severity::FixNow,
            "Readers scroll past before the first line lands; lead with the outcome or a number",
        )),
    },
    Rule {
        id: "structure",
        delta: 8,
        present: |s| s.has_structure,
        credit: "Line breaks make the post easy to skim",
        gap: "Add structure: break the copy into short lines or bullets",
        view_reason: Some((
            Severity::FixNow,
            "A single block of text is hard to skim on mobile; split it into short lines",
        )),
    },
    Rule {
        id: "question",
        delta: 5,
        present: |s| s.has_question(),
        credit: "The question gives readers a reason to reply",
        gap: "Add a question so readers have something to answer",
        view_reason: None,
    },
    Rule {
        id: "hashtags",
        delta: 6,
        present: |s| s.has_hashtags(),
        credit: "Hashtags give the post discovery surface",
        gap: "Add 2-3 targeted hashtags for discovery",
        view_reason: Some((
            Severity::Boost,
            "Without hashtags the post rarely travels beyond existing followers",
        )),
    },
    Rule {
        id: "call_to_action",
        delta: 7,
        present: |s| s.has_cta,
        credit: "A clear call-to-action tells readers what to do next",
        gap: "Add a call-to-action that tells readers what to do next",
        view_reason: Some((
            Severity::FixNow,
            "Nothing asks the reader to act, so engagement stalls after the read",
        )),
    },
    Rule {
        id: "shareability",
        delta: 0,
        present: |s| s.is_shareable(),
        credit: "There is a concrete takeaway worth passing on",
        gap: "Add a concrete takeaway or number people will want to pass on",
        view_reason: Some((
            Severity::Boost,
            "No concrete takeaway to pass on, which caps shares",
        )),
    },
    Rule {
        id: "emoji",
        delta: 3,
        present: |s| s.has_emoji(),
        credit: "Emoji add visual anchors to the feed card",
        gap: "Add one or two emoji as visual anchors",
        view_reason: Some((
            Severity::Keep,
            "No visual anchors; a single emoji can lift scanning without hurting credibility",
        )),
    },
    Rule {
        id: "tone_alignment",
        delta: 2,
        present: |s| s.tone_aligned,
        credit: "Wording already matches the chosen tone",
        gap: "Lean harder into the chosen tone with a few signature words",
        view_reason: None,
    },
    Rule {
        id: "category_alignment",
        delta: 2,
        present: |s| s.category_aligned,
        credit: "Vocabulary speaks directly to the category's audience",
        gap: "Use the words your category's audience actually searches for",
        view_reason: None,
    },
];

/// Piecewise length quality: short posts are penalised, 140-480 characters
/// rewarded, very long posts mildly penalised again.
pub fn length_base(char_count: usize) -> i32 {
    match char_count {
        0..=39 => 48,
        40..=79 => 55,
        80..=139 => 63,
        140..=480 => 72,
        481..=800 => 68,
        _ => 62,
    }
}
