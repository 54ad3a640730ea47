use crate::error::ValidationError;
use crate::{Category, EnhancementRequest, PlatformSlot, Tone};

/// Structural constraints for one slot.
#[derive(Debug, Clone, Copy)]
pub struct PlatformSpec {
    pub slot: PlatformSlot,
    pub label: &'static str,
    pub max_chars: usize,
    /// Hard ceilings are rejected by the network; soft ones are guidance.
    pub hard_ceiling: bool,
    pub hashtags: (usize, usize),
    pub sections: &'static [&'static str],
    pub format_notes: &'static str,
}

pub const PLATFORM_SPECS: [PlatformSpec; 4] = [
    PlatformSpec {
        slot: PlatformSlot::Primary,
        label: "long-form professional network",
        max_chars: 3000,
        hard_ceiling: false,
        hashtags: (3, 5),
        sections: &["hook", "context paragraph", "3-4 bullet takeaways", "call-to-action", "hashtags"],
        format_notes: "Use short paragraphs separated by blank lines. Bullets start with a simple symbol such as \u{2022} or \u{2192}.",
    },
    PlatformSpec {
        slot: PlatformSlot::Secondary,
        label: "short-form network",
        max_chars: 280,
        hard_ceiling: true,
        hashtags: (1, 2),
        sections: &["hook", "one-line payoff", "call-to-action", "hashtags"],
        format_notes: "Everything, hashtags included, must fit in one post. No threads.",
    },
    PlatformSpec {
        slot: PlatformSlot::Tertiary,
        label: "community network",
        max_chars: 2200,
        hard_ceiling: false,
        hashtags: (3, 3),
        sections: &["hook", "story body", "2-3 bullet points", "question to the reader", "hashtags"],
        format_notes: "Conversational paragraphs. Bullets start with \u{25b8}.",
    },
    PlatformSpec {
        slot: PlatformSlot::Quaternary,
        label: "visual network caption",
        max_chars: 2200,
        hard_ceiling: false,
        hashtags: (5, 5),
        sections: &["hook line", "short caption body", "2-3 bullet points", "call-to-action", "hashtag block"],
        format_notes: "The first line must work on its own before the caption is expanded. Bullets start with \u{2726}.",
    },
];

pub fn spec_for(slot: PlatformSlot) -> &'static PlatformSpec {
    match slot {
        PlatformSlot::Primary => &PLATFORM_SPECS[0],
        PlatformSlot::Secondary => &PLATFORM_SPECS[1],
        PlatformSlot::Tertiary => &PLATFORM_SPECS[2],
        PlatformSlot::Quaternary => &PLATFORM_SPECS[3],
    }
}

pub fn category_audience(category: Category) -> &'static str {
    match category {
        Category::Business => "founders, operators and business leaders",
        Category::Technology => "engineers and people building software",
        Category::Lifestyle => "people working on their habits, health and everyday life",
        Category::Marketing => "marketers and growth teams chasing real traction",
        Category::Creative => "creators, designers and artists",
        Category::General => "a broad, curious audience",
    }
}

pub fn tone_voice(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "polished and credible, confident without hype",
        Tone::Conversational => "warm and direct, like talking to a friend over coffee",
        Tone::Enthusiastic => "high-energy and upbeat, with genuine excitement",
        Tone::Authoritative => "expert and decisive, backed by specifics",
    }
}

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(
        slot: PlatformSlot,
        text: &str,
        category: Category,
        tone: Tone,
    ) -> Result<String, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }

        let spec = spec_for(slot);
        let ceiling = if spec.hard_ceiling {
            format!("HARD LIMIT: at most {} characters in total.", spec.max_chars)
        } else {
            format!("Keep it under {} characters.", spec.max_chars)
        };
        let hashtags = if spec.hashtags.0 == spec.hashtags.1 {
            format!("exactly {}", spec.hashtags.0)
        } else {
            format!("{}-{}", spec.hashtags.0, spec.hashtags.1)
        };
        let structure = spec
            .sections
            .iter()
            .enumerate()
            .map(|(idx, section)| format!("{}. {}", idx + 1, section))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            "You rewrite social media posts for the {label}.\n\
Audience: {audience}.\n\
Voice: {voice}.\n\
Category: {category}.\n\
\n\
Structure, in this order:\n\
{structure}\n\
\n\
Rules:\n\
- {ceiling}\n\
- Use {hashtags} relevant hashtags at the end.\n\
- {notes}\n\
- Keep every fact, number and claim from the original. Do not invent results.\n\
- Output plain text only: no markdown, no asterisks, no headings, no HTML, no surrounding quotes.\n\
- Return only the rewritten post, with no preamble or explanation.\n\
\n\
Original post:\n\
{text}",
            label = spec.label,
            audience = category_audience(category),
            voice = tone_voice(tone),
            category = category.label(),
            structure = structure,
            ceiling = ceiling,
            hashtags = hashtags,
            notes = spec.format_notes,
            text = text,
        ))
    }

    pub fn build_all(request: &EnhancementRequest) -> Result<Vec<(PlatformSlot, String)>, ValidationError> {
        request
            .platforms()
            .iter()
            .map(|slot| {
                Self::build(*slot, request.original_text(), request.category(), request.tone())
                    .map(|prompt| (*slot, prompt))
            })
            .collect()
    }
}
