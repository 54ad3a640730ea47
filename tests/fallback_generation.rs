use rand::rngs::StdRng;
use rand::SeedableRng;

use post_enhancer::{Category, ContentSource, DiagnosticsScorer, FallbackGenerator, PlatformSlot, Tone};

const POST: &str = "We grew signups 35% last quarter. The trick was a shorter onboarding flow. Most teams overthink the first screen.";

#[test]
fn seeded_generators_agree() {
    let first = FallbackGenerator::seeded(7).generate(POST, Category::Marketing, Tone::Professional);
    let second = FallbackGenerator::seeded(7).generate(POST, Category::Marketing, Tone::Professional);
    assert_eq!(first, second);
}

#[test]
fn explicit_rng_matches_seeded_generator() {
    let mut rng = StdRng::seed_from_u64(11);
    let direct = FallbackGenerator::generate_with_rng(POST, Category::Technology, Tone::Enthusiastic, &mut rng);
    let seeded = FallbackGenerator::seeded(11).generate(POST, Category::Technology, Tone::Enthusiastic);
    assert_eq!(direct, seeded);
}

#[test]
fn every_slot_is_filled_for_any_input() {
    let inputs = [POST, "ok", "#justhashtags #nothingelse", "ONE LOUD SENTENCE WITHOUT PUNCTUATION"];
    for text in inputs {
        for category in Category::ALL {
            for tone in Tone::ALL {
                let result = FallbackGenerator::seeded(3).generate(text, category, tone);
                assert_eq!(result.source, ContentSource::Fallback);
                assert_eq!(result.platform_content.len(), 4, "{} / {} / {}", text, category, tone);
                for slot in PlatformSlot::ALL {
                    let variant = result.platform_content.get(slot).unwrap_or_default();
                    assert!(!variant.trim().is_empty());
                }
            }
        }
    }
}

#[test]
fn short_form_respects_hard_ceiling() {
    let long_text = "This sentence is deliberately long so the short form variant has to be cut down to size. ".repeat(8);
    for tone in Tone::ALL {
        let result = FallbackGenerator::seeded(5).generate(&long_text, Category::Business, tone);
        let short = result
            .platform_content
            .get(PlatformSlot::Secondary)
            .unwrap_or_default();
        assert!(short.chars().count() <= 280, "{} chars", short.chars().count());
    }
}

#[test]
fn enhanced_score_stays_in_band() {
    for category in Category::ALL {
        for tone in Tone::ALL {
            let result = FallbackGenerator::seeded(1).generate(POST, category, tone);
            let score = result.diagnostics.virality_score;
            assert!((90..=97).contains(&score), "{} for {} / {}", score, category, tone);
        }
    }
}

#[test]
fn diagnostics_lists_are_bounded() {
    let result = FallbackGenerator::seeded(9).generate("ok", Category::General, Tone::Conversational);

    assert_eq!(result.diagnostics.quick_wins.len(), 4);
    assert!(!result.diagnostics.view_reasons.is_empty());
    assert!(result.diagnostics.view_reasons.len() <= 4);
    assert!(result.diagnostics.highlights.len() <= 3);
}

#[test]
fn metric_from_input_survives_into_long_form() {
    let result = FallbackGenerator::seeded(2).generate(POST, Category::Marketing, Tone::Professional);
    let primary = result
        .platform_content
        .get(PlatformSlot::Primary)
        .unwrap_or_default();

    assert!(primary.contains("35%"));
    assert!(primary.contains("Proof \u{2192}"));
}

#[test]
fn hashtags_come_from_the_category_pool() {
    let result = FallbackGenerator::seeded(4).generate(POST, Category::Technology, Tone::Professional);
    let primary = result
        .platform_content
        .get(PlatformSlot::Primary)
        .unwrap_or_default();
    let tags: Vec<&str> = primary
        .split_whitespace()
        .filter(|word| word.starts_with('#'))
        .collect();

    assert_eq!(tags.len(), 3);
    let pool = ["#tech", "#software", "#ai", "#engineering", "#buildinpublic", "#devtools"];
    assert!(tags.iter().all(|tag| pool.contains(tag)));
}

#[test]
fn every_fallback_hook_registers_as_a_hook() {
    let inputs = [POST, "We shipped a new feature.", "ok"];
    for text in inputs {
        for category in Category::ALL {
            for tone in Tone::ALL {
                let result = FallbackGenerator::seeded(1).generate(text, category, tone);
                let primary = result
                    .platform_content
                    .get(PlatformSlot::Primary)
                    .unwrap_or_default();
                let evaluation = DiagnosticsScorer::evaluate(primary, category, tone);
                assert!(evaluation.fired("hook"), "{} / {} / {}", text, category, tone);
                assert!(evaluation.fired("structure"), "{} / {} / {}", text, category, tone);
            }
        }
    }
}

#[test]
fn insights_never_contradict_view_reasons() {
    let inputs = [POST, "We shipped a new feature.", "ok"];
    for text in inputs {
        for category in Category::ALL {
            for tone in Tone::ALL {
                let diagnostics = FallbackGenerator::seeded(1).generate(text, category, tone).diagnostics;
                let praises_hook = diagnostics
                    .view_reasons
                    .iter()
                    .any(|reason| reason.starts_with("Keep") && reason.contains("hook"));
                let praises_structure = diagnostics
                    .view_reasons
                    .iter()
                    .any(|reason| reason.starts_with("Keep") && reason.contains("structure"));
                let praises_plain_copy = diagnostics
                    .view_reasons
                    .iter()
                    .any(|reason| reason.starts_with("Keep") && reason.contains("emoji"));

                for insight in &diagnostics.insights {
                    let context = format!("{:?} for {} / {} / {}", insight, text, category, tone);
                    assert!(!(praises_hook && insight.starts_with("Add a hook")), "{}", context);
                    assert!(!(praises_structure && insight.starts_with("Add structure")), "{}", context);
                    assert!(!(praises_plain_copy && insight.contains("emoji")), "{}", context);
                }
            }
        }
    }
}

#[test]
fn hooks_read_as_one_sentence() {
    let conversational = FallbackGenerator::seeded(1).generate(POST, Category::Business, Tone::Conversational);
    let authoritative = FallbackGenerator::seeded(1).generate(POST, Category::General, Tone::Authoritative);

    let first_line = |result: &post_enhancer::EnhancementResult| {
        result
            .platform_content
            .get(PlatformSlot::Primary)
            .unwrap_or_default()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    };
    assert_eq!(
        first_line(&conversational),
        "Here's the honest version for founders and operators: 35% more signups."
    );
    assert_eq!(
        first_line(&authoritative),
        "The truth about what works for anyone who wants results: 35% more signups."
    );
}
