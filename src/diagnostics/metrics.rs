use crate::diagnostics::rules::TextSignals;
use crate::EngagementMetrics;

/// Inclusive `[min, max]` band per metric.
pub const COMMENTS_BAND: (i32, i32) = (20, 95);
pub const LIKES_BAND: (i32, i32) = (30, 98);
pub const SHARES_BAND: (i32, i32) = (20, 95);
pub const VIEWS_BAND: (i32, i32) = (35, 99);
pub const TIME_SPENT_BAND: (i32, i32) = (25, 92);
pub const CLICK_THROUGH_BAND: (i32, i32) = (15, 90);
pub const SAVE_RATE_BAND: (i32, i32) = (15, 90);
pub const VIRAL_COEFFICIENT_BAND: (i32, i32) = (10, 95);

/// Each metric is a fixed share of the overall score plus the signal that
/// drives that behaviour, clamped to its own band.
pub fn engagement_metrics(score: u8, signals: &TextSignals) -> EngagementMetrics {
    let score = i32::from(score);
    let long_form = signals.char_count > 480;

    EngagementMetrics {
        comments: metric(
            score,
            80,
            bonus(signals.has_question(), 12) + bonus(signals.has_cta, 6),
            COMMENTS_BAND,
        ),
        likes: metric(
            score,
            90,
            bonus(signals.has_emoji(), 4) + bonus(signals.has_hook, 5),
            LIKES_BAND,
        ),
        shares: metric(
            score,
            75,
            bonus(signals.has_structure, 12) + bonus(signals.has_metric, 5),
            SHARES_BAND,
        ),
        views: metric(score, 95, bonus(signals.has_hook, 4), VIEWS_BAND),
        time_spent: metric(
            score,
            70,
            bonus(long_form, 10) + bonus(signals.has_structure, 8),
            TIME_SPENT_BAND,
        ),
        click_through: metric(score, 60, bonus(signals.has_cta, 15), CLICK_THROUGH_BAND),
        save_rate: metric(
            score,
            65,
            bonus(signals.has_structure, 14) + bonus(signals.has_metric, 4),
            SAVE_RATE_BAND,
        ),
        viral_coefficient: metric(
            score,
            70,
            bonus(signals.has_hashtags(), 12) + bonus(signals.is_shareable(), 6),
            VIRAL_COEFFICIENT_BAND,
        ),
    }
}

fn metric(score: i32, weight_pct: i32, signal: i32, band: (i32, i32)) -> u8 {
    let value = score * weight_pct / 100 + signal;
    value.clamp(band.0, band.1) as u8
}

fn bonus(present: bool, points: i32) -> i32 {
    if present {
        points
    } else {
        0
    }
}
