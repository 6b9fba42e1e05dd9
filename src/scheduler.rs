//! SM-2 spaced repetition scheduling
//!
//! Pure scheduling arithmetic: a flashcard's current state plus a 0-5 recall
//! quality maps to its next state. Failing a card is a transition, not an
//! error - repetitions reset while the ease factor keeps adjusting.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f32 = 1.3;

/// Ease factor assigned to new cards
pub const INITIAL_EASE_FACTOR: f32 = 2.5;

/// Scheduling state for one flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardSchedule {
    /// Growth factor for review intervals; never below [`MIN_EASE_FACTOR`]
    pub ease_factor: f32,

    /// Days until the next review
    pub interval_days: u32,

    /// Consecutive successful reviews
    pub repetitions: u32,

    /// When the card is next due
    pub next_review: Option<DateTime<Utc>>,

    /// When the card was last reviewed
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Default for FlashcardSchedule {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 1,
            repetitions: 0,
            next_review: None,
            last_reviewed: None,
        }
    }
}

/// Apply one review with the current wall clock
pub fn review(schedule: &FlashcardSchedule, quality: i32) -> FlashcardSchedule {
    review_at(schedule, quality, Utc::now())
}

/// Apply one review at an explicit instant
///
/// `quality` is clamped to [0, 5]. Below 3 the card resets to a one-day
/// interval with zero repetitions; at 3 and above the interval follows the
/// SM-2 ladder (1 day, 6 days, then `round(interval x ease_factor)`). The
/// ease factor update runs on both branches, floored at [`MIN_EASE_FACTOR`].
pub fn review_at(
    schedule: &FlashcardSchedule,
    quality: i32,
    now: DateTime<Utc>,
) -> FlashcardSchedule {
    let quality = quality.clamp(0, 5);

    let (interval_days, repetitions) = if quality < 3 {
        (1, 0)
    } else {
        let interval_days = match schedule.repetitions {
            0 => 1,
            1 => 6,
            _ => (schedule.interval_days as f32 * schedule.ease_factor).round() as u32,
        };
        (interval_days, schedule.repetitions + 1)
    };

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), regardless of pass/fail
    let spread = (5 - quality) as f32;
    let ease_factor =
        (schedule.ease_factor + (0.1 - spread * (0.08 + spread * 0.02))).max(MIN_EASE_FACTOR);

    FlashcardSchedule {
        ease_factor,
        interval_days,
        repetitions,
        next_review: Some(now + Duration::days(interval_days as i64)),
        last_reviewed: Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_new_card_defaults() {
        let schedule = FlashcardSchedule::default();
        assert_relative_eq!(schedule.ease_factor, 2.5);
        assert_eq!(schedule.interval_days, 1);
        assert_eq!(schedule.repetitions, 0);
        assert!(schedule.next_review.is_none());
        assert!(schedule.last_reviewed.is_none());
    }

    #[test]
    fn test_perfect_review_ladder() {
        let now = fixed_now();
        let schedule = FlashcardSchedule::default();

        let first = review_at(&schedule, 5, now);
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.interval_days, 1);
        assert_relative_eq!(first.ease_factor, 2.6, epsilon = 1e-6);

        let second = review_at(&first, 5, now);
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval_days, 6);
        assert_relative_eq!(second.ease_factor, 2.7, epsilon = 1e-6);

        // Third review multiplies by the ease factor as it stood before the
        // update: round(6 * 2.7) = 16
        let third = review_at(&second, 5, now);
        assert_eq!(third.repetitions, 3);
        assert_eq!(third.interval_days, 16);
        assert_relative_eq!(third.ease_factor, 2.8, epsilon = 1e-6);
    }

    #[test]
    fn test_failed_review_resets_but_still_lowers_ease() {
        let now = fixed_now();
        let mature = FlashcardSchedule {
            ease_factor: 2.5,
            interval_days: 30,
            repetitions: 6,
            next_review: Some(now),
            last_reviewed: Some(now),
        };

        let failed = review_at(&mature, 1, now);
        assert_eq!(failed.repetitions, 0);
        assert_eq!(failed.interval_days, 1);
        // 2.5 + (0.1 - 4 * (0.08 + 4 * 0.02)) = 2.5 - 0.54
        assert_relative_eq!(failed.ease_factor, 1.96, epsilon = 1e-6);
    }

    #[test]
    fn test_ease_factor_floor() {
        let now = fixed_now();
        let mut schedule = FlashcardSchedule {
            ease_factor: 1.4,
            ..FlashcardSchedule::default()
        };

        for _ in 0..5 {
            schedule = review_at(&schedule, 0, now);
            assert!(schedule.ease_factor >= MIN_EASE_FACTOR);
        }
        assert_relative_eq!(schedule.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_ease_update_varies_with_quality() {
        let now = fixed_now();
        let schedule = FlashcardSchedule::default();

        // (0.1 - 2 * (0.08 + 2 * 0.02)) = 0.1 - 0.24 = -0.14
        let reviewed = review_at(&schedule, 3, now);
        assert_relative_eq!(reviewed.ease_factor, 2.36, epsilon = 1e-6);
        assert_eq!(reviewed.repetitions, 1);

        // Quality 4 leaves the ease factor untouched: 0.1 - 1 * 0.1 = 0
        let reviewed = review_at(&schedule, 4, now);
        assert_relative_eq!(reviewed.ease_factor, 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_quality_is_clamped() {
        let now = fixed_now();
        let schedule = FlashcardSchedule::default();

        let high = review_at(&schedule, 11, now);
        let five = review_at(&schedule, 5, now);
        assert_eq!(high, five);

        let low = review_at(&schedule, -3, now);
        let zero = review_at(&schedule, 0, now);
        assert_eq!(low, zero);
    }

    #[test]
    fn test_timestamps_advance_with_interval() {
        let now = fixed_now();
        let schedule = FlashcardSchedule {
            ease_factor: 2.0,
            interval_days: 10,
            repetitions: 3,
            next_review: None,
            last_reviewed: None,
        };

        let reviewed = review_at(&schedule, 4, now);
        assert_eq!(reviewed.interval_days, 20);
        assert_eq!(reviewed.last_reviewed, Some(now));
        assert_eq!(reviewed.next_review, Some(now + Duration::days(20)));
    }

    #[test]
    fn test_review_uses_wall_clock() {
        let before = Utc::now();
        let reviewed = review(&FlashcardSchedule::default(), 5);
        let after = Utc::now();

        let last = reviewed.last_reviewed.unwrap();
        assert!(last >= before && last <= after);
    }
}
