// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The SM-2 scheduling policy.

use crate::error::Fallible;
use crate::types::grade::Grade;
use crate::types::schedule::HistoryEntry;
use crate::types::schedule::MIN_EASE;
use crate::types::schedule::SchedulingState;
use crate::types::timestamp::Timestamp;

/// Lapsed cards come back after this many minutes.
const RELEARN_MINUTES: i64 = 1;

/// The interval after the first success, in days.
const FIRST_INTERVAL: u32 = 1;

/// The interval after the second consecutive success, in days.
const SECOND_INTERVAL: u32 = 6;

/// No interval grows past a hundred years.
pub const MAX_INTERVAL: u32 = 36500;

/// How much the ease factor drops when a known word is added again.
const FORGOTTEN_EASE_PENALTY: f64 = 0.2;

/// Apply a grade to a card's scheduling state and record it in the history.
/// If the next review time cannot be computed, the state is left unchanged.
pub fn apply_grade(state: &mut SchedulingState, grade: Grade, now: Timestamp) -> Fallible<()> {
    if grade.is_lapse() {
        state.next_review_at = now.plus_minutes(RELEARN_MINUTES)?;
        state.streak = 0;
        state.interval = FIRST_INTERVAL;
    } else {
        let interval = match state.streak {
            0 => FIRST_INTERVAL,
            1 => SECOND_INTERVAL,
            _ => (f64::from(state.interval) * state.ease_factor).floor() as u32,
        };
        let interval = interval.min(MAX_INTERVAL);
        state.next_review_at = now.plus_days(interval)?;
        state.interval = interval;
        state.streak += 1;
        state.ease_factor = new_ease(state.ease_factor, grade.quality());
    }
    state.last_reviewed_at = Some(now);
    state.history.push(HistoryEntry {
        reviewed_at: now,
        grade,
        interval_after: state.interval,
        ease_after: state.ease_factor,
    });
    Ok(())
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
fn new_ease(ease: f64, quality: u8) -> f64 {
    let q = f64::from(5 - quality);
    let ease = ease + (0.1 - q * (0.08 + q * 0.02));
    ease.max(MIN_EASE)
}

/// Mark a card as forgotten because the learner added its word again. This
/// is not a graded review, so the history is left alone.
pub fn reset_forgotten(state: &mut SchedulingState, now: Timestamp) {
    state.streak = 0;
    state.interval = 0;
    state.next_review_at = now;
    state.ease_factor = (state.ease_factor - FORGOTTEN_EASE_PENALTY).max(MIN_EASE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ALL_GRADES: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    fn state(streak: u32, ease_factor: f64, interval: u32) -> SchedulingState {
        SchedulingState {
            interval,
            ease_factor,
            streak,
            ..SchedulingState::new(Timestamp::now())
        }
    }

    #[test]
    fn test_ease_never_below_floor() -> Fallible<()> {
        let now = Timestamp::now();
        for ease in [1.3, 1.35, 1.5, 2.5, 3.0] {
            for grade in ALL_GRADES {
                for streak in 0..4 {
                    let mut s = state(streak, ease, 6);
                    apply_grade(&mut s, grade, now)?;
                    assert!(s.ease_factor >= MIN_EASE);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_lapse_resets_streak() -> Fallible<()> {
        let now = Timestamp::now();
        for grade in [Grade::Again, Grade::Hard] {
            let mut s = state(5, 2.1, 40);
            apply_grade(&mut s, grade, now)?;
            assert_eq!(s.streak, 0);
            assert_eq!(s.interval, 1);
            assert_eq!(s.ease_factor, 2.1);
            assert_eq!(s.next_review_at, now.plus_minutes(1)?);
            assert_eq!(s.last_reviewed_at, Some(now));
        }
        Ok(())
    }

    #[test]
    fn test_interval_escalation() -> Fallible<()> {
        let now = Timestamp::now();

        let mut s = state(0, 2.5, 0);
        apply_grade(&mut s, Grade::Good, now)?;
        assert_eq!(s.interval, 1);
        assert_eq!(s.streak, 1);

        let mut s = state(1, 2.5, 1);
        apply_grade(&mut s, Grade::Good, now)?;
        assert_eq!(s.interval, 6);
        assert_eq!(s.streak, 2);

        let mut s = state(2, 2.5, 6);
        apply_grade(&mut s, Grade::Good, now)?;
        assert_eq!(s.interval, 15);
        assert_eq!(s.streak, 3);
        assert_eq!(s.next_review_at, now.plus_days(15)?);
        Ok(())
    }

    #[test]
    fn test_interval_is_floored() -> Fallible<()> {
        let mut s = state(2, 2.6, 15);
        apply_grade(&mut s, Grade::Good, Timestamp::now())?;
        // 15 * 2.6 = 39.0
        assert_eq!(s.interval, 39);
        let mut s = state(3, 1.3, 7);
        apply_grade(&mut s, Grade::Good, Timestamp::now())?;
        // 7 * 1.3 = 9.1
        assert_eq!(s.interval, 9);
        Ok(())
    }

    #[test]
    fn test_interval_is_capped() -> Fallible<()> {
        // Grading ahead of time is allowed, so the interval can keep growing.
        let now = Timestamp::now();
        let mut s = SchedulingState::new(now);
        for _ in 0..30 {
            apply_grade(&mut s, Grade::Good, now)?;
            assert!(s.interval <= MAX_INTERVAL);
            assert_eq!(Timestamp::parse(&s.next_review_at.to_rfc3339())?, s.next_review_at);
        }
        assert_eq!(s.interval, MAX_INTERVAL);
        assert_eq!(s.next_review_at, now.plus_days(MAX_INTERVAL)?);
        assert_eq!(s.history.len(), 30);
        Ok(())
    }

    #[test]
    fn test_out_of_range_grade_leaves_state_unchanged() -> Fallible<()> {
        let late = Timestamp::parse("9999-06-01T00:00:00.000000Z")?;
        let mut s = state(5, 2.5, 1000);
        let before = s.clone();
        let err = apply_grade(&mut s, Grade::Good, late).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert_eq!(s, before);
        Ok(())
    }

    #[test]
    fn test_only_easy_raises_ease() -> Fallible<()> {
        let now = Timestamp::now();
        let mut s = state(0, 2.5, 0);
        apply_grade(&mut s, Grade::Good, now)?;
        assert_eq!(s.ease_factor, 2.5);
        apply_grade(&mut s, Grade::Easy, now)?;
        assert!((s.ease_factor - 2.6).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_history_records_post_transition_values() -> Fallible<()> {
        let now = Timestamp::now();
        let mut s = state(0, 2.5, 0);
        apply_grade(&mut s, Grade::Good, now)?;
        apply_grade(&mut s, Grade::Again, now)?;
        assert_eq!(s.history.len(), 2);
        assert_eq!(
            s.history[0],
            HistoryEntry {
                reviewed_at: now,
                grade: Grade::Good,
                interval_after: 1,
                ease_after: 2.5,
            }
        );
        assert_eq!(s.history[1].grade, Grade::Again);
        assert_eq!(s.history[1].interval_after, 1);
        Ok(())
    }

    #[test]
    fn test_reset_forgotten() -> Fallible<()> {
        let now = Timestamp::now();
        let mut s = state(4, 2.5, 30);
        apply_grade(&mut s, Grade::Good, now)?;
        reset_forgotten(&mut s, now);
        assert_eq!(s.streak, 0);
        assert_eq!(s.interval, 0);
        assert_eq!(s.next_review_at, now);
        assert!((s.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(s.history.len(), 1);

        let mut s = state(1, 1.4, 6);
        reset_forgotten(&mut s, now);
        assert_eq!(s.ease_factor, MIN_EASE);
        Ok(())
    }
}
