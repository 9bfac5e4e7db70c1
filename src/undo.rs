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

//! Undoing a review by replaying the history ledger.
//!
//! History entries only carry the interval and ease after each review, so the
//! previous state is rebuilt from the new last entry. The streak is
//! recomputed as the number of successful grades left anywhere in the
//! history, not only the unbroken tail. After a lapse followed by successes
//! this overcounts relative to [`crate::sm2::apply_grade`], which makes the
//! next interval grow faster than it would have without the undo.

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::grade::Grade;
use crate::types::schedule::SchedulingState;
use crate::types::timestamp::Timestamp;

/// Remove the most recent review and rebuild the state it replaced. The card
/// becomes due at `now`. Returns the grade that was undone.
pub fn undo(state: &mut SchedulingState, now: Timestamp) -> Fallible<Grade> {
    let popped = state.history.pop().ok_or_else(ErrorReport::no_history)?;
    match state.history.last() {
        Some(prev) => {
            state.interval = prev.interval_after;
            state.ease_factor = prev.ease_after;
            state.last_reviewed_at = Some(prev.reviewed_at);
            state.streak = state
                .history
                .iter()
                .filter(|entry| !entry.grade.is_lapse())
                .count() as u32;
        }
        None => {
            let fresh = SchedulingState::new(now);
            state.interval = fresh.interval;
            state.ease_factor = fresh.ease_factor;
            state.streak = fresh.streak;
            state.last_reviewed_at = fresh.last_reviewed_at;
        }
    }
    state.next_review_at = now;
    Ok(popped.grade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sm2::apply_grade;

    #[test]
    fn test_empty_history() -> Fallible<()> {
        let created = Timestamp::now();
        let mut state = SchedulingState::new(created);
        let before = state.clone();
        let err = undo(&mut state, created.plus_days(3)?).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoHistory);
        assert_eq!(state, before);
        Ok(())
    }

    #[test]
    fn test_undo_only_review_resets_to_defaults() -> Fallible<()> {
        let t0 = Timestamp::now();
        let mut state = SchedulingState::new(t0);
        apply_grade(&mut state, Grade::Easy, t0)?;
        let t1 = t0.plus_minutes(10)?;
        let grade = undo(&mut state, t1)?;
        assert_eq!(grade, Grade::Easy);
        assert_eq!(state, SchedulingState::new(t1));
        Ok(())
    }

    #[test]
    fn test_round_trip_without_lapse() -> Fallible<()> {
        let t0 = Timestamp::now();
        let mut state = SchedulingState::new(t0);
        apply_grade(&mut state, Grade::Good, t0)?;
        apply_grade(&mut state, Grade::Easy, t0.plus_days(1)?)?;
        let before = state.clone();

        let t2 = t0.plus_days(7)?;
        apply_grade(&mut state, Grade::Good, t2)?;
        assert_eq!(undo(&mut state, t2)?, Grade::Good);

        assert_eq!(state.interval, before.interval);
        assert_eq!(state.ease_factor, before.ease_factor);
        assert_eq!(state.last_reviewed_at, before.last_reviewed_at);
        assert_eq!(state.streak, before.streak);
        assert_eq!(state.history, before.history);
        assert_eq!(state.next_review_at, t2);
        Ok(())
    }

    #[test]
    fn test_streak_rescan_counts_successes_before_a_lapse() -> Fallible<()> {
        let t0 = Timestamp::now();
        let mut state = SchedulingState::new(t0);
        apply_grade(&mut state, Grade::Good, t0)?;
        apply_grade(&mut state, Grade::Again, t0)?;
        apply_grade(&mut state, Grade::Good, t0)?;
        // Forward streak is 1: only the review after the lapse counts.
        assert_eq!(state.streak, 1);
        apply_grade(&mut state, Grade::Good, t0)?;
        assert_eq!(state.streak, 2);

        undo(&mut state, t0)?;
        // The rescan counts both successes, including the one before the
        // lapse, so it reports 2 where the forward rule would say 1.
        assert_eq!(state.streak, 2);
        assert_eq!(state.history.len(), 3);
        Ok(())
    }

    #[test]
    fn test_good_good_again_undo() -> Fallible<()> {
        let t0 = Timestamp::now();
        let mut state = SchedulingState::new(t0);

        apply_grade(&mut state, Grade::Good, t0)?;
        assert_eq!((state.interval, state.streak), (1, 1));

        let t1 = t0.plus_days(1)?;
        apply_grade(&mut state, Grade::Good, t1)?;
        assert_eq!((state.interval, state.streak), (6, 2));
        let ease_after_second_good = state.ease_factor;

        let t2 = t1.plus_days(6)?;
        apply_grade(&mut state, Grade::Again, t2)?;
        assert_eq!((state.interval, state.streak), (1, 0));
        assert_eq!(state.next_review_at, t2.plus_minutes(1)?);

        let t3 = t2.plus_minutes(1)?;
        assert_eq!(undo(&mut state, t3)?, Grade::Again);
        assert_eq!(state.ease_factor, ease_after_second_good);
        assert_eq!(state.interval, 6);
        assert_eq!(state.streak, 2);
        assert_eq!(state.last_reviewed_at, Some(t1));
        assert_eq!(state.next_review_at, t3);
        Ok(())
    }

    #[test]
    fn test_each_undo_removes_one_entry() -> Fallible<()> {
        let t0 = Timestamp::now();
        let mut state = SchedulingState::new(t0);
        for grade in [Grade::Good, Grade::Hard, Grade::Easy] {
            apply_grade(&mut state, grade, t0)?;
        }
        assert_eq!(undo(&mut state, t0)?, Grade::Easy);
        assert_eq!(undo(&mut state, t0)?, Grade::Hard);
        assert_eq!(undo(&mut state, t0)?, Grade::Good);
        assert!(state.history.is_empty());
        assert_eq!(undo(&mut state, t0).unwrap_err().kind(), ErrorKind::NoHistory);
        Ok(())
    }
}
