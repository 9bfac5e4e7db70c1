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

use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

/// The ease factor of a card that has never been reviewed.
pub const INITIAL_EASE: f64 = 2.5;

/// The ease factor never drops below this.
pub const MIN_EASE: f64 = 1.3;

/// One graded review, recorded after the transition. This is not a full
/// snapshot: streak and due time are not kept.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "date")]
    pub reviewed_at: Timestamp,
    pub grade: Grade,
    #[serde(rename = "interval")]
    pub interval_after: u32,
    #[serde(rename = "ease")]
    pub ease_after: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchedulingState {
    /// Days until the next review once graduated.
    pub interval: u32,
    pub ease_factor: f64,
    /// Consecutive successful grades since the last lapse.
    pub streak: u32,
    pub next_review_at: Timestamp,
    pub last_reviewed_at: Option<Timestamp>,
    /// Append-only, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl SchedulingState {
    /// The state of a card that was just created: due immediately.
    pub fn new(now: Timestamp) -> Self {
        Self {
            interval: 0,
            ease_factor: INITIAL_EASE,
            streak: 0,
            next_review_at: now,
            last_reviewed_at: None,
            history: Vec::new(),
        }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.next_review_at <= now
    }

    pub fn check_invariants(&self) -> Fallible<()> {
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE {
            return Err(ErrorReport::invariant(format!(
                "ease factor {} is below the floor of {MIN_EASE}",
                self.ease_factor
            )));
        }
        Ok(())
    }
}

impl AsRef<SchedulingState> for SchedulingState {
    fn as_ref(&self) -> &SchedulingState {
        self
    }
}
