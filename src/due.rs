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

use std::cmp::Ordering;

use crate::types::schedule::SchedulingState;
use crate::types::timestamp::Timestamp;

/// How many cards a session admits unless told otherwise.
pub const DEFAULT_LIMIT: usize = 50;

/// Pick the cards due at `now`, weakest first: ascending by streak, then
/// ease factor, then interval. Ties keep their input order.
pub fn select_due<T: AsRef<SchedulingState>>(
    candidates: impl IntoIterator<Item = T>,
    now: Timestamp,
    limit: usize,
) -> Vec<T> {
    let mut due: Vec<T> = candidates
        .into_iter()
        .filter(|c| c.as_ref().is_due(now))
        .collect();
    // `sort_by` is stable.
    due.sort_by(|a, b| mastery_order(a.as_ref(), b.as_ref()));
    due.truncate(limit);
    due
}

fn mastery_order(a: &SchedulingState, b: &SchedulingState) -> Ordering {
    a.streak
        .cmp(&b.streak)
        .then_with(|| a.ease_factor.total_cmp(&b.ease_factor))
        .then_with(|| a.interval.cmp(&b.interval))
}
