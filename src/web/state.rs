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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::collection::Collection;
use crate::enrich::llm::LlmClient;
use crate::enrich::retry::RetryPolicy;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::card::DueCard;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

#[derive(Clone)]
pub struct ServerState {
    pub collection: Collection,
    /// `None` when no provider is configured; adding words is then refused.
    pub llm: Option<Arc<LlmClient>>,
    pub retry: RetryPolicy,
    /// Defaults for API requests that leave them out.
    pub language: String,
    pub limit: usize,
    pub drill: Arc<Mutex<DrillSession>>,
}

/// The browser drill: the cards due when the server started.
pub struct DrillSession {
    pub total_cards: usize,
    pub cards: Vec<DueCard>,
    pub graded: Vec<GradedCard>,
    pub reveal: bool,
    pub finished: bool,
}

pub struct GradedCard {
    pub card: DueCard,
    pub grade: Grade,
}

impl ServerState {
    pub fn new(
        collection: Collection,
        llm: Option<LlmClient>,
        retry: RetryPolicy,
        language: String,
        limit: usize,
        now: Timestamp,
    ) -> Fallible<Self> {
        let cards = collection.due(&language, limit, now)?;
        log::debug!("Drill session has {} cards.", cards.len());
        let drill = DrillSession {
            total_cards: cards.len(),
            finished: cards.is_empty(),
            cards,
            graded: Vec::new(),
            reveal: false,
        };
        Ok(Self {
            collection,
            llm: llm.map(Arc::new),
            retry,
            language,
            limit,
            drill: Arc::new(Mutex::new(drill)),
        })
    }

    pub fn drill(&self) -> Fallible<MutexGuard<'_, DrillSession>> {
        self.drill
            .lock()
            .map_err(|_| ErrorReport::new("drill session lock is poisoned"))
    }
}
