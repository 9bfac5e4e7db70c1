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

use serde::Deserialize;
use serde::Serialize;

use crate::types::card_id::CardId;
use crate::types::schedule::SchedulingState;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    pub translation: String,
}

/// What the content provider knows about a word.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CardContent {
    /// The base form (lemma) of the word.
    #[serde(rename = "word")]
    pub canonical_form: String,
    pub translation: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Card {
    id: CardId,
    word: String,
    language: String,
    translation: String,
    examples: Vec<Example>,
    created_at: Timestamp,
}

impl Card {
    pub fn new(language: String, content: CardContent, created_at: Timestamp) -> Self {
        let CardContent {
            canonical_form,
            translation,
            examples,
        } = content;
        let id = CardId::for_word(&language, &canonical_form);
        Self {
            id,
            word: canonical_form,
            language,
            translation,
            examples,
            created_at,
        }
    }

    /// Rebuild a card from its stored columns.
    pub fn from_parts(
        id: CardId,
        word: String,
        language: String,
        translation: String,
        examples: Vec<Example>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            word,
            language,
            translation,
            examples,
            created_at,
        }
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// A card together with its scheduling state, as returned by a due query.
#[derive(Clone, Debug, Serialize)]
pub struct DueCard {
    #[serde(rename = "word")]
    pub card: Card,
    #[serde(rename = "review")]
    pub state: SchedulingState,
}

impl AsRef<SchedulingState> for DueCard {
    fn as_ref(&self) -> &SchedulingState {
        &self.state
    }
}
