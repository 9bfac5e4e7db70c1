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

use chrono::Local;
use chrono::TimeZone;
use serde::Serialize;

use crate::db::Database;
use crate::db::Insertion;
use crate::enrich::Enrich;
use crate::enrich::retry::RetryPolicy;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::sm2::apply_grade;
use crate::types::card::Card;
use crate::types::card::DueCard;
use crate::types::card_id::CardId;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;
use crate::undo::undo;

/// The operations a front end performs on the vocabulary collection. Each
/// one is a single read-modify-write against the database.
#[derive(Clone)]
pub struct Collection {
    db: Database,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct GradeOutcome {
    pub next_review_at: Timestamp,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct UndoOutcome {
    pub undone_grade: Grade,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddStatus {
    /// The word was new.
    Created,
    /// The word was already in the collection and is now due again.
    Reset,
}

#[derive(Debug, Serialize)]
pub struct AddOutcome {
    pub card: Card,
    pub status: AddStatus,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub card_count: usize,
    pub due_count: usize,
    pub today_review_count: usize,
}

impl Collection {
    pub fn open(database_path: &str) -> Fallible<Self> {
        let db = Database::new(database_path)?;
        Ok(Self { db })
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn grade(&self, card_id: CardId, grade: Grade, now: Timestamp) -> Fallible<GradeOutcome> {
        let state = self.db.update_schedule(card_id, |state| {
            apply_grade(state, grade, now)?;
            Ok(state.clone())
        })?;
        log::debug!(
            "{} {} I={}d EF={:.2} streak={} due={}",
            &card_id.to_hex()[..8],
            grade.as_str(),
            state.interval,
            state.ease_factor,
            state.streak,
            state.next_review_at
        );
        Ok(GradeOutcome {
            next_review_at: state.next_review_at,
        })
    }

    pub fn undo(&self, card_id: CardId, now: Timestamp) -> Fallible<UndoOutcome> {
        let undone_grade = self.db.update_schedule(card_id, |state| undo(state, now))?;
        log::debug!("{} undid {}", &card_id.to_hex()[..8], undone_grade.as_str());
        Ok(UndoOutcome { undone_grade })
    }

    pub fn due(&self, language: &str, limit: usize, now: Timestamp) -> Fallible<Vec<DueCard>> {
        self.db.query_due(language, now, limit)
    }

    pub fn card(&self, card_id: CardId) -> Fallible<Card> {
        self.db.get_card(card_id)
    }

    /// Look up a word with the content provider and add it. The provider is
    /// called before the database is touched. If the base form is already in
    /// the collection, the existing card is marked as forgotten instead.
    pub async fn add_word<E: Enrich + Sync>(
        &self,
        enricher: &E,
        retry: &RetryPolicy,
        word: &str,
        language: &str,
        now: Timestamp,
    ) -> Fallible<AddOutcome> {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Err(ErrorReport::invalid_input("word must not be empty."));
        }
        let language = language.trim();
        if language.is_empty() {
            return Err(ErrorReport::invalid_input("language must not be empty."));
        }
        log::info!("Adding word: {word} ({language})");
        let mut content = retry.run(|| enricher.enrich(&word, language)).await?;
        content.canonical_form = content.canonical_form.trim().to_lowercase();
        if content.canonical_form.is_empty() {
            content.canonical_form = word.clone();
        }

        let card = Card::new(language.to_string(), content, now);
        match self.db.insert_or_reset(&card, now)? {
            Insertion::Created => Ok(AddOutcome {
                card,
                status: AddStatus::Created,
            }),
            Insertion::Reset(card) => {
                log::info!(
                    "Word '{}' already exists. Resetting review status (forgotten).",
                    card.word()
                );
                Ok(AddOutcome {
                    card,
                    status: AddStatus::Reset,
                })
            }
        }
    }

    pub fn stats(&self, language: &str, now: Timestamp) -> Fallible<Stats> {
        Ok(Stats {
            card_count: self.db.card_count(language)?,
            due_count: self.db.due_count(language, now)?,
            today_review_count: self.db.review_count_since(language, start_of_day(now)?)?,
        })
    }
}

/// Local midnight of the day `now` falls on.
fn start_of_day(now: Timestamp) -> Fallible<Timestamp> {
    let midnight = now.local_date().and_hms_opt(0, 0, 0).and_then(|naive| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.to_utc())
    });
    match midnight {
        Some(midnight) => Ok(Timestamp::new(midnight)),
        // Midnight does not exist on this day (DST jump). Count the last 24 hours instead.
        None => now.plus_minutes(-24 * 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::helper::FakeEnricher;
    use crate::helper::create_tmp_db;

    fn no_delay() -> RetryPolicy {
        RetryPolicy::new(3, std::time::Duration::ZERO)
    }

    async fn collection_with(
        words: &[&str],
        now: Timestamp,
    ) -> Fallible<(tempfile::TempDir, Collection)> {
        let (dir, db) = create_tmp_db()?;
        let collection = Collection::new(db);
        let enricher = FakeEnricher::new(0);
        for word in words {
            collection
                .add_word(&enricher, &no_delay(), word, "en", now)
                .await?;
        }
        Ok((dir, collection))
    }

    #[tokio::test]
    async fn test_add_word_normalizes_and_canonicalizes() -> Fallible<()> {
        let (_dir, db) = create_tmp_db()?;
        let collection = Collection::new(db);
        let now = Timestamp::now();
        let enricher = FakeEnricher::new(0);

        let added = collection
            .add_word(&enricher, &no_delay(), "  RAN ", "en", now)
            .await?;
        assert_eq!(added.status, AddStatus::Created);
        assert_eq!(added.card.word(), "run");
        assert_eq!(added.card.id(), CardId::for_word("en", "run"));
        assert_eq!(collection.card(added.card.id())?, added.card);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_word_twice_resets_card() -> Fallible<()> {
        let now = Timestamp::now();
        let (_dir, collection) = collection_with(&["run"], now).await?;
        let id = CardId::for_word("en", "run");
        collection.grade(id, Grade::Good, now)?;
        collection.grade(id, Grade::Good, now)?;

        let later = now.plus_days(2)?;
        let added = collection
            .add_word(&FakeEnricher::new(0), &no_delay(), "ran", "en", later)
            .await?;
        assert_eq!(added.status, AddStatus::Reset);
        let state = collection.db.get_schedule(id)?;
        assert_eq!(state.streak, 0);
        assert_eq!(state.interval, 0);
        assert_eq!(state.next_review_at, later);
        assert!((state.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(state.history.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_word_retries_enrichment() -> Fallible<()> {
        let (_dir, db) = create_tmp_db()?;
        let collection = Collection::new(db);
        let enricher = FakeEnricher::new(2);
        let added = collection
            .add_word(&enricher, &no_delay(), "run", "en", Timestamp::now())
            .await?;
        assert_eq!(added.status, AddStatus::Created);
        assert_eq!(enricher.calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_word_gives_up_and_writes_nothing() -> Fallible<()> {
        let (_dir, db) = create_tmp_db()?;
        let collection = Collection::new(db);
        let enricher = FakeEnricher::new(3);
        let err = collection
            .add_word(&enricher, &no_delay(), "run", "en", Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Enrichment);
        assert_eq!(enricher.calls(), 3);
        assert_eq!(collection.db.card_count("en")?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_empty_word() -> Fallible<()> {
        let (_dir, db) = create_tmp_db()?;
        let collection = Collection::new(db);
        let enricher = FakeEnricher::new(0);
        let err = collection
            .add_word(&enricher, &no_delay(), "   ", "en", Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(enricher.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_grade_good_good_again_then_undo() -> Fallible<()> {
        let t0 = Timestamp::now();
        let (_dir, collection) = collection_with(&["run"], t0).await?;
        let id = CardId::for_word("en", "run");

        let outcome = collection.grade(id, Grade::Good, t0)?;
        assert_eq!(outcome.next_review_at, t0.plus_days(1)?);
        let t1 = t0.plus_days(1)?;
        let outcome = collection.grade(id, Grade::Good, t1)?;
        assert_eq!(outcome.next_review_at, t1.plus_days(6)?);
        let t2 = t1.plus_days(6)?;
        let outcome = collection.grade(id, Grade::Again, t2)?;
        assert_eq!(outcome.next_review_at, t2.plus_minutes(1)?);

        let t3 = t2.plus_minutes(5)?;
        let undone = collection.undo(id, t3)?;
        assert_eq!(undone.undone_grade, Grade::Again);
        let state = collection.db.get_schedule(id)?;
        assert_eq!(state.interval, 6);
        assert_eq!(state.streak, 2);
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.next_review_at, t3);
        assert_eq!(state.last_reviewed_at, Some(t1));
        assert_eq!(state.history.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_undo_without_history() -> Fallible<()> {
        let now = Timestamp::now();
        let (_dir, collection) = collection_with(&["run"], now).await?;
        let id = CardId::for_word("en", "run");
        let before = collection.db.get_schedule(id)?;
        let err = collection.undo(id, now.plus_days(1)?).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoHistory);
        assert_eq!(collection.db.get_schedule(id)?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_card() -> Fallible<()> {
        let (_dir, db) = create_tmp_db()?;
        let collection = Collection::new(db);
        let id = CardId::for_word("en", "ghost");
        let now = Timestamp::now();
        assert_eq!(
            collection.grade(id, Grade::Good, now).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(collection.undo(id, now).unwrap_err().kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_due_and_stats() -> Fallible<()> {
        let now = Timestamp::now();
        let (_dir, collection) = collection_with(&["one", "two", "three"], now).await?;
        collection.grade(CardId::for_word("en", "two"), Grade::Good, now)?;

        let due = collection.due("en", 50, now)?;
        let words: Vec<&str> = due.iter().map(|d| d.card.word()).collect();
        assert_eq!(words, vec!["one", "three"]);
        assert!(collection.due("de", 50, now)?.is_empty());

        let stats = collection.stats("en", now)?;
        assert_eq!(
            stats,
            Stats {
                card_count: 3,
                due_count: 2,
                today_review_count: 1,
            }
        );
        Ok(())
    }
}
