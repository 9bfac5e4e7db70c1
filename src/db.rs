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

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::config::DbConfig;

use crate::due::select_due;
use crate::sm2::reset_forgotten;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::card::Card;
use crate::types::card::DueCard;
use crate::types::card::Example;
use crate::types::card_id::CardId;
use crate::types::schedule::HistoryEntry;
use crate::types::schedule::SchedulingState;
use crate::types::timestamp::Timestamp;

/// What [`Database::insert_or_reset`] did.
#[derive(Debug, PartialEq)]
pub enum Insertion {
    Created,
    /// Holds the card that was already stored.
    Reset(Card),
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let mut conn = Connection::open(database_path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                log::debug!("Creating schema in {database_path}");
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// Add a new card along with its initial scheduling state.
    pub fn insert_card(&self, card: &Card, state: &SchedulingState) -> Fallible<()> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        write_card(&tx, card, state)?;
        tx.commit()?;
        Ok(())
    }

    /// Add `card` as new. If a card with its id is already stored, reset that
    /// card as forgotten instead and return it. The lookup and the write share
    /// one transaction, so concurrent adds of the same word cannot both insert.
    pub fn insert_or_reset(&self, card: &Card, now: Timestamp) -> Fallible<Insertion> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let insertion = match read_card(&tx, card.id())? {
            Some(existing) => {
                let mut state =
                    read_schedule(&tx, card.id())?.ok_or_else(|| not_found(card.id()))?;
                reset_forgotten(&mut state, now);
                state.check_invariants()?;
                write_schedule(&tx, card.id(), &state)?;
                Insertion::Reset(existing)
            }
            None => {
                write_card(&tx, card, &SchedulingState::new(now))?;
                Insertion::Created
            }
        };
        tx.commit()?;
        Ok(insertion)
    }

    pub fn find_card(&self, card_id: CardId) -> Fallible<Option<Card>> {
        let conn = self.acquire()?;
        read_card(&conn, card_id)
    }

    /// If no card with the given id exists, returns a not-found error.
    pub fn get_card(&self, card_id: CardId) -> Fallible<Card> {
        self.find_card(card_id)?.ok_or_else(|| not_found(card_id))
    }

    /// If no card with the given id exists, returns a not-found error.
    pub fn get_schedule(&self, card_id: CardId) -> Fallible<SchedulingState> {
        let conn = self.acquire()?;
        read_schedule(&conn, card_id)?.ok_or_else(|| not_found(card_id))
    }

    /// Load a card's scheduling state, let `f` change it, and write it back
    /// together with its history, all in one transaction. If `f` fails, or
    /// any write fails, nothing is changed.
    pub fn update_schedule<T>(
        &self,
        card_id: CardId,
        f: impl FnOnce(&mut SchedulingState) -> Fallible<T>,
    ) -> Fallible<T> {
        let mut conn = self.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = read_schedule(&tx, card_id)?.ok_or_else(|| not_found(card_id))?;
        let result = f(&mut state)?;
        state.check_invariants()?;
        write_schedule(&tx, card_id, &state)?;
        tx.commit()?;
        Ok(result)
    }

    /// The cards in `language` due at or before `now`, in session order.
    pub fn query_due(
        &self,
        language: &str,
        now: Timestamp,
        limit: usize,
    ) -> Fallible<Vec<DueCard>> {
        let conn = self.acquire()?;
        let sql = "select c.card_id, c.word, c.language, c.translation, c.examples, c.created_at, s.interval, s.ease_factor, s.streak, s.next_review_at, s.last_reviewed_at from cards c join schedules s on s.card_id = c.card_id where c.language = ? and s.next_review_at <= ? order by c.created_at, c.rowid;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query((language, now))?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let card = CardRow {
                card_id: row.get(0)?,
                word: row.get(1)?,
                language: row.get(2)?,
                translation: row.get(3)?,
                examples: row.get(4)?,
                created_at: row.get(5)?,
            }
            .into_card()?;
            let state = SchedulingState {
                interval: row.get(6)?,
                ease_factor: row.get(7)?,
                streak: row.get(8)?,
                next_review_at: row.get(9)?,
                last_reviewed_at: row.get(10)?,
                history: Vec::new(),
            };
            state.check_invariants()?;
            candidates.push(DueCard { card, state });
        }
        // Only load the ledger for the cards that make it into the session.
        let mut selected = select_due(candidates, now, limit);
        for due in selected.iter_mut() {
            due.state.history = read_history(&conn, due.card.id())?;
        }
        Ok(selected)
    }

    pub fn card_count(&self, language: &str) -> Fallible<usize> {
        let conn = self.acquire()?;
        let count: i64 = conn.query_row(
            "select count(*) from cards where language = ?;",
            [language],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn due_count(&self, language: &str, now: Timestamp) -> Fallible<usize> {
        let conn = self.acquire()?;
        let count: i64 = conn.query_row(
            "select count(*) from cards c join schedules s on s.card_id = c.card_id where c.language = ? and s.next_review_at <= ?;",
            (language, now),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// The number of graded reviews in `language` recorded since `since`.
    pub fn review_count_since(&self, language: &str, since: Timestamp) -> Fallible<usize> {
        let conn = self.acquire()?;
        let count: i64 = conn.query_row(
            "select count(*) from history h join cards c on c.card_id = h.card_id where c.language = ? and h.reviewed_at >= ?;",
            (language, since),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[cfg(test)]
    pub fn execute_batch(&self, sql: &str) -> Fallible<()> {
        self.acquire()?.execute_batch(sql)?;
        Ok(())
    }

    fn acquire(&self) -> Fallible<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ErrorReport::new("database connection lock is poisoned"))
    }
}

fn not_found(card_id: CardId) -> ErrorReport {
    ErrorReport::not_found(format!("no card with id '{card_id}'."))
}

struct CardRow {
    card_id: CardId,
    word: String,
    language: String,
    translation: String,
    examples: String,
    created_at: Timestamp,
}

impl CardRow {
    fn into_card(self) -> Fallible<Card> {
        let examples: Vec<Example> = serde_json::from_str(&self.examples)?;
        Ok(Card::from_parts(
            self.card_id,
            self.word,
            self.language,
            self.translation,
            examples,
            self.created_at,
        ))
    }
}

fn read_card(conn: &Connection, card_id: CardId) -> Fallible<Option<Card>> {
    let sql = "select word, language, translation, examples, created_at from cards where card_id = ?;";
    let row = conn
        .query_row(sql, [card_id], |row| {
            Ok(CardRow {
                card_id,
                word: row.get(0)?,
                language: row.get(1)?,
                translation: row.get(2)?,
                examples: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    row.map(CardRow::into_card).transpose()
}

fn read_schedule(conn: &Connection, card_id: CardId) -> Fallible<Option<SchedulingState>> {
    let sql = "select interval, ease_factor, streak, next_review_at, last_reviewed_at from schedules where card_id = ?;";
    let state = conn
        .query_row(sql, [card_id], |row| {
            Ok(SchedulingState {
                interval: row.get(0)?,
                ease_factor: row.get(1)?,
                streak: row.get(2)?,
                next_review_at: row.get(3)?,
                last_reviewed_at: row.get(4)?,
                history: Vec::new(),
            })
        })
        .optional()?;
    match state {
        Some(mut state) => {
            state.history = read_history(conn, card_id)?;
            state.check_invariants()?;
            Ok(Some(state))
        }
        None => Ok(None),
    }
}

fn read_history(conn: &Connection, card_id: CardId) -> Fallible<Vec<HistoryEntry>> {
    let sql = "select reviewed_at, grade, interval_after, ease_after from history where card_id = ? order by seq;";
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([card_id])?;
    let mut history = Vec::new();
    while let Some(row) = rows.next()? {
        history.push(HistoryEntry {
            reviewed_at: row.get(0)?,
            grade: row.get(1)?,
            interval_after: row.get(2)?,
            ease_after: row.get(3)?,
        });
    }
    Ok(history)
}

fn write_card(tx: &Transaction, card: &Card, state: &SchedulingState) -> Fallible<()> {
    log::debug!("Adding new card: {} ({})", card.word(), card.id());
    let examples = serde_json::to_string(card.examples())?;
    tx.execute(
        "insert into cards (card_id, word, language, translation, examples, created_at) values (?, ?, ?, ?, ?, ?);",
        (
            card.id(),
            card.word(),
            card.language(),
            card.translation(),
            examples,
            card.created_at(),
        ),
    )?;
    tx.execute(
        "insert into schedules (card_id, interval, ease_factor, streak, next_review_at, last_reviewed_at) values (?, ?, ?, ?, ?, ?);",
        (
            card.id(),
            state.interval,
            state.ease_factor,
            state.streak,
            state.next_review_at,
            state.last_reviewed_at,
        ),
    )?;
    write_history(tx, card.id(), &state.history)
}

fn write_schedule(tx: &Transaction, card_id: CardId, state: &SchedulingState) -> Fallible<()> {
    let sql = "update schedules set interval = ?, ease_factor = ?, streak = ?, next_review_at = ?, last_reviewed_at = ? where card_id = ?;";
    let updated = tx.execute(
        sql,
        (
            state.interval,
            state.ease_factor,
            state.streak,
            state.next_review_at,
            state.last_reviewed_at,
            card_id,
        ),
    )?;
    if updated != 1 {
        return Err(not_found(card_id));
    }
    tx.execute("delete from history where card_id = ?;", [card_id])?;
    write_history(tx, card_id, &state.history)
}

fn write_history(tx: &Transaction, card_id: CardId, history: &[HistoryEntry]) -> Fallible<()> {
    let sql = "insert into history (card_id, seq, reviewed_at, grade, interval_after, ease_after) values (?, ?, ?, ?, ?, ?);";
    let mut stmt = tx.prepare(sql)?;
    for (seq, entry) in history.iter().enumerate() {
        stmt.execute((
            card_id,
            seq as i64,
            entry.reviewed_at,
            entry.grade,
            entry.interval_after,
            entry.ease_after,
        ))?;
    }
    Ok(())
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["cards"], |row| row.get(0))?;
    Ok(count > 0)
}
