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

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::DateTime;
use chrono::Datelike;
use chrono::Duration;
use chrono::Local;
use chrono::NaiveDate;
use chrono::SecondsFormat;
use chrono::SubsecRound;
use chrono::Utc;
use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;

const MAX_YEAR: i32 = 9999;

/// A UTC instant, truncated to microseconds so that it survives a round trip
/// through the database unchanged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self(ts.trunc_subsecs(6))
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn plus_minutes(self, minutes: i64) -> Fallible<Self> {
        self.plus(Duration::try_minutes(minutes), "minutes", minutes)
    }

    pub fn plus_days(self, days: u32) -> Fallible<Self> {
        self.plus(Duration::try_days(i64::from(days)), "days", i64::from(days))
    }

    /// Fails past year 9999, where the stored form would stop being fixed
    /// width and could no longer be parsed back.
    fn plus(self, delta: Option<Duration>, unit: &str, amount: i64) -> Fallible<Self> {
        match delta.and_then(|delta| self.0.checked_add_signed(delta)) {
            Some(ts) if ts.year() <= MAX_YEAR => Ok(Self(ts)),
            _ => Err(ErrorReport::invariant(format!(
                "{self} plus {amount} {unit} is out of range"
            ))),
        }
    }

    pub fn local_date(self) -> NaiveDate {
        self.0.with_timezone(&Local).date_naive()
    }

    /// Fixed-width RFC 3339, so that lexical order is chronological order.
    pub fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(s: &str) -> Fallible<Self> {
        let ts = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ErrorReport::new(format!("invalid timestamp '{s}': {e}")))?;
        Ok(Self::new(ts.with_timezone(&Utc)))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_rfc3339()))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Timestamp::parse(&string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}
