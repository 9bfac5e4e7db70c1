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

use crate::collection::Collection;
use crate::config::Config;
use crate::error::Fallible;
use crate::types::timestamp::Timestamp;

pub fn print_stats(config: &Config, language: &str) -> Fallible<()> {
    let collection = Collection::open(&config.database)?;
    println!("{}", stats_json(&collection, language, Timestamp::now())?);
    Ok(())
}

fn stats_json(collection: &Collection, language: &str, now: Timestamp) -> Fallible<String> {
    let stats = collection.stats(language, now)?;
    Ok(serde_json::to_string_pretty(&stats)?)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use serde_json::json;

    use super::*;
    use crate::helper::create_tmp_db;
    use crate::helper::sample_card;
    use crate::types::schedule::SchedulingState;

    #[test]
    fn test_stats_json() -> Fallible<()> {
        let (_dir, db) = create_tmp_db()?;
        let now = Timestamp::now();
        for word in ["alpha", "beta"] {
            db.insert_card(&sample_card("en", word, now), &SchedulingState::new(now))?;
        }
        db.insert_card(&sample_card("de", "gamma", now), &SchedulingState::new(now))?;
        let collection = Collection::new(db);
        let json: Value = serde_json::from_str(&stats_json(&collection, "en", now)?)?;
        assert_eq!(
            json,
            json!({"cardCount": 2, "dueCount": 2, "todayReviewCount": 0})
        );
        Ok(())
    }
}
