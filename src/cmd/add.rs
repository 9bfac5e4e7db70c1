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

use std::io::BufRead;
use std::io::Write;

use crate::collection::AddStatus;
use crate::collection::Collection;
use crate::config::Config;
use crate::enrich::Enrich;
use crate::enrich::llm::LlmClient;
use crate::enrich::retry::RetryPolicy;
use crate::error::Fallible;
use crate::error::fail;
use crate::types::timestamp::Timestamp;

pub async fn add_words(config: &Config, words: Vec<String>, language: &str) -> Fallible<()> {
    let collection = Collection::open(&config.database)?;
    let llm = LlmClient::new(&config.llm)?;
    let retry = RetryPolicy::from_config(&config.retry);
    let mut out = std::io::stdout();
    let failed = if words.is_empty() {
        let stdin = std::io::stdin();
        add_interactive(&collection, &llm, &retry, language, stdin.lock(), &mut out).await?
    } else {
        add_all(&collection, &llm, &retry, &words, language, &mut out).await?
    };
    if failed > 0 {
        return fail(format!("{failed} word(s) could not be added."));
    }
    Ok(())
}

/// Add each word in turn. A failure is reported and the rest are still
/// added. Returns the number of failures.
async fn add_all<E: Enrich + Sync, W: Write>(
    collection: &Collection,
    enricher: &E,
    retry: &RetryPolicy,
    words: &[String],
    language: &str,
    out: &mut W,
) -> Fallible<usize> {
    let mut failed = 0;
    for word in words {
        if !add_one(collection, enricher, retry, word, language, out).await? {
            failed += 1;
        }
    }
    Ok(failed)
}

/// Read one word per line until an empty line or end of input.
async fn add_interactive<E: Enrich + Sync, R: BufRead, W: Write>(
    collection: &Collection,
    enricher: &E,
    retry: &RetryPolicy,
    language: &str,
    mut input: R,
    out: &mut W,
) -> Fallible<usize> {
    writeln!(out, "Enter words to add ({language}), one per line. Empty line to finish.")?;
    let mut failed = 0;
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let word = line.trim();
        if word.is_empty() {
            break;
        }
        if !add_one(collection, enricher, retry, word, language, out).await? {
            failed += 1;
        }
    }
    Ok(failed)
}

async fn add_one<E: Enrich + Sync, W: Write>(
    collection: &Collection,
    enricher: &E,
    retry: &RetryPolicy,
    word: &str,
    language: &str,
    out: &mut W,
) -> Fallible<bool> {
    match collection
        .add_word(enricher, retry, word, language, Timestamp::now())
        .await
    {
        Ok(added) => {
            let card = &added.card;
            match added.status {
                AddStatus::Created => {
                    writeln!(out, "✓ {}: {}", card.word(), card.translation())?;
                }
                AddStatus::Reset => {
                    writeln!(out, "↺ {}: {} (reset)", card.word(), card.translation())?;
                }
            }
            if let Some(example) = card.examples().first() {
                writeln!(out, "    {}", example.sentence)?;
                writeln!(out, "    {}", example.translation)?;
            }
            Ok(true)
        }
        Err(e) => {
            log::debug!("Failed to add {word}: {e}");
            writeln!(out, "✗ {word}: {}", e.message())?;
            Ok(false)
        }
    }
}
