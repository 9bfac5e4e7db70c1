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
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tempfile::tempdir;
use tokio::net::TcpListener;

use crate::db::Database;
use crate::enrich::Enrich;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::card::Card;
use crate::types::card::CardContent;
use crate::types::card::Example;
use crate::types::timestamp::Timestamp;

/// Open a fresh database in a temporary directory. The directory is deleted
/// when the returned guard is dropped.
pub fn create_tmp_db() -> Fallible<(TempDir, Database)> {
    let dir = tempdir()?;
    let path = dir.path().join("nekowords.db");
    let path = path.to_str().ok_or_else(|| ErrorReport::new("invalid path"))?;
    let db = Database::new(path)?;
    Ok((dir, db))
}

pub fn sample_content(word: &str) -> CardContent {
    CardContent {
        canonical_form: word.to_string(),
        translation: format!("/{word}/ translation of {word}"),
        examples: vec![
            Example {
                sentence: format!("I {word} every day."),
                translation: format!("example one for {word}"),
            },
            Example {
                sentence: format!("They {word} at work."),
                translation: format!("example two for {word}"),
            },
        ],
    }
}

pub fn sample_card(language: &str, word: &str, created_at: Timestamp) -> Card {
    Card::new(language.to_string(), sample_content(word), created_at)
}

/// Returns sample content, failing the first `failures` calls.
pub struct FakeEnricher {
    failures: usize,
    calls: AtomicUsize,
}

impl FakeEnricher {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Enrich for FakeEnricher {
    async fn enrich(&self, word: &str, _language: &str) -> Fallible<CardContent> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(ErrorReport::enrichment("provider unavailable"));
        }
        let base = if word == "ran" { "Run " } else { word };
        Ok(sample_content(base))
    }
}


/// The API key the fake provider accepts.
pub const FAKE_LLM_KEY: &str = "test-key";

/// An OpenAI-compatible endpoint on localhost that answers every prompt with
/// sample content for the quoted word. It maps "ran" to the base form "run",
/// fails with a 500 for "boom", and rejects any other API key with a 401.
pub struct FakeLlm {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeLlm {
    /// The number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn spawn_fake_llm() -> Fallible<FakeLlm> {
    let port = portpicker::pick_unused_port().ok_or_else(|| ErrorReport::new("no free port"))?;
    let bind = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&bind).await?;
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/chat/completions", post(fake_completions))
        .with_state(hits.clone());
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(FakeLlm {
        base_url: format!("http://{bind}"),
        hits,
    })
}

async fn fake_completions(
    State(hits): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    hits.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {FAKE_LLM_KEY}");
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid api key"})),
        );
    }
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    let word = prompt.split('"').nth(1).unwrap_or_default().to_lowercase();
    if word == "boom" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "provider exploded"})),
        );
    }
    let word = if word == "ran" { "run".to_string() } else { word };
    let content = sample_content(&word);
    let content = json!({
        "word": content.canonical_form,
        "translation": content.translation,
        "examples": content.examples,
    });
    let response = json!({
        "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
    });
    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tmp_db() -> Fallible<()> {
        let (dir, db) = create_tmp_db()?;
        assert!(dir.path().join("nekowords.db").exists());
        assert_eq!(db.card_count("en")?, 0);
        Ok(())
    }
}
