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

//! The JSON API under `/api/v1`.

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::ErrorKind;
use crate::error::ErrorReport;
use crate::types::card::Card;
use crate::types::card::DueCard;
use crate::types::card_id::CardId;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;
use crate::web::state::ServerState;

impl IntoResponse for ErrorReport {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::NoHistory | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Enrichment | ErrorKind::InvariantViolation | ErrorKind::Other => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            log::error!("{self}");
        }
        (status, Json(json!({ "detail": self.message() }))).into_response()
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the nekowords API",
        "api": "/api/v1",
        "drill": "/drill",
    }))
}

#[derive(Deserialize)]
pub struct WordInput {
    word: String,
    language: Option<String>,
}

pub async fn add_word(
    State(state): State<ServerState>,
    Json(input): Json<WordInput>,
) -> Result<Json<Card>, ErrorReport> {
    let Some(llm) = state.llm.as_deref() else {
        return Err(ErrorReport::new("no content provider is configured."));
    };
    let language = input.language.as_deref().unwrap_or(&state.language);
    let added = state
        .collection
        .add_word(llm, &state.retry, &input.word, language, Timestamp::now())
        .await?;
    Ok(Json(added.card))
}

pub async fn get_word(
    State(state): State<ServerState>,
    Path(card_id): Path<String>,
) -> Result<Json<Card>, ErrorReport> {
    let card_id = CardId::from_hex(&card_id)?;
    Ok(Json(state.collection.card(card_id)?))
}

#[derive(Deserialize)]
pub struct DueQuery {
    limit: Option<usize>,
    language: Option<String>,
}

pub async fn due(
    State(state): State<ServerState>,
    Query(query): Query<DueQuery>,
) -> Result<Json<Vec<DueCard>>, ErrorReport> {
    let language = query.language.as_deref().unwrap_or(&state.language);
    let limit = query.limit.unwrap_or(state.limit);
    let due = state.collection.due(language, limit, Timestamp::now())?;
    Ok(Json(due))
}

#[derive(Deserialize)]
pub struct ReviewLog {
    grade: Grade,
}

#[derive(Serialize)]
pub struct LogResponse {
    status: &'static str,
    next_review: Timestamp,
}

pub async fn log_review(
    State(state): State<ServerState>,
    Path(card_id): Path<String>,
    Json(log): Json<ReviewLog>,
) -> Result<Json<LogResponse>, ErrorReport> {
    let card_id = CardId::from_hex(&card_id)?;
    let outcome = state
        .collection
        .grade(card_id, log.grade, Timestamp::now())?;
    Ok(Json(LogResponse {
        status: "ok",
        next_review: outcome.next_review_at,
    }))
}

#[derive(Serialize)]
pub struct UndoResponse {
    status: &'static str,
    undone_grade: Grade,
}

pub async fn undo_review(
    State(state): State<ServerState>,
    Path(card_id): Path<String>,
) -> Result<Json<UndoResponse>, ErrorReport> {
    let card_id = CardId::from_hex(&card_id)?;
    let outcome = state.collection.undo(card_id, Timestamp::now())?;
    Ok(Json(UndoResponse {
        status: "ok",
        undone_grade: outcome.undone_grade,
    }))
}
