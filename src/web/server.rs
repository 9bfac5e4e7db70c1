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

use std::time::Duration;

use axum::Router;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use axum::routing::get;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::time::sleep;

use crate::collection::Collection;
use crate::config::Config;
use crate::enrich::llm::LlmClient;
use crate::enrich::retry::RetryPolicy;
use crate::error::Fallible;
use crate::types::timestamp::Timestamp;
use crate::web::api;
use crate::web::get::get_handler;
use crate::web::post::post_handler;
use crate::web::state::ServerState;

pub async fn start_server(
    config: &Config,
    language: String,
    limit: usize,
    open_browser: bool,
) -> Fallible<()> {
    let collection = Collection::open(&config.database)?;
    let llm = match LlmClient::new(&config.llm) {
        Ok(client) => Some(client),
        Err(e) => {
            log::warn!("Adding words is disabled: {e}");
            None
        }
    };
    let retry = RetryPolicy::from_config(&config.retry);
    let state = ServerState::new(collection, llm, retry, language, limit, Timestamp::now())?;
    let app = router(state);
    let bind = config.bind.clone();

    if open_browser {
        // Start a separate task to open the browser.
        let url = format!("http://{bind}/drill");
        let target = bind.clone();
        tokio::spawn(async move {
            loop {
                if let Ok(stream) = TcpStream::connect(&target).await {
                    drop(stream);
                    break;
                }
                sleep(Duration::from_millis(1)).await;
            }
            let _ = open::that(url);
        });
    }

    log::info!("Starting server on {bind}");
    let listener = TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped.");
    Ok(())
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/api/v1/words", post(api::add_word))
        .route("/api/v1/words/{card_id}", get(api::get_word))
        .route("/api/v1/reviews/due", get(api::due))
        .route("/api/v1/reviews/{card_id}/log", post(api::log_review))
        .route("/api/v1/reviews/{card_id}/undo", post(api::undo_review))
        .route("/drill", get(get_handler))
        .route("/drill", post(post_handler))
        .route("/style.css", get(stylesheet))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

async fn stylesheet() -> (StatusCode, [(HeaderName, &'static str); 2], &'static [u8]) {
    let bytes = include_bytes!("style.css");
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/css"),
            (CACHE_CONTROL, "public, max-age=604800, immutable"),
        ],
        bytes,
    )
}

async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html("Not Found".to_string()))
}
