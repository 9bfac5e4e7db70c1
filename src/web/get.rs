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

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use maud::Markup;
use maud::html;

use crate::error::Fallible;
use crate::types::card::Card;
use crate::web::state::DrillSession;
use crate::web::state::ServerState;
use crate::web::template::page_template;

pub async fn get_handler(State(state): State<ServerState>) -> (StatusCode, Html<String>) {
    match render(&state) {
        Ok(body) => (StatusCode::OK, Html(page_template(body).into_string())),
        Err(e) => {
            log::error!("{e}");
            let body = html! { p.error { (e.to_string()) } };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page_template(body).into_string()),
            )
        }
    }
}

fn render(state: &ServerState) -> Fallible<Markup> {
    let session = state.drill()?;
    let body = match session.cards.first() {
        Some(due) if !session.finished => render_card(&session, &due.card),
        _ => html! {
            div.finished {
                h1 {
                    "Session Completed"
                }
                p {
                    (format!("{} reviews", session.graded.len()))
                }
            }
        },
    };
    Ok(body)
}

fn render_card(session: &DrillSession, card: &Card) -> Markup {
    let undo_disabled = session.graded.is_empty();
    let progress = format!(
        "{} / {}",
        session.total_cards.saturating_sub(session.cards.len()),
        session.total_cards
    );
    let prompt = card.examples().first().map(|e| e.sentence.as_str());
    let answer = if session.reveal {
        html! {
            div.answer {
                p.translation { (card.translation()) }
                ul.examples {
                    @for example in card.examples() {
                        li {
                            span.sentence { (example.sentence) }
                            br;
                            span.example-translation { (example.translation) }
                        }
                    }
                }
            }
        }
    } else {
        html! { div.answer {} }
    };
    let controls = if session.reveal {
        html! {
            form action="/drill" method="post" {
                @if undo_disabled {
                    input id="undo" type="submit" name="action" value="Undo" disabled;
                } @else {
                    input id="undo" type="submit" name="action" value="Undo";
                }
                div.spacer {}
                input id="again" type="submit" name="action" value="Again";
                input id="hard" type="submit" name="action" value="Hard";
                input id="good" type="submit" name="action" value="Good";
                input id="easy" type="submit" name="action" value="Easy";
                div.spacer {}
                input id="end" type="submit" name="action" value="End";
            }
        }
    } else {
        html! {
            form action="/drill" method="post" {
                @if undo_disabled {
                    input id="undo" type="submit" name="action" value="Undo" disabled;
                } @else {
                    input id="undo" type="submit" name="action" value="Undo";
                }
                div.spacer {}
                input id="reveal" type="submit" name="action" value="Reveal";
                div.spacer {}
                input id="end" type="submit" name="action" value="End";
            }
        }
    };
    html! {
        div.root {
            div.card {
                div.header {
                    h1 {
                        (card.word())
                    }
                    div.progress {
                        (progress)
                    }
                }
                div.content {
                    div.question {
                        @if let Some(sentence) = prompt {
                            p.example { (sentence) }
                        }
                    }
                    (answer)
                }
                div.controls {
                    (controls)
                }
            }
        }
    }
}
