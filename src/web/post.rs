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

use axum::Form;
use axum::extract::State;
use axum::response::Redirect;
use serde::Deserialize;

use crate::error::Fallible;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;
use crate::web::state::GradedCard;
use crate::web::state::ServerState;

#[derive(Debug, Deserialize)]
enum Action {
    Reveal,
    Undo,
    End,
    Again,
    Hard,
    Good,
    Easy,
}

impl Action {
    fn grade(&self) -> Option<Grade> {
        match self {
            Action::Again => Some(Grade::Again),
            Action::Hard => Some(Grade::Hard),
            Action::Good => Some(Grade::Good),
            Action::Easy => Some(Grade::Easy),
            Action::Reveal | Action::Undo | Action::End => None,
        }
    }
}

#[derive(Deserialize)]
pub struct FormData {
    action: Action,
}

pub async fn post_handler(
    State(state): State<ServerState>,
    Form(form): Form<FormData>,
) -> Redirect {
    match action_handler(&state, form.action) {
        Ok(_) => {}
        Err(e) => {
            log::error!("{e}");
        }
    }
    Redirect::to("/drill")
}

fn action_handler(state: &ServerState, action: Action) -> Fallible<()> {
    let mut session = state.drill()?;
    let now = Timestamp::now();
    match action {
        Action::Reveal => {
            if !session.finished && !session.cards.is_empty() {
                session.reveal = true;
            }
        }
        Action::Undo => {
            if let Some(last) = session.graded.last() {
                let card_id = last.card.card.id();
                let lapsed = last.grade.is_lapse();
                state.collection.undo(card_id, now)?;
                if let Some(last) = session.graded.pop() {
                    if lapsed {
                        // Take the requeued copy off the back of the queue.
                        let requeued = session.cards.iter().rposition(|c| c.card.id() == card_id);
                        if let Some(i) = requeued {
                            session.cards.remove(i);
                        }
                    }
                    session.cards.insert(0, last.card);
                }
                session.finished = false;
                session.reveal = false;
            }
        }
        Action::End => {
            log::debug!("Session ended after {} reviews", session.graded.len());
            session.finished = true;
        }
        Action::Again | Action::Hard | Action::Good | Action::Easy => {
            let Some(grade) = action.grade() else {
                return Ok(());
            };
            if session.reveal && !session.finished && !session.cards.is_empty() {
                let card_id = session.cards[0].card.id();
                state.collection.grade(card_id, grade, now)?;
                let card = session.cards.remove(0);
                // Lapsed cards are seen again at the end of the session.
                if grade.is_lapse() {
                    session.cards.push(card.clone());
                }
                session.graded.push(GradedCard { card, grade });
                session.reveal = false;
                if session.cards.is_empty() {
                    log::debug!("Session completed");
                    session.finished = true;
                }
            }
        }
    }
    Ok(())
}
