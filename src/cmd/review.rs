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

use std::collections::VecDeque;
use std::io::BufRead;
use std::io::Write;

use crate::collection::Collection;
use crate::config::Config;
use crate::error::Fallible;
use crate::types::card::DueCard;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

pub fn review(config: &Config, language: &str, limit: usize) -> Fallible<()> {
    let collection = Collection::open(&config.database)?;
    let stdin = std::io::stdin();
    let mut out = std::io::stdout();
    let reviewed = review_loop(&collection, language, limit, stdin.lock(), &mut out)?;
    log::debug!("Reviewed {reviewed} cards.");
    Ok(())
}

/// Drill the due cards in the terminal. Returns the number of grades that
/// were recorded and not undone.
fn review_loop<R: BufRead, W: Write>(
    collection: &Collection,
    language: &str,
    limit: usize,
    mut input: R,
    out: &mut W,
) -> Fallible<usize> {
    let mut queue: VecDeque<DueCard> = collection.due(language, limit, Timestamp::now())?.into();
    if queue.is_empty() {
        writeln!(out, "No cards due.")?;
        return Ok(0);
    }
    let total = queue.len();
    let mut graded: Vec<(DueCard, Grade)> = Vec::new();
    'cards: while let Some(due) = queue.pop_front() {
        let card = &due.card;
        let done = total.saturating_sub(queue.len() + 1);
        writeln!(out)?;
        writeln!(out, "[{done}/{total}] {}", card.word())?;
        if let Some(example) = card.examples().first() {
            writeln!(out, "    {}", example.sentence)?;
        }
        write!(out, "(Enter to reveal, q to quit) ")?;
        out.flush()?;
        match read_answer(&mut input)? {
            None => break,
            Some(answer) if answer == "q" => break,
            Some(_) => {}
        }
        writeln!(out, "{}", card.translation())?;
        for example in card.examples() {
            writeln!(out, "  - {}", example.sentence)?;
            writeln!(out, "    {}", example.translation)?;
        }
        loop {
            write!(out, "Grade (1 again, 2 hard, 3 good, 4 easy, u undo) [3]: ")?;
            out.flush()?;
            let Some(answer) = read_answer(&mut input)? else {
                break 'cards;
            };
            let grade = match answer.as_str() {
                "1" => Grade::Again,
                "2" => Grade::Hard,
                "" | "3" => Grade::Good,
                "4" => Grade::Easy,
                "q" => break 'cards,
                "u" => {
                    let Some((previous, previous_grade)) = graded.pop() else {
                        writeln!(out, "Nothing to undo.")?;
                        continue;
                    };
                    let previous_id = previous.card.id();
                    let outcome = collection.undo(previous_id, Timestamp::now())?;
                    writeln!(
                        out,
                        "Undid '{}' on {}.",
                        outcome.undone_grade.as_str(),
                        previous.card.word()
                    )?;
                    // The current card may be the requeued copy of the one being undone.
                    let current_is_copy = previous_grade.is_lapse() && card.id() == previous_id;
                    if previous_grade.is_lapse() && !current_is_copy {
                        if let Some(i) = queue.iter().rposition(|c| c.card.id() == previous_id) {
                            queue.remove(i);
                        }
                    }
                    if !current_is_copy {
                        queue.push_front(due);
                    }
                    queue.push_front(previous);
                    continue 'cards;
                }
                _ => {
                    writeln!(out, "Invalid input.")?;
                    continue;
                }
            };
            let outcome = collection.grade(card.id(), grade, Timestamp::now())?;
            writeln!(out, "Next review: {}", outcome.next_review_at)?;
            if grade.is_lapse() {
                queue.push_back(due.clone());
            }
            graded.push((due, grade));
            continue 'cards;
        }
    }
    writeln!(out)?;
    writeln!(out, "Reviewed {} cards.", graded.len())?;
    Ok(graded.len())
}

fn read_answer<R: BufRead>(input: &mut R) -> Fallible<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}
