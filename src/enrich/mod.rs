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

//! Looking up the translation and examples for a new word.

pub mod llm;
pub mod retry;

use std::future::Future;

use crate::error::Fallible;
use crate::types::card::CardContent;

/// A source of card content. Failures are reported as
/// [`crate::error::ErrorKind::Enrichment`] so that callers can retry them.
pub trait Enrich {
    fn enrich(
        &self,
        word: &str,
        language: &str,
    ) -> impl Future<Output = Fallible<CardContent>> + Send;
}
