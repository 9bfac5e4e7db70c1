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

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::ErrorKind;
use crate::error::Fallible;

/// Retry transient enrichment failures a fixed number of times, waiting a
/// fixed delay between attempts.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. Returns the last error in the latter cases.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Fallible<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Fallible<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == ErrorKind::Enrichment && attempt < self.max_attempts => {
                    log::warn!(
                        "Attempt {attempt}/{} failed: {e}. Retrying in {}ms.",
                        self.max_attempts,
                        self.delay.as_millis()
                    );
                    sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.kind() == ErrorKind::Enrichment {
                        log::error!("Giving up after {attempt} attempts: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}
