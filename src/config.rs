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

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

/// The file looked up in the working directory when no `--config` is given.
const DEFAULT_CONFIG_FILE: &str = "nekowords.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database.
    pub database: String,
    /// Address the HTTP server listens on.
    pub bind: String,
    /// Language tag used when a command does not specify one.
    pub language: String,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Azure,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    /// OpenAI only. Defaults to the public API.
    pub base_url: Option<String>,
    /// OpenAI only.
    pub model: String,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub azure_deployment: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "nekowords.db".to_string(),
            bind: "127.0.0.1:8002".to_string(),
            language: "en".to_string(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            azure_api_key: None,
            azure_endpoint: None,
            azure_api_version: "2024-02-15-preview".to_string(),
            azure_deployment: "gpt-4o".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Load the configuration from `path`, or from `nekowords.toml` in the
    /// working directory, or fall back to the defaults. Environment
    /// variables are applied on top.
    pub fn load(path: Option<PathBuf>) -> Fallible<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return fail(format!("config file {} does not exist.", path.display()));
                }
                Self::from_file(&path)?
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults.");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Fallible<Self> {
        log::debug!("Loading configuration from {}", path.display());
        let content = read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Fallible<Self> {
        let config: Self = toml::from_str(content)?;
        if config.retry.max_attempts == 0 {
            return Err(ErrorReport::new("retry.max_attempts must be at least 1."));
        }
        Ok(config)
    }

    /// Override settings from `NEKO_*` variables, looked up with `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("NEKO_DATABASE") {
            self.database = value;
        }
        if let Some(value) = lookup("NEKO_LLM_PROVIDER") {
            match value.as_str() {
                "openai" => self.llm.provider = LlmProvider::OpenAi,
                "azure" => self.llm.provider = LlmProvider::Azure,
                other => log::warn!("Ignoring unknown NEKO_LLM_PROVIDER '{other}'."),
            }
        }
        if let Some(value) = lookup("NEKO_OPENAI_API_KEY") {
            self.llm.api_key = Some(value);
        }
        if let Some(value) = lookup("NEKO_OPENAI_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = lookup("NEKO_OPENAI_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = lookup("NEKO_AZURE_OPENAI_API_KEY") {
            self.llm.azure_api_key = Some(value);
        }
        if let Some(value) = lookup("NEKO_AZURE_OPENAI_ENDPOINT") {
            self.llm.azure_endpoint = Some(value);
        }
    }
}
