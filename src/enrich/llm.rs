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

//! An OpenAI-compatible chat completions client, talking either to OpenAI
//! proper or to an Azure OpenAI deployment.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::config::LlmConfig;
use crate::config::LlmProvider;
use crate::enrich::Enrich;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::card::CardContent;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct LlmClient {
    http: reqwest::Client,
    url: String,
    auth: Auth,
    model: String,
    provider: LlmProvider,
}

enum Auth {
    Bearer(String),
    ApiKey(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Fallible<Self> {
        let (url, auth, model) = match config.provider {
            LlmProvider::OpenAi => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    ErrorReport::new(
                        "OpenAI requires an API key (llm.api_key or NEKO_OPENAI_API_KEY).",
                    )
                })?;
                let base_url = config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
                let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
                (url, Auth::Bearer(api_key), config.model.clone())
            }
            LlmProvider::Azure => {
                let (Some(api_key), Some(endpoint)) =
                    (config.azure_api_key.clone(), config.azure_endpoint.as_deref())
                else {
                    return Err(ErrorReport::new(
                        "Azure OpenAI requires llm.azure_api_key and llm.azure_endpoint.",
                    ));
                };
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    azure_base(endpoint),
                    config.azure_deployment,
                    config.azure_api_version
                );
                (url, Auth::ApiKey(api_key), config.azure_deployment.clone())
            }
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url,
            auth,
            model,
            provider: config.provider,
        })
    }

    async fn complete(&self, prompt: String) -> Fallible<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let request = self.http.post(&self.url).json(&body);
        let request = match &self.auth {
            Auth::Bearer(key) => request.bearer_auth(key),
            Auth::ApiKey(key) => request.header("api-key", key),
        };
        let response = request
            .send()
            .await
            .map_err(|e| ErrorReport::enrichment(format!("request to provider failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ErrorReport::enrichment(format!(
                "provider returned {status}: {text}"
            )));
        }
        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ErrorReport::enrichment(format!("malformed provider response: {e}")))?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ErrorReport::enrichment("empty response from provider"))
    }
}

impl Enrich for LlmClient {
    async fn enrich(&self, word: &str, language: &str) -> Fallible<CardContent> {
        log::info!(
            "Enriching word: {word} ({language}) | Provider: {:?} | Model: {}",
            self.provider,
            self.model
        );
        let content = self.complete(prompt(word, language)).await?;
        log::debug!("Raw provider response for {word}: {content}");
        parse_content(&content)
    }
}

/// Azure endpoints are sometimes copied with the API path attached.
fn azure_base(endpoint: &str) -> &str {
    let endpoint = endpoint.trim_end_matches('/');
    for suffix in ["/openai/v1", "/openai"] {
        if let Some(stripped) = endpoint.strip_suffix(suffix) {
            return stripped;
        }
    }
    endpoint
}

pub fn prompt(word: &str, language: &str) -> String {
    format!(
        r#"You are a vocabulary assistant. Analyze the {language} word "{word}".

Rules for word forms:
- If the input is a conjugated verb or plural noun, set "word" to the base form (lemma).
- For IRREGULAR forms only, append the conjugation pattern after the translation, e.g. "(write-wrote-written)" or "(child-children)".
- For REGULAR forms (-ed, -s, -ing), do not mention any rule.

Return a valid JSON object:
{{
  "word": "base form",
  "translation": "/IPA/ Chinese translation (irregular note only if applicable)",
  "examples": [
    {{"sentence": "Example in {language}", "translation": "Chinese translation"}},
    {{"sentence": "Example in {language}", "translation": "Chinese translation"}}
  ]
}}

Requirements:
- Include the IPA transcription at the start of the translation.
- Provide at least 2 examples, preferably about daily life or software engineering.
- Keep the translation concise."#
    )
}

fn parse_content(content: &str) -> Fallible<CardContent> {
    let content: CardContent = serde_json::from_str(content)
        .map_err(|e| ErrorReport::enrichment(format!("provider returned invalid card JSON: {e}")))?;
    if content.translation.trim().is_empty() {
        return Err(ErrorReport::enrichment("provider returned an empty translation"));
    }
    Ok(content)
}
