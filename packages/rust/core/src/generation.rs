//! Text-generation backend.
//!
//! The pipeline talks to a [`TextGenerator`]; [`ChatCompletionsClient`] is the
//! production implementation for OpenAI-compatible chat-completions APIs
//! (OpenRouter by default).

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use quizcards_shared::{GenerationConfig, QuizcardsError, Result};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("quizcards/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body echoed back in a generation error.
const ERROR_BODY_PREVIEW: usize = 200;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Turns a prompt into a reply.
pub trait TextGenerator: Send + Sync {
    /// Send `request` to the backend and return the reply text.
    ///
    /// `model` overrides the backend's default model.
    fn generate(
        &self,
        request: &str,
        model: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    default_model: String,
}

impl ChatCompletionsClient {
    /// Build a client, reading the API key from the configured env var.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Self::with_api_key(config, config.api_key()?)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                QuizcardsError::Generation(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: config.chat_completions_url()?,
            api_key: api_key.into(),
            default_model: config.default_model.clone(),
        })
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

impl TextGenerator for ChatCompletionsClient {
    #[instrument(skip_all, fields(model = model.unwrap_or(&self.default_model), prompt_len = request.len()))]
    async fn generate(&self, request: &str, model: Option<&str>) -> Result<String> {
        let model = model.unwrap_or(&self.default_model);
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: request,
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| QuizcardsError::Generation(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            QuizcardsError::Generation(format!("{}: failed to read body: {e}", self.endpoint))
        })?;

        if !status.is_success() {
            return Err(QuizcardsError::Generation(format!(
                "HTTP {status}: {}",
                preview(&text)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            QuizcardsError::Generation(format!("invalid response: {e} (got: {})", preview(&text)))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| QuizcardsError::Generation("response contained no choices".into()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(QuizcardsError::Generation(format!("model refused: {refusal}")));
        }

        let content = choice.message.content.unwrap_or_default();
        debug!(
            reply_len = content.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "generation complete"
        );
        Ok(content)
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Generator answering from a closure and recording every request.
    pub(crate) struct ScriptedGenerator<F> {
        respond: F,
        pub(crate) calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl<F> ScriptedGenerator<F>
    where
        F: Fn(&str) -> Result<String> + Send + Sync,
    {
        pub(crate) fn new(respond: F) -> Self {
            Self {
                respond,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Number of recorded requests containing `needle`.
        pub(crate) fn calls_containing(&self, needle: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(request, _)| request.contains(needle))
                .count()
        }
    }

    impl<F> TextGenerator for ScriptedGenerator<F>
    where
        F: Fn(&str) -> Result<String> + Send + Sync,
    {
        async fn generate(&self, request: &str, model: Option<&str>) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((request.to_string(), model.map(str::to_string)));
            (self.respond)(request)
        }
    }
}
