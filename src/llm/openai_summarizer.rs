//! Session summary generation through an OpenAI-compatible chat completion API.
//!
//! The raw notes are substituted into a fixed clinical documentation prompt,
//! sent as the only (system) message, and the first choice is returned as is.
//! No retries and no post-processing of the model output: a `null` content
//! comes back as `None`.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::LlmConfig;

/// Instruction template; the notes are appended after the final line.
const SESSION_SUMMARY_PROMPT: &str = "You are a professional clinical psychologist. Given the following unstructured notes about the session, generate a plain text session summary.
Rules:
- DO NOT use markdown formatting.
- Use objective and measurable language: Focus on observable behaviors, avoiding subjective descriptions.
- Document specific behaviors: Describe actions, verbalizations, or physical movements in detail.
- Include clear behavior targets: Define specific goals and measurable targets for improvement.
- Use the SOAP format: Structure notes with Subjective, Objective, Assessment, and Plan sections.
- Provide recommendations: Suggest strategies or goals for the next session to promote progress.
- Prioritize data collection: Include accurate data on client performance to track the effectiveness of interventions.
- Be clear and concise: Keep notes focused, clear, and free from unnecessary information.


Session notes:
";

/// Boxed future type for generation calls.
pub type GenerateFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors produced by the summary generator.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP client error (connect, timeout, body decoding).
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("completion api returned status {status}: {body}")]
    HttpStatusNotOk {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The response had no usable completion.
    #[error("completion response malformed: {0}")]
    MalformedResponse(String),
    /// No credential configured.
    #[error("completion api key is not configured (set OPENAI_API_KEY)")]
    MissingApiKey,
}

/// Convenience result alias for generation calls.
pub type LlmResult<T> = Result<T, LlmError>;

/// Something that turns raw session notes into a summary.
pub trait SummaryGenerator: Send + Sync {
    /// Generate a summary for the given notes.
    ///
    /// # Errors
    /// Returns an error if the backing service fails.
    fn generate(&self, notes: &str) -> GenerateFuture<'_, LlmResult<Option<String>>>;
}

/// Build the full instruction for a set of notes.
#[must_use]
pub fn build_session_summary_prompt(notes: &str) -> String {
    format!("{SESSION_SUMMARY_PROMPT}{notes}")
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
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

impl ChatCompletionResponse {
    fn into_first_content(self) -> LlmResult<Option<String>> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no choices returned".to_string()))
    }
}

/// Chat completion client producing SOAP-format session summaries.
pub struct OpenAiSessionSummarizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiSessionSummarizer {
    /// Create a summarizer from the generation settings.
    ///
    /// A missing API key is not an error here; generation calls fail instead.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Model used for completions.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: String) -> LlmResult<Option<String>> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "system",
                content: &prompt,
            }],
        };

        debug!(
            "Requesting session summary from {} ({} prompt chars)",
            self.model,
            prompt.len()
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                debug!("Failed to read error body (status {status}): {e}");
                format!("<unreadable body: {e}>")
            });
            return Err(LlmError::HttpStatusNotOk {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatCompletionResponse>()
            .await?
            .into_first_content()
    }
}

impl SummaryGenerator for OpenAiSessionSummarizer {
    fn generate(&self, notes: &str) -> GenerateFuture<'_, LlmResult<Option<String>>> {
        let prompt = build_session_summary_prompt(notes);
        Box::pin(self.complete(prompt))
    }
}
