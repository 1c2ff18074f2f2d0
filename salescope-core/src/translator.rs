//! Natural-language-to-SQL translation for the Ask assistant.
//!
//! Provides a `CompletionBackend` trait over the text-generation API with a
//! Gemini implementation, and the `NlQueryTranslator` that builds the
//! instruction (schema context + literal question), invokes the backend and
//! post-processes the raw completion into a bare SQL statement.
//!
//! No retries at this layer: a failed or malformed completion is surfaced
//! as-is to the pipeline, which reports it rather than retrying.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::SchemaContext;

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// Abstraction over the text-generation capability.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one instruction through the model and return the raw text
    /// response. Exactly one attempt.
    async fn complete(&self, instruction: &str) -> Result<String, TranslationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Translation failures — generation call failed or returned unusable text.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned an empty completion")]
    EmptyCompletion,

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

/// Gemini completion client configuration
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
}

impl CompletionConfig {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .unwrap_or_default();

        Self { api_key, model }
    }
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneratePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationParams {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

#[derive(Debug, Deserialize)]
struct GenerateCandidate {
    content: Option<GenerateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiCompletionClient
// ============================================================================

/// Gemini completion client — calls the `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiCompletionClient {
    client: Client,
    config: CompletionConfig,
    base_url: String,
}

impl GeminiCompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, TranslationError> {
        if config.api_key.is_empty() {
            return Err(TranslationError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: CompletionConfig,
        base_url: String,
    ) -> Result<Self, TranslationError> {
        if config.api_key.is_empty() {
            return Err(TranslationError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn complete_once(&self, instruction: &str) -> Result<String, TranslationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: instruction.to_string(),
                }],
            }],
            // Deterministic output: query generation is not a creative task
            generation_config: GenerationParams { temperature: 0.0 },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(TranslationError::Api { code, message });
        }

        let generate_response: GenerateResponse = response.json().await?;

        let text = generate_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(TranslationError::EmptyCompletion)?;

        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for GeminiCompletionClient {
    async fn complete(&self, instruction: &str) -> Result<String, TranslationError> {
        self.complete_once(instruction).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// NlQueryTranslator
// ============================================================================

/// Turns a natural-language question plus the schema context into a single
/// candidate SQL statement.
pub struct NlQueryTranslator {
    backend: Arc<dyn CompletionBackend>,
    schema: SchemaContext,
}

impl NlQueryTranslator {
    pub fn new(backend: Arc<dyn CompletionBackend>, schema: SchemaContext) -> Self {
        Self { backend, schema }
    }

    fn build_instruction(&self, question: &str) -> String {
        format!(
            "You are a SQL expert. Given this question about sales data, \
             generate a PostgreSQL query.\n\n{}\n\n\
             Return ONLY the SQL query, no explanation.\n\n\
             Question: {}",
            self.schema.prompt_block(),
            question
        )
    }

    /// Translate a question into one candidate SQL statement. The question
    /// must be non-empty after trimming (the pipeline enforces this before
    /// calling). The statement may still be syntactically or semantically
    /// wrong — the executor is the judge.
    pub async fn translate(&self, question: &str) -> Result<String, TranslationError> {
        let instruction = self.build_instruction(question);

        tracing::debug!(backend = self.backend.name(), "Requesting query generation");
        let raw = self.backend.complete(&instruction).await?;

        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            return Err(TranslationError::EmptyCompletion);
        }

        Ok(sql)
    }
}

/// Strip surrounding code-fence markers and whitespace from a completion.
/// Generated text commonly wraps the query in ```sql fences; stripping is
/// idempotent on already-bare input.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // The opening fence may carry a language tag; drop through end of line,
        // or just the tag when the whole completion is a single line.
        text = match rest.split_once('\n') {
            Some((_, body)) => body,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }

    text = text.trim_end();
    if let Some(body) = text.strip_suffix("```") {
        text = body.trim_end();
    }

    text.trim().to_string()
}

// ============================================================================
// Tests
// ============================================================================
