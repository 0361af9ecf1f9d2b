//! Gemini `generateContent` client.
//!
//! Speaks the REST API directly over `reqwest`: one POST per call, system
//! instruction and user content in the body, optional JSON-schema response
//! constraint in `generationConfig`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::backend::{Generation, GenerationRequest, PlanBackend};
use super::errors::BackendError;
use crate::plan::prompt::{REPAIR_SYSTEM_PROMPT, build_repair_prompt};

/// Connection settings for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` or empty makes every call fail with [`BackendError::MissingApiKey`].
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Total request timeout, connect included.
    pub timeout: Duration,
    /// Output budget for repair calls.
    pub repair_max_output_tokens: u32,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_REPAIR_MAX_OUTPUT_TOKENS: u32 = 4096;
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::DEFAULT_MODEL.to_owned(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            timeout: Self::DEFAULT_TIMEOUT,
            repair_max_output_tokens: Self::DEFAULT_REPAIR_MAX_OUTPUT_TOKENS,
        }
    }
}

/// [`PlanBackend`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: HttpClient,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Build the client. Does not contact the service.
    pub fn new(config: GeminiConfig) -> Result<Self, BackendError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(BackendError::MissingApiKey)
    }

    fn request_error(&self, endpoint: &str, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                elapsed: self.config.timeout,
            }
        } else {
            BackendError::Transport {
                endpoint: endpoint.to_owned(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PlanBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, BackendError> {
        let api_key = self.api_key()?;
        let url = self.endpoint();

        let body = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_prompt,
                }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json"),
                response_json_schema: request.response_schema.as_ref(),
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: api_error_message(&body_text).unwrap_or(body_text),
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| self.request_error(&url, e))?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body_text).map_err(|e| BackendError::Api {
                message: format!("undecodable response body: {e}"),
            })?;

        if let Some(error) = parsed.error {
            return Err(BackendError::Api {
                message: error.message,
            });
        }

        let tokens_used = parsed
            .usage_metadata
            .and_then(|u| u.total_token_count)
            .unwrap_or(0);
        let candidate = parsed.candidates.into_iter().next();
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
        let text: String = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        // Empty text is a content failure, not an upstream one: it goes on to
        // the parser and its single repair.
        if text.trim().is_empty() {
            warn!(
                model = %self.config.model,
                finish_reason = finish_reason.as_deref().unwrap_or("none"),
                "model returned no candidate text"
            );
        }

        debug!(model = %self.config.model, tokens_used, chars = text.len(), "generation complete");
        Ok(Generation { text, tokens_used })
    }

    async fn repair(&self, malformed: &str, schema: &Value) -> Result<String, BackendError> {
        let request = GenerationRequest {
            system_prompt: REPAIR_SYSTEM_PROMPT.to_owned(),
            prompt: build_repair_prompt(malformed),
            response_schema: Some(schema.clone()),
            max_output_tokens: self.config.repair_max_output_tokens,
            temperature: 0.0,
        };
        Ok(self.generate(&request).await?.text)
    }
}

/// Pull `error.message` out of a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        error: ApiErrorBody,
    }
    serde_json::from_str::<Envelope>(body)
        .ok()
        .map(|e| e.error.message)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<&'a Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<i64>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
