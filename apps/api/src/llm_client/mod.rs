/// AI client: the single point of entry for all Gemini API calls.
///
/// Every request carries an instruction plus one inline file and asks the model
/// for JSON constrained by a response schema. No retries happen here; pacing
/// and backoff belong to the caller.
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const API_KEY_HEADER: &str = "x-goog-api-key";
/// Provider status string for quota exhaustion.
const QUOTA_STATUS: &str = "RESOURCE_EXHAUSTED";

/// Failure classes of an AI call. Callers switch on the variant instead of
/// inspecting message text.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Gemini API key is missing. Set GEMINI_API_KEY in the environment.")]
    MissingCredential,

    #[error("AI provider quota exceeded: {message}")]
    RateLimited { message: String },

    #[error("AI request failed: {detail}")]
    Transient { detail: String },

    #[error("AI returned an invalid response: {detail}")]
    InvalidResponse { detail: String },
}

impl AiError {
    /// True when the provider has throttled the caller for exceeding its quota.
    pub fn is_quota(&self) -> bool {
        matches!(self, AiError::RateLimited { .. })
    }
}

/// Base64 payload submitted next to the instruction text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: &'a InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Extracts the first text part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Gemini `generateContent` client shared by every AI-touching operation.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: String, api_base: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fails fast when no credential was configured.
    pub fn ensure_configured(&self) -> Result<&str, AiError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AiError::MissingCredential)
    }

    /// Makes a raw call, returning the full response object.
    pub async fn generate(
        &self,
        instruction: &str,
        file: &InlineData,
        schema: &Value,
    ) -> Result<GenerateContentResponse, AiError> {
        let api_key = self.ensure_configured()?;

        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::Text { text: instruction },
                    RequestPart::Inline { inline_data: file },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AiError::Transient {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        let body: GenerateContentResponse =
            response.json().await.map_err(|e| AiError::InvalidResponse {
                detail: e.to_string(),
            })?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(body)
    }

    /// Calls the model and deserializes its text response as JSON.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        instruction: &str,
        file: &InlineData,
        schema: &Value,
    ) -> Result<T, AiError> {
        let response = self.generate(instruction, file, schema).await?;

        let text = response.text().ok_or_else(|| AiError::InvalidResponse {
            detail: "model returned no text content".to_string(),
        })?;

        parse_model_json(text)
    }
}

/// Parses model output as JSON after removing any code fences it added.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let cleaned = strip_json_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| AiError::InvalidResponse {
        detail: e.to_string(),
    })
}

/// Maps a non-success HTTP status and body onto the error taxonomy.
fn classify_failure(status: u16, body: &str) -> AiError {
    let parsed = serde_json::from_str::<GeminiError>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let quota = parsed
        .as_ref()
        .is_some_and(|e| e.error.status == QUOTA_STATUS);

    if status == 429 || quota {
        AiError::RateLimited { message }
    } else {
        AiError::Transient {
            detail: format!("status {status}: {message}"),
        }
    }
}

/// Removes every ```json / ``` marker from model output.
fn strip_json_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
