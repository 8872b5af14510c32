//! Structured field extraction through the Gemini API.
//!
//! One extraction is one `generateContent` request: a fixed instruction
//! with the document text embedded, plus a response schema that asks for
//! an array of `{employeeName, weeklyHours}` objects. The reply is parsed
//! and filtered by [`parse_records`]; nothing partial is ever returned.

use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::model::EmployeeRecord;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Turns free-form document text into employee records.
pub(crate) trait FieldExtractor: Send + Sync {
    /// Extract every record found in `text`. Issues at most one remote call.
    async fn extract(&self, text: &str) -> Result<Vec<EmployeeRecord>>;
}

/// The instruction sent with every request, with `text` embedded.
pub(crate) fn build_prompt(text: &str) -> String {
    format!(
        "Extrae el nombre del empleado (\"Nombre de empleado\") y sus horas semanales \
         (\"jornada semanal en horas/sem\") del siguiente texto.\n\
         El texto ha sido extraído de un PDF y puede contener errores de formato.\n\
         Por favor, identifica todas las entradas de empleados.\n\
         \n\
         Texto a analizar:\n\
         ---\n\
         {text}\n\
         ---\n"
    )
}

/// JSON schema constraining the model output.
fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "employeeName": {
                    "type": "STRING",
                    "description": "The full name of the employee."
                },
                "weeklyHours": {
                    "type": "STRING",
                    "description": "The weekly work hours, including units like 'horas/sem'."
                }
            },
            "required": ["employeeName", "weeklyHours"]
        }
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

impl GenerateRequest {
    fn new(text: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: build_prompt(text),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::InvalidResponse(format!("prompt blocked: {reason}")));
        }
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("no candidates in response".into()))?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(Error::InvalidResponse(format!(
                "empty candidate (finish reason: {reason})"
            )));
        }
        Ok(text)
    }
}

/// Parse the model's JSON output into records.
///
/// The body must be a JSON array. Elements that are not objects carrying
/// both fields are dropped without error. Non-string field values are kept
/// as their JSON text, and `null` becomes an empty string.
pub(crate) fn parse_records(body: &str) -> Result<Vec<EmployeeRecord>> {
    let value: Value = serde_json::from_str(body.trim())
        .map_err(|e| Error::InvalidResponse(format!("not JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(Error::InvalidResponse("expected a JSON array".into()));
    };

    let total = items.len();
    let records: Vec<EmployeeRecord> = items.into_iter().filter_map(record_from_value).collect();
    if records.len() < total {
        debug!(dropped = total - records.len(), "dropped malformed elements");
    }
    Ok(records)
}

fn record_from_value(value: Value) -> Option<EmployeeRecord> {
    let Value::Object(mut obj) = value else {
        return None;
    };
    let name = obj.remove("employeeName")?;
    let hours = obj.remove("weeklyHours")?;
    Some(EmployeeRecord::new(field_text(name), field_text(hours)))
}

fn field_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Gemini-backed [`FieldExtractor`].
#[derive(Debug)]
pub(crate) struct GeminiExtractor {
    client: Client,
    config: ExtractorConfig,
}

impl GeminiExtractor {
    /// Create a client for the given configuration.
    ///
    /// A missing API key is not an error here; it fails each extraction
    /// instead, before any request is made.
    pub(crate) fn new(config: ExtractorConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        info!(endpoint = %config.endpoint, model = %config.model, "extractor ready");
        Ok(Self { client, config })
    }

    fn api_key_header(&self) -> Result<HeaderValue> {
        let key = self.config.api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "API key not set; export {} (or {})",
                crate::config::API_KEY_VAR,
                crate::config::API_KEY_FALLBACK_VAR
            ))
        })?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| Error::Config(format!("invalid API key format: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl FieldExtractor for GeminiExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<EmployeeRecord>> {
        let key = self.api_key_header()?;
        let url = self.config.generate_url();
        debug!(%url, chars = text.len(), "sending extraction request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&GenerateRequest::new(text))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            warn!(%status, "extraction request rejected");
            return Err(Error::Extraction(format!("HTTP {status}: {message}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::InvalidResponse(format!("unexpected response body: {e}")))?;
        let records = parse_records(&parsed.into_text()?)?;
        info!(records = records.len(), "extraction complete");
        Ok(records)
    }
}
