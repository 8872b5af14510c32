//! Extractor configuration.
//!
//! Everything the Gemini client needs is collected here once, from the
//! process environment, and handed to [`crate::extract::GeminiExtractor`]
//! at construction. Nothing else in the crate reads the environment for
//! these values.

use std::time::Duration;

/// Primary environment variable holding the API key.
pub(crate) const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Fallback API key variable.
pub(crate) const API_KEY_FALLBACK_VAR: &str = "API_KEY";
pub(crate) const MODEL_VAR: &str = "PDFJORNADA_MODEL";
pub(crate) const ENDPOINT_VAR: &str = "PDFJORNADA_ENDPOINT";
pub(crate) const TIMEOUT_VAR: &str = "PDFJORNADA_TIMEOUT_SECS";

pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub(crate) const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for the remote structured-extraction service.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct ExtractorConfig {
    /// API key. `None` makes every extraction fail with a configuration error.
    pub(crate) api_key: Option<String>,
    /// Model name, e.g. `gemini-2.5-flash`.
    pub(crate) model: String,
    /// Base URL of the Generative Language API, without trailing slash.
    pub(crate) endpoint: String,
    /// HTTP client timeout for the single extraction request.
    pub(crate) timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Keep the key out of debug logs.
impl std::fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ExtractorConfig {
    /// Build the configuration from the process environment.
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset. An unparsable timeout falls back to the
    /// default.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let timeout = get(TIMEOUT_VAR)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(defaults.timeout, Duration::from_secs);

        Self {
            api_key: get(API_KEY_VAR).or_else(|| get(API_KEY_FALLBACK_VAR)),
            model: get(MODEL_VAR).unwrap_or(defaults.model),
            endpoint: get(ENDPOINT_VAR)
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or(defaults.endpoint),
            timeout,
        }
    }

    /// URL of the `generateContent` method for the configured model.
    pub(crate) fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}
