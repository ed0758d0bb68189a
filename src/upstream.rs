//! Provider seam.
//!
//! Everything that depends on the provider's wire contract (URL layout, API
//! version, credential placement, how the system instruction is carried) sits
//! behind [`GenerativeProvider`]. The relay flow in `crate::relay` only sees
//! catalog descriptors and typed generate requests/responses.

use std::collections::HashSet;

use async_trait::async_trait;
use http::StatusCode;

use crate::error::RelayError;
use crate::models::gemini::{
    GenerateContentRequest, GenerateContentResponse, ModelDescriptor, ModelList,
};
use crate::system_prompt_config::SystemInstructionMode;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1";

/// Upper bound on `GET models` pages fetched for one catalog lookup.
pub const MAX_CATALOG_PAGES: usize = 20;

#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// How this provider expects the system instruction.
    fn system_mode(&self) -> SystemInstructionMode;

    /// Full model catalog in listing order.
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, RelayError>;

    /// One generation call. Non-2xx statuses come back as [`RelayError::Upstream`]
    /// with the raw body.
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        payload: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RelayError>;
}

/// Gemini REST client (`generativelanguage.googleapis.com`).
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    system_mode: SystemInstructionMode,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        system_mode: Option<SystemInstructionMode>,
    ) -> Self {
        let api_version = api_version.into();
        let system_mode =
            system_mode.unwrap_or_else(|| SystemInstructionMode::for_api_version(&api_version));
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version,
            system_mode,
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn models_url(&self) -> String {
        format!("{}/{}/models", self.base_url, self.api_version)
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, self.api_version, model
        )
    }
}

#[async_trait]
impl GenerativeProvider for GeminiClient {
    fn system_mode(&self) -> SystemInstructionMode {
        self.system_mode
    }

    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelDescriptor>, RelayError> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();

        for page_no in 1..=MAX_CATALOG_PAGES {
            let mut query: Vec<(&str, &str)> = vec![("key", api_key)];
            if let Some(tok) = page_token.as_deref() {
                query.push(("pageToken", tok));
            }
            let resp = self.http.get(self.models_url()).query(&query).send().await?;
            let status = resp.status();
            let raw = resp.text().await?;
            if !status.is_success() {
                tracing::warn!(status = %status, "model catalog listing failed");
                return Err(upstream_error(status, raw));
            }

            let page: ModelList = serde_json::from_str(&raw)
                .map_err(|e| RelayError::Internal(format!("invalid model list: {e}")))?;
            out.extend(page.models.into_iter().map(ModelDescriptor::from));

            let Some(next) = page.next_page_token.filter(|t| !t.is_empty()) else {
                tracing::debug!(count = out.len(), pages = page_no, "model catalog fetched");
                return Ok(out);
            };
            if !seen_tokens.insert(next.clone()) {
                tracing::warn!(token = %next, "model catalog repeated a page token");
                return Err(RelayError::Internal(format!(
                    "model catalog paging repeated token {next:?}"
                )));
            }
            page_token = Some(next);
        }

        tracing::warn!(pages = MAX_CATALOG_PAGES, "model catalog paging did not terminate");
        Err(RelayError::Internal(format!(
            "model catalog exceeded {MAX_CATALOG_PAGES} pages"
        )))
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        payload: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RelayError> {
        let resp = self
            .http
            .post(self.generate_url(model))
            .query(&[("key", api_key)])
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            return Err(upstream_error(status, raw));
        }

        serde_json::from_str(&raw).map_err(|e| RelayError::Internal(e.to_string()))
    }
}

fn upstream_error(status: StatusCode, body: String) -> RelayError {
    RelayError::Upstream { status, body }
}
