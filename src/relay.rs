use std::sync::Arc;

use crate::conversion::{build_generate_request, extract_reply, Instruction};
use crate::error::RelayError;
use crate::models::chat::{ChatReply, ChatRequest};
use crate::selection::{select_model, ModelCache};
use crate::system_prompt_config::SystemPromptConfig;
use crate::upstream::GenerativeProvider;

/// One chat invocation end to end: credential check, model resolution,
/// payload construction, a single upstream call, reply extraction.
///
/// The selection cache lives here rather than in a global so it can be shared
/// through `AppState` and exercised directly in tests.
pub struct Relay {
    provider: Arc<dyn GenerativeProvider>,
    api_key: Option<String>,
    preferred_model: Option<String>,
    prompt: SystemPromptConfig,
    cache: ModelCache,
}

impl Relay {
    pub fn new(
        provider: Arc<dyn GenerativeProvider>,
        api_key: Option<String>,
        preferred_model: Option<String>,
        prompt: SystemPromptConfig,
    ) -> Self {
        Self {
            provider,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            preferred_model: preferred_model.filter(|m| !m.trim().is_empty()),
            prompt,
            cache: ModelCache::new(),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn preferred_model(&self) -> Option<&str> {
        self.preferred_model.as_deref()
    }

    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatReply, RelayError> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;
        let model = self.resolve_model(api_key).await?;

        let instruction = Instruction {
            prompt: self.prompt.get_prompt(),
            acknowledgement: self.prompt.acknowledgement(),
            mode: self
                .prompt
                .injection_mode
                .unwrap_or_else(|| self.provider.system_mode()),
        };
        let payload = build_generate_request(req, instruction);

        tracing::debug!(
            model = %model,
            turns = payload.contents.len(),
            history = req.history.len(),
            "sending generateContent"
        );

        match self.provider.generate(api_key, &model, &payload).await {
            Ok(resp) => Ok(ChatReply {
                reply: extract_reply(&resp),
                model_used: Some(model),
            }),
            Err(err) => {
                if err.is_not_found() && self.cache.invalidate(&model) {
                    tracing::warn!(model = %model, "model not found upstream; selection cache cleared");
                }
                Err(err)
            }
        }
    }

    /// Cached selection if present, else catalog lookup + selection policy.
    pub async fn resolve_model(&self, api_key: &str) -> Result<String, RelayError> {
        if let Some(model) = self.cache.get() {
            tracing::debug!(model = %model, "model selection cache hit");
            return Ok(model);
        }

        let catalog = self.provider.list_models(api_key).await?;
        let model = select_model(&catalog, self.preferred_model.as_deref())
            .ok_or(RelayError::NoUsableModel)?;

        if let Some(preferred) = self.preferred_model.as_deref() {
            if crate::models::gemini::strip_models_prefix(preferred.trim()) != model {
                tracing::warn!(
                    preferred = %preferred,
                    selected = %model,
                    "preferred model unavailable; using fallback ranking"
                );
            }
        }
        tracing::info!(model = %model, catalog = catalog.len(), "model selected");

        self.cache.set(model.clone());
        Ok(model)
    }
}
