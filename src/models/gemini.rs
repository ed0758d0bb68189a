use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::models::chat::Role;

/// Generation method a catalog entry must advertise to be usable by the relay.
pub const GENERATE_CONTENT: &str = "generateContent";

/// A single content fragment. Only text parts are produced by the relay; parts of
/// other kinds in upstream responses deserialize with `text: None`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// One conversation turn (or the system instruction, which carries no role).
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Single-part text turn with the given role.
    pub fn turn(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Roleless content, used for `systemInstruction`.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

/// Sampling parameters attached to every generation call.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

/// Body of `models/{model}:generateContent`.
///
/// `system_instruction` is only accepted by API versions with first-class
/// system-instruction support (`v1beta`); on `v1` the instruction travels as a
/// leading user/model turn pair inside `contents` instead.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default)]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

/// Candidate content as returned upstream. Only `parts` is read; `role` and
/// any other fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl CandidateContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Successful `generateContent` response (subset).
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Raw catalog entry as returned by `GET models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModel {
    /// Fully-qualified name, e.g. "models/gemini-1.5-flash".
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

/// `GET models` response page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<CatalogModel>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Catalog entry reduced to what model selection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Short name without the "models/" prefix; this is what goes into the URL.
    pub name: String,
    pub display_name: Option<String>,
    pub supports_generation: bool,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, supports_generation: bool) -> Self {
        Self {
            name: strip_models_prefix(&name.into()).to_string(),
            display_name: None,
            supports_generation,
        }
    }
}

impl From<CatalogModel> for ModelDescriptor {
    fn from(m: CatalogModel) -> Self {
        let supports_generation = m
            .supported_generation_methods
            .iter()
            .any(|g| g == GENERATE_CONTENT);
        Self {
            name: strip_models_prefix(&m.name).to_string(),
            display_name: m.display_name,
            supports_generation,
        }
    }
}

/// "models/gemini-pro" -> "gemini-pro"; names without the prefix pass through.
pub fn strip_models_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}
