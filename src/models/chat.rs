use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::conversion::normalize_history;
use crate::error::RelayError;

/// Temperature used when the client does not send a numeric one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Conversation role as understood by Gemini.
///
/// Serialized lowercase: "user" | "model".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Anything other than the exact string "model" is a user turn.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("model") => Role::Model,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A prior conversation turn after normalization. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

/// Validated inbound chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryTurn>,
    pub temperature: f64,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Parse and validate a raw request body.
    ///
    /// An empty body counts as `{}`. History accepts several legacy turn shapes,
    /// see [`normalize_history`].
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let value: serde_json::Value = if body.iter().all(u8::is_ascii_whitespace) {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_slice(body).map_err(|_| RelayError::InvalidJson)?
        };

        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .ok_or(RelayError::MissingMessage)?
            .to_string();

        let history = value
            .get("history")
            .map(normalize_history)
            .unwrap_or_default();

        let temperature = value
            .get("temperature")
            .and_then(|t| t.as_f64())
            .unwrap_or(DEFAULT_TEMPERATURE);

        Ok(Self {
            message,
            history,
            temperature,
        })
    }
}

/// Successful relay reply sent back to the browser.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub model_used: Option<String>,
}
