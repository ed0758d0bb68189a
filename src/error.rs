use axum::response::{IntoResponse, Response};
use http::{header, HeaderValue, StatusCode};
use thiserror::Error;

/// Every way a chat invocation can fail. Each variant maps to exactly one HTTP
/// response; nothing is swallowed.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing GEMINI_API_KEY")]
    MissingApiKey,

    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("Missing message")]
    MissingMessage,

    /// Non-2xx from the provider, relayed verbatim.
    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, body: String },

    #[error("No available Gemini model supports generateContent for this API key.")]
    NoUsableModel,

    #[error("upstream request failed: {0}")]
    Http(reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::InvalidJson | RelayError::MissingMessage => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::NoUsableModel => StatusCode::BAD_GATEWAY,
            RelayError::Http(_) | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the provider reported the model as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RelayError::Upstream { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

// The API key travels as a query parameter; keep URLs out of error text.
impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Http(e.without_url())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            RelayError::Upstream { body, .. } => {
                let mut resp = (status, body).into_response();
                resp.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                resp
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
