use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A `generateContent` call as seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedGenerate {
    pub api_version: String,
    /// Path segment after `models/`, e.g. "gemini-1.5-flash:generateContent".
    pub action: String,
    pub key: Option<String>,
    pub body: serde_json::Value,
}

/// In-process stand-in for the Gemini REST API.
#[derive(Clone)]
pub struct UpstreamStub {
    base_url: String,
    state: Arc<StubState>,
    shutdown: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

struct StubState {
    catalog: Mutex<(StatusCode, serde_json::Value)>,
    /// Extra catalog pages keyed by `pageToken`.
    pages: Mutex<HashMap<String, serde_json::Value>>,
    page_tokens: Mutex<Vec<Option<String>>>,
    generate: Mutex<(StatusCode, serde_json::Value)>,
    catalog_calls: AtomicUsize,
    generate_calls: Mutex<Vec<RecordedGenerate>>,
}

impl UpstreamStub {
    pub async fn start(catalog: serde_json::Value, generate: serde_json::Value) -> Self {
        let state = Arc::new(StubState {
            catalog: Mutex::new((StatusCode::OK, catalog)),
            pages: Mutex::new(HashMap::new()),
            page_tokens: Mutex::new(Vec::new()),
            generate: Mutex::new((StatusCode::OK, generate)),
            catalog_calls: AtomicUsize::new(0),
            generate_calls: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/:version/models", get(list_handler))
            .route("/:version/models/:action", post(generate_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream stub");
        let addr = listener.local_addr().expect("upstream stub local addr");
        let (tx, rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, router.into_make_service());
        tokio::spawn(async move {
            tokio::select! {
                res = server => {
                    if let Err(err) = res {
                        eprintln!("Upstream stub server error: {err:?}");
                    }
                }
                _ = rx => {}
            }
        });

        UpstreamStub {
            base_url: format!("http://{}", addr),
            state,
            shutdown: Arc::new(Mutex::new(Some(tx))),
        }
    }

    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn catalog_calls(&self) -> usize {
        self.state.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> Vec<RecordedGenerate> {
        self.state
            .generate_calls
            .lock()
            .expect("lock generate calls")
            .clone()
    }

    pub fn last_generate(&self) -> RecordedGenerate {
        self.generate_calls()
            .pop()
            .expect("at least one generate call")
    }

    pub fn set_catalog(&self, status: StatusCode, body: serde_json::Value) {
        *self.state.catalog.lock().expect("lock catalog") = (status, body);
    }

    /// Serve `body` for catalog requests carrying `pageToken=token`.
    pub fn set_catalog_page(&self, token: &str, body: serde_json::Value) {
        self.state
            .pages
            .lock()
            .expect("lock pages")
            .insert(token.to_string(), body);
    }

    /// `pageToken` of every catalog request, in arrival order.
    pub fn catalog_page_tokens(&self) -> Vec<Option<String>> {
        self.state
            .page_tokens
            .lock()
            .expect("lock page tokens")
            .clone()
    }

    pub fn set_generate(&self, status: StatusCode, body: serde_json::Value) {
        *self.state.generate.lock().expect("lock generate") = (status, body);
    }
}

impl Drop for UpstreamStub {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.shutdown.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
    }
}

async fn list_handler(
    State(state): State<Arc<StubState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.catalog_calls.fetch_add(1, Ordering::SeqCst);
    let token = query.get("pageToken").cloned();
    if let Ok(mut guard) = state.page_tokens.lock() {
        guard.push(token.clone());
    }

    if let Some(page) = token
        .as_ref()
        .and_then(|t| state.pages.lock().expect("lock pages").get(t).cloned())
    {
        return (StatusCode::OK, Json(page)).into_response();
    }
    let (status, body) = state.catalog.lock().expect("lock catalog").clone();
    (status, Json(body)).into_response()
}

async fn generate_handler(
    State(state): State<Arc<StubState>>,
    Path((api_version, action)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if let Ok(mut guard) = state.generate_calls.lock() {
        guard.push(RecordedGenerate {
            api_version,
            action,
            key: query.get("key").cloned(),
            body,
        });
    }
    let (status, body) = state.generate.lock().expect("lock generate").clone();
    (status, Json(body)).into_response()
}

/// Catalog with one model of each rank plus a non-generating entry.
pub fn sample_catalog() -> serde_json::Value {
    serde_json::json!({
        "models": [
            {
                "name": "models/text-embedding-004",
                "supportedGenerationMethods": ["embedContent"]
            },
            {
                "name": "models/gemini-ultra",
                "supportedGenerationMethods": ["generateContent"]
            },
            {
                "name": "models/gemini-1.0-pro",
                "supportedGenerationMethods": ["generateContent", "countTokens"]
            },
            {
                "name": "models/gemini-1.5-flash",
                "displayName": "Gemini 1.5 Flash",
                "supportedGenerationMethods": ["generateContent", "countTokens"]
            }
        ]
    })
}

pub fn sample_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn not_found_body() -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": 404,
            "message": "models/gemini-1.5-flash is not found for API version v1",
            "status": "NOT_FOUND"
        }
    })
}
