use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::models::chat::ChatRequest;
use crate::util::{AppState, NETLIFY_CHAT_PATH};

/// Build the Axum router: the chat endpoint (plus its Netlify alias) and `/status`.
///
/// Every response, errors and unknown routes included, carries the CORS and
/// `no-store` headers from `AppState::cors`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/status", get(status))
        .route(&state.chat_path, chat_routes());

    if state.chat_path != NETLIFY_CHAT_PATH {
        router = router.route(NETLIFY_CHAT_PATH, chat_routes());
    }

    router
        .fallback(not_found)
        .layer(middleware::map_response_with_state(
            state.clone(),
            stamp_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn chat_routes() -> MethodRouter<Arc<AppState>> {
    post(chat).options(preflight).fallback(method_not_allowed)
}

async fn stamp_headers(State(state): State<Arc<AppState>>, mut resp: Response) -> Response {
    state.cors.apply(resp.headers_mut());
    resp
}

/// Service status endpoint exposing routes and the current model selection.
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut routes = vec!["/status".to_string(), state.chat_path.clone()];
    if state.chat_path != NETLIFY_CHAT_PATH {
        routes.push(NETLIFY_CHAT_PATH.to_string());
    }
    Json(serde_json::json!({
        "name": "huongvi-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": routes,
        "cachedModel": state.relay.cache().get(),
        "preferredModel": state.relay.preferred_model(),
    }))
}

async fn preflight() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Validate the body, run the relay, and map the outcome to a response.
async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        let req = match ChatRequest::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                tracing::info!(error = %e, "rejected chat request");
                return e.into_response();
            }
        };

        match state.relay.chat(&req).await {
            Ok(reply) => {
                tracing::info!(model = ?reply.model_used, "chat reply relayed");
                Json(reply).into_response()
            }
            Err(e) => {
                tracing::warn!(status = %e.status(), error = %e, "chat request failed");
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}
