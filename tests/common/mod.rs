#![allow(dead_code)]

pub mod upstream_stub;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use huongvi_relay::server::build_router;
use huongvi_relay::util::{AppState, RelayConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Relay bound to an ephemeral local port, pointed at an upstream stub.
///
/// Configuration goes through `RelayConfig::from_lookup` so tests never touch
/// process environment and can run in parallel.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    join: JoinHandle<()>,
    client: reqwest::Client,
}

impl TestServer {
    fn make_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed building reqwest client")
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    pub async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
    }

    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Build a config from `(key, value)` pairs, with the upstream stub as base URL.
pub fn config_for(upstream_url: &str, vars: &[(&str, &str)]) -> RelayConfig {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.entry("GEMINI_BASE_URL".into())
        .or_insert_with(|| upstream_url.to_string());
    RelayConfig::from_lookup(move |k| map.get(k).cloned())
}

pub async fn spawn_relay(cfg: RelayConfig) -> TestServer {
    let state = AppState::from_config(&cfg).expect("app state");
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, app.into_make_service());

    let join = tokio::spawn(async move {
        if let Err(e) = server.await {
            eprintln!("Test server error: {e:?}");
        }
    });

    TestServer {
        base_url,
        addr,
        join,
        client: TestServer::make_client(),
    }
}

/// Relay with a test API key against `upstream_url`, plus extra vars.
pub async fn spawn_with_key(upstream_url: &str, extra: &[(&str, &str)]) -> TestServer {
    let mut vars = vec![("GEMINI_API_KEY", "test-key")];
    vars.extend_from_slice(extra);
    spawn_relay(config_for(upstream_url, &vars)).await
}

pub fn sample_chat_request(message: &str) -> serde_json::Value {
    serde_json::json!({ "message": message })
}
