use std::sync::Arc;

use anyhow::Context;
use http::{header, HeaderMap, HeaderValue};
use tracing_subscriber::{fmt, EnvFilter};

use crate::relay::Relay;
use crate::system_prompt_config::{SystemInstructionMode, SystemPromptConfig};
use crate::upstream::{GeminiClient, GenerativeProvider, DEFAULT_API_VERSION, DEFAULT_BASE_URL};

/// Port used when neither BIND_ADDR nor PORT is set.
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";
/// Netlify-style path the site's older pages still post to.
pub const NETLIFY_CHAT_PATH: &str = "/.netlify/functions/chat";

/// Initialize dotenv and structured tracing based on RUST_LOG.
///
/// Env file lookup order:
/// - explicit paths in ENV_FILE, ENVFILE, DOTENV_PATH
/// - ".envfile"
/// - default ".env" discovery
///
/// Existing process variables are never overwritten.
pub fn init_tracing() {
    let mut env_source: String = "none".into();
    for key in ["ENV_FILE", "ENVFILE", "DOTENV_PATH"] {
        if let Ok(p) = std::env::var(key) {
            let p = p.trim();
            if !p.is_empty()
                && std::path::Path::new(p).is_file()
                && dotenvy::from_filename(p).is_ok()
            {
                env_source = format!("{p} ({key})");
                break;
            }
        }
    }

    if env_source == "none"
        && std::path::Path::new(".envfile").is_file()
        && dotenvy::from_filename(".envfile").is_ok()
    {
        env_source = ".envfile".into();
    }

    if env_source == "none" && dotenvy::dotenv().is_ok() {
        env_source = ".env".into();
    }

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("Environment loaded from: {}", env_source);
}

/// 1, true, yes, on (case-insensitive).
pub fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Everything the relay reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub preferred_model: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub system_mode: Option<SystemInstructionMode>,
    pub system_prompt_config_path: Option<String>,
    pub bind_addr: String,
    pub chat_path: String,
    pub allowed_origin: String,
    pub http_timeout_secs: Option<u64>,
    pub proxy_url: Option<String>,
    pub no_proxy: bool,
}

impl RelayConfig {
    /// Read configuration from process environment.
    ///
    /// Environment:
    /// - GEMINI_API_KEY               -> credential; absence fails each chat request with 500
    /// - GEMINI_MODEL                 -> preferred model (still verified against the catalog)
    /// - GEMINI_API_VERSION           -> "v1" (default) | "v1beta"
    /// - GEMINI_BASE_URL              -> provider origin
    /// - GEMINI_SYSTEM_MODE           -> "turn_pair" | "field"; derived from version when unset
    /// - SYSTEM_PROMPT_CONFIG         -> JSON file, see `SystemPromptConfig`
    /// - BIND_ADDR / PORT             -> listen address (default 0.0.0.0:8787)
    /// - RELAY_CHAT_PATH              -> chat route (default /api/chat)
    /// - CORS_ALLOWED_ORIGIN          -> Access-Control-Allow-Origin (default *)
    /// - RELAY_HTTP_TIMEOUT_SECONDS   -> upstream timeout; none when unset
    /// - RELAY_PROXY_URL / RELAY_NO_PROXY
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = non_empty(get("BIND_ADDR")).unwrap_or_else(|| {
            let port = non_empty(get("PORT"))
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            format!("0.0.0.0:{port}")
        });

        let mut chat_path =
            non_empty(get("RELAY_CHAT_PATH")).unwrap_or_else(|| DEFAULT_CHAT_PATH.to_string());
        if !chat_path.starts_with('/') {
            chat_path.insert(0, '/');
        }

        Self {
            api_key: non_empty(get("GEMINI_API_KEY")),
            preferred_model: non_empty(get("GEMINI_MODEL")),
            base_url: non_empty(get("GEMINI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: non_empty(get("GEMINI_API_VERSION"))
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            system_mode: non_empty(get("GEMINI_SYSTEM_MODE"))
                .and_then(|m| SystemInstructionMode::parse(&m)),
            system_prompt_config_path: non_empty(get("SYSTEM_PROMPT_CONFIG")),
            bind_addr,
            chat_path,
            allowed_origin: non_empty(get("CORS_ALLOWED_ORIGIN")).unwrap_or_else(|| "*".into()),
            http_timeout_secs: non_empty(get("RELAY_HTTP_TIMEOUT_SECONDS"))
                .and_then(|s| s.parse::<u64>().ok()),
            proxy_url: non_empty(get("RELAY_PROXY_URL")),
            no_proxy: get("RELAY_NO_PROXY").map(|v| is_truthy(&v)).unwrap_or(false),
        }
    }
}

/// Build the outbound HTTP client from config.
///
/// No timeout is set unless RELAY_HTTP_TIMEOUT_SECONDS is given; the hosting
/// platform's limits apply otherwise.
pub fn build_http_client(cfg: &RelayConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();

    if let Some(n) = cfg.http_timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs(n));
    }

    if cfg.no_proxy {
        builder = builder.no_proxy();
    } else if let Some(u) = cfg.proxy_url.as_deref() {
        match reqwest::Proxy::all(u) {
            Ok(p) => builder = builder.proxy(p),
            Err(e) => tracing::warn!("Ignoring invalid RELAY_PROXY_URL: {}", e),
        }
    }

    builder = builder.user_agent(format!("huongvi-relay/{}", env!("CARGO_PKG_VERSION")));

    builder.build().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
}

/// Headers stamped on every response: permissive CORS plus `no-store`.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
}

impl CorsHeaders {
    pub fn new(origin: &str) -> Self {
        let allow_origin =
            HeaderValue::from_str(origin).unwrap_or_else(|_| HeaderValue::from_static("*"));
        Self { allow_origin }
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self::new("*")
    }
}

/// Shared application state used by the HTTP server and handlers.
pub struct AppState {
    pub relay: Relay,
    pub cors: CorsHeaders,
    pub chat_path: String,
}

impl AppState {
    pub fn new(relay: Relay, cors: CorsHeaders, chat_path: impl Into<String>) -> Self {
        Self {
            relay,
            cors,
            chat_path: chat_path.into(),
        }
    }

    /// Wire the Gemini client, prompt config and relay from a `RelayConfig`.
    pub fn from_config(cfg: &RelayConfig) -> anyhow::Result<Arc<Self>> {
        let prompt = match cfg.system_prompt_config_path.as_deref() {
            Some(path) => {
                tracing::info!("Loading system prompt configuration from: {}", path);
                SystemPromptConfig::load_from_file(path)
                    .with_context(|| format!("system prompt config at {path}"))?
            }
            None => SystemPromptConfig::default(),
        };

        let provider = GeminiClient::new(
            build_http_client(cfg),
            cfg.base_url.clone(),
            cfg.api_version.clone(),
            cfg.system_mode,
        );
        let system_mode = prompt
            .injection_mode
            .unwrap_or_else(|| provider.system_mode());
        tracing::info!(
            api_version = %provider.api_version(),
            system_mode = ?system_mode,
            "Gemini provider configured"
        );
        if cfg.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail with 500");
        }

        let relay = Relay::new(
            Arc::new(provider),
            cfg.api_key.clone(),
            cfg.preferred_model.clone(),
            prompt,
        );

        Ok(Arc::new(Self::new(
            relay,
            CorsHeaders::new(&cfg.allowed_origin),
            cfg.chat_path.clone(),
        )))
    }
}
