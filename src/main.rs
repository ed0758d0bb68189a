use huongvi_relay::server::build_router;
use huongvi_relay::util::{init_tracing, AppState, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = RelayConfig::from_env();
    let state = AppState::from_config(&cfg)?;

    match cfg.preferred_model.as_deref() {
        Some(m) => tracing::info!("Preferred model: {} (verified against catalog on first request)", m),
        None => tracing::info!("No preferred model; selecting from catalog (flash > pro > any)"),
    }
    match cfg.http_timeout_secs {
        Some(n) => tracing::info!("Upstream timeout: {}s", n),
        None => tracing::info!("Upstream timeout: none (platform default)"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        "Huongvi relay listening on http://{} (chat at {})",
        cfg.bind_addr,
        cfg.chat_path
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
