use std::sync::Arc;

use anyhow::Context;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use campus_ai_gateway::config::Config;
use campus_ai_gateway::router;
use campus_ai_gateway::service::chat_service::ChatService;
use campus_ai_gateway::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_ai_gateway=debug,tower_http=debug".into()),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(upstream = ?config.upstream, "Configuration loaded");

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let upstream = UpstreamClient::new(Arc::new(config.upstream.clone()))
        .context("Failed to build upstream client")?;
    let chat_service = ChatService::new(upstream);

    // ── Router ────────────────────────────────────────────────────────────────
    let app = router(chat_service).layer(cors_layer(config.cors_origin.as_deref())?);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let allow_origin = match origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin).context("AI_CHAT_CORS_ORIGIN is not a valid origin")?,
        ),
        None => AllowOrigin::any(),
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]))
}
