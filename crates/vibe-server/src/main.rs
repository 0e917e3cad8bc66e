use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use vibe_api::{AppState, AppStateInner, messages, users};
use vibe_sentiment::{AiConfig, ProviderKind, SentimentClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibe=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("VIBE_DB_PATH").unwrap_or_else(|_| "vibe.db".into());
    let host = std::env::var("VIBE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("VIBE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let ai = AiConfig {
        provider: ProviderKind::parse(
            &std::env::var("VIBE_AI_PROVIDER").unwrap_or_else(|_| "huggingface".into()),
        ),
        base_url: std::env::var("VIBE_AI_BASE_URL").unwrap_or_default(),
        path: std::env::var("VIBE_AI_PATH").ok().filter(|p| !p.trim().is_empty()),
        token: std::env::var("VIBE_AI_TOKEN").ok().filter(|t| !t.trim().is_empty()),
    };

    // Init database
    let db = vibe_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state: one HTTP client for every AI call
    let state: AppState = Arc::new(AppStateInner {
        db,
        sentiment: SentimentClient::new(reqwest::Client::new()),
        ai,
    });

    // Routes
    let app = Router::new()
        .route(
            "/messages",
            post(messages::post_message).get(messages::get_messages_by_user),
        )
        .route("/messages/all", get(messages::get_all_messages))
        .route("/users", post(users::register_user).get(users::get_users))
        .route("/users/{id}", get(users::get_user_by_id))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Vibe server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
