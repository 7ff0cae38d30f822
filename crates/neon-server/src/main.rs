mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use neon_api::realtime::GatewayChat;
use neon_api::{AppState, AppStateInner};
use neon_gateway::{Dispatcher, connection};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neon_server=debug,neon_api=debug,neon_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = neon_db::Database::open(&config.db_path)?;
    info!("Database ready at {}", config.db_path.display());

    // Shared state
    let state = AppStateInner::with_image_limit(db, Dispatcher::new(), config.max_upload_bytes);

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state.clone());

    let app = Router::new()
        .merge(neon_api::routes::router(state))
        .merge(ws_route)
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("NeonSquare server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let dispatcher = state.dispatcher.clone();
        connection::handle_connection(socket, dispatcher, Arc::new(GatewayChat::new(state)))
    })
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
