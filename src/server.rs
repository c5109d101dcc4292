use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handler::{
    get_entity, get_watermark, health_check, list_entity_deposits, register_entity, trigger_scan,
    AppState,
};
use crate::middleware::{create_cors_layer, rate_limit_middleware};

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let scan_limit = from_fn_with_state(state.scan_limiter.clone(), rate_limit_middleware);

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Reconciliation endpoints
                .route("/watermark", get(get_watermark))
                .route("/scan", post(trigger_scan).route_layer(scan_limit))
                // Entity endpoints
                .route("/entities", post(register_entity))
                .route("/entities/:id", get(get_entity))
                .route("/entities/:id/deposits", get(list_entity_deposits)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
