use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use kanban_core::AppConfig;
use kanban_persistence::{Database, JsonFileStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::files::LocalFileStorage;
use crate::hub::BoardHub;
use crate::service::KanbanService;

/// Request bodies may carry a full attachment plus some slack for headers.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Wire the service, hub and storage together from configuration.
pub async fn build_state(config: AppConfig) -> Result<Arc<AppState>> {
    let store = Arc::new(JsonFileStore::new(&config.storage.data_file));
    let db = Database::open(store).await.with_context(|| {
        format!(
            "Failed to open data file {}",
            config.storage.data_file.display()
        )
    })?;
    let files = LocalFileStorage::new(&config.storage.attachments_dir);
    let hub = Arc::new(BoardHub::new(config.server.notification_buffer));
    let identity_header = config.server.identity_header.clone();

    let service = KanbanService::new(
        Arc::new(db),
        hub.clone(),
        Arc::new(files),
        Arc::new(config),
    );
    Ok(Arc::new(AppState {
        service: Arc::new(service),
        hub,
        identity_header,
    }))
}

/// Build the full application router with the API and the WebSocket route.
pub fn build_router(state: Arc<AppState>) -> Router {
    let config = state.service.config();
    let body_limit = config.storage.max_attachment_bytes as usize + BODY_LIMIT_SLACK;
    let cors = cors_layer(&config.server.cors_origins);

    api::api_router()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let bind = state.service.config().server.bind.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "kanban server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_router() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_file = dir.path().join("kanban.json");
        config.storage.attachments_dir = dir.path().join("attachments");
        let state = build_state(config).await.unwrap();
        (build_router(state), dir)
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let (app, _dir) = test_router().await;
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (app, _dir) = test_router().await;
        let req = Request::builder()
            .uri("/api/boards")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status_code"], 401);
    }

    #[tokio::test]
    async fn test_board_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_file = dir.path().join("kanban.json");
        config.storage.attachments_dir = dir.path().join("attachments");

        let app = build_router(build_state(config.clone()).await.unwrap());
        let req = Request::builder()
            .method("POST")
            .uri("/api/boards")
            .header("x-user-id", "alice")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Roadmap"}"#))
            .unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::CREATED);

        let app = build_router(build_state(config).await.unwrap());
        let req = Request::builder()
            .uri("/api/boards")
            .header("x-user-id", "alice")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let boards: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(boards[0]["name"], "Roadmap");
    }
}
