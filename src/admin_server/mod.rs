//! Admin HTTP endpoint for video-input nodes.
//!
//! Provides two endpoints:
//! - `POST /video-input/{id}/{state}` - enable or disable a node's timer
//! - `GET /metrics` - Prometheus-compatible processing counters
//!
//! The server runs in the background next to the polling nodes.

mod handlers;
mod types;

use axum::routing::{get, post};
use axum::Router;

use handlers::{metrics_handler, video_input_state_handler};
pub use types::AdminState;

/// Builds the admin router over `state`.
pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/video-input/{id}/{state}", post(video_input_state_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Creates and starts the admin server
pub async fn start_admin_server(port: u16, state: AdminState) -> Result<(), anyhow::Error> {
    let app = admin_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind admin server to port {}: {}", port, e))?;

    log::info!("Admin server listening on http://127.0.0.1:{}/", port);
    log::info!("  - Control: POST http://127.0.0.1:{}/video-input/<id>/<enable|disable>", port);
    log::info!("  - Metrics: http://127.0.0.1:{}/metrics", port);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Admin server error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error_handling::ProcessingStats;
    use crate::nodes::NodeRegistry;

    #[tokio::test]
    async fn test_start_admin_server_port_in_use() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let port = occupied.local_addr().expect("local addr").port();

        let state = AdminState::new(NodeRegistry::new(), Arc::new(ProcessingStats::new()));
        let err = start_admin_server(port, state)
            .await
            .expect_err("port is already bound");
        let message = err.to_string();
        assert!(message.contains("Failed to bind admin server"));
        assert!(message.contains(&port.to_string()));
    }
}
