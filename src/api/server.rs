//! API server lifecycle — bind, spawn, graceful shutdown.
//!
//! Pattern: bind → spawn background task → return handle with shutdown
//! channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

/// Start the API server on the given address (port 0 binds an ephemeral
/// port; the actual address is on the returned handle).
pub async fn start_server(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    tracing::info!(%addr, "API server binding");

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx() -> (ApiContext, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(tmp.path().join("patients.db"));
        (ctx, tmp)
    }

    fn localhost() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let (ctx, _tmp) = test_ctx();
        let mut server = start_server(ctx, localhost()).await.expect("server starts");
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn server_serves_patient_routes() {
        let (ctx, _tmp) = test_ctx();
        let mut server = start_server(ctx, localhost()).await.expect("server starts");

        // Unknown route returns 404
        let url = format!("http://{}/nonexistent", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        // Empty list works end to end
        let url = format!("http://{}/api/patients", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["pagination"]["total"], 0);

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (ctx, _tmp) = test_ctx();
        let mut server = start_server(ctx, localhost()).await.expect("server starts");

        server.shutdown();
        server.shutdown(); // Second call should be safe
    }
}
