//! Trivial liveness responder, outside the core.

use axum::{routing::get, Router};
use tracing::{error, info};

pub fn router() -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "Bot is running!"
}

pub async fn spawn(port: u16) -> std::io::Result<()> {
    let address = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("health endpoint listening on {address}");

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router()).await {
            error!("health endpoint terminated unexpectedly: {error}");
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_liveness() {
        assert_eq!(health().await, "Bot is running!");
    }
}
