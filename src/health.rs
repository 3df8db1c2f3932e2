//! Liveness endpoint for uptime monitors.

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::{error, info};

/// GET / - always `OK` while the process is alive.
async fn ok() -> &'static str {
    "OK"
}

pub fn router() -> Router {
    Router::new().route("/", get(ok))
}

/// Serve until the process exits. Failures are logged, never fatal to the bot.
pub async fn serve(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Health endpoint failed to bind {addr}: {e}");
            return;
        }
    };

    info!("🩺 Health endpoint listening on {addr}");
    if let Err(e) = axum::serve(listener, router()).await {
        error!("Health endpoint stopped: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_ok_handler() {
        assert_eq!(ok().await, "OK");
    }

    #[tokio::test]
    async fn test_serves_ok_over_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
    }
}
