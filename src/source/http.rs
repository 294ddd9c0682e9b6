//! HTTP status source — `reqwest` client against the backend REST API.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::payload::{
    self, FtpConnectionPayload, FtpFilesPayload, IndexStatusPayload, LogEntryPayload, StatsPayload,
};
use super::{SourceError, StatusSource};

pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpStatusSource {
    /// Build a source for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// `timeout` bounds every request end to end, so a hung backend cannot
    /// stall the next poll.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("newsroom-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a GET and fail on anything but a 2xx status.
    async fn get(&self, path: &str) -> Result<reqwest::Response, SourceError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        debug!(path, status = status.as_u16(), "backend responded");
        if !status.is_success() {
            return Err(SourceError::Http(status));
        }
        Ok(resp)
    }

    async fn get_json(&self, path: &str) -> Result<Value, SourceError> {
        let resp = self.get(path).await?;
        resp.json::<Value>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if e.is_decode() {
            SourceError::Shape(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn health(&self) -> Result<(), SourceError> {
        self.get("/api/health").await.map(|_| ())
    }

    async fn stats(&self) -> Result<StatsPayload, SourceError> {
        let body = self.get_json("/api/stats").await?;
        payload::parse_stats(&body)
    }

    async fn ftp_connection(&self) -> Result<FtpConnectionPayload, SourceError> {
        let body = self.get_json("/api/ftp/connection-info").await?;
        Ok(payload::parse_ftp_connection(&body))
    }

    async fn ftp_files(&self) -> Result<FtpFilesPayload, SourceError> {
        let body = self.get_json("/api/ftp/files").await?;
        payload::parse_ftp_files(&body)
    }

    async fn vector_index_status(&self) -> Result<IndexStatusPayload, SourceError> {
        let body = self.get_json("/api/vector-index/status").await?;
        Ok(payload::parse_index_status(&body))
    }

    async fn processing_logs(&self, limit: usize) -> Result<Vec<LogEntryPayload>, SourceError> {
        let body = self
            .get_json(&format!("/api/processing-logs?limit={}", limit))
            .await?;
        payload::parse_logs(&body)
    }

    async fn articles_ping(&self) -> Result<(), SourceError> {
        self.get("/api/articles?limit=1").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(base: &str) -> HttpStatusSource {
        HttpStatusSource::new(base, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_health_maps_status_codes() {
        let ok = serve(Router::new().route("/api/health", get(|| async { "ok" }))).await;
        assert!(source(&ok).health().await.is_ok());

        let down = serve(Router::new().route(
            "/api/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        match source(&down).health().await {
            Err(SourceError::Http(code)) => assert_eq!(code.as_u16(), 503),
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_info_without_success_field() {
        let base = serve(Router::new().route(
            "/api/ftp/connection-info",
            get(|| async { Json(json!({"connected": true, "info": {"host": "ftp"}})) }),
        ))
        .await;

        let info = source(&base).ftp_connection().await.unwrap();
        assert!(info.connected);
    }

    #[tokio::test]
    async fn test_processing_logs_sends_limit() {
        let base = serve(Router::new().route(
            "/api/processing-logs",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let limit: usize = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(100);
                let logs: Vec<_> = (0..limit)
                    .map(|i| json!({"id": i.to_string(), "message": "m", "status": "success"}))
                    .collect();
                Json(json!({ "logs": logs }))
            }),
        ))
        .await;

        let logs = source(&base).processing_logs(5).await.unwrap();
        assert_eq!(logs.len(), 5);
    }

    #[tokio::test]
    async fn test_non_json_body_is_shape_error() {
        let base = serve(Router::new().route("/api/stats", get(|| async { "not json" }))).await;
        assert!(matches!(source(&base).stats().await, Err(SourceError::Shape(_))));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let base = serve(Router::new().route(
            "/api/vector-index/status",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"status": "not_created"}))
            }),
        ))
        .await;

        let src = HttpStatusSource::new(&base, Duration::from_millis(100)).unwrap();
        assert!(matches!(
            src.vector_index_status().await,
            Err(SourceError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let src = source(&format!("http://{}/", addr));
        assert!(matches!(src.articles_ping().await, Err(SourceError::Network(_))));
    }
}
