//! Status source trait — the backend seen as a set of independent endpoints.
//!
//! The poller only talks to this trait. Each endpoint has its own payload
//! type and its own parser, because the backend does not use one envelope
//! shape consistently (`/api/ftp/connection-info` has no `success` flag,
//! `/api/vector-index/status` has three different shapes, and so on).

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod http;
pub mod payload;

pub use payload::{
    FtpConnectionPayload, FtpFile, FtpFilesPayload, IndexStatusPayload, LogEntryPayload,
    StatsPayload,
};

// ── Errors ──────────────────────────────────────────────────────────

/// Why a single endpoint call failed.
///
/// The poller never propagates these; each one is mapped to an `error`
/// service state or to "keep the previous value".
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be sent or the connection dropped.
    #[error("network failure: {0}")]
    Network(String),

    /// No response within the per-request budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {0}")]
    Http(::http::StatusCode),

    /// The body was not the shape this endpoint is expected to return.
    #[error("unexpected payload shape: {0}")]
    Shape(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

// ── Source Trait ────────────────────────────────────────────────────

/// One method per backend endpoint the poller consumes.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// `GET /api/health` — only the HTTP status matters.
    async fn health(&self) -> Result<(), SourceError>;

    /// `GET /api/stats`
    async fn stats(&self) -> Result<StatsPayload, SourceError>;

    /// `GET /api/ftp/connection-info`
    async fn ftp_connection(&self) -> Result<FtpConnectionPayload, SourceError>;

    /// `GET /api/ftp/files`
    async fn ftp_files(&self) -> Result<FtpFilesPayload, SourceError>;

    /// `GET /api/vector-index/status`
    async fn vector_index_status(&self) -> Result<IndexStatusPayload, SourceError>;

    /// `GET /api/processing-logs?limit=N`, most recent first.
    async fn processing_logs(&self, limit: usize) -> Result<Vec<LogEntryPayload>, SourceError>;

    /// `GET /api/articles?limit=1` — database liveness check.
    async fn articles_ping(&self) -> Result<(), SourceError>;
}
