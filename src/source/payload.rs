//! Per-endpoint payload types and their parsers.
//!
//! Parsers take the decoded JSON body and return either a typed payload or
//! `SourceError::Shape`. They never look at another endpoint's fields.

use serde_json::Value;

use super::SourceError;

const DEFAULT_LOG_MESSAGE: &str = "Operation performed";

// ── /api/stats ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsPayload {
    pub total_articles: Option<u64>,
    pub processed_today: Option<u64>,
    pub vector_indexes: Option<u64>,
    pub ftp_files: Option<u64>,
}

pub fn parse_stats(body: &Value) -> Result<StatsPayload, SourceError> {
    if !body.is_object() {
        return Err(SourceError::Shape(format!("stats: expected object, got {}", kind(body))));
    }
    Ok(StatsPayload {
        total_articles: count_field(body, "total_articles"),
        processed_today: count_field(body, "processed_today"),
        vector_indexes: count_field(body, "vector_indexes"),
        ftp_files: count_field(body, "ftp_files"),
    })
}

/// Counters arrive as integers, but tolerate floats and negative junk.
fn count_field(body: &Value, name: &str) -> Option<u64> {
    let v = body.get(name)?;
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

// ── /api/ftp/connection-info ────────────────────────────────────────

/// Connection info has no `success` envelope: `connected` sits at the top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtpConnectionPayload {
    pub connected: bool,
    pub last_connected: Option<String>,
    pub error: Option<String>,
}

pub fn parse_ftp_connection(body: &Value) -> FtpConnectionPayload {
    // A null or non-object body reads as "not connected".
    FtpConnectionPayload {
        connected: body.get("connected").map(truthy).unwrap_or(false),
        last_connected: body["last_connected"].as_str().map(str::to_string),
        error: body["error"].as_str().map(str::to_string),
    }
}

// ── /api/ftp/files ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtpFile {
    pub name: String,
    pub size: Option<u64>,
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtpFilesPayload {
    pub files: Vec<FtpFile>,
}

pub fn parse_ftp_files(body: &Value) -> Result<FtpFilesPayload, SourceError> {
    let arr = body["files"]
        .as_array()
        .ok_or_else(|| SourceError::Shape("ftp files: missing `files` array".into()))?;

    let files = arr
        .iter()
        .map(|f| FtpFile {
            name: f["name"].as_str().unwrap_or_default().to_string(),
            size: f["size"].as_u64(),
            modified: f["modified"].as_str().map(str::to_string),
        })
        .collect();

    Ok(FtpFilesPayload { files })
}

// ── /api/vector-index/status ────────────────────────────────────────

/// The three shapes the index status endpoint returns, plus a catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatusPayload {
    /// `{status: "error", message?}`
    Failed { message: Option<String> },
    /// `{status: "not_created"}`
    NotCreated,
    /// `{status: "not_initialized"}`
    NotInitialized,
    /// `{index_status: {state}, endpoint_status?: {state}}`
    Index {
        index_state: String,
        /// `None` when there is no endpoint block at all; `Some(None)` when
        /// the block exists but carries no state.
        endpoint: Option<Option<String>>,
    },
    /// Anything else.
    Unrecognized,
}

pub fn parse_index_status(body: &Value) -> IndexStatusPayload {
    match body["status"].as_str() {
        Some("error") => {
            return IndexStatusPayload::Failed {
                message: body["message"].as_str().map(str::to_string),
            }
        }
        Some("not_created") => return IndexStatusPayload::NotCreated,
        Some("not_initialized") => return IndexStatusPayload::NotInitialized,
        _ => {}
    }

    let index_state = match body["index_status"]["state"].as_str() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => return IndexStatusPayload::Unrecognized,
    };

    let endpoint = match body.get("endpoint_status") {
        Some(block) if truthy(block) => Some(block["state"].as_str().map(str::to_string)),
        _ => None,
    };

    IndexStatusPayload::Index { index_state, endpoint }
}

// ── /api/processing-logs ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntryPayload {
    pub id: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
    pub status: Option<String>,
    pub process_type: Option<String>,
}

impl LogEntryPayload {
    pub fn message_or_default(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_LOG_MESSAGE)
    }
}

/// Accepts `{logs: [...]}` as well as a bare array.
pub fn parse_logs(body: &Value) -> Result<Vec<LogEntryPayload>, SourceError> {
    let arr = body["logs"]
        .as_array()
        .or_else(|| body.as_array())
        .ok_or_else(|| SourceError::Shape("processing logs: missing `logs` array".into()))?;

    Ok(arr.iter().map(parse_log_entry).collect())
}

fn parse_log_entry(log: &Value) -> LogEntryPayload {
    let id = match &log["id"] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    let timestamp = log["timestamp"]
        .as_str()
        .or_else(|| log["created_at"].as_str())
        .map(str::to_string);

    LogEntryPayload {
        id,
        message: log["message"].as_str().map(str::to_string),
        timestamp,
        status: log["status"].as_str().map(str::to_string),
        process_type: log["process_type"].as_str().map(str::to_string),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// JavaScript-style truthiness, which is what the backend contract assumes.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
