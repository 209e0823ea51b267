//! Record model — the typed form of one parsed log line.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// One access-log entry, fully typed.
///
/// Optional fields are absent exactly when the raw field carried the `-`
/// placeholder. `time_local` is normalized to UTC; the source offset is
/// applied during parsing and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessLogRecord {
    pub remote_addr: String,
    pub remote_user: Option<String>,
    pub time_local: DateTime<Utc>,
    pub request: String,
    pub status: u16,
    pub body_bytes_sent: u64,
    pub http_referer: Option<String>,
    pub http_user_agent: String,
    pub upstream_addr: Option<String>,
    /// Total request time in seconds.
    pub request_time: f64,
    /// Upstream response time in seconds; absent when no upstream served
    /// the request.
    pub upstream_response_time: Option<f64>,
}

/// One error-log entry, fully typed.
///
/// The source format carries no timezone, so `time_local` stays naive and
/// is stored as-is. The four context fields mirror nginx's optional
/// trailing clauses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorLogRecord {
    pub time_local: NaiveDateTime,
    pub level: String,
    pub message: String,
    pub pid: Option<u32>,
    pub client: Option<String>,
    pub server: Option<String>,
    pub request: Option<String>,
    pub host: Option<String>,
}
