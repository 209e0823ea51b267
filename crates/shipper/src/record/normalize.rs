//! Normalizer — converts raw grammar captures into typed records.
//!
//! All conversion runs before any database work starts, so a line that
//! fails here never opens a transaction. Failures are per-line and
//! recoverable; the caller logs and moves on.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::grammar::{AccessFields, ErrorFields};
use crate::record::model::{AccessLogRecord, ErrorLogRecord};

/// Timestamp layout of the access log (`10/Oct/2023:13:55:36 +0000`).
const ACCESS_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";
/// Timestamp layout of the error log (`2023/10/10 13:55:36`, no offset).
const ERROR_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid {field} timestamp {value:?}: {source}")]
    Timestamp {
        field: &'static str,
        value: String,
        source: chrono::ParseError,
    },

    #[error("invalid {field} integer {value:?}")]
    Integer { field: &'static str, value: String },

    #[error("invalid {field} duration {value:?}")]
    Duration { field: &'static str, value: String },

    #[error("status {0} is not a 3-digit HTTP code")]
    StatusRange(u16),
}

/// Map the `-` placeholder to an absent value; anything else is kept.
fn optional(raw: &str) -> Option<String> {
    if raw == "-" {
        None
    } else {
        Some(raw.to_string())
    }
}

fn integer<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, NormalizeError> {
    raw.parse().map_err(|_| NormalizeError::Integer {
        field,
        value: raw.to_string(),
    })
}

/// Parse a duration in seconds; rejects non-numbers and negative values.
fn seconds(field: &'static str, raw: &str) -> Result<f64, NormalizeError> {
    let value: f64 = raw.parse().map_err(|_| NormalizeError::Duration {
        field,
        value: raw.to_string(),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(NormalizeError::Duration {
            field,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

/// Build a typed access record from raw captures.
pub fn access_record(fields: AccessFields<'_>) -> Result<AccessLogRecord, NormalizeError> {
    let time_local = DateTime::parse_from_str(fields.time_local, ACCESS_TIME_FORMAT)
        .map_err(|source| NormalizeError::Timestamp {
            field: "time_local",
            value: fields.time_local.to_string(),
            source,
        })?
        .with_timezone(&Utc);

    let status: u16 = integer("status", fields.status)?;
    if !(100..=999).contains(&status) {
        return Err(NormalizeError::StatusRange(status));
    }

    Ok(AccessLogRecord {
        remote_addr: fields.remote_addr.to_string(),
        remote_user: optional(fields.remote_user),
        time_local,
        request: fields.request.to_string(),
        status,
        body_bytes_sent: integer("body_bytes_sent", fields.body_bytes_sent)?,
        http_referer: optional(fields.http_referer),
        http_user_agent: fields.http_user_agent.to_string(),
        upstream_addr: optional(fields.upstream_addr),
        request_time: seconds("request_time", fields.request_time)?,
        upstream_response_time: match fields.upstream_response_time {
            "-" => None,
            raw => Some(seconds("upstream_response_time", raw)?),
        },
    })
}

/// Build a typed error record from raw captures.
pub fn error_record(fields: ErrorFields<'_>) -> Result<ErrorLogRecord, NormalizeError> {
    let time_local = NaiveDateTime::parse_from_str(fields.time_local, ERROR_TIME_FORMAT).map_err(
        |source| NormalizeError::Timestamp {
            field: "time_local",
            value: fields.time_local.to_string(),
            source,
        },
    )?;

    Ok(ErrorLogRecord {
        time_local,
        level: fields.level.to_string(),
        message: fields.message.to_string(),
        pid: Some(integer("pid", fields.pid)?),
        client: fields.client.map(str::to_string),
        server: fields.server.map(str::to_string),
        request: fields.request.map(str::to_string),
        host: fields.host.map(str::to_string),
    })
}
