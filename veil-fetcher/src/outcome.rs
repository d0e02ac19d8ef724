//! Fetch outcomes: the result, the error taxonomy, and the report form
//! handed to embedding callers.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// What the payload was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Xml,
    Html,
    Json,
    Unknown,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentKind::Xml => "xml",
            ContentKind::Html => "html",
            ContentKind::Json => "json",
            ContentKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Response payload: raw text or a decoded JSON document, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Text(_) => None,
            Payload::Json(v) => Some(v),
        }
    }

    /// Render for the report boundary: text as-is, JSON re-serialised.
    pub fn to_data_string(&self) -> String {
        match self {
            Payload::Text(s) => s.clone(),
            Payload::Json(v) => v.to_string(),
        }
    }
}

/// Successful retrieval: status, headers, classified payload, and a note
/// when the payload had to be unwrapped from a surrounding document.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub payload: Payload,
    pub kind: ContentKind,
    pub extraction_note: Option<String>,
}

/// Failure taxonomy. Every kind is recoverable by the caller; none carries
/// a partial body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Blocked,
    TransportFailure,
    MalformedContent,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Blocked => "blocked",
            FetchErrorKind::TransportFailure => "transport failure",
            FetchErrorKind::MalformedContent => "malformed content",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Blocked,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::TransportFailure,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::MalformedContent,
            message: message.into(),
        }
    }
}

/// Serialized outcome for embedding callers: one JSON object per fetch with
/// `data`, `status`, `headers`, and `error` when the fetch failed.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub data: Option<String>,
    pub status: u16,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchReport {
    pub fn from_outcome(outcome: &Result<FetchResult, FetchError>) -> Self {
        match outcome {
            Ok(result) => Self {
                data: Some(result.payload.to_data_string()),
                status: result.status,
                headers: result.headers.clone(),
                error: None,
            },
            Err(err) => Self {
                data: None,
                status: 500,
                headers: HashMap::new(),
                error: Some(err.to_string()),
            },
        }
    }
}
