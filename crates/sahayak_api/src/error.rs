use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SahayakApiError {
    /// A record carried a truthy `error` field.
    #[error("{message}")]
    Upstream { message: String },

    #[error("malformed stream record {record:?}: {source}")]
    MalformedRecord {
        record: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("response is missing the '{0}' field")]
    MissingField(&'static str),
}

impl SahayakApiError {
    #[must_use]
    pub fn malformed(record: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedRecord {
            record: record.into(),
            source,
        }
    }

    /// Builds an upstream error from the value of an `error` field.
    ///
    /// A truthy `message` wins; otherwise the whole value is serialized, so a
    /// bare string error keeps its JSON quotes.
    #[must_use]
    pub fn upstream(error: &Value) -> Self {
        Self::Upstream {
            message: upstream_message(error),
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

fn upstream_message(error: &Value) -> String {
    match error.get("message") {
        Some(Value::String(message)) if !message.is_empty() => message.clone(),
        Some(message) if is_truthy(message) => message.to_string(),
        _ => error.to_string(),
    }
}

/// Truthiness as the stream producer's consumers see it: `null`, `false`, `0`
/// and `""` are falsy, every array and object is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Extracts a human-readable message from a non-success response body.
///
/// The backend answers failures with `{"error": "..."}`; some proxies wrap it
/// as `{"error": {"message": "..."}}`. Anything else falls back to the raw
/// body and finally to the canonical status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(error) = value.get("error").filter(|error| is_truthy(error)) {
            return match error {
                Value::String(message) => message.trim().to_string(),
                other => upstream_message(other),
            };
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
