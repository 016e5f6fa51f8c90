// src/error.rs
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use warp::reject::Reject;

#[derive(Debug)]
pub struct CustomError {
    pub message: String,
}

impl CustomError {
    pub fn new(message: impl Into<String>) -> Self {
        CustomError {
            message: message.into(),
        }
    }
}

impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CustomError {}

impl Reject for CustomError {}

/// A failed call to the backend API.
#[derive(Debug)]
pub struct ApiError {
    /// `None` when the request never got a response.
    pub status: Option<StatusCode>,
    pub detail: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

impl ApiError {
    /// Builds the error from a non-success response body.
    ///
    /// The backend answers `{"detail": "..."}` for business errors and
    /// `{"detail": [{"msg": "..."}, ...]}` for validation errors.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| detail_message(&body.detail))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Erreur inconnue")
                    .to_string()
            });
        ApiError {
            status: Some(status),
            detail,
        }
    }
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join(", "))
            }
        }
        _ => None,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.detail, status.as_u16()),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError {
            status: e.status(),
            detail: e.to_string(),
        }
    }
}
