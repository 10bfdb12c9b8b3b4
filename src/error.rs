//! Error types for the openapi-fluent crate.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::spec::Verb;

/// Errors raised while compiling a client tree or dispatching a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("invalid JSON in API description")]
    InvalidSpecJson(#[source] serde_json::Error),

    #[error("placeholder {{{placeholder}}} in {template} cannot be reconciled with the existing tree")]
    InconsistentSpec {
        template: String,
        placeholder: String,
    },

    #[error("no backend configured (set a backend or a base URL)")]
    MissingBackend,

    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("{path} has no child named {name}")]
    NoSuchChild { path: String, name: String },

    #[error("{path} does not take a path parameter")]
    NotParameterized { path: String },

    #[error("{method} is not supported on {path}")]
    UnsupportedVerb { method: Verb, path: String },

    #[error("{method} {pathname} has no operationId")]
    MissingOperationId { method: Verb, pathname: String },

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to read response body")]
    ResponseRead(#[source] reqwest::Error),

    #[error("failed to encode response body")]
    Encode(#[source] serde_json::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: StatusCode,
        message: String,
        body: Value,
    },
}

impl ClientError {
    /// Build an `HttpStatus` error, taking the message from the body's
    /// `message` field when there is one.
    pub fn from_status(status: StatusCode, body: Value) -> Self {
        let message = match body.get("message").and_then(|v| v.as_str()) {
            Some(m) => m.to_string(),
            None => match &body {
                Value::String(text) if !text.is_empty() => text.clone(),
                _ => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            },
        };
        Self::HttpStatus {
            status,
            message,
            body,
        }
    }

    /// Numeric HTTP status for `HttpStatus` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(status.as_u16()),
            Self::RequestFailed(e) | Self::ResponseRead(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Legacy name for [`ClientError::status_code`].
    pub fn code(&self) -> Option<u16> {
        self.status_code()
    }

    /// Human-readable message; the server-supplied one for `HttpStatus`.
    pub fn message(&self) -> String {
        match self {
            Self::HttpStatus { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
