//! Error types for the site API client.
//!
//! # Design
//! `NotFound` and `Validation` get dedicated variants because callers
//! routinely branch on "the entity does not exist" and "the payload was
//! rejected". Every other non-2xx response lands in `Http` with the raw
//! status and body; failures below HTTP land in `Network`. Together these
//! two form the transport-error kind.
//!
//! `Configuration` errors are raised before any request is built, so seeing
//! one guarantees nothing was sent.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by resource clients and transports.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server returned 404: the entity or parent path segment does not exist.
    #[error("resource not found (HTTP {status})")]
    NotFound { status: u16, body: String },

    /// The server returned 422 and rejected the payload.
    #[error("validation failed: {}", summarize(.errors))]
    Validation {
        status: u16,
        errors: Vec<FieldError>,
        body: String,
    },

    /// The server returned any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("network failure: {0}")]
    Network(String),

    /// The caller asked for something the resource descriptor does not allow.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A local file could not be read.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True for `Http` and `Network`, the failures passed through uninterpreted.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Http { .. } | ClientError::Network(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::NotFound { status, .. }
            | ClientError::Validation { status, .. }
            | ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client-side misuse detected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("`{name}` is not a declared attribute or relationship of `{resource}`")]
    UnknownField { resource: &'static str, name: String },

    #[error("`{resource}` is nested and requires a parent id")]
    MissingParentId { resource: &'static str },

    #[error("`{resource}` is not nested and takes no parent id")]
    UnexpectedParentId { resource: &'static str },

    #[error("`{resource}` does not support `{action}`")]
    UnsupportedAction {
        resource: &'static str,
        action: &'static str,
    },

    #[error("invalid value for `{name}` on `{resource}`: {reason}")]
    InvalidPayload {
        resource: &'static str,
        name: String,
        reason: String,
    },

    #[error("`{url}` is not an absolute http(s) URL")]
    InvalidUrl { url: String },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// One field-level problem reported in a 422 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending field, when the server names one.
    pub field: Option<String>,
    pub code: String,
    pub message: Option<String>,
}

fn summarize(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }
    errors
        .iter()
        .map(|e| match &e.field {
            Some(field) => format!("{field}: {}", e.code),
            None => e.code.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    data: Vec<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    #[serde(default)]
    attributes: ErrorAttributes,
}

#[derive(Deserialize, Default)]
struct ErrorAttributes {
    #[serde(default)]
    code: String,
    #[serde(default)]
    details: ErrorDetails,
}

#[derive(Deserialize, Default)]
struct ErrorDetails {
    field: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Extract field errors from a JSON:API error document. Bodies that are not
/// error documents yield an empty list; the raw body stays on the error.
pub(crate) fn parse_field_errors(body: &str) -> Vec<FieldError> {
    let Ok(doc) = serde_json::from_str::<ErrorDocument>(body) else {
        return Vec::new();
    };
    doc.data
        .into_iter()
        .map(|obj| {
            let attrs = obj.attributes;
            FieldError {
                field: attrs.details.field,
                code: attrs.details.code.unwrap_or(attrs.code),
                message: attrs.details.message,
            }
        })
        .collect()
}
