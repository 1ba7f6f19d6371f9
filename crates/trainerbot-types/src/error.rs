use serde_json::Value;
use thiserror::Error;

use crate::engine::SESSION_NOT_FOUND;

/// Errors talking to the module backend over HTTP.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend request timed out")]
    Timeout,

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid backend response: {0}")]
    Decode(String),
}

/// Errors talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat platform request failed: {0}")]
    Request(String),

    #[error("chat platform rejected the call: {description}")]
    Api { description: String },

    #[error("invalid chat platform response: {0}")]
    Decode(String),
}

/// Protocol-level failures reported by a module in an otherwise valid response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module rejected the request: {0}")]
    Rejected(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("module response is missing '{0}'")]
    MissingField(&'static str),
}

impl ModuleError {
    /// Classify the value of a response's `error` key.
    pub fn from_error_value(value: &Value) -> Self {
        match value {
            Value::String(s) if s == SESSION_NOT_FOUND => ModuleError::SessionNotFound,
            Value::String(s) => ModuleError::Rejected(s.clone()),
            other => ModuleError::Rejected(other.to_string()),
        }
    }
}

/// Any failure of a module call, transport or protocol.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// Configuration errors. A missing credential is the only one that stops startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no chat platform token found (set one of: {0})")]
    MissingCredential(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}
