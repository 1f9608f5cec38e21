// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the log parser.
//!
//! Errors fall in two groups:
//! - **Fatal** ([`InvocationError`] and everything that converts into it): the whole invocation
//!   fails and nothing is written, so the runtime may retry it.
//! - **Per-message** ([`MissingFieldError`], [`ExtractionError`]): the offending log event is
//!   skipped and counted, siblings are still written.

/// Failure to reverse the base64 + gzip transport encoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid gzip stream: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("decompressed payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure to read the log envelope as a whole.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed log envelope: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        EnvelopeError::Malformed(err.to_string())
    }
}

/// A single log event in the envelope lacks its `message` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("log event #{index} has no string `{field}` attribute")]
pub struct MissingFieldError {
    pub index: usize,
    pub field: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    InsufficientGroups { found: usize, required: usize },
}

impl std::fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionFailure::InsufficientGroups { found, required } => write!(
                f,
                "found {found} parenthetical groups, at least {required} required"
            ),
        }
    }
}

/// A log message whose fields could not be extracted. Carries the original message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot extract fields from log message: {reason}")]
pub struct ExtractionError {
    pub message: String,
    pub reason: ExtractionFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write object `{key}`: {reason}")]
    Write { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Errors talking to the invocation runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeApiError {
    #[error("runtime API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("runtime API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("runtime API response is missing header {0}")]
    MissingHeader(&'static str),
}

/// Errors that fail a whole invocation.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("malformed trigger event: {0}")]
    MalformedEvent(#[source] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl InvocationError {
    /// Stable error type reported back to the runtime.
    pub fn error_type(&self) -> &'static str {
        match self {
            InvocationError::MalformedEvent(_) => "LogParser.MalformedEvent",
            InvocationError::Decode(DecodeError::Base64(_)) => "LogParser.DecodeError",
            InvocationError::Decode(DecodeError::Decompression(_)) => {
                "LogParser.DecompressionError"
            }
            InvocationError::Decode(DecodeError::Encoding(_)) => "LogParser.EncodingError",
            InvocationError::Envelope(_) => "LogParser.MalformedEnvelopeError",
            InvocationError::Sink(_) => "LogParser.SinkWriteError",
        }
    }
}
