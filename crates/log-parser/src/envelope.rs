// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of the decoded CloudWatch Logs envelope.
//!
//! ```text
//! {
//!   "messageType": "DATA_MESSAGE",
//!   "owner": "123456789012",
//!   "logGroup": "/aws/lambda/app",
//!   "logStream": "2024/01/01/[$LATEST]abc",
//!   "subscriptionFilters": ["to-s3"],
//!   "logEvents": [ { "id": "...", "timestamp": 1700000000000, "message": "..." } ]
//! }
//! ```
//!
//! Only `logEvents` is required. Entries are kept as raw JSON values so one malformed entry
//! surfaces as a per-entry [`MissingFieldError`] instead of failing the whole envelope.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EnvelopeError, MissingFieldError};

const MESSAGE_FIELD: &str = "message";
const CONTROL_MESSAGE_TYPE: &str = "CONTROL_MESSAGE";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEnvelope {
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub log_group: Option<String>,
    #[serde(default)]
    pub log_stream: Option<String>,
    #[serde(default)]
    pub subscription_filters: Vec<String>,
    log_events: Vec<Value>,
}

impl LogEnvelope {
    /// Connectivity probes sent by the log service when a subscription is created.
    pub fn is_control_message(&self) -> bool {
        self.message_type.as_deref() == Some(CONTROL_MESSAGE_TYPE)
    }

    pub fn len(&self) -> usize {
        self.log_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_events.is_empty()
    }

    /// Consumes the envelope into its messages, in envelope order.
    ///
    /// Control messages carry no user log events and yield an empty sequence.
    pub fn into_messages(self) -> Messages {
        let events = if self.is_control_message() {
            Vec::new()
        } else {
            self.log_events
        };
        Messages {
            events: events.into_iter().enumerate(),
        }
    }
}

/// Single-pass sequence of log messages.
#[derive(Debug)]
pub struct Messages {
    events: std::iter::Enumerate<std::vec::IntoIter<Value>>,
}

impl Iterator for Messages {
    type Item = Result<String, MissingFieldError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, event) = self.events.next()?;
        Some(match event {
            Value::Object(mut entry) => match entry.remove(MESSAGE_FIELD) {
                Some(Value::String(message)) => Ok(message),
                _ => Err(MissingFieldError {
                    index,
                    field: MESSAGE_FIELD,
                }),
            },
            _ => Err(MissingFieldError {
                index,
                field: MESSAGE_FIELD,
            }),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

impl ExactSizeIterator for Messages {}

/// Parses a decoded envelope.
///
/// # Errors
///
/// [`EnvelopeError::Malformed`] if `text` is not JSON, or `logEvents` is absent or not an array.
pub fn parse(text: &str) -> Result<LogEnvelope, EnvelopeError> {
    Ok(serde_json::from_str(text)?)
}

/// Parses `text` straight into its message sequence, discarding envelope metadata.
pub fn parse_messages(text: &str) -> Result<Messages, EnvelopeError> {
    parse(text).map(LogEnvelope::into_messages)
}
