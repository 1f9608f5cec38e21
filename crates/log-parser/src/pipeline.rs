// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One invocation, end to end.
//!
//! ```text
//!   CloudWatchLogsEvent
//!         │  decoder::decode        (base64 → gzip → UTF-8)
//!         v
//!   envelope text
//!         │  envelope::parse        (logEvents[].message, envelope order)
//!         v
//!   messages ──► Extractor::extract ──► records / skips
//!         │
//!         v
//!   SinkWriter::write               (one NDJSON object per invocation)
//! ```
//!
//! Transport, envelope and sink failures fail the invocation. A log event with no message or
//! too few groups is skipped, counted and logged; the rest of the batch is still written.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::decoder;
use crate::envelope;
use crate::error::{InvocationError, MissingFieldError};
use crate::event::CloudWatchLogsEvent;
use crate::extractor::{ExtractedRecord, Extractor};
use crate::sink::{ObjectStore, SinkWriter};

/// Outcome of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    /// Object written, `None` when the batch was a control message
    pub key: Option<String>,
    pub records_written: usize,
    pub skipped_missing_field: usize,
    pub skipped_extraction: usize,
    pub bytes_written: usize,
}

impl InvocationReport {
    pub fn skipped(&self) -> usize {
        self.skipped_missing_field + self.skipped_extraction
    }
}

/// Records extracted from one batch, plus what was skipped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ExtractedRecord>,
    pub skipped_missing_field: usize,
    pub skipped_extraction: usize,
}

/// Runs `extractor` over `messages`, keeping order and isolating per-message failures.
pub fn extract_all<I>(extractor: &Extractor, messages: I) -> Extraction
where
    I: IntoIterator<Item = Result<String, MissingFieldError>>,
{
    let mut extraction = Extraction::default();
    for message in messages {
        match message {
            Ok(message) => match extractor.extract(&message) {
                Ok(record) => extraction.records.push(record),
                Err(err) => {
                    warn!("Skipping log event: {err}: {}", err.message);
                    extraction.skipped_extraction += 1;
                }
            },
            Err(err) => {
                warn!("Skipping log event: {err}");
                extraction.skipped_missing_field += 1;
            }
        }
    }
    extraction
}

pub struct Pipeline<S: ObjectStore + ?Sized> {
    extractor: Extractor,
    writer: SinkWriter<S>,
}

impl<S: ObjectStore + ?Sized> Pipeline<S> {
    pub fn new(extractor: Extractor, writer: SinkWriter<S>) -> Self {
        Self { extractor, writer }
    }

    pub fn from_config(config: &Config, store: Arc<S>) -> Self {
        Self::new(
            Extractor::new(config.extraction_rule.clone()),
            SinkWriter::new(store, config.key_generator()),
        )
    }

    /// Handles a raw trigger payload as delivered by the runtime.
    pub async fn handle_payload(
        &self,
        payload: &[u8],
        invocation_id: Option<&str>,
    ) -> Result<InvocationReport, InvocationError> {
        let event =
            CloudWatchLogsEvent::from_slice(payload).map_err(InvocationError::MalformedEvent)?;
        self.handle(&event, invocation_id).await
    }

    pub async fn handle(
        &self,
        event: &CloudWatchLogsEvent,
        invocation_id: Option<&str>,
    ) -> Result<InvocationReport, InvocationError> {
        let text = decoder::decode(&event.aws_logs.data)?;
        let envelope = envelope::parse(&text)?;

        let log_group = envelope.log_group.clone().unwrap_or_default();
        let log_stream = envelope.log_stream.clone().unwrap_or_default();
        if envelope.is_control_message() {
            info!("Received control message for log group '{log_group}', nothing to write");
            return Ok(InvocationReport::default());
        }

        let total = envelope.len();
        let extraction = extract_all(&self.extractor, envelope.into_messages());
        let written = self.writer.write(&extraction.records, invocation_id).await?;

        let report = InvocationReport {
            key: Some(written.key),
            records_written: written.records,
            skipped_missing_field: extraction.skipped_missing_field,
            skipped_extraction: extraction.skipped_extraction,
            bytes_written: written.bytes,
        };
        info!(
            "Wrote {} of {total} log events from '{log_group}' / '{log_stream}' to {} ({} skipped)",
            report.records_written,
            report.key.as_deref().unwrap_or_default(),
            report.skipped()
        );
        Ok(report)
    }
}
