// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns CloudWatch Logs subscription batches into queryable NDJSON objects.
//!
//! Each invocation decodes the base64 + gzip batch, walks the envelope's log events, extracts
//! positional fields from every message and writes the resulting records to S3 as a single
//! newline-delimited JSON object.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod event;
pub mod extractor;
pub mod logger;
pub mod pipeline;
pub mod runtime;
pub mod sink;
#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::InvocationError;
pub use extractor::{ExtractedRecord, ExtractionRule, Extractor};
pub use pipeline::{InvocationReport, Pipeline};
pub use runtime::RuntimeApiClient;
pub use sink::{KeyGenerator, ObjectStore, S3ObjectStore, SinkWriter};
