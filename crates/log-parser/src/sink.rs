// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! NDJSON serialization and delivery of extracted records to the object store.
//!
//! The whole payload is built in memory and written with a single `put`, so a failed or
//! timed-out invocation never leaves a partial object behind.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::error::SinkError;
use crate::extractor::ExtractedRecord;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Durable object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), SinkError>;
}

/// [`ObjectStore`] backed by an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the ambient AWS configuration.
    ///
    /// A custom `endpoint` (e.g. LocalStack) switches the client to path-style addressing.
    pub async fn from_env(bucket: impl Into<String>, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(endpoint.is_some())
            .build();

        Self::new(Client::from_conf(s3_config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), SinkError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| {
                let reason = aws_sdk_s3::error::DisplayErrorContext(&err).to_string();
                error!("Failed to put s3://{}/{key}: {reason}", self.bucket);
                SinkError::Write {
                    key: key.to_string(),
                    reason,
                }
            })?;
        Ok(())
    }
}

/// Derives object keys of the form `{prefix}[dt=YYYY-MM-DD/]data_{timestamp}_{invocation}.json`.
///
/// Keys are unique without shared state: the invocation id is the runtime request id, or a
/// random UUID when none is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyGenerator {
    prefix: String,
    partition_by_date: bool,
}

impl KeyGenerator {
    #[must_use]
    pub fn new(prefix: impl Into<String>, partition_by_date: bool) -> Self {
        Self {
            prefix: prefix.into(),
            partition_by_date,
        }
    }

    pub fn generate(&self, invocation_id: Option<&str>) -> String {
        self.generate_at(Utc::now(), invocation_id)
    }

    pub fn generate_at(&self, now: DateTime<Utc>, invocation_id: Option<&str>) -> String {
        let invocation = match invocation_id.map(sanitize).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => Uuid::new_v4().simple().to_string(),
        };
        let partition = if self.partition_by_date {
            format!("dt={}/", now.format("%Y-%m-%d"))
        } else {
            String::new()
        };
        format!(
            "{}{partition}data_{}_{invocation}.json",
            self.prefix,
            now.format("%Y%m%dT%H%M%S%3fZ")
        )
    }
}

/// Keeps key-safe characters only.
fn sanitize(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Serializes records as newline-terminated JSON documents.
pub fn to_ndjson<'a>(
    records: impl IntoIterator<Item = &'a ExtractedRecord>,
) -> Result<Vec<u8>, SinkError> {
    let mut payload = Vec::new();
    for record in records {
        let line = serde_json::to_string(record)?;
        trace!("{line}");
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
    }
    Ok(payload)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub key: String,
    pub records: usize,
    pub bytes: usize,
}

pub struct SinkWriter<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    keys: KeyGenerator,
}

impl<S: ObjectStore + ?Sized> SinkWriter<S> {
    pub fn new(store: Arc<S>, keys: KeyGenerator) -> Self {
        Self { store, keys }
    }

    /// Writes all `records` as one object. An empty slice writes an empty object.
    pub async fn write(
        &self,
        records: &[ExtractedRecord],
        invocation_id: Option<&str>,
    ) -> Result<WriteResult, SinkError> {
        let payload = to_ndjson(records)?;
        let key = self.keys.generate(invocation_id);
        let bytes = payload.len();

        debug!(
            "Writing {} records ({bytes} bytes) to {key}",
            records.len()
        );
        self.store.put(&key, payload, NDJSON_CONTENT_TYPE).await?;

        Ok(WriteResult {
            key,
            records: records.len(),
            bytes,
        })
    }
}
