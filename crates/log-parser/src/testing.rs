// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`ObjectStore`] doubles shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::sink::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

impl StoredObject {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<Vec<StoredObject>>,
}

impl MemoryStore {
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), SinkError> {
        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

/// Rejects every write with `reason`.
pub struct FailingStore {
    pub reason: &'static str,
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, key: &str, _body: Vec<u8>, _content_type: &str) -> Result<(), SinkError> {
        Err(SinkError::Write {
            key: key.to_string(),
            reason: self.reason.to_string(),
        })
    }
}
