// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log_parser::{
    decoder::encode,
    error::SinkError,
    event::{AwsLogs, CloudWatchLogsEvent},
    Config, ExtractionRule, KeyGenerator, ObjectStore, Pipeline,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<Vec<(String, Vec<u8>, String)>>,
}

impl MemoryStore {
    fn lines(&self) -> Vec<Value> {
        let objects = self.objects.lock().unwrap();
        assert_eq!(objects.len(), 1, "expected exactly one object");
        String::from_utf8(objects[0].1.clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), SinkError> {
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), body, content_type.to_string()));
        Ok(())
    }
}

struct UnreachableStore;

#[async_trait]
impl ObjectStore for UnreachableStore {
    async fn put(&self, key: &str, _body: Vec<u8>, _content_type: &str) -> Result<(), SinkError> {
        Err(SinkError::Write {
            key: key.to_string(),
            reason: "dispatch failure: connection refused".to_string(),
        })
    }
}

fn subscription_event(messages: &[&str]) -> CloudWatchLogsEvent {
    let events: Vec<_> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            json!({
                "id": i.to_string(),
                "timestamp": 1_700_000_000_000u64 + i as u64,
                "message": message,
            })
        })
        .collect();
    let envelope = json!({
        "messageType": "DATA_MESSAGE",
        "owner": "123456789012",
        "logGroup": "/aws/lambda/social-app",
        "logStream": "2024/01/01/[$LATEST]0123456789abcdef",
        "subscriptionFilters": ["parse-to-s3"],
        "logEvents": events,
    });
    CloudWatchLogsEvent {
        aws_logs: AwsLogs {
            data: encode(&envelope.to_string()).unwrap(),
        },
    }
}

fn config() -> Config {
    Config {
        bucket: "parsed-logs".to_string(),
        key_prefix: "users/".to_string(),
        partition_by_date: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_sample_line_end_to_end() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = Pipeline::from_config(&config(), Arc::clone(&store));

    let report = pipeline
        .handle(
            &subscription_event(&["X(u1)Y(f1)(f2)(f3)(f4)(d1)(_)(_)(_)(_)"]),
            Some("8476a536-e9f4-11e8-9739-2dfe598c3fcd"),
        )
        .await
        .unwrap();

    assert_eq!(report.records_written, 1);
    let key = report.key.unwrap();
    assert!(key.starts_with("users/dt="));
    assert!(key.ends_with("_8476a536-e9f4-11e8-9739-2dfe598c3fcd.json"));

    // Fifth and tenth groups are `(f4)` and the last `(_)`.
    assert_eq!(
        store.lines(),
        vec![json!({"user_name": "u1", "friends": "f4", "date_created": "_"})]
    );
    assert_eq!(store.objects.lock().unwrap()[0].2, "application/x-ndjson");
}

#[tokio::test]
async fn test_realistic_batch_with_short_line() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = Pipeline::from_config(&config(), Arc::clone(&store));

    let messages = [
        "INFO (alice) joined (web) (us-east-1) (v2) friends=(bob;carol) (0) (0) (0) (0) created=(2024-01-01T10:00:00Z)",
        "ERROR (database timeout)",
        "INFO (dave) joined (ios) (eu-west-1) (v2) friends=() (0) (0) (0) (0) created=(2024-01-02T11:30:00Z)",
    ];
    let report = pipeline
        .handle(&subscription_event(&messages), None)
        .await
        .unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.skipped_extraction, 1);
    assert_eq!(report.skipped_missing_field, 0);
    assert_eq!(
        store.lines(),
        vec![
            json!({"user_name": "alice", "friends": "bob;carol", "date_created": "2024-01-01T10:00:00Z"}),
            json!({"user_name": "dave", "friends": "", "date_created": "2024-01-02T11:30:00Z"}),
        ]
    );
}

#[tokio::test]
async fn test_custom_extraction_rule() {
    let store = Arc::new(MemoryStore::default());
    let config = Config {
        extraction_rule: "user=0,region=2".parse::<ExtractionRule>().unwrap(),
        ..config()
    };
    let pipeline = Pipeline::from_config(&config, Arc::clone(&store));

    let report = pipeline
        .handle(&subscription_event(&["(alice)(web)(us-east-1)", "(bob)"]), None)
        .await
        .unwrap();

    assert_eq!(report.records_written, 1);
    assert_eq!(report.skipped_extraction, 1);
    assert_eq!(
        store.lines(),
        vec![json!({"user": "alice", "region": "us-east-1"})]
    );
}

#[tokio::test]
async fn test_sink_failure_fails_invocation() {
    let pipeline = Pipeline::new(
        Default::default(),
        log_parser::SinkWriter::new(Arc::new(UnreachableStore), KeyGenerator::default()),
    );

    let err = pipeline
        .handle(
            &subscription_event(&["(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)"]),
            Some("req-1"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), "LogParser.SinkWriteError");
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_missing_message_fields_are_counted() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = Pipeline::from_config(&config(), Arc::clone(&store));
    let envelope = json!({
        "logEvents": [
            { "id": "1" },
            { "message": "(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)" },
            { "message": null },
        ]
    });
    let event = CloudWatchLogsEvent {
        aws_logs: AwsLogs {
            data: encode(&envelope.to_string()).unwrap(),
        },
    };

    let report = pipeline.handle(&event, None).await.unwrap();
    assert_eq!(report.records_written, 1);
    assert_eq!(report.skipped_missing_field, 2);
    assert_eq!(
        store.lines(),
        vec![json!({"user_name": "a", "friends": "e", "date_created": "j"})]
    );
}
