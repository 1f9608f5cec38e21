// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the Lambda runtime API (`2018-06-01`).
//!
//! The runtime hands out one invocation at a time:
//!
//! ```text
//! GET  /runtime/invocation/next             -> event payload + Lambda-Runtime-Aws-Request-Id
//! POST /runtime/invocation/{id}/response    <- InvocationReport
//! POST /runtime/invocation/{id}/error       <- {"errorType", "errorMessage"}
//! POST /runtime/init/error                  <- cold start failures (e.g. configuration)
//! ```
//!
//! Reporting an error lets the platform apply its retry and dead-letter policy to the batch.

use std::env;

use reqwest::Response;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info_span, Instrument};

use crate::error::{ConfigError, RuntimeApiError};
use crate::pipeline::Pipeline;
use crate::sink::ObjectStore;

pub const RUNTIME_API_VAR: &str = "AWS_LAMBDA_RUNTIME_API";
const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const DEADLINE_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub request_id: String,
    /// Deadline in milliseconds since the epoch
    pub deadline_ms: Option<u64>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RuntimeApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl RuntimeApiClient {
    /// `runtime_api` is the `host:port` the platform exposes, or a full URL.
    pub fn new(runtime_api: &str) -> Self {
        let runtime_api = runtime_api.trim_end_matches('/');
        let base_url = if runtime_api.starts_with("http://") || runtime_api.starts_with("https://")
        {
            format!("{runtime_api}/{API_VERSION}")
        } else {
            format!("http://{runtime_api}/{API_VERSION}")
        };
        Self {
            // The next-invocation long poll has no upper bound, so no client timeout.
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        env::var(RUNTIME_API_VAR)
            .map(|api| Self::new(&api))
            .map_err(|_| ConfigError::Missing(RUNTIME_API_VAR))
    }

    /// Blocks until the runtime delivers the next invocation.
    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeApiError> {
        let resp = self
            .client
            .get(format!("{}/runtime/invocation/next", self.base_url))
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(RuntimeApiError::MissingHeader(REQUEST_ID_HEADER))?;
        let deadline_ms = resp
            .headers()
            .get(DEADLINE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let payload = resp.bytes().await?.to_vec();

        Ok(Invocation {
            request_id,
            deadline_ms,
            payload,
        })
    }

    pub async fn send_response<T: Serialize + ?Sized>(
        &self,
        request_id: &str,
        body: &T,
    ) -> Result<(), RuntimeApiError> {
        let resp = self
            .client
            .post(format!(
                "{}/runtime/invocation/{request_id}/response",
                self.base_url
            ))
            .json(body)
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }

    pub async fn send_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeApiError> {
        self.post_error(
            format!("{}/runtime/invocation/{request_id}/error", self.base_url),
            error_type,
            message,
        )
        .await
    }

    pub async fn send_init_error(
        &self,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeApiError> {
        self.post_error(
            format!("{}/runtime/init/error", self.base_url),
            error_type,
            message,
        )
        .await
    }

    async fn post_error(
        &self,
        url: String,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeApiError> {
        let resp = self
            .client
            .post(url)
            .header(ERROR_TYPE_HEADER, error_type)
            .json(&json!({ "errorType": error_type, "errorMessage": message }))
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }

    /// Fetches one invocation, runs it through `pipeline` and reports the outcome.
    ///
    /// Pipeline failures are reported to the runtime and are not errors here; only failures
    /// talking to the runtime itself are returned.
    pub async fn serve_one<S: ObjectStore + ?Sized>(
        &self,
        pipeline: &Pipeline<S>,
    ) -> Result<(), RuntimeApiError> {
        let invocation = self.next_invocation().await?;
        let span = info_span!("invocation", request_id = %invocation.request_id);

        async {
            debug!(
                "Received {} byte event, deadline {:?}",
                invocation.payload.len(),
                invocation.deadline_ms
            );
            match pipeline
                .handle_payload(&invocation.payload, Some(&invocation.request_id))
                .await
            {
                Ok(report) => self.send_response(&invocation.request_id, &report).await,
                Err(err) => {
                    error!("Invocation failed: {err}");
                    self.send_error(&invocation.request_id, err.error_type(), &err.to_string())
                        .await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Serves invocations until talking to the runtime fails.
    pub async fn serve<S: ObjectStore + ?Sized>(
        &self,
        pipeline: &Pipeline<S>,
    ) -> Result<(), RuntimeApiError> {
        loop {
            self.serve_one(pipeline).await?;
        }
    }
}

async fn check_status(resp: Response) -> Result<Response, RuntimeApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RuntimeApiError::Status {
        status: status.as_u16(),
        body,
    })
}
