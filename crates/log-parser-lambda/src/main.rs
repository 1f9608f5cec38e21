// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode, sync::Arc};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use log_parser::{
    config::{Config, LOG_LEVEL_VAR},
    logger::Formatter,
    Pipeline, RuntimeApiClient, S3ObjectStore,
};

const NOISY_CRATES: &str =
    "h2=off,hyper=off,hyper_util=off,rustls=off,reqwest=off,aws_config=warn,aws_smithy_runtime=warn";

#[tokio::main]
pub async fn main() -> ExitCode {
    // Read before Config so configuration errors are logged at the requested level.
    let log_level = env::var(LOG_LEVEL_VAR)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("{NOISY_CRATES},{log_level}");

    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .event_format(Formatter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let runtime = match RuntimeApiClient::from_env() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Not running under the Lambda runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading configuration on startup: {e}");
            if let Err(report_err) = runtime
                .send_init_error("LogParser.ConfigError", &e.to_string())
                .await
            {
                error!("Failed to report init error: {report_err}");
            }
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(
        S3ObjectStore::from_env(config.bucket.clone(), config.s3_endpoint.clone()).await,
    );
    let pipeline = Pipeline::from_config(&config, store);

    info!(
        "Log parser ready: bucket={}, extraction rule={}",
        config.bucket, config.extraction_rule
    );

    match runtime.serve(&pipeline).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Lost connection to the Lambda runtime: {e}");
            ExitCode::FAILURE
        }
    }
}
