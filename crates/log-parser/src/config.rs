// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;

use crate::error::ConfigError;
use crate::extractor::ExtractionRule;
use crate::sink::KeyGenerator;

pub const BUCKET_VAR: &str = "LOG_PARSER_BUCKET";
/// Name used by older deployments of the function.
pub const LEGACY_BUCKET_VAR: &str = "bucket";
pub const KEY_PREFIX_VAR: &str = "LOG_PARSER_KEY_PREFIX";
pub const PARTITION_BY_DATE_VAR: &str = "LOG_PARSER_PARTITION_BY_DATE";
pub const EXTRACTION_RULE_VAR: &str = "LOG_PARSER_EXTRACTION_RULE";
pub const S3_ENDPOINT_VAR: &str = "LOG_PARSER_S3_ENDPOINT";
pub const LOG_LEVEL_VAR: &str = "LOG_PARSER_LOG_LEVEL";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Process configuration, read once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Destination bucket for NDJSON objects
    pub bucket: String,
    /// Prefix prepended to every object key
    pub key_prefix: String,
    /// Whether keys get a `dt=YYYY-MM-DD/` partition segment
    pub partition_by_date: bool,
    pub extraction_rule: ExtractionRule,
    /// Custom S3 endpoint, e.g. LocalStack
    pub s3_endpoint: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key_prefix: String::new(),
            partition_by_date: false,
            extraction_rule: ExtractionRule::default(),
            s3_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let bucket = env::var(BUCKET_VAR)
            .or_else(|_| env::var(LEGACY_BUCKET_VAR))
            .map_err(|_| ConfigError::Missing(BUCKET_VAR))?;
        let key_prefix = env::var(KEY_PREFIX_VAR).unwrap_or_default();
        let partition_by_date = env::var(PARTITION_BY_DATE_VAR)
            .map(|val| val.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let extraction_rule = match env::var(EXTRACTION_RULE_VAR) {
            Ok(rule) => rule
                .parse::<ExtractionRule>()
                .map_err(|reason| ConfigError::Invalid {
                    var: EXTRACTION_RULE_VAR,
                    reason,
                })?,
            Err(_) => ExtractionRule::default(),
        };
        let s3_endpoint = env::var(S3_ENDPOINT_VAR)
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        let log_level = env::var(LOG_LEVEL_VAR)
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            bucket,
            key_prefix,
            partition_by_date,
            extraction_rule,
            s3_endpoint,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: BUCKET_VAR,
                reason: "bucket name cannot be empty".to_string(),
            });
        }

        self.extraction_rule
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: EXTRACTION_RULE_VAR,
                reason,
            })?;

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid {
                var: LOG_LEVEL_VAR,
                reason: format!(
                    "'{}' is not one of: {}",
                    self.log_level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }

    pub fn key_generator(&self) -> KeyGenerator {
        KeyGenerator::new(self.key_prefix.clone(), self.partition_by_date)
    }
}
