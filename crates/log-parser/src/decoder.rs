// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport decoding for CloudWatch Logs subscription payloads.
//!
//! The log service ships each batch as base64 text wrapping a gzip stream of a UTF-8 JSON
//! envelope. [`decode`] reverses all three layers and rejects anything that does not survive
//! each step intact; lossy UTF-8 substitution is never applied.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};
use tracing::debug;

use crate::error::DecodeError;

/// Decodes a base64 + gzip payload into its text envelope.
///
/// # Errors
///
/// * [`DecodeError::Base64`] if `raw` is not valid base64
/// * [`DecodeError::Decompression`] if the bytes are not a sequence of complete gzip members
/// * [`DecodeError::Encoding`] if the decompressed bytes are not UTF-8
pub fn decode(raw: &str) -> Result<String, DecodeError> {
    let compressed = STANDARD.decode(raw.trim())?;

    // Concatenated members decode as one stream; trailing bytes must form another member.
    let mut decoder = MultiGzDecoder::new(compressed.as_slice());
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(DecodeError::Decompression)?;

    let text = String::from_utf8(decompressed)?;
    debug!(
        "Decoded {} compressed bytes into {} bytes of text: {}",
        compressed.len(),
        text.len(),
        text
    );
    Ok(text)
}

/// Applies the same transport encoding the log service uses. Inverse of [`decode`].
pub fn encode(text: &str) -> Result<String, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}
