//! Base64-encoded fixtures
//!
//! Some fixture sets ship schemas and documents base64-encoded so they
//! survive transport byte-for-byte. An [`EncodedFixture`] file looks like:
//!
//! ```json
//! { "schema": "eyJ0eXBlIjoiaW50ZWdlciJ9", "document": "NDI=", "valid": true }
//! ```

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, Result};

/// Decode base64 text to raw bytes. Embedded line breaks and surrounding
/// whitespace are ignored.
pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Decode base64 text holding a JSON document
pub fn decode_json(encoded: &str) -> Result<Value> {
    let bytes = decode_bytes(encoded)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encode a JSON document the way fixtures store it
pub fn encode_json(value: &Value) -> Result<String> {
    Ok(STANDARD.encode(serde_json::to_vec(value)?))
}

/// A schema/document pair as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedFixture {
    pub schema: String,
    pub document: String,
    /// Expected validation outcome, when the fixture records one
    #[serde(default)]
    pub valid: Option<bool>,
}

/// A fixture with both halves decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFixture {
    pub schema: Value,
    pub document: Value,
    pub valid: Option<bool>,
}

impl EncodedFixture {
    /// Read an encoded fixture file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn decode(&self) -> Result<DecodedFixture> {
        Ok(DecodedFixture {
            schema: decode_json(&self.schema)?,
            document: decode_json(&self.document)?,
            valid: self.valid,
        })
    }
}
