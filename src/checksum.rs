//! Checksum utilities for registered documents

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of raw document bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for listings
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }

    /// Verify that bytes match this checksum
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::from_bytes(data) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = br#"{"type": "integer"}"#;
        assert_eq!(Checksum::from_bytes(content), Checksum::from_bytes(content));
    }

    #[test]
    fn test_checksum_different_content() {
        let a = Checksum::from_bytes(br#"{"type": "integer"}"#);
        let b = Checksum::from_bytes(br#"{"type": "string"}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_verification() {
        let content = br##"{"$ref": "#/definitions/a"}"##;
        let checksum = Checksum::from_bytes(content);
        assert!(checksum.verify(content));
        assert!(!checksum.verify(b"different content"));
        assert_eq!(checksum.short().len(), 12);
        assert_eq!(checksum.as_str().len(), 64);
    }

    #[test]
    fn test_short_of_deserialized_checksum() {
        let checksum: Checksum = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(checksum.short(), "abc");
    }
}
