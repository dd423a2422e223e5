//! URI Registry
//!
//! Fixed set of schema documents addressable by canonical URI. Populated once
//! at startup (normally with the draft meta-schemas) and read-only afterwards,
//! so a single instance can be shared across resolver threads through `Arc`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use include_dir::{include_dir, Dir};
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{HarnessError, Result};
use crate::reference::canonical_uri;

/// Meta-schema documents embedded at compile time
static META_SCHEMAS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/metaschemas");

/// Canonical meta-schema URIs and the embedded file backing each
pub const META_SCHEMA_URIS: [(&str, &str); 4] = [
    ("http://json-schema.org/draft-03/schema", "draft-03.json"),
    ("http://json-schema.org/draft-04/schema", "draft-04.json"),
    ("http://json-schema.org/draft-06/schema", "draft-06.json"),
    ("http://json-schema.org/draft-07/schema", "draft-07.json"),
];

/// An immutable (URI -> bytes) entry
#[derive(Debug, Clone)]
pub struct RegisteredDocument {
    uri: String,
    bytes: Arc<[u8]>,
    checksum: Checksum,
}

impl RegisteredDocument {
    fn new(uri: String, bytes: Vec<u8>) -> Self {
        let checksum = Checksum::from_bytes(&bytes);
        Self {
            uri,
            bytes: bytes.into(),
            checksum,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Shared handle to the registered bytes
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }
}

/// In-memory map of canonical URI to registered document
#[derive(Debug, Clone, Default)]
pub struct UriRegistry {
    documents: HashMap<String, RegisteredDocument>,
}

impl UriRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the draft-03, -04, -06 and -07 meta-schemas
    pub fn with_meta_schemas() -> Result<Self> {
        let mut registry = Self::new();
        for (uri, file_name) in META_SCHEMA_URIS {
            let file = META_SCHEMAS
                .get_file(file_name)
                .ok_or_else(|| HarnessError::ResourceNotFound {
                    path: PathBuf::from("metaschemas").join(file_name),
                })?;
            registry.register(uri, file.contents())?;
        }
        Ok(registry)
    }

    /// Register a document under `uri`.
    ///
    /// Re-registering identical content is a no-op; different content under
    /// an existing URI is a configuration bug and fails.
    pub fn register(&mut self, uri: &str, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let key = canonical_uri(uri)?;
        let bytes = bytes.into();

        if let Some(existing) = self.documents.get(&key) {
            if *existing.bytes == *bytes {
                return Ok(());
            }
            return Err(HarnessError::DuplicateRegistration { uri: key });
        }

        debug!(uri = %key, len = bytes.len(), "registered document");
        self.documents
            .insert(key.clone(), RegisteredDocument::new(key, bytes));
        Ok(())
    }

    /// Exact-match lookup after canonicalization
    pub fn lookup(&self, uri: &str) -> Result<Arc<[u8]>> {
        let key = canonical_uri(uri)?;
        self.documents
            .get(&key)
            .map(RegisteredDocument::bytes)
            .ok_or(HarnessError::UnknownReference { uri: key })
    }

    pub fn contains(&self, uri: &str) -> bool {
        canonical_uri(uri)
            .map(|key| self.documents.contains_key(&key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All registered documents, sorted by URI
    pub fn documents(&self) -> Vec<&RegisteredDocument> {
        let mut docs: Vec<_> = self.documents.values().collect();
        docs.sort_by(|a, b| a.uri.cmp(&b.uri));
        docs
    }
}
