//! Schema references and resolution context
//!
//! A [`SchemaReference`] splits a `$ref` URI into the base document URI that
//! drives resolution and the optional fragment applied afterwards. A
//! [`ResolutionContext`] tracks the document currently being resolved so
//! relative references can be joined, and bounds how deep `$ref` chains go.

use std::fmt;

use url::Url;

use crate::error::{HarnessError, Result};

/// Default bound on nested `$ref` chains
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// An absolute URI with the fragment split off
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaReference {
    base: Url,
    fragment: Option<String>,
}

impl SchemaReference {
    /// Parse an absolute reference URI
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).map_err(|source| HarnessError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        Ok(Self::from_url(url))
    }

    /// Build a reference from an already-parsed URL. An empty fragment
    /// (`...schema#`) addresses the whole document and is dropped.
    pub fn from_url(mut url: Url) -> Self {
        let fragment = url
            .fragment()
            .filter(|f| !f.is_empty())
            .map(String::from);
        url.set_fragment(None);
        Self { base: url, fragment }
    }

    /// The document URI, fragment stripped
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// `host[:port]` of the base URI; empty for URIs without a host
    pub fn authority(&self) -> String {
        match (self.base.host_str(), self.base.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        }
    }

    pub fn path(&self) -> &str {
        self.base.path()
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fragment {
            Some(fragment) => write!(f, "{}#{}", self.base, fragment),
            None => write!(f, "{}", self.base),
        }
    }
}

/// Canonical registry key for a URI: parsed, normalized by the URL parser,
/// fragment removed.
pub fn canonical_uri(uri: &str) -> Result<String> {
    Ok(SchemaReference::parse(uri)?.base.to_string())
}

/// Per-request resolution state, passed by reference through nested lookups
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    current: Option<Url>,
    depth: usize,
    max_depth: usize,
}

impl ResolutionContext {
    /// Context for a top-level request with no enclosing document
    pub fn root(max_depth: usize) -> Self {
        Self {
            current: None,
            depth: 0,
            max_depth,
        }
    }

    /// Context for resolving references found inside `document`
    pub fn for_document(document: &SchemaReference, max_depth: usize) -> Self {
        Self {
            current: Some(document.base.clone()),
            depth: 0,
            max_depth,
        }
    }

    pub fn current(&self) -> Option<&Url> {
        self.current.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Turn a raw `$ref` value into an absolute reference, joining it
    /// against the current document when it is relative.
    pub fn reference(&self, raw: &str) -> Result<SchemaReference> {
        let joined = match &self.current {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        let url = joined.map_err(|source| HarnessError::InvalidUri {
            uri: raw.to_string(),
            source,
        })?;
        Ok(SchemaReference::from_url(url))
    }

    /// Context for resolving inside `reference`, one level deeper
    pub fn descend(&self, reference: &SchemaReference) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(HarnessError::RecursionLimit {
                uri: reference.to_string(),
                max_depth: self.max_depth,
            });
        }
        Ok(Self {
            current: Some(reference.base.clone()),
            depth,
            max_depth: self.max_depth,
        })
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::root(DEFAULT_MAX_DEPTH)
    }
}
