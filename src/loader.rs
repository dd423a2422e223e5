//! Schema Loading
//!
//! Turns resolved bytes into JSON documents: applies fragments (JSON Pointer
//! or plain-name anchors), walks nested external `$ref`s transitively, and
//! bridges the [`CompositeResolver`] into the `jsonschema` crate so compiled
//! validators fetch remote references through it.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use anyhow::Context;
use jsonschema::{SchemaResolver, SchemaResolverError};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{HarnessError, Result};
use crate::reference::{ResolutionContext, SchemaReference, DEFAULT_MAX_DEPTH};
use crate::resolver::CompositeResolver;

/// Loads parsed schema documents through a [`CompositeResolver`]
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    resolver: Arc<CompositeResolver>,
    max_depth: usize,
}

impl SchemaLoader {
    pub fn new(resolver: Arc<CompositeResolver>) -> Self {
        Self {
            resolver,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn resolver(&self) -> &CompositeResolver {
        &self.resolver
    }

    /// Load the (sub)schema addressed by an absolute URI
    pub fn load(&self, uri: &str) -> Result<Value> {
        let ctx = ResolutionContext::root(self.max_depth);
        let reference = ctx.reference(uri)?;
        self.load_reference(&ctx, &reference)
    }

    /// Fetch the base document of `reference` and apply its fragment
    pub fn load_reference(&self, context: &ResolutionContext, reference: &SchemaReference) -> Result<Value> {
        let document = self.load_document(context, reference)?;
        resolve_fragment(&document, reference)
    }

    /// Load a document and every external document reachable through its
    /// `$ref`s, keyed by base URI. Each document is fetched once; chains
    /// longer than the configured depth fail with `RecursionLimit`.
    pub fn load_closure(&self, uri: &str) -> Result<BTreeMap<String, Value>> {
        let root_ctx = ResolutionContext::root(self.max_depth);
        let root = root_ctx.reference(uri)?;

        let mut documents = BTreeMap::new();
        let mut queued = HashSet::from([root.base().clone()]);
        let mut pending = VecDeque::from([(root_ctx, root)]);

        while let Some((ctx, reference)) = pending.pop_front() {
            let document = self.load_document(&ctx, &reference)?;
            let scan = scan_refs(&document, reference.base())?;

            for child in scan.refs {
                if scan.embedded.contains(child.base()) || queued.contains(child.base()) {
                    continue;
                }
                queued.insert(child.base().clone());
                pending.push_back((ctx.descend(&child)?, child));
            }

            documents.insert(reference.base().to_string(), document);
        }

        Ok(documents)
    }

    fn load_document(&self, context: &ResolutionContext, reference: &SchemaReference) -> Result<Value> {
        let bytes = self.resolver.resolve_bytes(context, reference)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Apply the fragment of `reference` to an already-fetched document.
///
/// `#/a/b` is an RFC 6901 JSON Pointer (percent-decoded first); `#name` is a
/// plain-name anchor matched against `$id`/`id` values ending in `#name`.
pub fn resolve_fragment(document: &Value, reference: &SchemaReference) -> Result<Value> {
    let fragment = match reference.fragment() {
        None => return Ok(document.clone()),
        Some(fragment) => fragment,
    };
    let not_found = || HarnessError::PointerNotFound {
        uri: reference.base().to_string(),
        pointer: fragment.to_string(),
    };

    let decoded = urlencoding::decode(fragment).map_err(|_| not_found())?;
    let target = if decoded.starts_with('/') {
        document.pointer(&decoded)
    } else {
        find_anchor(document, &format!("#{}", decoded))
    };
    target.cloned().ok_or_else(not_found)
}

fn find_anchor<'a>(value: &'a Value, anchor: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            let id = map.get("$id").or_else(|| map.get("id")).and_then(Value::as_str);
            if id.map(|id| id.ends_with(anchor)).unwrap_or(false) {
                return Some(value);
            }
            map.values().find_map(|child| find_anchor(child, anchor))
        }
        Value::Array(items) => items.iter().find_map(|item| find_anchor(item, anchor)),
        _ => None,
    }
}

/// References found in a document, plus the base URIs its embedded
/// subschemas declare through `$id`/`id`
#[derive(Debug, Default)]
struct RefScan {
    refs: Vec<SchemaReference>,
    embedded: HashSet<Url>,
}

fn scan_refs(document: &Value, base: &Url) -> Result<RefScan> {
    let mut scan = RefScan::default();
    collect_refs(document, base, &mut scan)?;
    Ok(scan)
}

/// Collect all `$ref`s, joining each against the `$id` scope it appears in
fn collect_refs(value: &Value, scope: &Url, scan: &mut RefScan) -> Result<()> {
    match value {
        Value::Object(map) => {
            let scope = match scope_id(map) {
                Some(id) => {
                    let joined = join(scope, id)?;
                    let mut embedded = joined.clone();
                    embedded.set_fragment(None);
                    scan.embedded.insert(embedded);
                    joined
                }
                None => scope.clone(),
            };

            if let Some(raw) = map.get("$ref").and_then(Value::as_str) {
                scan.refs.push(SchemaReference::from_url(join(&scope, raw)?));
            }

            for (key, child) in map {
                // literal data, not subschemas
                if key == "enum" || key == "const" || (key == "$ref" && child.is_string()) {
                    continue;
                }
                collect_refs(child, &scope, scan)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, scope, scan)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn scope_id(map: &Map<String, Value>) -> Option<&str> {
    map.get("$id")
        .or_else(|| map.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.starts_with('#'))
}

fn join(base: &Url, raw: &str) -> Result<Url> {
    base.join(raw).map_err(|source| HarnessError::InvalidUri {
        uri: raw.to_string(),
        source,
    })
}

/// Adapter handing `jsonschema` remote documents through the composite resolver
#[derive(Debug, Clone)]
pub struct ValidatorResolver {
    resolver: Arc<CompositeResolver>,
    max_depth: usize,
}

impl ValidatorResolver {
    pub fn new(resolver: Arc<CompositeResolver>, max_depth: usize) -> Self {
        Self { resolver, max_depth }
    }
}

impl SchemaResolver for ValidatorResolver {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        _original_reference: &str,
    ) -> std::result::Result<Arc<Value>, SchemaResolverError> {
        // jsonschema applies the fragment itself; hand back the whole document
        let reference = SchemaReference::from_url(url.clone());
        let ctx = ResolutionContext::root(self.max_depth);
        let bytes = self
            .resolver
            .resolve_bytes(&ctx, &reference)
            .with_context(|| format!("failed to resolve {}", reference))?;
        let document = serde_json::from_slice(&bytes)
            .with_context(|| format!("{} is not valid JSON", reference))?;
        Ok(Arc::new(document))
    }
}
