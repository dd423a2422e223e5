//! Composite Resolver
//!
//! Single dispatch point for fetching the bytes behind a `$ref`. A
//! [`ResolverRoute`] inspects the authority of each reference: the synthetic
//! fixture host goes to the [`FsRemoteResolver`], everything else to the
//! [`UriRegistry`]. Errors from either side are passed through unchanged.

use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::reference::{ResolutionContext, SchemaReference};
use crate::registry::UriRegistry;
use crate::remote::FsRemoteResolver;

/// Readable document bytes; released when dropped
pub type ByteStream = Box<dyn Read + Send>;

/// Authority the JSON-Schema-Test-Suite uses for its remote fixtures
pub const DEFAULT_LOCAL_AUTHORITY: &str = "localhost:1234";

/// Which delegate serves a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Filesystem remotes tree
    Remotes,
    /// Pre-registered documents
    Registry,
}

/// Routing policy: references whose authority equals the local marker are
/// fixtures, the rest fall through to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverRoute {
    local_authority: String,
}

impl ResolverRoute {
    pub fn new(local_authority: impl Into<String>) -> Self {
        Self {
            local_authority: local_authority.into(),
        }
    }

    pub fn local_authority(&self) -> &str {
        &self.local_authority
    }

    pub fn classify(&self, reference: &SchemaReference) -> RouteTarget {
        if reference.authority().eq_ignore_ascii_case(&self.local_authority) {
            RouteTarget::Remotes
        } else {
            RouteTarget::Registry
        }
    }
}

impl Default for ResolverRoute {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_AUTHORITY)
    }
}

/// Registry + filesystem resolver behind one `resolve` call.
///
/// Immutable once built; share it across workers with `Arc`.
#[derive(Debug, Clone)]
pub struct CompositeResolver {
    registry: Arc<UriRegistry>,
    remotes: FsRemoteResolver,
    route: ResolverRoute,
}

impl CompositeResolver {
    pub fn new(registry: Arc<UriRegistry>, remotes: FsRemoteResolver, route: ResolverRoute) -> Self {
        Self {
            registry,
            remotes,
            route,
        }
    }

    /// Build a resolver with the meta-schema registry and the fixture tree
    /// named by `config`
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let registry = UriRegistry::with_meta_schemas()?;
        let remotes = FsRemoteResolver::new(config.suite_root())?
            .with_read_timeout(config.resolver.read_timeout());
        Ok(Self::new(
            Arc::new(registry),
            remotes,
            ResolverRoute::new(config.resolver.local_authority.clone()),
        ))
    }

    pub fn registry(&self) -> &UriRegistry {
        &self.registry
    }

    pub fn remotes(&self) -> &FsRemoteResolver {
        &self.remotes
    }

    pub fn route(&self) -> &ResolverRoute {
        &self.route
    }

    /// Open the document behind `reference`. The fragment is ignored here;
    /// it is applied by the loader once the base document is parsed.
    pub fn resolve(&self, context: &ResolutionContext, reference: &SchemaReference) -> Result<ByteStream> {
        match self.route.classify(reference) {
            RouteTarget::Remotes => {
                debug!(uri = %reference.base(), depth = context.depth(), "resolving from remotes");
                self.remotes.resolve(reference)
            }
            RouteTarget::Registry => {
                debug!(uri = %reference.base(), depth = context.depth(), "resolving from registry");
                let bytes = self.registry.lookup(reference.base().as_str())?;
                Ok(Box::new(Cursor::new(bytes)))
            }
        }
    }

    /// [`resolve`](Self::resolve) and drain the stream
    pub fn resolve_bytes(&self, context: &ResolutionContext, reference: &SchemaReference) -> Result<Vec<u8>> {
        let mut stream = self.resolve(context, reference)?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|source| HarnessError::Io {
                path: PathBuf::from(reference.base().as_str()),
                source,
            })?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn resolver_with_fixtures() -> (tempfile::TempDir, CompositeResolver) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("remotes")).unwrap();
        fs::write(dir.path().join("remotes/integer.json"), br#"{"type": "integer"}"#).unwrap();

        let resolver = CompositeResolver::new(
            Arc::new(UriRegistry::with_meta_schemas().unwrap()),
            FsRemoteResolver::new(dir.path()).unwrap(),
            ResolverRoute::default(),
        );
        (dir, resolver)
    }

    #[test]
    fn test_resolver_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompositeResolver>();
        assert_send_sync::<UriRegistry>();
    }

    #[test]
    fn test_route_classification() {
        let route = ResolverRoute::default();
        let fixture = SchemaReference::parse("http://localhost:1234/integer.json").unwrap();
        let meta = SchemaReference::parse("http://json-schema.org/draft-07/schema#").unwrap();
        let other_port = SchemaReference::parse("http://localhost:4321/integer.json").unwrap();

        assert_eq!(route.classify(&fixture), RouteTarget::Remotes);
        assert_eq!(route.classify(&meta), RouteTarget::Registry);
        assert_eq!(route.classify(&other_port), RouteTarget::Registry);
        assert_eq!(
            ResolverRoute::new("fixtures.test").classify(&SchemaReference::parse("http://fixtures.test/a.json").unwrap()),
            RouteTarget::Remotes
        );
    }

    #[test]
    fn test_registry_route_returns_registered_bytes() {
        let (_dir, resolver) = resolver_with_fixtures();
        let ctx = ResolutionContext::default();
        let reference = SchemaReference::parse("http://json-schema.org/draft-07/schema").unwrap();

        let bytes = resolver.resolve_bytes(&ctx, &reference).unwrap();
        let expected = resolver.registry().lookup("http://json-schema.org/draft-07/schema").unwrap();
        assert_eq!(bytes, &*expected);
    }

    #[test]
    fn test_remote_route_reads_fixture() {
        let (dir, resolver) = resolver_with_fixtures();
        let ctx = ResolutionContext::default();
        let reference = SchemaReference::parse("http://localhost:1234/integer.json").unwrap();

        let bytes = resolver.resolve_bytes(&ctx, &reference).unwrap();
        assert_eq!(bytes, fs::read(dir.path().join("remotes/integer.json")).unwrap());
    }

    #[test]
    fn test_errors_pass_through() {
        let (_dir, resolver) = resolver_with_fixtures();
        let ctx = ResolutionContext::default();

        let missing = SchemaReference::parse("http://localhost:1234/missing.json").unwrap();
        assert!(matches!(
            resolver.resolve(&ctx, &missing),
            Err(HarnessError::ResourceNotFound { .. })
        ));

        let unknown = SchemaReference::parse("http://example.com/unregistered.json").unwrap();
        assert!(matches!(
            resolver.resolve(&ctx, &unknown),
            Err(HarnessError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_concurrent_resolution_is_identical() {
        let (_dir, resolver) = resolver_with_fixtures();
        let resolver = Arc::new(resolver);
        let uris = [
            "http://localhost:1234/integer.json",
            "http://json-schema.org/draft-04/schema#",
        ];

        for uri in uris {
            let reference = SchemaReference::parse(uri).unwrap();
            let first = resolver.resolve_bytes(&ResolutionContext::default(), &reference).unwrap();

            std::thread::scope(|s| {
                let handles: Vec<_> = (0..8)
                    .map(|_| {
                        let resolver = Arc::clone(&resolver);
                        let reference = reference.clone();
                        s.spawn(move || {
                            resolver
                                .resolve_bytes(&ResolutionContext::default(), &reference)
                                .unwrap()
                        })
                    })
                    .collect();
                for handle in handles {
                    assert_eq!(handle.join().unwrap(), first);
                }
            });
        }
    }
}
