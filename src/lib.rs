//! Schema Reference Harness
//!
//! Reference resolution and conformance scaffolding for running the official
//! JSON-Schema-Test-Suite against a validator.
//!
//! ## Features
//!
//! - **Meta-Schema Registry**: draft-03/04/06/07 meta-schemas served from memory
//! - **Fixture Remotes**: `http://localhost:1234/...` references read from the suite's `remotes/` tree
//! - **Composite Routing**: one `resolve` entry point, routed by URI authority
//! - **Loading**: JSON Pointer fragments and transitive `$ref` closure
//! - **Suite Runner**: data-driven case files compiled with `jsonschema`
//!
//! ## Fixture layout
//!
//! ```text
//! JSON-Schema-Test-Suite/
//! ├── remotes/
//! │   ├── integer.json              <- http://localhost:1234/integer.json
//! │   └── baseUriChange/
//! │       └── folderInteger.json    <- http://localhost:1234/baseUriChange/folderInteger.json
//! └── tests/
//!     ├── draft4/
//!     └── draft7/
//!         ├── refRemote.json
//!         └── optional/
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod fixture;
pub mod loader;
pub mod reference;
pub mod registry;
pub mod remote;
pub mod resolver;
pub mod suite;

pub use checksum::Checksum;
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use fixture::{DecodedFixture, EncodedFixture};
pub use loader::{SchemaLoader, ValidatorResolver};
pub use reference::{ResolutionContext, SchemaReference};
pub use registry::{RegisteredDocument, UriRegistry};
pub use remote::FsRemoteResolver;
pub use resolver::{ByteStream, CompositeResolver, ResolverRoute, RouteTarget};
pub use suite::{SuiteDraft, SuiteReport, SuiteRunner};
