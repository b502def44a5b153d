//! # hateoas-metadata
//!
//! The class metadata store. Relation declarations for a class are read
//! from a chain of [`RelationDriver`]s:
//! - [`YamlDriver`]: relation files located through namespace-prefixed
//!   directories ([`FileLocator`])
//! - [`ClassDeclaredDriver`]: relations declared on the [`ClassInfo`] itself
//! - [`StaticDriver`]: relations registered in code
//!
//! [`MetadataStore`] merges the declarations of a class hierarchy (root
//! first), optionally appends interface relations, and caches the result in
//! memory and, with a [`FileCache`], on disk.
//!
//! [`ClassInfo`]: hateoas_core::ClassInfo

pub mod cache;
pub mod driver;
pub mod locator;
pub mod store;

pub use cache::{CacheEntry, FileCache, SourceHash};
pub use driver::{ClassDeclaredDriver, DriverChain, RelationDriver, StaticDriver, YamlDriver};
pub use locator::FileLocator;
pub use store::MetadataStore;
