//! # hateoas
//!
//! Hypermedia for serialized objects. Relations declared for a class (in
//! YAML files, on its [`ClassInfo`] or in code) become `_links` and
//! `_embedded` sections of its serialized form:
//!
//! ```json
//! {
//!   "first_name": "Adrien",
//!   "_links": { "self": { "href": "http://adrienbrault.fr", "foo": "bar" } },
//!   "_embedded": { "computer": { "name": "MacBook Pro" } }
//! }
//! ```
//!
//! The sections are properties of synthetic types ([`synthetic`]) whose host
//! metadata is produced from the relations ([`driver`]) and which are
//! appended to each object after its own fields ([`subscriber`]).
//!
//! [`ClassInfo`]: hateoas_core::ClassInfo

pub mod builder;
pub mod driver;
pub mod subscriber;
pub mod synthetic;
pub mod url;

use std::sync::Arc;

use hateoas_core::{ClassInfo, ClassRelationMetadata, Result, Value};
use hateoas_metadata::MetadataStore;
use hateoas_serializer::{OutputFormat, SerializationContext, Serializer};

pub use builder::HateoasBuilder;
pub use driver::{EmbeddedMetadataDriver, SyntheticField, SyntheticMetadataDescriptor, SyntheticValue};
pub use subscriber::{InjectionSubscriber, EMBEDDED_PROPERTY, LINKS_PROPERTY};
pub use synthetic::{SyntheticKind, SyntheticTypeIdentity, SyntheticTypeRegistry, DEFAULT_MARKER};
pub use url::{ServiceContainer, UrlGeneratorRegistry, UrlGeneratorService, URL_GENERATOR_SERVICE};

/// A serializer that injects `_links` and `_embedded`. Share it freely;
/// every call carries its own [`SerializationContext`].
#[derive(Debug)]
pub struct Hateoas {
    serializer: Serializer,
    store: Arc<MetadataStore>,
    registry: Arc<SyntheticTypeRegistry>,
}

impl Hateoas {
    #[must_use]
    pub fn builder() -> HateoasBuilder {
        HateoasBuilder::new()
    }

    /// Serialize and render `value`.
    ///
    /// # Errors
    ///
    /// Fails when relation metadata cannot be loaded or an embedded
    /// content, href or exclusion expression cannot be evaluated.
    pub fn serialize(
        &self,
        value: &Value,
        format: OutputFormat,
        context: SerializationContext,
    ) -> Result<String> {
        self.serializer.serialize(value, format, context)
    }

    /// Serialize `value` into a JSON tree.
    ///
    /// # Errors
    ///
    /// See [`Hateoas::serialize`].
    pub fn to_tree(&self, value: &Value, context: SerializationContext) -> Result<serde_json::Value> {
        self.serializer.to_tree(value, context)
    }

    /// Merged relations of `class`.
    ///
    /// # Errors
    ///
    /// Propagates relation metadata failures.
    pub fn relations_for(&self, class: &'static ClassInfo) -> Result<Option<Arc<ClassRelationMetadata>>> {
        Ok(self.store.metadata_for_class(class)?)
    }

    #[must_use]
    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    #[must_use]
    pub fn registry(&self) -> &SyntheticTypeRegistry {
        &self.registry
    }
}
