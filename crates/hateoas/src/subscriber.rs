//! Appends `_links` and `_embedded` to every object that declares
//! relations.

use std::collections::HashMap;
use std::sync::Arc;

use hateoas_core::value::object_id;
use hateoas_core::{ObjectRef, Result};
use hateoas_metadata::MetadataStore;
use hateoas_serializer::{
    EventSubscriber, PostSerializeEvent, PropertyMetadata, PropertyVisitor, SerializationContext,
};

use crate::synthetic::{SyntheticKind, SyntheticTypeRegistry};

pub const LINKS_PROPERTY: &str = "_links";
pub const EMBEDDED_PROPERTY: &str = "_embedded";

/// Objects already decorated during the current serialization call. Lives
/// in the context extensions; holds a handle so addresses are not reused.
#[derive(Default)]
struct Decorated(HashMap<usize, ObjectRef>);

pub struct InjectionSubscriber {
    store: Arc<MetadataStore>,
    registry: Arc<SyntheticTypeRegistry>,
}

impl InjectionSubscriber {
    #[must_use]
    pub fn new(store: Arc<MetadataStore>, registry: Arc<SyntheticTypeRegistry>) -> Self {
        Self { store, registry }
    }
}

impl EventSubscriber for InjectionSubscriber {
    fn on_post_serialize(
        &self,
        event: &PostSerializeEvent<'_>,
        visitor: &mut dyn PropertyVisitor,
        context: &mut SerializationContext,
    ) -> Result<()> {
        if self.registry.is_synthetic(event.type_name) {
            return Ok(());
        }

        let object = event.object;
        let class = object.class_info();
        let Some(metadata) = self.store.metadata_for_class(class)? else {
            return Ok(());
        };

        let decorated = context.extensions_mut().get_or_default::<Decorated>();
        let id = object_id(object);
        if decorated.0.contains_key(&id) {
            return Ok(());
        }
        decorated.0.insert(id, ObjectRef::clone(object));

        if context.is_visiting(object) {
            return Ok(());
        }

        tracing::trace!(class = class.name, "injecting relations");
        if metadata.has_links() {
            let links = self.registry.mint(class, SyntheticKind::Links);
            let property = PropertyMetadata::source(class.name, LINKS_PROPERTY)
                .typed(links.as_str())
                .skip_when_empty();
            visitor.visit_property(&property, object, context)?;
        }
        if metadata.has_embedded() {
            let embedded = self.registry.mint(class, SyntheticKind::Embedded);
            let property = PropertyMetadata::source(class.name, EMBEDDED_PROPERTY)
                .typed(embedded.as_str())
                .skip_when_empty();
            visitor.visit_property(&property, object, context)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for InjectionSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionSubscriber")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
