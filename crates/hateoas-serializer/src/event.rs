//! Serialization events.

use hateoas_core::{ObjectRef, Result};

use crate::context::SerializationContext;
use crate::navigator::PropertyVisitor;

/// Raised after the properties of an object have been written and before
/// its map is closed.
#[derive(Debug, Clone, Copy)]
pub struct PostSerializeEvent<'a> {
    pub object: &'a ObjectRef,
    /// Type the object was navigated as; differs from the runtime class for
    /// objects viewed through a virtual type.
    pub type_name: &'a str,
}

/// Hooks into the serialization of every object.
pub trait EventSubscriber: Send + Sync {
    /// Properties visited through `visitor` are appended to the object's
    /// output.
    ///
    /// # Errors
    ///
    /// Errors abort the serialization call.
    fn on_post_serialize(
        &self,
        event: &PostSerializeEvent<'_>,
        visitor: &mut dyn PropertyVisitor,
        context: &mut SerializationContext,
    ) -> Result<()>;
}
