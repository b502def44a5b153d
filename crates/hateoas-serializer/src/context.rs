//! Per-call serialization state.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use hateoas_core::value::same_object;
use hateoas_core::ObjectRef;

/// Typed storage for state that subscribers keep for the duration of one
/// serialization call.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// The stored `T`, inserting `T::default()` first if absent.
    pub fn get_or_default<T: Any + Send + Sync + Default>(&mut self) -> &mut T {
        let slot = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("extensions are keyed by TypeId"),
        }
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// Options and traversal state of one serialization call.
///
/// Created fresh for every call and never shared.
#[derive(Debug, Default)]
pub struct SerializationContext {
    groups: Option<Vec<String>>,
    version: Option<String>,
    max_depth_checks: bool,
    serialize_null: bool,
    visiting: Vec<ObjectRef>,
    /// `max_depth` of each property currently being navigated, outermost
    /// first.
    property_depths: Vec<Option<usize>>,
    extensions: Extensions,
}

impl SerializationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only serialize properties in at least one of these groups.
    /// Properties without groups belong to `Default`.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn enable_max_depth_checks(mut self) -> Self {
        self.max_depth_checks = true;
        self
    }

    /// Write `null` values instead of omitting them.
    #[must_use]
    pub fn serialize_null(mut self, serialize_null: bool) -> Self {
        self.serialize_null = serialize_null;
        self
    }

    #[must_use]
    pub fn groups(&self) -> Option<&[String]> {
        self.groups.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn max_depth_checks(&self) -> bool {
        self.max_depth_checks
    }

    #[must_use]
    pub fn should_serialize_null(&self) -> bool {
        self.serialize_null
    }

    /// Whether `object` is currently being serialized further up the graph.
    #[must_use]
    pub fn is_visiting(&self, object: &ObjectRef) -> bool {
        self.visiting.iter().any(|o| same_object(o, object))
    }

    /// Number of objects currently being serialized.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.visiting.len()
    }

    pub(crate) fn start_visiting(&mut self, object: &ObjectRef) {
        self.visiting.push(ObjectRef::clone(object));
    }

    pub(crate) fn stop_visiting(&mut self) {
        self.visiting.pop();
    }

    pub(crate) fn push_property(&mut self, max_depth: Option<usize>) {
        self.property_depths.push(max_depth);
    }

    pub(crate) fn pop_property(&mut self) {
        self.property_depths.pop();
    }

    /// Some enclosing property allows fewer nesting levels than the current
    /// position. Counting starts at the innermost property; a `max_depth` of
    /// zero on the innermost property itself is ignored.
    #[must_use]
    pub fn is_too_deep(&self) -> bool {
        self.property_depths
            .iter()
            .rev()
            .enumerate()
            .any(|(i, max_depth)| match max_depth {
                Some(0) if i == 0 => false,
                Some(limit) => i + 1 > *limit,
                None => false,
            })
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
