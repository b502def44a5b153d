//! Depth-first traversal of an object graph into a JSON tree.
//!
//! For every object the navigator resolves host metadata, writes the
//! non-excluded properties in order, stops visiting the object, lets the
//! post-serialize subscribers add properties, then closes the map.

use std::sync::Arc;

use serde_json::{Map, Number, Value as Json};

use hateoas_core::{HateoasError, ObjectRef, Result, Value};

use crate::context::SerializationContext;
use crate::driver::{MetadataFactory, TypeRef};
use crate::event::{EventSubscriber, PostSerializeEvent};
use crate::exclusion::Exclusions;
use crate::metadata::{Accessor, ClassMetadata, PropertyMetadata};

/// Writes a property of an object into the map currently being built.
pub trait PropertyVisitor {
    /// # Errors
    ///
    /// Fails when the property value cannot be computed or serialized.
    fn visit_property(
        &mut self,
        property: &PropertyMetadata,
        object: &ObjectRef,
        context: &mut SerializationContext,
    ) -> Result<()>;
}

pub(crate) struct GraphNavigator<'a> {
    factory: &'a MetadataFactory,
    exclusions: Exclusions<'a>,
    subscribers: &'a [Arc<dyn EventSubscriber>],
    open: Vec<Map<String, Json>>,
}

impl<'a> GraphNavigator<'a> {
    pub fn new(
        factory: &'a MetadataFactory,
        exclusions: Exclusions<'a>,
        subscribers: &'a [Arc<dyn EventSubscriber>],
    ) -> Self {
        Self {
            factory,
            exclusions,
            subscribers,
            open: Vec::new(),
        }
    }

    /// Serialize `value`. Objects are navigated as `type_name` when given.
    /// `None` means the value was skipped.
    pub fn accept(
        &mut self,
        value: &Value,
        type_name: Option<&str>,
        context: &mut SerializationContext,
    ) -> Result<Option<Json>> {
        Ok(Some(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(json) = self.accept_nullable(item, context)? {
                        out.push(json);
                    }
                }
                Json::Array(out)
            }
            Value::Map(entries) => {
                let mut out = Map::new();
                for (key, item) in entries {
                    if let Some(json) = self.accept_nullable(item, context)? {
                        out.insert(key.clone(), json);
                    }
                }
                Json::Object(out)
            }
            Value::Object(object) => return self.accept_object(object, type_name, false, context),
        }))
    }

    /// Like [`GraphNavigator::accept`] but maps skipped values and nulls to
    /// `None` unless nulls are serialized.
    fn accept_nullable(&mut self, value: &Value, context: &mut SerializationContext) -> Result<Option<Json>> {
        let json = self.accept(value, None, context)?.unwrap_or(Json::Null);
        Ok((!json.is_null() || context.should_serialize_null()).then_some(json))
    }

    /// `reentrant` marks the object that is currently being visited, viewed
    /// through another type; the cycle check does not apply to it.
    fn accept_object(
        &mut self,
        object: &ObjectRef,
        type_name: Option<&str>,
        reentrant: bool,
        context: &mut SerializationContext,
    ) -> Result<Option<Json>> {
        if !reentrant && context.is_visiting(object) {
            return Ok(None);
        }
        if self.exclusions.should_skip_object(context) {
            return Ok(None);
        }

        let ty = match type_name {
            Some(name) => TypeRef::named(name),
            None => TypeRef::class(object.class_info()),
        };
        let metadata = self
            .factory
            .metadata_for(&ty)?
            .ok_or_else(|| HateoasError::Serialization(format!("no metadata for type '{}'", ty.name)))?;

        context.start_visiting(object);
        self.open.push(Map::new());
        let visited = self.visit_properties(&metadata, object, context);
        context.stop_visiting();

        let result = visited.and_then(|()| self.post_serialize(object, ty.name, context));
        let map = self.open.pop().unwrap_or_default();
        result?;
        Ok(Some(Json::Object(map)))
    }

    fn visit_properties(
        &mut self,
        metadata: &ClassMetadata,
        object: &ObjectRef,
        context: &mut SerializationContext,
    ) -> Result<()> {
        for property in &metadata.properties {
            if self.exclusions.should_skip_property(property, object, context)? {
                continue;
            }
            context.push_property(property.max_depth);
            let result = self.visit_property(property, object, context);
            context.pop_property();
            result?;
        }
        Ok(())
    }

    fn post_serialize(
        &mut self,
        object: &ObjectRef,
        type_name: &str,
        context: &mut SerializationContext,
    ) -> Result<()> {
        let subscribers = self.subscribers;
        let event = PostSerializeEvent { object, type_name };
        for subscriber in subscribers {
            subscriber.on_post_serialize(&event, self, context)?;
        }
        Ok(())
    }

    fn read(&self, property: &PropertyMetadata, object: &ObjectRef) -> Result<Value> {
        match &property.accessor {
            Accessor::Reflection => Ok(object.property(&property.name).unwrap_or_default()),
            Accessor::Static(value) => Ok(value.clone()),
            Accessor::Expression(expression) => self
                .exclusions
                .scope
                .evaluate(expression, object)
                .map_err(|source| HateoasError::UnknownRelationTarget {
                    property: property.name.clone(),
                    source,
                }),
            Accessor::Source => Ok(Value::Object(ObjectRef::clone(object))),
        }
    }
}

impl PropertyVisitor for GraphNavigator<'_> {
    fn visit_property(
        &mut self,
        property: &PropertyMetadata,
        object: &ObjectRef,
        context: &mut SerializationContext,
    ) -> Result<()> {
        let type_name = property.type_name.as_deref();
        let json = if matches!(property.accessor, Accessor::Source) {
            self.accept_object(object, type_name, true, context)?
        } else {
            let value = self.read(property, object)?;
            self.accept(&value, type_name, context)?
        };

        let json = json.unwrap_or(Json::Null);
        if json.is_null() && !context.should_serialize_null() {
            return Ok(());
        }
        if property.skip_when_empty && is_empty(&json) {
            return Ok(());
        }
        if let Some(map) = self.open.last_mut() {
            map.insert(property.serialized_name.clone(), json);
        }
        Ok(())
    }
}

fn is_empty(json: &Json) -> bool {
    match json {
        Json::Object(map) => map.is_empty(),
        Json::Array(items) => items.is_empty(),
        _ => false,
    }
}
