//! # hateoas-serializer
//!
//! A small object serializer that the injection engine plugs into:
//! - Host metadata ([`ClassMetadata`], [`PropertyMetadata`]) produced by a
//!   chain of [`MetadataDriver`]s behind a caching [`MetadataFactory`]
//! - Exclusion by groups, version range, depth and `exclude_if`
//! - Depth-first navigation with cycle detection
//! - Post-serialize [`EventSubscriber`]s that may append properties
//! - JSON and YAML rendering
//!
//! Deserialization and XML output are out of scope.

pub mod context;
pub mod driver;
pub mod event;
pub mod exclusion;
pub mod format;
pub mod metadata;
pub mod navigator;

use std::sync::Arc;

use hateoas_core::{Container, ExpressionEvaluator, Result, Value};
use hateoas_expr::ExpressionLanguage;

pub use context::{Extensions, SerializationContext};
pub use driver::{MetadataDriver, MetadataFactory, NamingStrategy, ReflectionDriver, TypeRef};
pub use event::{EventSubscriber, PostSerializeEvent};
pub use format::{render, OutputFormat};
pub use metadata::{Accessor, ClassMetadata, PropertyMetadata};
pub use navigator::PropertyVisitor;

use crate::exclusion::{ExpressionScope, Exclusions};
use crate::navigator::GraphNavigator;

/// Serializes [`Value`] graphs. Cheap to share; every call gets its own
/// [`SerializationContext`].
pub struct Serializer {
    factory: MetadataFactory,
    evaluator: Arc<dyn ExpressionEvaluator>,
    container: Option<Arc<dyn Container>>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl Serializer {
    #[must_use]
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::default()
    }

    #[must_use]
    pub fn metadata_factory(&self) -> &MetadataFactory {
        &self.factory
    }

    /// Serialize into a JSON tree. A skipped root yields `null`.
    ///
    /// # Errors
    ///
    /// Propagates metadata, expression and subscriber failures.
    pub fn to_tree(&self, value: &Value, mut context: SerializationContext) -> Result<serde_json::Value> {
        let exclusions = Exclusions {
            scope: ExpressionScope {
                evaluator: self.evaluator.as_ref(),
                container: self.container.as_deref(),
            },
        };
        let mut navigator = GraphNavigator::new(&self.factory, exclusions, &self.subscribers);
        Ok(navigator
            .accept(value, None, &mut context)?
            .unwrap_or(serde_json::Value::Null))
    }

    /// Serialize and render.
    ///
    /// # Errors
    ///
    /// See [`Serializer::to_tree`] and [`render`].
    pub fn serialize(
        &self,
        value: &Value,
        format: OutputFormat,
        context: SerializationContext,
    ) -> Result<String> {
        render(&self.to_tree(value, context)?, format)
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("factory", &self.factory)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

/// Configures a [`Serializer`].
#[derive(Default)]
pub struct SerializerBuilder {
    drivers: Vec<Arc<dyn MetadataDriver>>,
    naming: NamingStrategy,
    debug: bool,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    container: Option<Arc<dyn Container>>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl SerializerBuilder {
    /// Add a metadata driver. Drivers are asked in the order they were
    /// added, before the [`ReflectionDriver`].
    #[must_use]
    pub fn add_metadata_driver(mut self, driver: Arc<dyn MetadataDriver>) -> Self {
        self.drivers.push(driver);
        self
    }

    #[must_use]
    pub fn naming_strategy(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Disable metadata caching.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Defaults to [`ExpressionLanguage::new`].
    #[must_use]
    pub fn expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Services and parameters visible to expressions.
    #[must_use]
    pub fn container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    #[must_use]
    pub fn add_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    #[must_use]
    pub fn build(self) -> Serializer {
        let mut drivers = self.drivers;
        drivers.push(Arc::new(ReflectionDriver::new(self.naming)));
        Serializer {
            factory: MetadataFactory::new(drivers).debug(self.debug),
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(ExpressionLanguage::new())),
            container: self.container,
            subscribers: self.subscribers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use hateoas_core::{ClassInfo, HateoasError, Object, ObjectRef, PropertyInfo};
    use serde_json::json;

    static NODE: ClassInfo = ClassInfo::new("test::Node").with_properties(&[
        PropertyInfo::new("name"),
        PropertyInfo::new("secretCode").groups(&["admin"]),
        PropertyInfo::new("legacyId").until("1.9"),
        PropertyInfo::new("next").max_depth(1),
        PropertyInfo::new("children"),
    ]);

    struct Node {
        name: String,
        next: Mutex<Option<ObjectRef>>,
        children: Vec<Value>,
    }

    impl Node {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                next: Mutex::new(None),
                children: Vec::new(),
            })
        }
    }

    impl Object for Node {
        fn class_info(&self) -> &'static ClassInfo {
            &NODE
        }

        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "name" => Some(self.name.clone().into()),
                "secretCode" => Some("s3cr3t".into()),
                "legacyId" => Some(Value::Int(7)),
                "next" => self.next.lock().ok()?.clone().map(Value::Object),
                "children" => Some(Value::List(self.children.clone())),
                _ => None,
            }
        }
    }

    fn tree(value: &Value, context: SerializationContext) -> serde_json::Value {
        Serializer::builder().build().to_tree(value, context).unwrap()
    }

    #[test]
    fn properties_follow_declaration_order() {
        let node = Node::new("a");
        let output = tree(&Value::Object(node), SerializationContext::new());
        assert_eq!(
            output,
            json!({ "name": "a", "secret_code": "s3cr3t", "legacy_id": 7, "children": [] })
        );
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "secret_code", "legacy_id", "children"]);
    }

    #[test]
    fn groups_and_versions_exclude_properties() {
        let node: ObjectRef = Node::new("a");
        let value = Value::Object(node);

        let output = tree(&value, SerializationContext::new().with_groups(["Default"]));
        assert!(output.get("secret_code").is_none());
        assert!(output.get("name").is_some());

        let output = tree(&value, SerializationContext::new().with_groups(["admin"]));
        assert_eq!(output, json!({ "secret_code": "s3cr3t" }));

        let output = tree(&value, SerializationContext::new().with_version("2.0"));
        assert!(output.get("legacy_id").is_none());
    }

    #[test]
    fn cycles_are_cut_at_the_repeated_object() {
        let a = Node::new("a");
        let b = Node::new("b");
        *b.next.lock().unwrap() = Some(a.clone());
        *a.next.lock().unwrap() = Some(b.clone());

        let output = tree(&Value::Object(a), SerializationContext::new().with_groups(["Default"]));
        assert_eq!(
            output,
            json!({
                "name": "a",
                "legacy_id": 7,
                "next": { "name": "b", "legacy_id": 7, "children": [] },
                "children": []
            })
        );
    }

    #[test]
    fn max_depth_applies_only_when_enabled() {
        let a = Node::new("a");
        let b = Node::new("b");
        let c = Node::new("c");
        *b.next.lock().unwrap() = Some(c.clone());
        *a.next.lock().unwrap() = Some(b.clone());
        let value = Value::Object(a);
        let context = || SerializationContext::new().with_groups(["Default"]);

        let output = tree(&value, context());
        assert_eq!(output["next"]["next"]["name"], json!("c"));

        let output = tree(&value, context().enable_max_depth_checks());
        assert_eq!(output["next"]["name"], json!("b"));
        assert!(output["next"].get("next").is_none());
    }

    #[test]
    fn nulls_are_omitted_unless_requested() {
        let value = Value::Map(vec![("a".into(), Value::Null), ("b".into(), Value::Int(1))]);
        assert_eq!(tree(&value, SerializationContext::new()), json!({ "b": 1 }));
        assert_eq!(
            tree(&value, SerializationContext::new().serialize_null(true)),
            json!({ "a": null, "b": 1 })
        );
    }

    struct Stamp;

    impl EventSubscriber for Stamp {
        fn on_post_serialize(
            &self,
            event: &PostSerializeEvent<'_>,
            visitor: &mut dyn PropertyVisitor,
            context: &mut SerializationContext,
        ) -> Result<()> {
            let property = PropertyMetadata::expression(event.type_name, "stamp", "'#' ~ object.name");
            visitor.visit_property(&property, event.object, context)
        }
    }

    #[test]
    fn subscribers_append_after_regular_properties() {
        let serializer = Serializer::builder()
            .add_subscriber(Arc::new(Stamp))
            .build();
        let output = serializer
            .to_tree(
                &Value::Object(Node::new("a")),
                SerializationContext::new().with_groups(["Default"]),
            )
            .unwrap();
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "legacy_id", "children", "stamp"]);
        assert_eq!(output["stamp"], json!("#a"));
    }

    #[test]
    fn failing_expressions_surface_to_the_caller() {
        struct Broken;

        impl EventSubscriber for Broken {
            fn on_post_serialize(
                &self,
                event: &PostSerializeEvent<'_>,
                visitor: &mut dyn PropertyVisitor,
                context: &mut SerializationContext,
            ) -> Result<()> {
                let property = PropertyMetadata::expression(event.type_name, "broken", "object.missing");
                visitor.visit_property(&property, event.object, context)
            }
        }

        let serializer = Serializer::builder().add_subscriber(Arc::new(Broken)).build();
        let err = serializer
            .serialize(&Value::Object(Node::new("a")), OutputFormat::Json, SerializationContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            HateoasError::UnknownRelationTarget { ref property, .. } if property == "broken"
        ));
    }
}
