//! URL generators and the service container that exposes them to
//! expressions.
//!
//! Route hrefs compile to expressions such as
//! `service('hateoas.url_generator').generate('user_get', {'id': object.id}, false)`.
//! The container answers `service()` with a [`UrlGeneratorService`] object
//! whose `generate` method forwards to the registered [`UrlGenerator`].

use std::collections::HashMap;
use std::sync::Arc;

use hateoas_core::{ClassInfo, Container, ExpressionError, Object, UrlGenerator, Value};

/// Service id of the default URL generator.
pub const URL_GENERATOR_SERVICE: &str = "hateoas.url_generator";

/// Service id of the URL generator registered as `generator`.
#[must_use]
pub fn url_generator_service_id(generator: Option<&str>) -> String {
    match generator {
        Some(name) => format!("{URL_GENERATOR_SERVICE}.{name}"),
        None => URL_GENERATOR_SERVICE.to_string(),
    }
}

/// The default URL generator plus any number of named ones.
#[derive(Clone, Default)]
pub struct UrlGeneratorRegistry {
    default: Option<Arc<dyn UrlGenerator>>,
    named: HashMap<String, Arc<dyn UrlGenerator>>,
}

impl UrlGeneratorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator; `None` sets the default one. A later
    /// registration under the same name replaces the earlier one.
    pub fn set(&mut self, name: Option<&str>, generator: Arc<dyn UrlGenerator>) {
        match name {
            Some(name) => {
                self.named.insert(name.to_string(), generator);
            }
            None => self.default = Some(generator),
        }
    }

    #[must_use]
    pub fn get(&self, name: Option<&str>) -> Option<&Arc<dyn UrlGenerator>> {
        match name {
            Some(name) => self.named.get(name),
            None => self.default.as_ref(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.named.is_empty()
    }
}

impl std::fmt::Debug for UrlGeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut named: Vec<&str> = self.named.keys().map(String::as_str).collect();
        named.sort_unstable();
        f.debug_struct("UrlGeneratorRegistry")
            .field("default", &self.default.is_some())
            .field("named", &named)
            .finish()
    }
}

static URL_GENERATOR_SERVICE_CLASS: ClassInfo = ClassInfo::new("hateoas::UrlGeneratorService");

/// Expression-side handle of a [`UrlGenerator`].
///
/// Exposes one method, `generate(route, parameters, absolute)`.
pub struct UrlGeneratorService {
    generator: Arc<dyn UrlGenerator>,
}

impl UrlGeneratorService {
    #[must_use]
    pub fn new(generator: Arc<dyn UrlGenerator>) -> Self {
        Self { generator }
    }
}

impl Object for UrlGeneratorService {
    fn class_info(&self) -> &'static ClassInfo {
        &URL_GENERATOR_SERVICE_CLASS
    }

    fn property(&self, _name: &str) -> Option<Value> {
        None
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Value, ExpressionError> {
        if method != "generate" {
            return Err(ExpressionError::UnknownMethod {
                class: URL_GENERATOR_SERVICE_CLASS.name.to_string(),
                method: method.to_string(),
            });
        }

        let (route, parameters, absolute) = match args {
            [Value::String(route)] => (route, &[][..], false),
            [Value::String(route), Value::Map(parameters)] => (route, parameters.as_slice(), false),
            [Value::String(route), Value::Map(parameters), absolute] => {
                (route, parameters.as_slice(), absolute.is_truthy())
            }
            _ => {
                return Err(ExpressionError::Type(
                    "generate() expects (route, parameters, absolute)".to_string(),
                ))
            }
        };

        self.generator
            .generate(route, parameters, absolute)
            .map(Value::String)
    }
}

/// Services and parameters visible to expressions through `service()` and
/// `parameter()`.
#[derive(Default)]
pub struct ServiceContainer {
    generators: UrlGeneratorRegistry,
    services: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
}

impl ServiceContainer {
    #[must_use]
    pub fn new(generators: UrlGeneratorRegistry) -> Self {
        Self {
            generators,
            ..Self::default()
        }
    }

    pub fn set_generators(&mut self, generators: UrlGeneratorRegistry) {
        self.generators = generators;
    }

    pub fn add_service(&mut self, id: impl Into<String>, service: Value) {
        self.services.insert(id.into(), service);
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    #[must_use]
    pub fn generators(&self) -> &UrlGeneratorRegistry {
        &self.generators
    }

    fn generator_service(&self, id: &str) -> Option<Value> {
        let name = match id.strip_prefix(URL_GENERATOR_SERVICE)? {
            "" => None,
            rest => Some(rest.strip_prefix('.')?),
        };
        let generator = Arc::clone(self.generators.get(name)?);
        Some(Value::object(UrlGeneratorService::new(generator)))
    }
}

impl Container for ServiceContainer {
    fn service(&self, id: &str) -> Option<Value> {
        self.services
            .get(id)
            .cloned()
            .or_else(|| self.generator_service(id))
    }

    fn parameter(&self, name: &str) -> Option<Value> {
        self.parameters.get(name).cloned()
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("generators", &self.generators)
            .field("services", &self.services.len())
            .field("parameters", &self.parameters.len())
            .finish()
    }
}
