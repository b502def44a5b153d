//! Collaborator contracts: expression evaluation, services, URL generation.

use crate::error::ExpressionError;
use crate::value::Value;

/// Variables visible to an expression.
#[derive(Clone, Copy)]
pub struct Bindings<'a> {
    /// The instance the expression is evaluated against (`object`).
    pub object: &'a Value,
    /// Service and parameter lookups for `service()` / `parameter()`.
    pub container: Option<&'a dyn Container>,
}

impl<'a> Bindings<'a> {
    #[must_use]
    pub fn new(object: &'a Value) -> Self {
        Self {
            object,
            container: None,
        }
    }

    #[must_use]
    pub fn with_container(mut self, container: &'a dyn Container) -> Self {
        self.container = Some(container);
        self
    }
}

/// Evaluates expression strings (conditional exclusion, embedded content,
/// route hrefs).
pub trait ExpressionEvaluator: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`ExpressionError`] when the expression cannot be parsed or
    /// one of its references cannot be resolved.
    fn evaluate(&self, expression: &str, bindings: &Bindings<'_>) -> Result<Value, ExpressionError>;
}

/// Named services and parameters reachable from expressions.
pub trait Container: Send + Sync {
    fn service(&self, id: &str) -> Option<Value>;

    fn parameter(&self, name: &str) -> Option<Value>;
}

/// Turns a route name and parameters into a URL.
pub trait UrlGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ExpressionError::UnknownRoute`] when the route is unknown.
    fn generate(
        &self,
        route: &str,
        parameters: &[(String, Value)],
        absolute: bool,
    ) -> Result<String, ExpressionError>;
}

impl<F> UrlGenerator for F
where
    F: Fn(&str, &[(String, Value)], bool) -> Result<String, ExpressionError> + Send + Sync,
{
    fn generate(
        &self,
        route: &str,
        parameters: &[(String, Value)],
        absolute: bool,
    ) -> Result<String, ExpressionError> {
        self(route, parameters, absolute)
    }
}
