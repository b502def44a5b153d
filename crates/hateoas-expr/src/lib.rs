//! # hateoas-expr
//!
//! A small expression language used for conditional exclusion
//! (`exclude_if`), embedded content and route hrefs. Expressions are parsed
//! with a pest PEG grammar (`src/expression.pest`) into an [`ast::Expr`]
//! and evaluated against [`Bindings`].
//!
//! ```
//! use hateoas_core::{Bindings, ExpressionEvaluator, Value};
//! use hateoas_expr::ExpressionLanguage;
//!
//! let language = ExpressionLanguage::new();
//! let object = Value::Map(vec![("firstName".into(), "Adrien".into())]);
//! let result = language
//!     .evaluate("object.firstName === 'Adrien' and 1 + 1 == 2", &Bindings::new(&object))
//!     .unwrap();
//! assert!(result.is_truthy());
//! ```

pub mod ast;
mod eval;
pub mod functions;
pub mod parser;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use hateoas_core::{Bindings, ExpressionError, ExpressionEvaluator, Value};

use crate::ast::Expr;
use crate::eval::Evaluator;
use crate::functions::{BasicFunctions, ExpressionFunction, FunctionProvider, FunctionRegistry};

pub use crate::parser::parse_expression;

/// Parses, caches and evaluates expressions.
pub struct ExpressionLanguage {
    functions: FunctionRegistry,
    parsed: RwLock<HashMap<String, Arc<Expr>>>,
}

impl ExpressionLanguage {
    /// A language with the [`BasicFunctions`] registered.
    #[must_use]
    pub fn new() -> Self {
        let mut language = Self::empty();
        language.register_provider(&BasicFunctions);
        language
    }

    /// A language without any function.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            functions: FunctionRegistry::default(),
            parsed: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a function.
    pub fn register(&mut self, name: impl Into<String>, function: ExpressionFunction) {
        self.functions.insert(name.into(), function);
    }

    pub fn register_provider(&mut self, provider: &dyn FunctionProvider) {
        for (name, function) in provider.functions() {
            self.functions.insert(name, function);
        }
    }

    /// Parse an expression, reusing the cached tree when available.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::Syntax`] for invalid input.
    pub fn parse(&self, expression: &str) -> Result<Arc<Expr>, ExpressionError> {
        if let Some(expr) = self.parsed.read().get(expression) {
            return Ok(Arc::clone(expr));
        }

        let expr = Arc::new(parse_expression(expression)?);
        tracing::trace!(expression, "parsed expression");
        self.parsed
            .write()
            .insert(expression.to_string(), Arc::clone(&expr));
        Ok(expr)
    }
}

impl Default for ExpressionLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExpressionLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&str> = self.functions.names().collect();
        functions.sort_unstable();
        f.debug_struct("ExpressionLanguage")
            .field("functions", &functions)
            .field("cached_expressions", &self.parsed.read().len())
            .finish()
    }
}

impl ExpressionEvaluator for ExpressionLanguage {
    fn evaluate(&self, expression: &str, bindings: &Bindings<'_>) -> Result<Value, ExpressionError> {
        let expr = self.parse(expression)?;
        Evaluator {
            functions: &self.functions,
            bindings,
        }
        .eval(&expr)
    }
}
