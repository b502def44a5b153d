//! Functions callable from expressions.

use std::collections::HashMap;
use std::sync::Arc;

use hateoas_core::{Bindings, ExpressionError, Value};

/// A function callable as `name(args...)`.
pub type ExpressionFunction =
    Arc<dyn Fn(&[Value], &Bindings<'_>) -> Result<Value, ExpressionError> + Send + Sync>;

/// Supplies a set of named functions to an expression language.
pub trait FunctionProvider {
    fn functions(&self) -> Vec<(String, ExpressionFunction)>;
}

#[derive(Default, Clone)]
pub(crate) struct FunctionRegistry {
    functions: HashMap<String, ExpressionFunction>,
}

impl FunctionRegistry {
    pub fn insert(&mut self, name: String, function: ExpressionFunction) {
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<&ExpressionFunction> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

/// Service asked by `is_granted()`. It must be an object with an
/// `isGranted(attribute, subject)` method.
pub const AUTHORIZATION_CHECKER_SERVICE: &str = "security.authorization_checker";

/// `service(id)`, `parameter(name)` and `is_granted(attribute, subject?)`,
/// all resolved against the container in the bindings.
pub struct BasicFunctions;

impl FunctionProvider for BasicFunctions {
    fn functions(&self) -> Vec<(String, ExpressionFunction)> {
        let service: ExpressionFunction = Arc::new(|args: &[Value], bindings: &Bindings<'_>| {
            let id = single_string_argument("service", args)?;
            bindings
                .container
                .and_then(|container| container.service(id))
                .ok_or_else(|| ExpressionError::UnknownService(id.to_string()))
        });

        let parameter: ExpressionFunction = Arc::new(|args: &[Value], bindings: &Bindings<'_>| {
            let name = single_string_argument("parameter", args)?;
            bindings
                .container
                .and_then(|container| container.parameter(name))
                .ok_or_else(|| ExpressionError::UnknownParameter(name.to_string()))
        });

        let is_granted: ExpressionFunction = Arc::new(|args: &[Value], bindings: &Bindings<'_>| {
            let (attribute, subject) = match args {
                [attribute] => (attribute.clone(), Value::Null),
                [attribute, subject] => (attribute.clone(), subject.clone()),
                _ => {
                    return Err(ExpressionError::Type(format!(
                        "is_granted() expects an attribute and an optional subject, got {} argument(s)",
                        args.len()
                    )))
                }
            };
            let checker = bindings
                .container
                .and_then(|container| container.service(AUTHORIZATION_CHECKER_SERVICE))
                .ok_or_else(|| ExpressionError::UnknownService(AUTHORIZATION_CHECKER_SERVICE.to_string()))?;
            let checker = checker.as_object().ok_or_else(|| {
                ExpressionError::Type(format!(
                    "service '{AUTHORIZATION_CHECKER_SERVICE}' is a {}, not an object",
                    checker.type_name()
                ))
            })?;
            let granted = checker.call("isGranted", &[attribute, subject])?;
            Ok(Value::Bool(granted.is_truthy()))
        });

        vec![
            ("service".to_string(), service),
            ("parameter".to_string(), parameter),
            ("is_granted".to_string(), is_granted),
        ]
    }
}

fn single_string_argument<'a>(function: &str, args: &'a [Value]) -> Result<&'a str, ExpressionError> {
    match args {
        [Value::String(s)] => Ok(s),
        _ => Err(ExpressionError::Type(format!(
            "{function}() expects a single string argument, got {} argument(s)",
            args.len()
        ))),
    }
}
