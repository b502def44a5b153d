//! Exclusion rules: groups, version ranges, depth limits and `exclude_if`
//! predicates.

use std::cmp::Ordering;

use hateoas_core::{Bindings, Container, ExpressionError, ExpressionEvaluator, ObjectRef, Result, Value};

use crate::context::SerializationContext;
use crate::metadata::PropertyMetadata;

/// Group of properties that declare none.
pub const DEFAULT_GROUP: &str = "Default";

/// Evaluator and container used for expressions of one serializer.
#[derive(Clone, Copy)]
pub(crate) struct ExpressionScope<'a> {
    pub evaluator: &'a dyn ExpressionEvaluator,
    pub container: Option<&'a dyn Container>,
}

impl ExpressionScope<'_> {
    /// Evaluate `expression` with `object` bound.
    pub fn evaluate(&self, expression: &str, object: &ObjectRef) -> std::result::Result<Value, ExpressionError> {
        let object = Value::Object(ObjectRef::clone(object));
        let mut bindings = Bindings::new(&object);
        if let Some(container) = self.container {
            bindings = bindings.with_container(container);
        }
        self.evaluator.evaluate(expression, &bindings)
    }
}

/// Evaluates exclusion rules for one serializer.
#[derive(Clone, Copy)]
pub(crate) struct Exclusions<'a> {
    pub scope: ExpressionScope<'a>,
}

impl Exclusions<'_> {
    /// Whether `property` of `object` must be left out.
    ///
    /// # Errors
    ///
    /// Fails when an `exclude_if` expression cannot be evaluated.
    pub fn should_skip_property(
        &self,
        property: &PropertyMetadata,
        object: &ObjectRef,
        context: &SerializationContext,
    ) -> Result<bool> {
        if let Some(groups) = context.groups() {
            if !in_groups(property, groups) {
                return Ok(true);
            }
        }

        if let Some(version) = context.version() {
            if !in_version_range(property, version) {
                return Ok(true);
            }
        }

        if let Some(expression) = &property.exclude_if {
            if self.scope.evaluate(expression, object)?.is_truthy() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Whether navigation must stop before entering another object.
    pub fn should_skip_object(&self, context: &SerializationContext) -> bool {
        context.max_depth_checks() && context.is_too_deep()
    }
}

fn in_groups(property: &PropertyMetadata, groups: &[String]) -> bool {
    match &property.groups {
        Some(declared) if !declared.is_empty() => declared.iter().any(|g| groups.contains(g)),
        _ => groups.iter().any(|g| g == DEFAULT_GROUP),
    }
}

fn in_version_range(property: &PropertyMetadata, version: &str) -> bool {
    let after_since = property
        .since_version
        .as_deref()
        .is_none_or(|since| compare_versions(version, since) != Ordering::Less);
    let before_until = property
        .until_version
        .as_deref()
        .is_none_or(|until| compare_versions(version, until) != Ordering::Greater);
    after_since && before_until
}

/// Compare dotted versions part by part, numerically where both parts are
/// numbers. Missing parts count as `0`.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-', '+']);
    let mut right = b.split(['.', '-', '+']);
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (x, y) => {
                let x = x.unwrap_or("0");
                let y = y.unwrap_or("0");
                match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}
