//! Tree-walking evaluator.

use std::cmp::Ordering;

use hateoas_core::{Bindings, ExpressionError, Value};

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp};
use crate::functions::FunctionRegistry;

pub(crate) struct Evaluator<'a> {
    pub functions: &'a FunctionRegistry,
    pub bindings: &'a Bindings<'a>,
}

impl Evaluator<'_> {
    pub fn eval(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Variable(name) => match name.as_str() {
                "object" => Ok(self.bindings.object.clone()),
                _ => Err(ExpressionError::UnknownVariable(name.clone())),
            },
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.eval(value)?)))
                .collect::<Result<Vec<_>, ExpressionError>>()
                .map(Value::Map),
            Expr::Member { target, name } => read_member(&self.eval(target)?, name),
            Expr::Index { target, index } => read_index(&self.eval(target)?, &self.eval(index)?),
            Expr::MethodCall {
                target,
                method,
                args,
            } => {
                let target = self.eval(target)?;
                let args = self.eval_all(args)?;
                match &target {
                    Value::Object(object) => object.call(method, &args),
                    other => Err(ExpressionError::Type(format!(
                        "cannot call method '{method}' on {}",
                        other.type_name()
                    ))),
                }
            }
            Expr::FunctionCall { name, args } => {
                let function = self
                    .functions
                    .get(name)
                    .ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;
                let args = self.eval_all(args)?;
                function(&args, self.bindings)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Int(i) => i
                            .checked_neg()
                            .map(Value::Int)
                            .ok_or_else(|| ExpressionError::Type("integer overflow".to_string())),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(ExpressionError::Type(format!(
                            "cannot negate {}",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> Result<Vec<Value>, ExpressionError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, ExpressionError> {
        // short-circuit before touching the right-hand side
        match op {
            BinaryOp::Or => Ok(Value::Bool(
                self.eval(lhs)?.is_truthy() || self.eval(rhs)?.is_truthy(),
            )),
            BinaryOp::And => Ok(Value::Bool(
                self.eval(lhs)?.is_truthy() && self.eval(rhs)?.is_truthy(),
            )),
            _ => apply_binary(op, &self.eval(lhs)?, &self.eval(rhs)?),
        }
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    match op {
        BinaryOp::StrictEq => Ok(Value::Bool(lhs.strict_eq(rhs))),
        BinaryOp::StrictNeq => Ok(Value::Bool(!lhs.strict_eq(rhs))),
        BinaryOp::Eq => Ok(Value::Bool(lhs.loose_eq(rhs))),
        BinaryOp::Neq => Ok(Value::Bool(!lhs.loose_eq(rhs))),
        BinaryOp::Lt => compare(op, lhs, rhs).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Lte => compare(op, lhs, rhs).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(op, lhs, rhs).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Gte => compare(op, lhs, rhs).map(|o| Value::Bool(o != Ordering::Less)),
        BinaryOp::Concat => Ok(Value::String(format!("{lhs}{rhs}"))),
        _ => arithmetic(op, lhs, rhs),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn read_member(target: &Value, name: &str) -> Result<Value, ExpressionError> {
    match target {
        Value::Object(object) => {
            object
                .property(name)
                .ok_or_else(|| ExpressionError::UnknownProperty {
                    class: object.class_info().name.to_string(),
                    property: name.to_string(),
                })
        }
        Value::Map(_) => Ok(target.get(name).cloned().unwrap_or_default()),
        other => Err(ExpressionError::Type(format!(
            "cannot read property '{name}' of {}",
            other.type_name()
        ))),
    }
}

fn read_index(target: &Value, index: &Value) -> Result<Value, ExpressionError> {
    match (target, index) {
        (Value::List(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default()),
        (Value::Map(_), Value::String(key)) => Ok(target.get(key).cloned().unwrap_or_default()),
        (Value::Object(_), Value::String(key)) => read_member(target, key),
        (target, index) => Err(ExpressionError::Type(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Ordering, ExpressionError> {
    let ordering = match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        ExpressionError::Type(format!(
            "cannot compare {} {op} {}",
            lhs.type_name(),
            rhs.type_name()
        ))
    })
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    let type_error = || {
        ExpressionError::Type(format!(
            "unsupported operands {} {op} {}",
            lhs.type_name(),
            rhs.type_name()
        ))
    };

    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Rem if *b == 0 => {
                return Err(ExpressionError::Type("modulo by zero".to_string()))
            }
            BinaryOp::Rem => a.checked_rem(*b),
            // division always yields a float
            _ => None,
        };
        if let Some(result) = result {
            return Ok(Value::Int(result));
        }
    }

    let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(type_error()),
    };
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div if b == 0.0 => Err(ExpressionError::Type("division by zero".to_string())),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Rem if b == 0.0 => Err(ExpressionError::Type("modulo by zero".to_string())),
        BinaryOp::Rem => Ok(Value::Float(a % b)),
        _ => Err(type_error()),
    }
}
