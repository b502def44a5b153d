//! pest-based parser producing [`Expr`] trees.

use std::sync::LazyLock;

use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use hateoas_core::ExpressionError;

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp};

#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionParser;

/// Operator table, loosest binding first.
static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_neq, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::neq, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::lte, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::gte, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left)
            | Op::infix(Rule::sub, Assoc::Left)
            | Op::infix(Rule::concat, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg))
        .op(Op::postfix(Rule::method_call) | Op::postfix(Rule::member) | Op::postfix(Rule::index))
});

/// Parse an expression string into an AST.
///
/// # Errors
///
/// Returns [`ExpressionError::Syntax`] if the input is not a valid
/// expression.
pub fn parse_expression(input: &str) -> Result<Expr, ExpressionError> {
    let syntax = |message: String| ExpressionError::Syntax {
        expression: input.to_string(),
        message,
    };

    let mut pairs =
        ExpressionParser::parse(Rule::expression, input).map_err(|e| syntax(e.to_string()))?;
    let expr = pairs
        .next()
        .and_then(|root| root.into_inner().next())
        .ok_or_else(|| syntax("empty expression".to_string()))?;

    build_expr(expr.into_inner()).map_err(syntax)
}

fn build_expr(pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                Rule::neg => UnaryOp::Neg,
                rule => return Err(format!("unexpected prefix operator {rule:?}")),
            };
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand?),
            })
        })
        .map_postfix(|target, op| build_postfix(target?, op))
        .map_infix(|lhs, op, rhs| {
            Ok(Expr::Binary {
                op: binary_op(op.as_rule())?,
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
            })
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    match pair.as_rule() {
        Rule::null => Ok(Expr::Literal(Literal::Null)),
        Rule::boolean => Ok(Expr::Literal(Literal::Bool(pair.as_str() == "true"))),
        Rule::number => parse_number(pair.as_str()),
        Rule::string => Ok(Expr::Literal(Literal::String(string_value(pair)))),
        Rule::variable => Ok(Expr::Variable(pair.as_str().to_string())),
        Rule::function_call => {
            let mut inner = pair.into_inner();
            let name = next_str(&mut inner, "function name")?;
            let args = build_arguments(inner.next())?;
            Ok(Expr::FunctionCall { name, args })
        }
        Rule::array => pair
            .into_inner()
            .map(|item| build_expr(item.into_inner()))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Array),
        Rule::map => {
            let mut entries = Vec::new();
            for entry in pair.into_inner() {
                let mut inner = entry.into_inner();
                let key = inner
                    .next()
                    .ok_or_else(|| "map entry without key".to_string())?;
                let key = match key.as_rule() {
                    Rule::string => string_value(key),
                    _ => key.as_str().to_string(),
                };
                let value = inner
                    .next()
                    .ok_or_else(|| format!("map entry '{key}' without value"))?;
                entries.push((key, build_expr(value.into_inner())?));
            }
            Ok(Expr::Map(entries))
        }
        Rule::expr => build_expr(pair.into_inner()),
        rule => Err(format!("unexpected operand {rule:?}")),
    }
}

fn build_postfix(target: Expr, op: Pair<'_, Rule>) -> Result<Expr, String> {
    let target = Box::new(target);
    match op.as_rule() {
        Rule::method_call => {
            let mut inner = op.into_inner();
            let method = next_str(&mut inner, "method name")?;
            let args = build_arguments(inner.next())?;
            Ok(Expr::MethodCall {
                target,
                method,
                args,
            })
        }
        Rule::member => {
            let mut inner = op.into_inner();
            let name = next_str(&mut inner, "property name")?;
            Ok(Expr::Member { target, name })
        }
        Rule::index => {
            let index = op
                .into_inner()
                .next()
                .ok_or_else(|| "empty index".to_string())?;
            Ok(Expr::Index {
                target,
                index: Box::new(build_expr(index.into_inner())?),
            })
        }
        rule => Err(format!("unexpected postfix operator {rule:?}")),
    }
}

fn build_arguments(arguments: Option<Pair<'_, Rule>>) -> Result<Vec<Expr>, String> {
    arguments
        .map(|args| {
            args.into_inner()
                .map(|arg| build_expr(arg.into_inner()))
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn binary_op(rule: Rule) -> Result<BinaryOp, String> {
    Ok(match rule {
        Rule::or => BinaryOp::Or,
        Rule::and => BinaryOp::And,
        Rule::strict_eq => BinaryOp::StrictEq,
        Rule::strict_neq => BinaryOp::StrictNeq,
        Rule::eq => BinaryOp::Eq,
        Rule::neq => BinaryOp::Neq,
        Rule::lt => BinaryOp::Lt,
        Rule::lte => BinaryOp::Lte,
        Rule::gt => BinaryOp::Gt,
        Rule::gte => BinaryOp::Gte,
        Rule::add => BinaryOp::Add,
        Rule::sub => BinaryOp::Sub,
        Rule::concat => BinaryOp::Concat,
        Rule::mul => BinaryOp::Mul,
        Rule::div => BinaryOp::Div,
        Rule::rem => BinaryOp::Rem,
        rule => return Err(format!("unexpected infix operator {rule:?}")),
    })
}

fn next_str(pairs: &mut Pairs<'_, Rule>, what: &str) -> Result<String, String> {
    pairs
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| format!("missing {what}"))
}

fn parse_number(text: &str) -> Result<Expr, String> {
    if text.contains('.') {
        text.parse::<f64>()
            .map(|f| Expr::Literal(Literal::Float(f)))
            .map_err(|e| format!("invalid number '{text}': {e}"))
    } else {
        text.parse::<i64>()
            .map(|i| Expr::Literal(Literal::Int(i)))
            .map_err(|e| format!("invalid number '{text}': {e}"))
    }
}

/// Unescape the body of a quoted string literal.
fn string_value(pair: Pair<'_, Rule>) -> String {
    let raw = pair
        .into_inner()
        .next()
        .map(|inner| inner.as_str())
        .unwrap_or_default();

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
