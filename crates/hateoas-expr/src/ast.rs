//! AST for parsed expressions.
//!
//! Produced by [`crate::parser::parse_expression`] and consumed by the
//! evaluator.

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A bound variable, e.g. `object`.
    Variable(String),
    Array(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    /// `target.name`
    Member { target: Box<Expr>, name: String },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `target.method(args...)`
    MethodCall {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// `name(args...)`, resolved against the registered functions.
    FunctionCall { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    StrictEq,
    StrictNeq,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Rem,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Not => write!(f, "!"),
            Self::Neg => write!(f, "-"),
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Or => write!(f, "||"),
            Self::And => write!(f, "&&"),
            Self::StrictEq => write!(f, "==="),
            Self::StrictNeq => write!(f, "!=="),
            Self::Eq => write!(f, "=="),
            Self::Neq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Concat => write!(f, "~"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
            Self::Rem => write!(f, "%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_display_as_source_tokens() {
        assert_eq!(BinaryOp::StrictNeq.to_string(), "!==");
        assert_eq!(BinaryOp::Concat.to_string(), "~");
        assert_eq!(UnaryOp::Not.to_string(), "!");
    }
}
