//! Contract expression representation
//!
//! Expressions are immutable trees. The tree covers the whole dataflow
//! contract language that a component model may carry, including the
//! constructs the quantifier-elimination backend cannot express (arrays,
//! tuples, quantifiers, datatype constructors). Those are kept so that
//! translation can reject them with a precise message instead of failing
//! at parse time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Negative,
    /// Logical negation
    Not,
    /// Value of the operand at the previous step
    Pre,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    IntDivide,
    Modulus,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Or,
    And,
    Xor,
    Implies,
    /// Initialisation operator `a -> b`
    Arrow,
}

impl BinaryOp {
    /// Concrete syntax of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDivide => "div",
            BinaryOp::Modulus => "mod",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Xor => "xor",
            BinaryOp::Implies => "=>",
            BinaryOp::Arrow => "->",
        }
    }
}

/// Quantifier kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Forall,
    Exists,
}

/// A contract expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    /// Decimal literal, kept as written (`1.5`)
    Real(String),
    /// Variable reference, possibly qualified (`C1.x`)
    Id(String),
    RecordAccess {
        record: Box<Expr>,
        field: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    IfThenElse {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Record {
        type_name: String,
        fields: Vec<(String, Expr)>,
    },
    RecordUpdate {
        record: Box<Expr>,
        field: String,
        value: Box<Expr>,
    },
    /// Call of an invocable node
    NodeCall {
        node: String,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayUpdate {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    Quantified {
        quantifier: Quantifier,
        bound: Vec<String>,
        body: Box<Expr>,
    },
    /// Inductive datatype constructor application
    Constructor {
        datatype: String,
        variant: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn id(name: impl Into<String>) -> Self {
        Expr::Id(name.into())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn pre(expr: Expr) -> Self {
        Expr::unary(UnaryOp::Pre, expr)
    }

    pub fn not(expr: Expr) -> Self {
        Expr::unary(UnaryOp::Not, expr)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::And, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Or, right)
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Equal, right)
    }

    pub fn if_then_else(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::IfThenElse {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn call(node: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::NodeCall {
            node: node.into(),
            args,
        }
    }

    /// Human-readable name of the expression variant, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Bool(_) => "boolean literal",
            Expr::Int(_) => "integer literal",
            Expr::Real(_) => "real literal",
            Expr::Id(_) => "variable reference",
            Expr::RecordAccess { .. } => "record field access",
            Expr::Unary { .. } => "unary expression",
            Expr::Binary { .. } => "binary expression",
            Expr::IfThenElse { .. } => "conditional expression",
            Expr::Record { .. } => "record construction",
            Expr::RecordUpdate { .. } => "record update",
            Expr::NodeCall { .. } => "node call",
            Expr::Array(_) => "array expression",
            Expr::ArrayAccess { .. } => "array access",
            Expr::ArrayUpdate { .. } => "array update",
            Expr::Tuple(_) => "tuple expression",
            Expr::Quantified { .. } => "quantified expression",
            Expr::Constructor { .. } => "datatype constructor",
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bool(value) => write!(f, "{}", value),
            Expr::Int(value) if *value < 0 => write!(f, "(-{})", value.unsigned_abs()),
            Expr::Int(value) => write!(f, "{}", value),
            Expr::Real(text) => write!(f, "{}", text),
            Expr::Id(name) => write!(f, "{}", name),
            Expr::RecordAccess { record, field } => write!(f, "({}).{}", record, field),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Negative => write!(f, "(-{})", expr),
                UnaryOp::Not => write!(f, "(not {})", expr),
                UnaryOp::Pre => write!(f, "pre({})", expr),
            },
            Expr::Binary { left, op, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::IfThenElse {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "(if {} then {} else {})", cond, then_expr, else_expr),
            Expr::Record { type_name, fields } => {
                write!(f, "{} {{", type_name)?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, " {} = {}", name, value)?;
                }
                write!(f, " }}")
            }
            Expr::RecordUpdate {
                record,
                field,
                value,
            } => write!(f, "({}){{{} := {}}}", record, field, value),
            Expr::NodeCall { node, args } => {
                write!(f, "{}(", node)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::ArrayAccess { array, index } => write!(f, "({})[{}]", array, index),
            Expr::ArrayUpdate {
                array,
                index,
                value,
            } => write!(f, "({})[{} := {}]", array, index, value),
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expr::Quantified {
                quantifier,
                bound,
                body,
            } => {
                let keyword = match quantifier {
                    Quantifier::Forall => "forall",
                    Quantifier::Exists => "exists",
                };
                write!(f, "({} {}. {})", keyword, bound.join(", "), body)
            }
            Expr::Constructor {
                datatype,
                variant,
                args,
            } => {
                write!(f, "{}::{}(", datatype, variant)?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        crate::parse::parse_expr(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
