//! Translation error types

use thiserror::Error;

/// Errors raised while turning a component model into a solver script.
///
/// All of these are fatal and are reported before any solver process is
/// started.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Expression construct the solver language cannot express
    #[error("Unsupported {construct}: {expr}")]
    UnsupportedExpr { construct: String, expr: String },

    /// Variable declared with a type other than bool, int or real
    #[error("Unsupported type {ty} for variable {var}")]
    UnsupportedType { var: String, ty: String },

    /// Contract with assumptions but no guarantees
    #[error("Contract {0} has no guarantees")]
    EmptyGuarantees(String),

    /// A destination port driven by two different sources
    #[error("Port {destination} is driven by both {first} and {second}")]
    FanIn {
        destination: String,
        first: String,
        second: String,
    },

    /// Connection endpoint that names no declared port
    #[error("Connection references undeclared port {0}")]
    UnknownPort(String),

    /// Contract expression naming a variable outside its component's scope
    #[error("Variable {name} is not a port of {component}")]
    UnknownVariable { name: String, component: String },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Only single-output nodes can be inlined
    #[error("Node {node} has {count} outputs; only single-output nodes can be inlined")]
    MultipleOutputs { node: String, count: usize },

    #[error("Node {node} expects {expected} arguments but was called with {found}")]
    Arity {
        node: String,
        expected: usize,
        found: usize,
    },

    #[error("Node {node} has no equation for output {output}")]
    MissingEquation { node: String, output: String },

    /// Reference inside a node body that is not one of its inputs
    #[error("Variable {name} is not bound in node {node}")]
    UnboundReference { name: String, node: String },

    #[error("Unknown target component: {0}")]
    UnknownTarget(String),

    /// The model declares no int or real variable
    #[error("Nothing to decide: no int or real variables in the model")]
    NothingToDecide,

    #[error(transparent)]
    Model(#[from] redcomp_core::Error),
}

impl TranslationError {
    pub(crate) fn unsupported(construct: &str, expr: &redcomp_core::Expr) -> Self {
        TranslationError::UnsupportedExpr {
            construct: construct.to_string(),
            expr: expr.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslationError>;
