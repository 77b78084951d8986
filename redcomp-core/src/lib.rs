//! Core types and data structures for redcomp
//!
//! This crate provides the fundamental building blocks shared by the
//! composer and the solver front-end:
//! - Contract expression representation
//! - Component model (ports, contracts, connections, node definitions)
//! - Textual expression syntax (lexer and parser)
//! - Error types

pub mod ast;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parse;

pub use ast::{BinaryOp, Expr, Quantifier, UnaryOp};
pub use error::{Error, Result};
pub use model::{
    ComponentModel, ComponentNode, Connection, Equation, NodeDef, PortRef, Statement,
    VarDecl, VarType,
};
pub use parse::parse_expr;
