//! Redcomp contract composition
//!
//! This crate turns a hierarchical component model into a Redlog script:
//! contract expressions are rewritten into one global namespace, composed
//! with the connections of the root, and serialized as quantifier
//! elimination problems, by induction when the system is temporal.

pub mod compose;
pub mod errors;
pub mod formula;
pub mod order;
pub mod program;
pub mod protocol;
pub mod render;
pub mod rewrite;
pub mod shift;

pub use compose::{
    compose, ComponentContract, ComposedModel, Constraint, ConnectionLink, Mode, Renaming,
    SystemProperty, TargetComponent,
};
pub use errors::{Result, TranslationError};
pub use formula::Formula;
pub use order::{system_order, DependencyGraph};
pub use program::{domain, generate, Check, Domain, PropertyInfo, Script};
pub use protocol::{split_markers, with_offset, Band};
pub use rewrite::{Rewriter, Rewritten};
pub use shift::{shift, Direction};
