//! Command implementations

pub mod script;
pub mod verify;
