//! Names and markers shared between script generation and result parsing

use std::fmt;

/// Marker prepended to a variable name for each step into the past
pub const PRE_MARKER: &str = "pre#";

/// Marker prepended to a variable name for each step into the future
pub const NEXT_MARKER: &str = "next#";

/// Prefix of the synthesized per-guarantee property names
pub const GUARANTEE_PREFIX: &str = "__GUARANTEE";

pub const BEGIN_PRINTING: &str = "//begin printing ";
pub const END_PRINTING: &str = "//end printing";

const INITIAL_CONSTRAINT: &str = "initial system constraint:";
const STRONGEST_PROPERTY: &str = "system strongest property:";
const WEAKEST_PROPERTY: &str = "component weakest property:";
const PROPERTY_RESULT: &str = "property result: ";
const BASE_STEP_RESULT: &str = "base step result: ";
const INDUCTIVE_STEP_RESULT: &str = "inductive step result: ";

/// A named section of solver output bracketed by printing sentinels
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    InitialConstraint,
    StrongestProperty,
    WeakestProperty,
    Property(String),
    BaseStep(String),
    InductiveStep(String),
}

impl Band {
    /// Recover a band from the text following [`BEGIN_PRINTING`]
    pub fn from_label(label: &str) -> Option<Band> {
        let label = label.trim();
        match label {
            INITIAL_CONSTRAINT => return Some(Band::InitialConstraint),
            STRONGEST_PROPERTY => return Some(Band::StrongestProperty),
            WEAKEST_PROPERTY => return Some(Band::WeakestProperty),
            _ => {}
        }
        if let Some(name) = label.strip_prefix(PROPERTY_RESULT) {
            Some(Band::Property(name.trim().to_string()))
        } else if let Some(name) = label.strip_prefix(BASE_STEP_RESULT) {
            Some(Band::BaseStep(name.trim().to_string()))
        } else {
            label
                .strip_prefix(INDUCTIVE_STEP_RESULT)
                .map(|name| Band::InductiveStep(name.trim().to_string()))
        }
    }

    /// Script statement opening this band
    pub fn begin_statement(&self) -> String {
        format!("\"{}{}\";", BEGIN_PRINTING, self)
    }

    pub fn end_statement() -> String {
        format!("\"{}\";", END_PRINTING)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::InitialConstraint => write!(f, "{}", INITIAL_CONSTRAINT),
            Band::StrongestProperty => write!(f, "{}", STRONGEST_PROPERTY),
            Band::WeakestProperty => write!(f, "{}", WEAKEST_PROPERTY),
            Band::Property(name) => write!(f, "{}{}", PROPERTY_RESULT, name),
            Band::BaseStep(name) => write!(f, "{}{}", BASE_STEP_RESULT, name),
            Band::InductiveStep(name) => write!(f, "{}{}", INDUCTIVE_STEP_RESULT, name),
        }
    }
}

/// Split leading temporal markers off a name.
///
/// Returns the net time offset (`next#` counts +1, `pre#` counts -1) and the
/// marker-free root.
pub fn split_markers(name: &str) -> (i64, &str) {
    let mut offset = 0;
    let mut rest = name;
    loop {
        if let Some(tail) = rest.strip_prefix(PRE_MARKER) {
            offset -= 1;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix(NEXT_MARKER) {
            offset += 1;
            rest = tail;
        } else {
            return (offset, rest);
        }
    }
}

/// Name carrying exactly `offset` markers of the matching direction
pub fn with_offset(root: &str, offset: i64) -> String {
    let marker = if offset < 0 { PRE_MARKER } else { NEXT_MARKER };
    let mut name = marker.repeat(offset.unsigned_abs() as usize);
    name.push_str(root);
    name
}
