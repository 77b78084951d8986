//! First-order formula text with its free variables
//!
//! Formulas are built bottom-up from rendered constraints. Each one carries
//! the set of variables occurring free in it, so quantifier prefixes can be
//! computed instead of tracked by hand.

use crate::shift::{shift_by, shift_name, Direction};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    text: String,
    free: BTreeSet<String>,
}

impl Formula {
    /// Formula text together with the variables occurring in it
    pub fn atom(text: impl Into<String>, free: impl IntoIterator<Item = String>) -> Self {
        Self {
            text: text.into(),
            free: free.into_iter().collect(),
        }
    }

    pub fn truth() -> Self {
        Self::atom("true", [])
    }

    /// Reference to a formula previously assigned to `name` in the script
    pub fn named(name: &str, body: &Formula) -> Self {
        Self::atom(name, body.free.iter().cloned())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn free(&self) -> &BTreeSet<String> {
        &self.free
    }

    pub fn is_truth(&self) -> bool {
        self.text == "true"
    }

    /// Conjunction; empty is `true`, a single item is returned as is
    pub fn conj(items: impl IntoIterator<Item = Formula>) -> Self {
        let items: Vec<Formula> = items.into_iter().filter(|f| !f.is_truth()).collect();
        match items.len() {
            0 => Formula::truth(),
            1 => items.into_iter().next().unwrap_or_else(Formula::truth),
            _ => {
                let mut free = BTreeSet::new();
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    free.extend(item.free);
                    parts.push(item.text);
                }
                Self {
                    text: format!("({})", parts.join(" and ")),
                    free,
                }
            }
        }
    }

    pub fn implies(self, conclusion: Formula) -> Self {
        let mut free = self.free;
        free.extend(conclusion.free);
        Self {
            text: format!("({} impl {})", self.text, conclusion.text),
            free,
        }
    }

    /// Existentially close every free variable accepted by `select`
    pub fn exists_where(self, select: impl Fn(&str) -> bool) -> Self {
        self.quantify("ex", select)
    }

    /// Universally close every free variable accepted by `select`
    pub fn forall_where(self, select: impl Fn(&str) -> bool) -> Self {
        self.quantify("all", select)
    }

    /// Universal closure over all free variables
    pub fn close(self) -> Self {
        self.forall_where(|_| true)
    }

    fn quantify(self, quantifier: &str, select: impl Fn(&str) -> bool) -> Self {
        let (bound, free): (BTreeSet<String>, BTreeSet<String>) =
            self.free.into_iter().partition(|name| select(name));
        if bound.is_empty() {
            return Self {
                text: self.text,
                free,
            };
        }
        let mut text = String::new();
        for name in &bound {
            text.push_str(quantifier);
            text.push('(');
            text.push_str(name);
            text.push_str(", ");
        }
        text.push_str(&self.text);
        text.push_str(&")".repeat(bound.len()));
        Self { text, free }
    }

    /// Shift every variable of the formula by `steps` instants
    pub fn shifted(&self, direction: Direction, steps: usize) -> Self {
        let mut free = self.free.clone();
        for _ in 0..steps {
            free = free
                .iter()
                .map(|name| shift_name(name, "", direction))
                .collect();
        }
        Self {
            text: shift_by(&self.text, "", direction, steps),
            free,
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
