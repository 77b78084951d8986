//! Expression rewriting into the global namespace
//!
//! A contract expression written inside a component refers to that
//! component's ports by bare name. Rewriting prefixes every free variable
//! with the component scope, inlines calls to invocable nodes, expands
//! conditionals, and turns `pre` into a textual marker on the scope so that
//! the resulting names can later be time-shifted by text substitution.

use crate::errors::{Result, TranslationError};
use crate::protocol::{split_markers, PRE_MARKER};
use redcomp_core::{Expr, NodeDef, UnaryOp};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Result of rewriting one expression
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    /// Expression over global, marker-tagged names
    pub expr: Expr,

    /// Deepest `pre` nesting reached by any variable reference
    pub order: usize,

    /// Variable names observed at each order
    pub vars_by_order: BTreeMap<usize, BTreeSet<String>>,

    /// Highest order each variable is observed at, keyed by marker-free name
    pub highest_order: BTreeMap<String, usize>,
}

impl Rewritten {
    /// Every rewritten variable name, markers included
    pub fn variables(&self) -> BTreeSet<String> {
        self.vars_by_order.values().flatten().cloned().collect()
    }

    /// Marker-free names referenced at order zero
    pub fn current_variables(&self) -> impl Iterator<Item = &String> {
        self.vars_by_order.get(&0).into_iter().flatten()
    }
}

/// Formal-to-actual bindings of one inlined node call.
///
/// Arguments are resolved in the parent frame, which is the frame active at
/// the call site.
struct Frame<'e, 'p> {
    node: &'e str,
    bindings: FxHashMap<&'e str, &'e Expr>,
    parent: Option<&'p Frame<'e, 'p>>,
}

#[derive(Default)]
struct Observations {
    vars_by_order: BTreeMap<usize, BTreeSet<String>>,
    highest_order: BTreeMap<String, usize>,
    order: usize,
}

impl Observations {
    fn record(&mut self, name: &str, order: usize) {
        self.vars_by_order
            .entry(order)
            .or_default()
            .insert(name.to_string());
        let (_, root) = split_markers(name);
        let highest = self.highest_order.entry(root.to_string()).or_insert(0);
        *highest = (*highest).max(order);
        self.order = self.order.max(order);
    }
}

/// Rewrites contract expressions against a catalogue of invocable nodes
pub struct Rewriter<'a> {
    nodes: FxHashMap<&'a str, &'a NodeDef>,
}

impl<'a> Rewriter<'a> {
    pub fn new(nodes: &'a [NodeDef]) -> Self {
        Self {
            nodes: nodes.iter().map(|node| (node.id.as_str(), node)).collect(),
        }
    }

    /// Rewrite `expr` into the namespace given by `prefix` (`"C1."`, or `""`
    /// for the root)
    pub fn rewrite(&self, expr: &Expr, prefix: &str) -> Result<Rewritten> {
        let mut seen = Observations::default();
        let expr = self.walk(expr, prefix, 0, None, &mut seen)?;
        Ok(Rewritten {
            expr,
            order: seen.order,
            vars_by_order: seen.vars_by_order,
            highest_order: seen.highest_order,
        })
    }

    fn walk<'e>(
        &self,
        expr: &'e Expr,
        prefix: &str,
        order: usize,
        frame: Option<&Frame<'e, '_>>,
        seen: &mut Observations,
    ) -> Result<Expr>
    where
        'a: 'e,
    {
        match expr {
            Expr::Bool(_) | Expr::Int(_) | Expr::Real(_) => Ok(expr.clone()),
            Expr::Id(name) => match frame {
                None => {
                    let global = format!("{}{}", prefix, name);
                    seen.record(&global, order);
                    Ok(Expr::Id(global))
                }
                Some(frame) => match frame.bindings.get(name.as_str()) {
                    Some(&actual) => self.walk(actual, prefix, order, frame.parent, seen),
                    None => Err(TranslationError::UnboundReference {
                        name: name.clone(),
                        node: frame.node.to_string(),
                    }),
                },
            },
            Expr::RecordAccess { record, field } => Ok(Expr::RecordAccess {
                record: Box::new(self.walk(record, prefix, order, frame, seen)?),
                field: field.clone(),
            }),
            Expr::Unary {
                op: UnaryOp::Pre,
                expr: inner,
            } => {
                let marked = format!("{}{}", PRE_MARKER, prefix);
                self.walk(inner, &marked, order + 1, frame, seen)
            }
            Expr::Unary { op, expr: inner } => {
                Ok(Expr::unary(*op, self.walk(inner, prefix, order, frame, seen)?))
            }
            Expr::Binary { left, op, right } => {
                let left = self.walk(left, prefix, order, frame, seen)?;
                let right = self.walk(right, prefix, order, frame, seen)?;
                Ok(Expr::binary(left, *op, right))
            }
            Expr::IfThenElse {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.walk(cond, prefix, order, frame, seen)?;
                let then_expr = self.walk(then_expr, prefix, order, frame, seen)?;
                let else_expr = self.walk(else_expr, prefix, order, frame, seen)?;
                Ok(Expr::or(
                    Expr::and(cond.clone(), then_expr),
                    Expr::and(Expr::not(cond), else_expr),
                ))
            }
            Expr::Record { type_name, fields } => {
                let mut rewritten = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    rewritten.push((name.clone(), self.walk(value, prefix, order, frame, seen)?));
                }
                Ok(Expr::Record {
                    type_name: type_name.clone(),
                    fields: rewritten,
                })
            }
            Expr::RecordUpdate {
                record,
                field,
                value,
            } => Ok(Expr::RecordUpdate {
                record: Box::new(self.walk(record, prefix, order, frame, seen)?),
                field: field.clone(),
                value: Box::new(self.walk(value, prefix, order, frame, seen)?),
            }),
            Expr::NodeCall { node, args } => self.inline(node, args, prefix, order, frame, seen),
            Expr::Array(_)
            | Expr::ArrayAccess { .. }
            | Expr::ArrayUpdate { .. }
            | Expr::Tuple(_)
            | Expr::Quantified { .. }
            | Expr::Constructor { .. } => {
                Err(TranslationError::unsupported(expr.kind_name(), expr))
            }
        }
    }

    fn inline<'e>(
        &self,
        node: &str,
        args: &'e [Expr],
        prefix: &str,
        order: usize,
        frame: Option<&Frame<'e, '_>>,
        seen: &mut Observations,
    ) -> Result<Expr>
    where
        'a: 'e,
    {
        let def: &'e NodeDef = self
            .nodes
            .get(node)
            .copied()
            .ok_or_else(|| TranslationError::UnknownNode(node.to_string()))?;

        let output = match def.outputs.as_slice() {
            [output] => output,
            outputs => {
                return Err(TranslationError::MultipleOutputs {
                    node: def.id.clone(),
                    count: outputs.len(),
                })
            }
        };
        if def.inputs.len() != args.len() {
            return Err(TranslationError::Arity {
                node: def.id.clone(),
                expected: def.inputs.len(),
                found: args.len(),
            });
        }
        let body = def
            .equation_for(&output.id)
            .ok_or_else(|| TranslationError::MissingEquation {
                node: def.id.clone(),
                output: output.id.clone(),
            })?;

        let callee = Frame {
            node: def.id.as_str(),
            bindings: def
                .inputs
                .iter()
                .map(|input| input.id.as_str())
                .zip(args.iter())
                .collect(),
            parent: frame,
        };
        self.walk(body, prefix, order, Some(&callee), seen)
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
