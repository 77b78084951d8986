//! System order computation
//!
//! The system order is the largest number of `pre` steps separating a
//! system output from the system inputs through the composed model. It is
//! computed over a dependency graph of interned variables: a connection
//! destination depends on its source with no lag, and a variable that a
//! guarantee mentions at the current instant depends on every other
//! variable of that guarantee with the lag it is mentioned at.

use crate::rewrite::Rewritten;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Dependency graph over interned variable names
#[derive(Debug, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
    /// Per variable: source index and lag, sorted by source name
    edges: Vec<Vec<(usize, usize)>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

struct DfsFrame {
    var: usize,
    next_edge: usize,
    /// Lag of the edge the parent followed to reach this variable
    delta: usize,
}

impl DependencyGraph {
    /// Build the graph from connections (`source`, `destination`) and the
    /// rewritten guarantees and assertions of every component
    pub fn build<'r>(
        inputs: impl IntoIterator<Item = &'r str>,
        connections: &[(String, String)],
        constraints: impl IntoIterator<Item = &'r Rewritten>,
    ) -> Self {
        let mut graph = DependencyGraph::default();
        let mut lags: Vec<FxHashMap<usize, usize>> = Vec::new();
        let mut add = |graph: &mut DependencyGraph, from: &str, to: &str, delta: usize| {
            let from = graph.intern(from);
            let to = graph.intern(to);
            if lags.len() < graph.names.len() {
                lags.resize_with(graph.names.len(), FxHashMap::default);
            }
            let lag = lags[from].entry(to).or_insert(delta);
            *lag = (*lag).max(delta);
        };

        let inputs: FxHashSet<&str> = inputs.into_iter().collect();
        let mut destinations = FxHashSet::default();
        for (source, destination) in connections {
            destinations.insert(destination.as_str());
            if !inputs.contains(destination.as_str()) {
                add(&mut graph, destination.as_str(), source.as_str(), 0);
            }
        }

        for rewritten in constraints {
            for var in rewritten.current_variables() {
                if inputs.contains(var.as_str()) || destinations.contains(var.as_str()) {
                    continue;
                }
                for (source, &lag) in &rewritten.highest_order {
                    if source != var || lag > 0 {
                        add(&mut graph, var.as_str(), source.as_str(), lag);
                    }
                }
            }
        }

        lags.resize_with(graph.names.len(), FxHashMap::default);
        graph.edges = lags
            .into_iter()
            .map(|targets| {
                let mut targets: Vec<(usize, usize)> = targets.into_iter().collect();
                targets.sort_by(|a, b| graph.names[a.0].cmp(&graph.names[b.0]));
                targets
            })
            .collect();
        graph
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), index);
        index
    }

    /// Order of each of `outputs`, by explicit-stack depth-first search.
    ///
    /// A source already on the stack is a feedback loop and contributes
    /// only the lag of the edge closing it.
    pub fn orders<'o>(&self, outputs: impl IntoIterator<Item = &'o str>) -> Vec<usize> {
        let mut state = vec![Visit::New; self.names.len()];
        let mut memo = vec![0usize; self.names.len()];
        let mut result = Vec::new();

        for output in outputs {
            let Some(&root) = self.index.get(output) else {
                result.push(0);
                continue;
            };
            if state[root] == Visit::New {
                self.search(root, &mut state, &mut memo);
            }
            result.push(memo[root]);
        }
        result
    }

    fn search(&self, root: usize, state: &mut [Visit], memo: &mut [usize]) {
        state[root] = Visit::OnStack;
        let mut stack = vec![DfsFrame {
            var: root,
            next_edge: 0,
            delta: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let var = frame.var;
            if let Some(&(source, delta)) = self.edges[var].get(frame.next_edge) {
                frame.next_edge += 1;
                match state[source] {
                    Visit::Done => memo[var] = memo[var].max(memo[source] + delta),
                    Visit::OnStack => memo[var] = memo[var].max(delta),
                    Visit::New => {
                        state[source] = Visit::OnStack;
                        memo[source] = 0;
                        stack.push(DfsFrame {
                            var: source,
                            next_edge: 0,
                            delta,
                        });
                    }
                }
                continue;
            }

            let finished = stack.pop();
            state[var] = Visit::Done;
            if let (Some(finished), Some(parent)) = (finished, stack.last()) {
                let parent = parent.var;
                memo[parent] = memo[parent].max(memo[var] + finished.delta);
            }
        }
    }
}

/// System order of a composed model.
///
/// The maximum over all system outputs. Without outputs, the maximum order
/// of any guarantee or assertion.
pub fn system_order<'r>(
    inputs: &[&str],
    outputs: &[&str],
    connections: &[(String, String)],
    constraints: &[&'r Rewritten],
) -> usize {
    if outputs.is_empty() {
        let order = constraints.iter().map(|c| c.order).max().unwrap_or(0);
        debug!(order, "no system outputs, using constraint order");
        return order;
    }
    let graph = DependencyGraph::build(
        inputs.iter().copied(),
        connections,
        constraints.iter().copied(),
    );
    let orders = graph.orders(outputs.iter().copied());
    debug!(?orders, "system output orders");
    orders.into_iter().max().unwrap_or(0)
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
