//! Contract composition
//!
//! Walks the immediate sub-components of the hierarchy root, rewrites their
//! contracts into the global namespace and assembles the verification
//! problem: system properties, context contracts, connection equalities,
//! an optional diagnosis target and the system order.

use crate::errors::{Result, TranslationError};
use crate::formula::Formula;
use crate::order::system_order;
use crate::protocol::GUARANTEE_PREFIX;
use crate::render::render;
use crate::rewrite::{Rewriter, Rewritten};
use redcomp_core::{ComponentModel, ComponentNode, Expr, Statement, VarDecl, VarType};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A rewritten and rendered contract expression
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Rendered formula text, not yet escaped
    pub text: String,

    pub rewritten: Rewritten,
}

impl Constraint {
    fn new(rewritten: Rewritten) -> Result<Self> {
        let text = render(&rewritten.expr)?;
        Ok(Self { text, rewritten })
    }

    pub fn order(&self) -> usize {
        self.rewritten.order
    }

    pub fn formula(&self) -> Formula {
        Formula::atom(self.text.clone(), self.rewritten.variables())
    }
}

/// Assumptions and guarantees of one component, in global names
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentContract {
    pub name: String,

    pub assumptions: Vec<Constraint>,

    pub guarantees: Vec<Constraint>,
}

impl ComponentContract {
    /// Deepest `pre` nesting among all of its constraints
    pub fn order(&self) -> usize {
        self.assumptions
            .iter()
            .chain(&self.guarantees)
            .map(Constraint::order)
            .max()
            .unwrap_or(0)
    }

    /// `assumptions impl guarantees`, or the bare guarantees
    pub fn formula(&self) -> Formula {
        let guarantees = Formula::conj(self.guarantees.iter().map(Constraint::formula));
        if self.assumptions.is_empty() {
            guarantees
        } else {
            Formula::conj(self.assumptions.iter().map(Constraint::formula)).implies(guarantees)
        }
    }
}

/// One system guarantee to prove, as a synthesized property
#[derive(Debug, Clone, PartialEq)]
pub struct SystemProperty {
    /// Synthesized name, `__GUARANTEE<i>`
    pub name: String,

    pub description: Option<String>,

    /// Root assumptions and the single guarantee
    pub contract: ComponentContract,
}

/// Ports and contract of the component under diagnosis
#[derive(Debug, Clone, PartialEq)]
pub struct TargetComponent {
    pub name: String,

    pub variables: Vec<VarDecl>,

    /// `None` when the target carries no contract of its own
    pub contract: Option<ComponentContract>,
}

/// A connection as the equality `source = destination`
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionLink {
    pub source: String,

    pub destination: String,

    pub constraint: Constraint,
}

/// Map from global variable names to the references reported to the user.
///
/// Lookups ignore case; the solver folds identifiers to lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renaming {
    entries: BTreeMap<String, String>,
}

impl Renaming {
    pub fn insert(&mut self, name: &str, reference: impl Into<String>) {
        self.entries.insert(name.to_lowercase(), reference.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Reference for `name`, or `name` itself when unmapped
    pub fn rename(&self, name: &str) -> String {
        self.get(name).unwrap_or(name).to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How the composed problem is to be checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Prove the system guarantees from the component contracts
    Composition,
    /// Derive what the target must guarantee for the system guarantees to hold
    Diagnosis { target: String },
}

/// Verification problem assembled from a component model
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedModel {
    pub system_inputs: Vec<VarDecl>,

    pub system_outputs: Vec<VarDecl>,

    /// Present in diagnosis mode only
    pub target: Option<TargetComponent>,

    /// Ports of every non-target sub-component
    pub context_variables: Vec<VarDecl>,

    pub context_contracts: Vec<ComponentContract>,

    pub connections: Vec<ConnectionLink>,

    /// In root guarantee order
    pub properties: Vec<SystemProperty>,

    pub renaming: Renaming,

    /// Largest `pre` distance from system outputs back to inputs
    pub system_order: usize,
}

impl ComposedModel {
    pub fn mode(&self) -> Mode {
        match &self.target {
            Some(target) => Mode::Diagnosis {
                target: target.name.clone(),
            },
            None => Mode::Composition,
        }
    }

    pub fn is_temporal(&self) -> bool {
        self.system_order > 0
    }

    /// Every declared variable: system ports, context and target ports
    pub fn all_variables(&self) -> impl Iterator<Item = &VarDecl> {
        self.system_inputs
            .iter()
            .chain(&self.system_outputs)
            .chain(&self.context_variables)
            .chain(self.target.iter().flat_map(|t| t.variables.iter()))
    }

    /// Names that stay free when internal variables are eliminated: system
    /// ports, component ports wired straight to them, and every variable a
    /// system property mentions
    pub fn boundary(&self) -> BTreeSet<String> {
        let inputs: BTreeSet<&str> = self.system_inputs.iter().map(|v| v.id.as_str()).collect();
        let outputs: BTreeSet<&str> = self.system_outputs.iter().map(|v| v.id.as_str()).collect();

        let mut boundary: BTreeSet<String> = inputs
            .iter()
            .chain(outputs.iter())
            .map(|name| name.to_string())
            .collect();
        for link in &self.connections {
            if inputs.contains(link.source.as_str()) {
                boundary.insert(link.destination.clone());
            }
            if outputs.contains(link.destination.as_str()) {
                boundary.insert(link.source.clone());
            }
        }
        for property in &self.properties {
            let contract = &property.contract;
            for constraint in contract.assumptions.iter().chain(&contract.guarantees) {
                boundary.extend(constraint.rewritten.highest_order.keys().cloned());
            }
        }
        boundary
    }
}

/// Compose the immediate sub-components of the model root.
///
/// With a `target`, that sub-component is kept apart for diagnosis.
pub fn compose(model: &ComponentModel, target: Option<&str>) -> Result<ComposedModel> {
    let root = &model.root;
    info!(root = %root.id, ?target, "composing contracts");

    if let Some(name) = target {
        if root.subcomponent(name).is_none() {
            return Err(TranslationError::UnknownTarget(name.to_string()));
        }
    }
    if root.guarantees.is_empty() {
        return Err(TranslationError::EmptyGuarantees(root.id.clone()));
    }

    let rewriter = Rewriter::new(&model.nodes);
    let mut renaming = Renaming::default();
    let mut declared = BTreeSet::new();

    for decl in root.inputs.iter().chain(&root.outputs) {
        check_type(decl)?;
        declared.insert(decl.id.clone());
        renaming.insert(&decl.id, reference_of(decl, &decl.id));
    }

    let mut context_variables = Vec::new();
    let mut context_contracts = Vec::new();
    let mut target_component = None;

    for component in &root.subcomponents {
        let prefix = format!("{}.", component.id);
        let mut variables = Vec::new();
        for decl in component.inputs.iter().chain(&component.outputs) {
            check_type(decl)?;
            let global = decl.prefixed(&prefix);
            declared.insert(global.id.clone());
            renaming.insert(&global.id, reference_of(decl, &global.id));
            variables.push(global);
        }

        let scope: BTreeSet<String> = variables.iter().map(|v| v.id.clone()).collect();
        let contract = component_contract(&rewriter, component, &prefix, &scope)?;
        if Some(component.id.as_str()) == target {
            debug!(component = %component.id, "diagnosis target");
            target_component = Some(TargetComponent {
                name: component.id.clone(),
                variables,
                contract,
            });
        } else {
            context_variables.extend(variables);
            context_contracts.extend(contract);
        }
    }

    let connections = connection_links(root, &declared)?;
    let properties = system_properties(&rewriter, root, &declared, &mut renaming)?;

    let input_names: Vec<&str> = root.inputs.iter().map(|v| v.id.as_str()).collect();
    let output_names: Vec<&str> = root.outputs.iter().map(|v| v.id.as_str()).collect();
    let pairs: Vec<(String, String)> = connections
        .iter()
        .map(|link| (link.source.clone(), link.destination.clone()))
        .collect();
    let defining: Vec<&Rewritten> = context_contracts
        .iter()
        .chain(target_component.iter().flat_map(|t| t.contract.iter()))
        .flat_map(|contract| contract.guarantees.iter().map(|g| &g.rewritten))
        .collect();
    let order = system_order(&input_names, &output_names, &pairs, &defining);

    info!(
        components = root.subcomponents.len(),
        properties = properties.len(),
        connections = connections.len(),
        system_order = order,
        "composition complete"
    );

    Ok(ComposedModel {
        system_inputs: root.inputs.clone(),
        system_outputs: root.outputs.clone(),
        target: target_component,
        context_variables,
        context_contracts,
        connections,
        properties,
        renaming,
        system_order: order,
    })
}

fn check_type(decl: &VarDecl) -> Result<()> {
    match &decl.ty {
        VarType::Bool | VarType::Int | VarType::Real => Ok(()),
        VarType::Named(name) => Err(TranslationError::UnsupportedType {
            var: decl.id.clone(),
            ty: name.clone(),
        }),
    }
}

fn reference_of(decl: &VarDecl, global: &str) -> String {
    decl.reference.clone().unwrap_or_else(|| global.to_string())
}

/// Statements of one component and the global names they may mention
struct Scope<'s> {
    rewriter: &'s Rewriter<'s>,
    component: &'s str,
    prefix: &'s str,
    ports: &'s BTreeSet<String>,
}

impl Scope<'_> {
    fn constraint(&self, statement: &Statement) -> Result<Constraint> {
        let rewritten = self.rewriter.rewrite(&statement.expr, self.prefix)?;
        if let Some(name) = rewritten
            .highest_order
            .keys()
            .find(|name| !self.ports.contains(*name))
        {
            return Err(TranslationError::UnknownVariable {
                name: name.clone(),
                component: self.component.to_string(),
            });
        }
        Constraint::new(rewritten)
    }

    fn constraints<'a>(
        &self,
        statements: impl IntoIterator<Item = &'a Statement>,
    ) -> Result<Vec<Constraint>> {
        statements
            .into_iter()
            .map(|statement| self.constraint(statement))
            .collect()
    }
}

/// Contract of one sub-component; assertions count as guarantees and
/// guarantees rendering to an already seen text are dropped
fn component_contract(
    rewriter: &Rewriter<'_>,
    component: &ComponentNode,
    prefix: &str,
    ports: &BTreeSet<String>,
) -> Result<Option<ComponentContract>> {
    let scope = Scope {
        rewriter,
        component: &component.id,
        prefix,
        ports,
    };
    let assumptions = scope.constraints(&component.assumptions)?;

    let mut seen = BTreeSet::new();
    let mut guarantees = Vec::new();
    for statement in component.constraints() {
        let constraint = scope.constraint(statement)?;
        if seen.insert(constraint.text.clone()) {
            guarantees.push(constraint);
        } else {
            debug!(
                component = %component.id,
                text = %constraint.text,
                "dropping duplicate guarantee"
            );
        }
    }

    match (assumptions.is_empty(), guarantees.is_empty()) {
        (true, true) => Ok(None),
        (false, true) => Err(TranslationError::EmptyGuarantees(component.id.clone())),
        _ => Ok(Some(ComponentContract {
            name: component.id.clone(),
            assumptions,
            guarantees,
        })),
    }
}

fn connection_links(
    root: &ComponentNode,
    declared: &BTreeSet<String>,
) -> Result<Vec<ConnectionLink>> {
    let mut sources: FxHashMap<String, String> = FxHashMap::default();
    let mut links = Vec::new();

    for connection in &root.connections {
        let source = connection.source.qualified_name();
        let destination = connection.destination.qualified_name();
        for name in [&source, &destination] {
            if !declared.contains(name) {
                return Err(TranslationError::UnknownPort(name.clone()));
            }
        }

        match sources.get(&destination) {
            Some(first) if *first == source => {
                debug!(%source, %destination, "ignoring duplicate connection");
                continue;
            }
            Some(first) => {
                return Err(TranslationError::FanIn {
                    destination,
                    first: first.clone(),
                    second: source,
                })
            }
            None => {}
        }
        sources.insert(destination.clone(), source.clone());

        let equality = Expr::eq(Expr::id(source.as_str()), Expr::id(destination.as_str()));
        let constraint = Constraint::new(Rewriter::new(&[]).rewrite(&equality, "")?)?;
        links.push(ConnectionLink {
            source,
            destination,
            constraint,
        });
    }
    Ok(links)
}

/// One property per root guarantee; root assertions join the assumptions
fn system_properties(
    rewriter: &Rewriter<'_>,
    root: &ComponentNode,
    declared: &BTreeSet<String>,
    renaming: &mut Renaming,
) -> Result<Vec<SystemProperty>> {
    let scope = Scope {
        rewriter,
        component: &root.id,
        prefix: "",
        ports: declared,
    };
    let assumptions = scope.constraints(root.assumptions.iter().chain(&root.assertions))?;

    let mut properties = Vec::with_capacity(root.guarantees.len());
    for (i, statement) in root.guarantees.iter().enumerate() {
        let name = format!("{}{}", GUARANTEE_PREFIX, i);
        let guarantee = scope.constraint(statement)?;
        let display = statement
            .description
            .clone()
            .unwrap_or_else(|| statement.expr.to_string());
        renaming.insert(&name, display);
        properties.push(SystemProperty {
            name,
            description: statement.description.clone(),
            contract: ComponentContract {
                name: root.id.clone(),
                assumptions: assumptions.clone(),
                guarantees: vec![guarantee],
            },
        });
    }
    Ok(properties)
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
