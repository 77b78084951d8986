//! Solver script generation
//!
//! Turns a [`ComposedModel`] into one Redlog script. Every quantity the
//! caller reads back is printed between a pair of sentinel strings so the
//! solver output can be split into labelled bands.
//!
//! A combinational model (system order 0) is decided with a single check per
//! property. A temporal model of order `k` is proven by induction: a base
//! case over the first `k` instants and an inductive step over a window of
//! `k + 1` instants.

use crate::compose::{ComponentContract, ComposedModel, Mode, Renaming};
use crate::errors::{Result, TranslationError};
use crate::formula::Formula;
use crate::protocol::{split_markers, Band};
use crate::render::escape;
use crate::shift::Direction;
use redcomp_core::VarType;
use std::collections::BTreeSet;
use tracing::{debug, info};

const INITIAL_CONSTRAINT: &str = "__isc";
const STRONGEST_PROPERTY: &str = "__ssp";
const WEAKEST_PROPERTY: &str = "__wcp";
const BASE_STEP: &str = "__base";
const INDUCTIVE_STEP: &str = "__step";

/// Arithmetic domain the solver decides over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Real,
    Integer,
}

impl Domain {
    fn statement(self) -> &'static str {
        match self {
            Domain::Real => "rlset r$",
            Domain::Integer => "rlset z$",
        }
    }
}

/// How each property verdict is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// One band per property
    Single,
    /// A base step band and an inductive step band per property
    Induction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Synthesized property name
    pub name: String,

    /// Statement description, or the guarantee text
    pub display: String,
}

/// A generated script and everything needed to read its output back
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    /// Escaped script text, ready to be written out
    pub text: String,

    pub mode: Mode,

    pub check: Check,

    pub domain: Domain,

    pub system_order: usize,

    pub properties: Vec<PropertyInfo>,

    /// Every band the script prints, in output order
    pub bands: Vec<Band>,

    pub renaming: Renaming,
}

impl Script {
    /// Bands carrying the verdict of `property`
    pub fn verdict_bands(&self, property: &str) -> Vec<Band> {
        match self.check {
            Check::Single => vec![Band::Property(property.to_string())],
            Check::Induction => vec![
                Band::BaseStep(property.to_string()),
                Band::InductiveStep(property.to_string()),
            ],
        }
    }
}

/// Pick the solver domain from the declared variable types
pub fn domain(model: &ComposedModel) -> Result<Domain> {
    let mut integer = false;
    for decl in model.all_variables() {
        match decl.ty {
            VarType::Real => return Ok(Domain::Real),
            VarType::Int => integer = true,
            _ => {}
        }
    }
    if integer {
        Ok(Domain::Integer)
    } else {
        Err(TranslationError::NothingToDecide)
    }
}

/// Generate the solver script for a composed model
pub fn generate(model: &ComposedModel) -> Result<Script> {
    let domain = domain(model)?;
    let k = model.system_order;
    let mut builder = ScriptBuilder::new(domain);

    let check = match (&model.target, k) {
        (Some(_), _) => {
            diagnosis(model, k, &mut builder);
            Check::Single
        }
        (None, 0) => {
            composition(model, &mut builder);
            Check::Single
        }
        (None, _) => {
            induction(model, k, &mut builder);
            Check::Induction
        }
    };

    let properties = model
        .properties
        .iter()
        .map(|p| PropertyInfo {
            name: p.name.clone(),
            display: model.renaming.rename(&p.name),
        })
        .collect();
    let (text, bands) = builder.finish();

    info!(
        mode = ?model.mode(),
        ?check,
        ?domain,
        system_order = k,
        bands = bands.len(),
        "generated solver script"
    );

    Ok(Script {
        text,
        mode: model.mode(),
        check,
        domain,
        system_order: k,
        properties,
        bands,
        renaming: model.renaming.clone(),
    })
}

/// Order 0: eliminate the internal variables once, then check each property
/// against the strongest system property
fn composition(model: &ComposedModel, builder: &mut ScriptBuilder) {
    let internal = internal_variables(model);
    let ssp = window(&context_constraints(model), 0, Direction::Backward)
        .exists_where(|name| internal.contains(root(name)));
    builder.assign(STRONGEST_PROPERTY, &ssp);

    for property in &model.properties {
        let check = Formula::named(STRONGEST_PROPERTY, &ssp)
            .implies(property.contract.formula())
            .close();
        builder.assign(&property.name, &check);
    }

    builder.band(
        Band::StrongestProperty,
        &[format!("rlqe {};", STRONGEST_PROPERTY)],
    );
    builder.showtime();
    for property in &model.properties {
        builder.band(
            Band::Property(property.name.clone()),
            &[format!("rlqea {};", property.name), "showtime;".to_string()],
        );
    }
}

/// Order `k`: a base case from the initial constraint and an inductive step
/// from the strongest property over a `k + 1` instant window
fn induction(model: &ComposedModel, k: usize, builder: &mut ScriptBuilder) {
    let internal = internal_variables(model);
    let is_internal = |name: &str| internal.contains(root(name));
    let constraints = context_constraints(model);

    let isc = window(&constraints, k, Direction::Forward).exists_where(is_internal);
    let ssp = window(&constraints, k, Direction::Backward).exists_where(is_internal);
    builder.assign(INITIAL_CONSTRAINT, &isc);
    builder.assign(STRONGEST_PROPERTY, &ssp);

    for (i, property) in model.properties.iter().enumerate() {
        let (assumptions, guarantee, order) = split_contract(&property.contract);

        let base_hypothesis = Formula::conj(
            std::iter::once(Formula::named(INITIAL_CONSTRAINT, &isc))
                .chain((0..=k).map(|s| assumptions.shifted(Direction::Forward, s))),
        );
        let base_goal = Formula::conj(
            (order.max(1)..=k).map(|s| guarantee.shifted(Direction::Forward, s)),
        );
        let base = base_hypothesis.implies(base_goal).close();

        let step_hypothesis = Formula::conj(
            std::iter::once(Formula::named(STRONGEST_PROPERTY, &ssp))
                .chain(history(&assumptions, &guarantee, k)),
        );
        let step = step_hypothesis.implies(guarantee).close();

        debug!(property = %property.name, order, "induction over {} instants", k + 1);
        builder.assign(&format!("{}{}", BASE_STEP, i), &base);
        builder.assign(&format!("{}{}", INDUCTIVE_STEP, i), &step);
    }

    builder.band(
        Band::InitialConstraint,
        &[format!("rlqe {};", INITIAL_CONSTRAINT)],
    );
    builder.band(
        Band::StrongestProperty,
        &[format!("rlqe {};", STRONGEST_PROPERTY)],
    );
    builder.showtime();
    for (i, property) in model.properties.iter().enumerate() {
        builder.band(
            Band::BaseStep(property.name.clone()),
            &[format!("rlqea {}{};", BASE_STEP, i), "showtime;".to_string()],
        );
        builder.band(
            Band::InductiveStep(property.name.clone()),
            &[format!("rlqea {}{};", INDUCTIVE_STEP, i), "showtime;".to_string()],
        );
    }
}

/// Weakest property the target must guarantee, then one check of the
/// target contract against it per property
fn diagnosis(model: &ComposedModel, k: usize, builder: &mut ScriptBuilder) {
    let Some(target) = &model.target else {
        return;
    };
    let target_variables: BTreeSet<&str> =
        target.variables.iter().map(|v| v.id.as_str()).collect();
    let context = window(&context_constraints(model), k, Direction::Backward);
    let target_contract = target
        .contract
        .as_ref()
        .map(|c| window(&[(c.formula(), c.order())], k, Direction::Backward))
        .unwrap_or_else(Formula::truth);

    let mut queries = Vec::with_capacity(model.properties.len());
    for (i, property) in model.properties.iter().enumerate() {
        let name = format!("{}{}", WEAKEST_PROPERTY, i);
        let (assumptions, guarantee, _) = split_contract(&property.contract);
        let goal = Formula::conj(history(&assumptions, &guarantee, k));
        let goal = if goal.is_truth() {
            guarantee
        } else {
            goal.implies(guarantee)
        };
        let wcp = context
            .clone()
            .implies(goal)
            .forall_where(|var| !target_variables.contains(root(var)));
        builder.assign(&name, &wcp);

        let weakest = Formula::named(&name, &wcp);
        let check = if target_contract.is_truth() {
            weakest.close()
        } else {
            target_contract.clone().implies(weakest).close()
        };
        builder.assign(&property.name, &check);
        queries.push(format!("rlqe {};", name));
    }

    builder.band(Band::WeakestProperty, &queries);
    builder.showtime();
    for property in &model.properties {
        builder.band(
            Band::Property(property.name.clone()),
            &[format!("rlqea {};", property.name), "showtime;".to_string()],
        );
    }
}

/// Connection equalities followed by the context contracts, with their order
fn context_constraints(model: &ComposedModel) -> Vec<(Formula, usize)> {
    model
        .connections
        .iter()
        .map(|link| (link.constraint.formula(), 0))
        .chain(
            model
                .context_contracts
                .iter()
                .map(|contract| (contract.formula(), contract.order())),
        )
        .collect()
}

/// Conjunction of every instance of the constraints inside a `k + 1`
/// instant window. Forward instances start at time 0, backward instances
/// end at the current instant. A constraint deeper than `k` has no
/// instance.
fn window(constraints: &[(Formula, usize)], k: usize, direction: Direction) -> Formula {
    let mut instances = Vec::new();
    for (formula, order) in constraints {
        if *order > k {
            debug!(order, k, "constraint deeper than the window, omitted");
            continue;
        }
        match direction {
            Direction::Forward => {
                instances.extend((*order..=k).map(|s| formula.shifted(direction, s)))
            }
            Direction::Backward => {
                instances.extend((0..=k - order).map(|j| formula.shifted(direction, j)))
            }
        }
    }
    Formula::conj(instances)
}

/// Assumptions over the last `k + 1` instants and the guarantee over the
/// `k` instants before the current one
fn history(assumptions: &Formula, guarantee: &Formula, k: usize) -> Vec<Formula> {
    (0..=k)
        .map(|j| assumptions.shifted(Direction::Backward, j))
        .chain((1..=k).map(|j| guarantee.shifted(Direction::Backward, j)))
        .collect()
}

fn split_contract(contract: &ComponentContract) -> (Formula, Formula, usize) {
    let assumptions = Formula::conj(contract.assumptions.iter().map(|c| c.formula()));
    let guarantee = Formula::conj(contract.guarantees.iter().map(|c| c.formula()));
    let order = contract
        .guarantees
        .iter()
        .map(|c| c.order())
        .max()
        .unwrap_or(0);
    (assumptions, guarantee, order)
}

/// Context variables outside the boundary
fn internal_variables(model: &ComposedModel) -> BTreeSet<String> {
    let boundary = model.boundary();
    model
        .context_variables
        .iter()
        .filter(|v| !boundary.contains(&v.id))
        .map(|v| v.id.clone())
        .collect()
}

fn root(name: &str) -> &str {
    split_markers(name).1
}

struct ScriptBuilder {
    text: String,
    bands: Vec<Band>,
}

impl ScriptBuilder {
    fn new(domain: Domain) -> Self {
        let mut text = String::from("off echo$\n\noff nat$\n\n");
        text.push_str(domain.statement());
        text.push_str("\n\n");
        Self {
            text,
            bands: Vec::new(),
        }
    }

    fn assign(&mut self, name: &str, formula: &Formula) {
        self.text
            .push_str(&format!("{} := {}$\n\n", name, formula.text()));
    }

    fn band(&mut self, band: Band, statements: &[String]) {
        self.text.push_str(&band.begin_statement());
        self.text.push('\n');
        for statement in statements {
            self.text.push_str(statement);
            self.text.push('\n');
        }
        self.text.push_str(&Band::end_statement());
        self.text.push_str("\n\n");
        self.bands.push(band);
    }

    fn showtime(&mut self) {
        self.text.push_str("showtime;\n\n");
    }

    fn finish(mut self) -> (String, Vec<Band>) {
        self.text.push_str("quit;\n");
        (escape(&self.text), self.bands)
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
