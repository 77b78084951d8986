//! Hierarchical component model
//!
//! The model is consumed read-only by the contract composer. It is loaded
//! from JSON; expressions inside it are written in the textual contract
//! syntax and parsed on deserialization.

use crate::ast::Expr;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Type of a port or node variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VarType {
    Bool,
    Int,
    Real,
    /// Any other named type; representable but not translatable
    Named(String),
}

impl From<String> for VarType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "bool" => VarType::Bool,
            "int" => VarType::Int,
            "real" => VarType::Real,
            _ => VarType::Named(name),
        }
    }
}

impl From<VarType> for String {
    fn from(ty: VarType) -> Self {
        ty.to_string()
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Bool => write!(f, "bool"),
            VarType::Int => write!(f, "int"),
            VarType::Real => write!(f, "real"),
            VarType::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A typed variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: String,

    #[serde(rename = "type")]
    pub ty: VarType,

    /// Provenance reference reported back in counterexamples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Identity of the owning component instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl VarDecl {
    pub fn new(id: impl Into<String>, ty: VarType) -> Self {
        Self {
            id: id.into(),
            ty,
            reference: None,
            instance: None,
        }
    }

    /// Copy of this declaration renamed into a component's namespace
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            id: format!("{}{}", prefix, self.id),
            ty: self.ty.clone(),
            reference: self.reference.clone(),
            instance: self.instance.clone(),
        }
    }
}

/// An assumption, guarantee or assertion with an optional description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StatementRepr")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub expr: Expr,
}

impl Statement {
    pub fn new(expr: Expr) -> Self {
        Self {
            description: None,
            expr,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatementRepr {
    Bare(Expr),
    Described {
        #[serde(default)]
        description: Option<String>,
        expr: Expr,
    },
}

impl From<StatementRepr> for Statement {
    fn from(repr: StatementRepr) -> Self {
        match repr {
            StatementRepr::Bare(expr) => Statement::new(expr),
            StatementRepr::Described { description, expr } => Statement { description, expr },
        }
    }
}

/// A port reference: `Component.port`, or a bare `port` of the enclosing node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRef {
    pub component: Option<String>,
    pub port: String,
}

impl PortRef {
    pub fn new(component: Option<&str>, port: &str) -> Self {
        Self {
            component: component.map(str::to_string),
            port: port.to_string(),
        }
    }

    /// Name of the port in the composed namespace
    pub fn qualified_name(&self) -> String {
        self.to_string()
    }
}

impl TryFrom<String> for PortRef {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        let (component, port) = match text.split_once('.') {
            Some((component, port)) => (Some(component), port),
            None => (None, text.as_str()),
        };
        let valid = |s: &str| !s.is_empty() && !s.contains('.');
        if !valid(port) || component.is_some_and(|c| !valid(c)) {
            return Err(Error::InvalidPort(text));
        }
        Ok(PortRef::new(component, port))
    }
}

impl From<PortRef> for String {
    fn from(port: PortRef) -> Self {
        port.to_string()
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(component) => write!(f, "{}.{}", component, self.port),
            None => write!(f, "{}", self.port),
        }
    }
}

/// A dataflow connection between two ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source: PortRef,
    pub destination: PortRef,
}

/// A node of the component hierarchy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentNode {
    pub id: String,

    pub inputs: Vec<VarDecl>,

    pub outputs: Vec<VarDecl>,

    pub assumptions: Vec<Statement>,

    pub guarantees: Vec<Statement>,

    /// Assertions constrain the component like guarantees do
    pub assertions: Vec<Statement>,

    pub subcomponents: Vec<ComponentNode>,

    pub connections: Vec<Connection>,
}

impl ComponentNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn subcomponent(&self, id: &str) -> Option<&ComponentNode> {
        self.subcomponents.iter().find(|c| c.id == id)
    }

    /// Guarantees followed by assertions
    pub fn constraints(&self) -> impl Iterator<Item = &Statement> {
        self.guarantees.iter().chain(self.assertions.iter())
    }
}

/// A single defining equation `lhs = expr` of an invocable node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub lhs: String,
    pub expr: Expr,
}

/// An invocable node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: String,

    #[serde(default)]
    pub inputs: Vec<VarDecl>,

    #[serde(default)]
    pub outputs: Vec<VarDecl>,

    #[serde(default)]
    pub equations: Vec<Equation>,
}

impl NodeDef {
    /// Defining expression of `output`, if any
    pub fn equation_for(&self, output: &str) -> Option<&Expr> {
        self.equations
            .iter()
            .find(|eq| eq.lhs == output)
            .map(|eq| &eq.expr)
    }
}

/// A component hierarchy plus the catalogue of invocable nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentModel {
    #[serde(default)]
    pub nodes: Vec<NodeDef>,

    pub root: ComponentNode,
}

impl ComponentModel {
    pub fn new(root: ComponentNode) -> Self {
        Self {
            nodes: Vec::new(),
            root,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    /// Check that sub-components and node definitions are uniquely named
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for component in &self.root.subcomponents {
            if component.id.is_empty() || component.id.contains('.') {
                return Err(Error::InvalidModel(format!(
                    "invalid component name {:?}",
                    component.id
                )));
            }
            if !seen.insert(component.id.as_str()) {
                return Err(Error::InvalidModel(format!(
                    "duplicate component {}",
                    component.id
                )));
            }
        }
        seen.clear();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(Error::InvalidModel(format!("duplicate node {}", node.id)));
            }
        }
        Ok(())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    const MODEL: &str = r#"{
        "nodes": [
            {
                "id": "inc",
                "inputs": [{ "id": "a", "type": "int" }],
                "outputs": [{ "id": "r", "type": "int" }],
                "equations": [{ "lhs": "r", "expr": "a + 1" }]
            }
        ],
        "root": {
            "id": "Top",
            "outputs": [{ "id": "out", "type": "int", "reference": "Top/out" }],
            "guarantees": ["out = 4", { "description": "positive", "expr": "out > 0" }],
            "subcomponents": [
                { "id": "C1", "outputs": [{ "id": "x", "type": "int" }] }
            ],
            "connections": [{ "source": "C1.x", "destination": "out" }]
        }
    }"#;

    #[test]
    fn test_load_model() {
        let model = ComponentModel::from_json_str(MODEL).unwrap();
        assert_eq!(model.root.id, "Top");
        assert_eq!(model.root.guarantees.len(), 2);
        assert_eq!(model.root.guarantees[0].description, None);
        assert_eq!(
            model.root.guarantees[1].description.as_deref(),
            Some("positive")
        );
        assert_eq!(
            model.root.outputs[0].reference.as_deref(),
            Some("Top/out")
        );

        let connection = &model.root.connections[0];
        assert_eq!(connection.source, PortRef::new(Some("C1"), "x"));
        assert_eq!(connection.destination, PortRef::new(None, "out"));

        let inc = &model.nodes[0];
        assert_eq!(inc.id, "inc");
        assert_eq!(
            inc.equation_for("r"),
            Some(&Expr::binary(Expr::id("a"), BinaryOp::Plus, Expr::Int(1)))
        );
    }

    #[test]
    fn test_var_type_names() {
        assert_eq!(VarType::from("real".to_string()), VarType::Real);
        assert_eq!(
            VarType::from("Speed".to_string()),
            VarType::Named("Speed".to_string())
        );
    }

    #[test]
    fn test_invalid_port() {
        assert!(PortRef::try_from("C1.".to_string()).is_err());
        assert!(PortRef::try_from("a.b.c".to_string()).is_err());
        assert!(PortRef::try_from(String::new()).is_err());
    }

    #[test]
    fn test_bad_expression_rejected() {
        let text = r#"{ "root": { "id": "Top", "guarantees": ["x = "] } }"#;
        assert!(ComponentModel::from_json_str(text).is_err());
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let text = r#"{ "root": { "id": "Top", "subcomponents": [{ "id": "C" }, { "id": "C" }] } }"#;
        assert!(matches!(
            ComponentModel::from_json_str(text),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn test_prefixed_decl() {
        let decl = VarDecl::new("x", VarType::Int).prefixed("C1.");
        assert_eq!(decl.id, "C1.x");
        assert_eq!(decl.ty, VarType::Int);
    }
}
