#[cfg(test)]
mod tests {
    use crate::compose::*;
    use crate::errors::TranslationError;
    use redcomp_core::ComponentModel;

    const PIPELINE: &str = r#"{
        "root": {
            "id": "Top",
            "guarantees": [{ "description": "output is four", "expr": "C2.z = 4" }],
            "subcomponents": [
                {
                    "id": "C1",
                    "outputs": [{ "id": "x", "type": "int", "reference": "C1/x" }],
                    "guarantees": ["x = 3"]
                },
                {
                    "id": "C2",
                    "inputs": [{ "id": "y", "type": "int" }],
                    "outputs": [{ "id": "z", "type": "int" }],
                    "guarantees": ["z = y + 1"],
                    "assertions": ["z = y + 1", "z > y"]
                }
            ],
            "connections": [{ "source": "C1.x", "destination": "C2.y" }]
        }
    }"#;

    fn load(text: &str) -> ComponentModel {
        ComponentModel::from_json_str(text).unwrap()
    }

    #[test]
    fn test_compose_pipeline() {
        let composed = compose(&load(PIPELINE), None).unwrap();
        assert_eq!(composed.mode(), Mode::Composition);
        assert_eq!(composed.system_order, 0);
        assert_eq!(composed.context_contracts.len(), 2);
        assert_eq!(composed.context_variables.len(), 3);
        assert_eq!(composed.connections.len(), 1);
        assert_eq!(composed.connections[0].constraint.text, "(C1.x = C2.y)");

        let property = &composed.properties[0];
        assert_eq!(property.name, "__GUARANTEE0");
        assert_eq!(property.contract.formula().text(), "(C2.z = 4)");
    }

    #[test]
    fn test_duplicate_guarantee_text_dropped() {
        let composed = compose(&load(PIPELINE), None).unwrap();
        let c2 = &composed.context_contracts[1];
        let texts: Vec<&str> = c2.guarantees.iter().map(|g| g.text.as_str()).collect();
        assert_eq!(texts, vec!["(C2.z = (C2.y + 1))", "(C2.z > C2.y)"]);
    }

    #[test]
    fn test_boundary_includes_property_variables() {
        let composed = compose(&load(PIPELINE), None).unwrap();
        let boundary = composed.boundary();
        assert!(boundary.contains("C2.z"));
        assert!(!boundary.contains("C1.x"));
    }

    #[test]
    fn test_renaming_uses_references() {
        let composed = compose(&load(PIPELINE), None).unwrap();
        assert_eq!(composed.renaming.rename("c1.x"), "C1/x");
        assert_eq!(composed.renaming.rename("C2.y"), "C2.y");
        assert_eq!(composed.renaming.rename("__GUARANTEE0"), "output is four");
        assert_eq!(composed.renaming.rename("unmapped"), "unmapped");
    }

    #[test]
    fn test_diagnosis_keeps_target_apart() {
        let composed = compose(&load(PIPELINE), Some("C2")).unwrap();
        assert_eq!(
            composed.mode(),
            Mode::Diagnosis {
                target: "C2".to_string()
            }
        );
        let target = composed.target.as_ref().unwrap();
        assert_eq!(target.variables.len(), 2);
        assert!(target.contract.is_some());
        assert_eq!(composed.context_contracts.len(), 1);
        assert_eq!(composed.context_contracts[0].name, "C1");
    }

    #[test]
    fn test_unknown_target() {
        let err = compose(&load(PIPELINE), Some("C9")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown target component: C9");
    }

    #[test]
    fn test_fan_in_rejected() {
        let text = r#"{
            "root": {
                "id": "Top",
                "inputs": [{ "id": "a", "type": "int" }, { "id": "b", "type": "int" }],
                "guarantees": ["true"],
                "subcomponents": [{ "id": "C", "inputs": [{ "id": "i", "type": "int" }] }],
                "connections": [
                    { "source": "a", "destination": "C.i" },
                    { "source": "b", "destination": "C.i" }
                ]
            }
        }"#;
        let err = compose(&load(text), None).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::FanIn { ref destination, .. } if destination == "C.i"
        ));
    }

    #[test]
    fn test_duplicate_connection_ignored() {
        let text = r#"{
            "root": {
                "id": "Top",
                "inputs": [{ "id": "a", "type": "int" }],
                "guarantees": ["a = a"],
                "subcomponents": [{ "id": "C", "inputs": [{ "id": "i", "type": "int" }] }],
                "connections": [
                    { "source": "a", "destination": "C.i" },
                    { "source": "a", "destination": "C.i" }
                ]
            }
        }"#;
        let composed = compose(&load(text), None).unwrap();
        assert_eq!(composed.connections.len(), 1);
    }

    #[test]
    fn test_undeclared_port_rejected() {
        let text = r#"{
            "root": {
                "id": "Top",
                "guarantees": ["true"],
                "subcomponents": [{ "id": "C", "outputs": [{ "id": "o", "type": "int" }] }],
                "connections": [{ "source": "C.o", "destination": "missing" }]
            }
        }"#;
        let err = compose(&load(text), None).unwrap_err();
        assert_eq!(err.to_string(), "Connection references undeclared port missing");
    }

    #[test]
    fn test_foreign_variable_rejected() {
        let text = r#"{
            "root": {
                "id": "Top",
                "inputs": [{ "id": "in", "type": "int" }],
                "guarantees": ["true"],
                "subcomponents": [{
                    "id": "B",
                    "outputs": [{ "id": "d", "type": "int" }],
                    "guarantees": ["d = pre(in)"]
                }]
            }
        }"#;
        let err = compose(&load(text), None).unwrap_err();
        assert_eq!(err.to_string(), "Variable B.in is not a port of B");

        let root = PIPELINE.replace(r#""expr": "C2.z = 4""#, r#""expr": "C3.z = 4""#);
        let err = compose(&load(&root), None).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnknownVariable { ref name, ref component }
                if name == "C3.z" && component == "Top"
        ));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let text = r#"{
            "root": {
                "id": "Top",
                "guarantees": ["true"],
                "subcomponents": [{ "id": "C", "outputs": [{ "id": "s", "type": "Speed" }] }]
            }
        }"#;
        let err = compose(&load(text), None).unwrap_err();
        assert!(matches!(err, TranslationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_assumptions_without_guarantees_rejected() {
        let text = r#"{
            "root": {
                "id": "Top",
                "guarantees": ["true"],
                "subcomponents": [{
                    "id": "C",
                    "inputs": [{ "id": "i", "type": "int" }],
                    "assumptions": ["i > 0"]
                }]
            }
        }"#;
        let err = compose(&load(text), None).unwrap_err();
        assert_eq!(err.to_string(), "Contract C has no guarantees");
    }

    #[test]
    fn test_root_without_guarantees_rejected() {
        let text = r#"{ "root": { "id": "Top" } }"#;
        assert!(matches!(
            compose(&load(text), None),
            Err(TranslationError::EmptyGuarantees(_))
        ));
    }

    #[test]
    fn test_temporal_component_order() {
        let text = r#"{
            "root": {
                "id": "Top",
                "inputs": [{ "id": "in", "type": "int" }],
                "outputs": [{ "id": "out", "type": "int" }],
                "assumptions": ["in = 0"],
                "guarantees": ["out = 1"],
                "subcomponents": [{
                    "id": "C",
                    "inputs": [{ "id": "in", "type": "int" }],
                    "outputs": [{ "id": "out", "type": "int" }],
                    "guarantees": ["out = pre(in) + 1"]
                }],
                "connections": [
                    { "source": "in", "destination": "C.in" },
                    { "source": "C.out", "destination": "out" }
                ]
            }
        }"#;
        let composed = compose(&load(text), None).unwrap();
        assert_eq!(composed.system_order, 1);
        assert!(composed.is_temporal());
        assert_eq!(composed.context_contracts[0].order(), 1);
    }
}
