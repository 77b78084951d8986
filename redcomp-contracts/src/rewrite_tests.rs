#[cfg(test)]
mod tests {
    use crate::errors::TranslationError;
    use crate::rewrite::*;
    use proptest::prelude::*;
    use redcomp_core::{parse_expr, Equation, Expr, NodeDef, VarDecl, VarType};
    use rustc_hash::FxHashMap;

    /// Replace variable references by their bound expressions
    fn substitute(expr: &Expr, bindings: &FxHashMap<String, Expr>) -> Expr {
        match expr {
            Expr::Id(name) => bindings.get(name).cloned().unwrap_or_else(|| expr.clone()),
            Expr::Unary { op, expr: inner } => Expr::unary(*op, substitute(inner, bindings)),
            Expr::Binary { left, op, right } => {
                Expr::binary(substitute(left, bindings), *op, substitute(right, bindings))
            }
            other => other.clone(),
        }
    }

    fn node(id: &str, inputs: &[&str], output: &str, body: &str) -> NodeDef {
        NodeDef {
            id: id.to_string(),
            inputs: inputs
                .iter()
                .map(|name| VarDecl::new(*name, VarType::Int))
                .collect(),
            outputs: vec![VarDecl::new(output, VarType::Int)],
            equations: vec![Equation {
                lhs: output.to_string(),
                expr: parse_expr(body).unwrap(),
            }],
        }
    }

    fn rewrite(nodes: &[NodeDef], source: &str, prefix: &str) -> Rewritten {
        Rewriter::new(nodes)
            .rewrite(&parse_expr(source).unwrap(), prefix)
            .unwrap()
    }

    #[test]
    fn test_prefixes_free_variables() {
        let result = rewrite(&[], "z = y + 1", "C2.");
        assert_eq!(result.expr.to_string(), "(C2.z = (C2.y + 1))");
        assert_eq!(result.order, 0);
        assert_eq!(
            result.variables().into_iter().collect::<Vec<_>>(),
            vec!["C2.y".to_string(), "C2.z".to_string()]
        );
    }

    #[test]
    fn test_pre_marks_scope() {
        let result = rewrite(&[], "out = pre(in) + 1", "C.");
        assert_eq!(result.expr.to_string(), "(C.out = (pre#C.in + 1))");
        assert_eq!(result.order, 1);
        assert_eq!(result.highest_order.get("C.in"), Some(&1));
        assert_eq!(result.highest_order.get("C.out"), Some(&0));
        assert!(result.vars_by_order[&1].contains("pre#C.in"));
    }

    #[test]
    fn test_conditional_expands() {
        let result = rewrite(&[], "if c then a else b", "");
        assert_eq!(
            result.expr.to_string(),
            "((c and a) or ((not c) and b))"
        );
    }

    #[test]
    fn test_node_call_inlined() {
        let nodes = [node("inc", &["a"], "r", "a + 1")];
        let result = rewrite(&nodes, "z = inc(y)", "C.");
        assert_eq!(result.expr.to_string(), "(C.z = (C.y + 1))");
    }

    #[test]
    fn test_pre_inside_node_body() {
        let nodes = [node("delay", &["a"], "r", "pre(a)")];
        let result = rewrite(&nodes, "z = delay(y)", "C.");
        assert_eq!(result.expr.to_string(), "(C.z = pre#C.y)");
        assert_eq!(result.order, 1);
    }

    #[test]
    fn test_nested_calls_use_call_site_bindings() {
        // `a` in the inner argument refers to the outer node's input
        let nodes = [
            node("outer", &["a"], "r", "inner(a + 1)"),
            node("inner", &["a"], "r", "pre(a) * 2"),
        ];
        let result = rewrite(&nodes, "outer(x)", "C.");
        assert_eq!(result.expr.to_string(), "((pre#C.x + 1) * 2)");
    }

    #[test]
    fn test_unbound_reference_in_node() {
        let nodes = [node("leak", &["a"], "r", "a + hidden")];
        let err = Rewriter::new(&nodes)
            .rewrite(&parse_expr("leak(x)").unwrap(), "C.")
            .unwrap_err();
        assert_eq!(err.to_string(), "Variable hidden is not bound in node leak");
    }

    #[test]
    fn test_unknown_node() {
        let err = Rewriter::new(&[])
            .rewrite(&parse_expr("f(x)").unwrap(), "")
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown node: f");
    }

    #[test]
    fn test_multiple_outputs_rejected() {
        let mut def = node("pair", &["a"], "r", "a");
        def.outputs.push(VarDecl::new("s", VarType::Int));
        let nodes = [def];
        let err = Rewriter::new(&nodes)
            .rewrite(&parse_expr("pair(x)").unwrap(), "")
            .unwrap_err();
        assert!(matches!(err, TranslationError::MultipleOutputs { count: 2, .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let nodes = [node("inc", &["a"], "r", "a + 1")];
        let err = Rewriter::new(&nodes)
            .rewrite(&parse_expr("inc(x, y)").unwrap(), "")
            .unwrap_err();
        assert!(matches!(
            err,
            TranslationError::Arity {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_constructs_fail_fast() {
        for (source, construct) in [
            ("[1, 2]", "array expression"),
            ("(a)[0] = 1", "array access"),
            ("(a, b)", "tuple expression"),
            ("forall i. i > 0", "quantified expression"),
        ] {
            let err = Rewriter::new(&[])
                .rewrite(&parse_expr(source).unwrap(), "C.")
                .unwrap_err();
            assert!(
                err.to_string().starts_with(&format!("Unsupported {}", construct)),
                "{}",
                err
            );
        }
    }

    fn nest_pre(depth: usize) -> String {
        let mut source = "x".to_string();
        for _ in 0..depth {
            source = format!("pre({})", source);
        }
        source
    }

    proptest! {
        #[test]
        fn prop_pre_depth_is_order_and_marker_count(depth in 0usize..6) {
            let result = rewrite(&[], &nest_pre(depth), "C.");
            prop_assert_eq!(result.order, depth);
            prop_assert_eq!(result.highest_order.get("C.x"), Some(&depth));
            let name = result.expr.to_string();
            prop_assert_eq!(name.matches("pre#").count(), depth);
            prop_assert!(name.ends_with("C.x"));
        }

        #[test]
        fn prop_inlining_matches_substitution(
            depth in 0usize..3,
            constant in 0i64..100,
        ) {
            let body = format!("{} + b * {}", nest_pre(depth).replace('x', "a"), constant);
            let nodes = [node("f", &["a", "b"], "r", &body)];
            let call = rewrite(&nodes, "f(u, pre(v))", "C.");

            let mut bindings = FxHashMap::default();
            bindings.insert("a".to_string(), parse_expr("u").unwrap());
            bindings.insert("b".to_string(), parse_expr("pre(v)").unwrap());
            let expanded = substitute(&parse_expr(&body).unwrap(), &bindings);
            let direct = Rewriter::new(&[]).rewrite(&expanded, "C.").unwrap();

            prop_assert_eq!(call, direct);
        }
    }
}
