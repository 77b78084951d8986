//! Rendering rewritten expressions in the solver's concrete syntax

use crate::errors::{Result, TranslationError};
use redcomp_core::{BinaryOp, Expr, UnaryOp};

/// Render a rewritten expression as unescaped formula text
pub fn render(expr: &Expr) -> Result<String> {
    let mut out = String::new();
    write_expr(&mut out, expr)?;
    Ok(out)
}

fn write_expr(out: &mut String, expr: &Expr) -> Result<()> {
    match expr {
        Expr::Bool(true) => out.push_str("true"),
        Expr::Bool(false) => out.push_str("false"),
        Expr::Int(value) if *value < 0 => out.push_str(&format!("(-{})", value.unsigned_abs())),
        Expr::Int(value) => out.push_str(&value.to_string()),
        Expr::Real(text) => out.push_str(&rational(text)),
        Expr::Id(_) | Expr::RecordAccess { .. } => out.push_str(&flatten_path(expr)?),
        Expr::Unary { op, expr: inner } => {
            match op {
                UnaryOp::Negative => out.push_str("(-"),
                UnaryOp::Not => out.push_str("(not "),
                UnaryOp::Pre => return Err(TranslationError::unsupported("unrewritten pre", expr)),
            }
            write_expr(out, inner)?;
            out.push(')');
        }
        Expr::Binary { left, op, right } => {
            let symbol = match op {
                BinaryOp::Plus => "+",
                BinaryOp::Minus => "-",
                BinaryOp::Multiply => "*",
                BinaryOp::Divide => "/",
                BinaryOp::Equal => "=",
                BinaryOp::NotEqual => "<>",
                BinaryOp::Greater => ">",
                BinaryOp::Less => "<",
                BinaryOp::GreaterEqual => ">=",
                BinaryOp::LessEqual => "<=",
                BinaryOp::Or => "or",
                BinaryOp::And => "and",
                BinaryOp::Implies => "impl",
                BinaryOp::IntDivide => {
                    return Err(TranslationError::unsupported("integer division", expr))
                }
                BinaryOp::Modulus => return Err(TranslationError::unsupported("modulus", expr)),
                BinaryOp::Arrow => {
                    return Err(TranslationError::unsupported("initialisation operator", expr))
                }
                BinaryOp::Xor => {
                    let (l, r) = ((**left).clone(), (**right).clone());
                    let expanded =
                        Expr::and(Expr::or(l.clone(), r.clone()), Expr::not(Expr::and(l, r)));
                    return write_expr(out, &expanded);
                }
            };
            out.push('(');
            write_expr(out, left)?;
            out.push(' ');
            out.push_str(symbol);
            out.push(' ');
            write_expr(out, right)?;
            out.push(')');
        }
        Expr::IfThenElse {
            cond,
            then_expr,
            else_expr,
        } => {
            let expanded = Expr::or(
                Expr::and((**cond).clone(), (**then_expr).clone()),
                Expr::and(Expr::not((**cond).clone()), (**else_expr).clone()),
            );
            write_expr(out, &expanded)?;
        }
        Expr::Record { .. } => {
            return Err(TranslationError::unsupported("record construction", expr))
        }
        Expr::RecordUpdate { .. } => {
            return Err(TranslationError::unsupported("record update", expr))
        }
        Expr::NodeCall { .. } => {
            return Err(TranslationError::unsupported("uninlined node call", expr))
        }
        Expr::Array(_) => return Err(TranslationError::unsupported("array expression", expr)),
        Expr::ArrayAccess { .. } => return Err(TranslationError::unsupported("array access", expr)),
        Expr::ArrayUpdate { .. } => return Err(TranslationError::unsupported("array update", expr)),
        Expr::Tuple(_) => return Err(TranslationError::unsupported("tuple expression", expr)),
        Expr::Quantified { .. } => {
            return Err(TranslationError::unsupported("quantified expression", expr))
        }
        Expr::Constructor { .. } => {
            return Err(TranslationError::unsupported("datatype constructor", expr))
        }
    }
    Ok(())
}

/// `r.f.g` for a chain of field accesses over a variable
fn flatten_path(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Id(name) => Ok(name.clone()),
        Expr::RecordAccess { record, field } => Ok(format!("{}.{}", flatten_path(record)?, field)),
        _ => Err(TranslationError::unsupported("field access on a computed record", expr)),
    }
}

/// Decimal literal as an exact fraction, `1.25` becomes `(125/100)`
fn rational(text: &str) -> String {
    match text.split_once('.') {
        Some((whole, fraction)) => {
            let numerator = format!("{}{}", whole, fraction);
            let numerator = numerator.trim_start_matches('0');
            let numerator = if numerator.is_empty() { "0" } else { numerator };
            format!("({}/1{})", numerator, "0".repeat(fraction.len()))
        }
        None => text.to_string(),
    }
}

/// Escape identifier separators for the solver reader.
///
/// Every `_`, `.` and `#` outside a string literal is prefixed with `!`.
pub fn escape(script: &str) -> String {
    let mut out = String::with_capacity(script.len() + script.len() / 8);
    let mut in_string = false;
    for c in script.chars() {
        if c == '"' {
            in_string = !in_string;
        } else if !in_string && matches!(c, '_' | '.' | '#') {
            out.push('!');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use redcomp_core::parse_expr;

    fn render_source(source: &str) -> String {
        render(&parse_expr(source).unwrap()).unwrap()
    }

    #[test]
    fn test_render_arithmetic_and_logic() {
        assert_eq!(
            render_source("a + 1 = b and not c => d"),
            "((((a + 1) = b) and (not c)) impl d)"
        );
        assert_eq!(render_source("x <> -2"), "(x <> (-2))");
    }

    #[test]
    fn test_render_real_as_fraction() {
        assert_eq!(render_source("x = 1.25"), "(x = (125/100))");
        assert_eq!(render_source("x = 0.5"), "(x = (5/10))");
    }

    #[test]
    fn test_render_record_access_flattens() {
        assert_eq!(render_source("(p).x > 0"), "(p.x > 0)");
    }

    #[test]
    fn test_render_xor() {
        assert_eq!(
            render_source("a xor b"),
            "((a or b) and (not (a and b)))"
        );
    }

    #[test]
    fn test_render_rejects_records_and_arrows() {
        for source in ["Point { x = 1 } = p", "0 -> x", "x mod 2 = 0", "x div 2 = 0"] {
            assert!(render(&parse_expr(source).unwrap()).is_err(), "{}", source);
        }
    }

    #[test]
    fn test_escape_outside_strings() {
        assert_eq!(
            escape("pre#C1.x_y := 1$ \"//begin printing property result: __G0\";"),
            "pre!#C1!.x!_y := 1$ \"//begin printing property result: __G0\";"
        );
    }
}
