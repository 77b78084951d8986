//! Textual time shifting of rendered formulas
//!
//! A rendered formula names the value of `x` at the current instant `x`,
//! one instant earlier `pre#x` and one instant later `next#x`. Shifting
//! rewrites every identifier token by one instant, cancelling an opposite
//! marker before adding a new one, so a forward shift followed by a backward
//! shift gives back the original text.

use crate::protocol::{split_markers, with_offset};

/// Direction of a one-step time shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn delta(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "impl", "repl", "equiv", "ex", "all", "true", "false",
];

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '#')
}

/// Shift one identifier, leaving names outside `prefix` alone
pub fn shift_name(name: &str, prefix: &str, direction: Direction) -> String {
    let (offset, root) = split_markers(name);
    if !root.starts_with(prefix) {
        return name.to_string();
    }
    with_offset(root, offset + direction.delta())
}

/// Shift every identifier of `text` whose marker-free root starts with
/// `prefix` by one instant. Numbers and connectives are left untouched.
pub fn shift(text: &str, prefix: &str, direction: Direction) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut token = String::new();
    for c in text.chars() {
        if is_ident_char(c) {
            token.push(c);
            continue;
        }
        flush(&mut out, &mut token, prefix, direction);
        out.push(c);
    }
    flush(&mut out, &mut token, prefix, direction);
    out
}

/// Apply `steps` shifts in the same direction
pub fn shift_by(text: &str, prefix: &str, direction: Direction, steps: usize) -> String {
    let mut shifted = text.to_string();
    for _ in 0..steps {
        shifted = shift(&shifted, prefix, direction);
    }
    shifted
}

fn flush(out: &mut String, token: &mut String, prefix: &str, direction: Direction) {
    if token.is_empty() {
        return;
    }
    let starts_with_digit = token.starts_with(|c: char| c.is_ascii_digit());
    if starts_with_digit || KEYWORDS.contains(&token.as_str()) {
        out.push_str(token);
    } else {
        out.push_str(&shift_name(token, prefix, direction));
    }
    token.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_forward_adds_next_marker() {
        assert_eq!(
            shift("(C.out = (pre#C.in + 1))", "", Direction::Forward),
            "(next#C.out = (C.in + 1))"
        );
    }

    #[test]
    fn test_backward_adds_pre_marker() {
        assert_eq!(
            shift("(x and not y)", "", Direction::Backward),
            "(pre#x and not pre#y)"
        );
    }

    #[test]
    fn test_prefix_limits_shift() {
        assert_eq!(
            shift("(C1.x = C2.y)", "C1.", Direction::Backward),
            "(pre#C1.x = C2.y)"
        );
    }

    #[test]
    fn test_numbers_and_fractions_untouched() {
        assert_eq!(
            shift("(x = (125/100))", "", Direction::Forward),
            "(next#x = (125/100))"
        );
    }

    #[test]
    fn test_shift_by_steps() {
        assert_eq!(shift_by("x", "", Direction::Backward, 3), "pre#pre#pre#x");
        assert_eq!(shift_by("pre#pre#x", "", Direction::Forward, 3), "next#x");
    }

    fn name() -> impl Strategy<Value = String> {
        ("[A-Z][a-z0-9]{0,3}\\.[a-z][a-z0-9_]{0,4}", 0usize..3, any::<bool>()).prop_map(
            |(root, depth, past)| {
                let marker = if past { "pre#" } else { "next#" };
                format!("{}{}", marker.repeat(depth), root)
            },
        )
    }

    fn formula() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(name(), 1..5),
            prop::collection::vec(
                prop::sample::select(vec![" = ", " + ", " and ", " impl ", " <= "]),
                4,
            ),
            0i64..50,
        )
            .prop_map(|(names, ops, constant)| {
                let mut text = String::from("(");
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        text.push_str(ops[i - 1]);
                    }
                    text.push_str(name);
                }
                text.push_str(&format!(" = {})", constant));
                text
            })
    }

    proptest! {
        #[test]
        fn prop_forward_then_backward_is_identity(text in formula()) {
            let there = shift(&text, "", Direction::Forward);
            prop_assert_eq!(shift(&there, "", Direction::Backward), text);
        }

        #[test]
        fn prop_backward_then_forward_is_identity(text in formula()) {
            let there = shift(&text, "", Direction::Backward);
            prop_assert_eq!(shift(&there, "", Direction::Forward), text);
        }
    }
}
