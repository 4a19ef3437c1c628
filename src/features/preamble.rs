//! Conditional preamble
//!
//! Preamble templates carry conditions in comments:
//!
//! ```text
//! \usepackage{minted} % CONDITION: minted==true
//! \usepackage{listings} % minted==false
//! % IF language==english
//! \usepackage[english]{babel}
//! % ENDIF
//! ```
//!
//! The `CONDITION:` prefix is optional. A line whose condition fails is
//! dropped; an `IF` block whose condition fails is dropped up to its `ENDIF`. Malformed conditions and unknown keys
//! count as true.

use crate::core::scanner::find_unescaped;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value a condition key can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConditionValue {
    /// Compare with the right-hand side of `key==value`, by string form.
    /// Booleans match `true`/`True` alike.
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            ConditionValue::Bool(b) => expected.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
            other => other.to_string() == expected,
        }
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Bool(true) => write!(f, "True"),
            ConditionValue::Bool(false) => write!(f, "False"),
            ConditionValue::Int(n) => write!(f, "{}", n),
            ConditionValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        ConditionValue::Bool(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        ConditionValue::Int(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Str(value.to_string())
    }
}

/// Condition keys in declaration order.
pub type Conditions = IndexMap<String, ConditionValue>;

fn condition_holds(expression: &str, keys: &Conditions) -> bool {
    let expression = expression.trim();
    let expression = expression.strip_prefix("CONDITION:").unwrap_or(expression);
    let Some((key, value)) = expression.split_once("==") else {
        return true;
    };
    keys.get(key.trim()).map_or(true, |v| v.matches(value.trim()))
}

/// Split a line at its first unescaped `%`.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    match find_unescaped(line, "%", 0) {
        Some(at) => {
            let comment = &line[at + 1..];
            let comment = comment.split('%').next().unwrap_or(comment);
            (&line[..at], Some(comment))
        }
        None => (line, None),
    }
}

/// Apply the conditions of a preamble template.
///
/// Kept lines lose their comment and the whitespace before it. Runs of empty
/// lines collapse to one.
pub fn conditional_preamble(text: &str, keys: &Conditions) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut hiding = false;

    for line in text.split('\n') {
        let (code, comment) = split_comment(line);
        if hiding {
            if comment.map_or(false, |c| c.trim().starts_with("ENDIF")) {
                hiding = false;
            }
            continue;
        }
        match comment {
            Some(comment) => match comment.trim().strip_prefix("IF") {
                Some(block) => hiding = !condition_holds(block, keys),
                None => {
                    if condition_holds(comment, keys) {
                        kept.push(code.trim_end());
                    }
                }
            },
            None => kept.push(code),
        }
    }

    let mut out: Vec<&str> = Vec::with_capacity(kept.len());
    for line in kept {
        if line.is_empty() && out.last().map_or(false, |prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(pairs: &[(&str, ConditionValue)]) -> Conditions {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn line_conditions() {
        let keys = conditions(&[("minted", true.into()), ("cols", 2i64.into())]);
        let text = "\\usepackage{minted} % minted==True\n\\usepackage{listings} % minted==false\n\\columns % cols==2";
        assert_eq!(
            conditional_preamble(text, &keys),
            "\\usepackage{minted}\n\\columns"
        );
    }

    #[test]
    fn condition_prefix() {
        let keys = conditions(&[("minted", true.into())]);
        let text = "\\usepackage{listings} % CONDITION: minted==false\n\\usepackage{x}";
        assert_eq!(conditional_preamble(text, &keys), "\\usepackage{x}");
        let text = "\\usepackage{minted}   % CONDITION: minted==true\n% IF CONDITION: minted==false\ny\n% ENDIF";
        assert_eq!(conditional_preamble(text, &keys), "\\usepackage{minted}");
    }

    #[test]
    fn if_blocks() {
        let keys = conditions(&[("lang", "english".into())]);
        let text = "a\n% IF lang==french\n\\usepackage[french]{babel}\n% ENDIF\nb\n% IF lang==english\nc\n% ENDIF";
        assert_eq!(conditional_preamble(text, &keys), "a\nb\nc\n");
    }

    #[test]
    fn unknown_and_malformed_conditions_keep_lines() {
        let keys = Conditions::new();
        let text = "x % missing==1\ny % just a note\nz";
        assert_eq!(conditional_preamble(text, &keys), "x\ny\nz");
    }

    #[test]
    fn escaped_percent_is_not_a_comment() {
        let keys = conditions(&[("flag", false.into())]);
        assert_eq!(conditional_preamble("50\\% off % flag==true", &keys), "");
        assert_eq!(conditional_preamble("50\\% off", &keys), "50\\% off");
    }

    #[test]
    fn empty_lines_collapse() {
        let text = "a\n\n\n\nb";
        assert_eq!(conditional_preamble(text, &Conditions::new()), "a\n\nb");
    }

    #[test]
    fn condition_values_from_json() {
        let keys: Conditions = serde_json::from_str(r#"{"a": true, "b": 3, "c": "x"}"#).unwrap();
        assert_eq!(keys["a"], ConditionValue::Bool(true));
        assert_eq!(keys["b"], ConditionValue::Int(3));
        assert_eq!(keys["c"], ConditionValue::Str("x".to_string()));
        assert!(keys["a"].matches("true"));
        assert!(!keys["b"].matches("4"));
    }
}
