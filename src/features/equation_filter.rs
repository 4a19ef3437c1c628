//! Per-equation repair for math exported by Word
//!
//! Word's equation editor produces constructs pandoc passes through
//! verbatim: accents stacked with `\overset`, braces for set notation, and
//! multi-line equations written as consecutive `{line}` groups.
//! [`fix_equations`] rewrites one math node at a time.

use crate::core::align::split_equation;
use crate::core::scanner::{brace_depth, local_env_end, outer_brace_groups};
use crate::utils::error::RepairResult;

/// Line width used to break long equations.
const MAX_LINE_LENGTH: usize = 80;

/// Alignment symbols from highest to lowest precedence.
const ALIGN_TIERS: &[&[&str]] = &[
    &["\\iff", "\\Leftrightarrow", "\\Rightarrow", "\\implies", "\\Leftarrow"],
    &["="],
    &["<", ">", "\\leq", "\\geq", "\\approx"],
    &["\\subset", "\\subseteq", "\\not\\subset"],
    &["\\neq"],
];

const SIMPLE_REPLACEMENTS: &[(&str, &str)] = &[
    ("\n", " "),
    ("\\{", "\\lbrace"),
    ("\\}", "\\rbrace"),
    ("≢", "\\not\\equiv "),
    ("\\overrightarrow", "\\vec"),
    ("\\overset{\u{20D1}}", "\\mathbf"),
    ("\\overset{\u{20D0}}", "\\mathbf"),
    (
        "\\end{matrix}\\mid\\begin{matrix}",
        "\\end{matrix}\\;\\middle|\\;\\begin{matrix}",
    ),
];

const OVERSET: &str = "\\overset{";
const BRACE_ACCENT: &str = "}{\u{FE38}}}";
const ARROW_ACCENT: &str = "\\overleftrightarrow{}}{";

/// Repair a single equation.
///
/// The result always ends with two spaces, which keeps the equation apart
/// from whatever pandoc placed after it.
pub fn fix_equations(eqn: &str) -> RepairResult<String> {
    let mut eqn = eqn.to_string();
    for (from, to) in SIMPLE_REPLACEMENTS {
        eqn = eqn.replace(from, to);
    }
    let eqn = fix_accents(&eqn)?;
    let eqn = fix_line_groups(&eqn)?;
    Ok(format!("{}  ", eqn))
}

/// `\overset{x}{︸}}` → `\underbrace{x}}` and
/// `\overset{\overleftrightarrow{}}{AB}` → `\overleftrightarrow{AB}`.
fn fix_accents(eqn: &str) -> RepairResult<String> {
    let mut text = eqn.to_string();
    let mut cursor = 0usize;
    while let Some(offset) = text[cursor..].find(OVERSET) {
        let start = cursor + offset;
        let after = start + OVERSET.len();

        if text[after..].starts_with(ARROW_ACCENT) {
            let open = after + ARROW_ACCENT.len() - 1;
            let close = local_env_end(&text, open)?;
            text = format!("{}\\overleftrightarrow{{{}{}", &text[..start], &text[open + 1..close], &text[close..]);
            cursor = start + 1;
            continue;
        }

        let close = local_env_end(&text, start)?;
        if text[close..].starts_with(BRACE_ACCENT) {
            let contents = text[after..close].to_string();
            let rest = close + BRACE_ACCENT.len();
            text = format!("{}\\underbrace{{{}}}}}{}", &text[..start], contents, &text[rest..]);
        }
        cursor = start + 1;
    }
    Ok(text)
}

/// Turn a long equation or Word's `{line}{line}` form into an `aligned`
/// block. Anything else comes back unchanged.
fn fix_line_groups(eqn: &str) -> RepairResult<String> {
    let eqn = eqn.trim();
    if !eqn.starts_with('{') {
        return match split_equation(eqn, MAX_LINE_LENGTH)? {
            Some(lines) if lines.len() > 1 => generate_aligned(&lines),
            _ => Ok(eqn.to_string()),
        };
    }

    let mut lines = Vec::new();
    for group in line_groups(eqn)? {
        match split_equation(&group, MAX_LINE_LENGTH)? {
            Some(split) => lines.extend(split),
            None => lines.push(group),
        }
    }
    generate_aligned(&lines)
}

/// Lines of Word's multi-line form: at least two adjacent top-level groups,
/// optionally followed by one more line of ungrouped text. A group carrying
/// a sub- or superscript is ordinary math, so the whole equation is one line.
fn line_groups(eqn: &str) -> RepairResult<Vec<String>> {
    let groups = outer_brace_groups(eqn)?;
    let whole = vec![eqn.to_string()];

    let mut end = 0usize;
    let mut lines = Vec::new();
    for group in &groups {
        if group.start != end {
            break;
        }
        lines.push(group.inner().slice(eqn).trim().to_string());
        end = group.end;
    }
    if lines.len() < 2 {
        return Ok(whole);
    }

    let rest = eqn[end..].trim();
    if rest.starts_with('_') || rest.starts_with('^') {
        return Ok(whole);
    }
    if !rest.is_empty() {
        lines.push(rest.to_string());
    }
    Ok(lines)
}

fn generate_aligned(lines: &[String]) -> RepairResult<String> {
    match lines {
        [] => Ok(String::new()),
        [line] => Ok(line.clone()),
        _ => {
            let mut body = Vec::with_capacity(lines.len());
            for (i, line) in lines.iter().enumerate() {
                let aligned = add_alignment_point(line)?;
                if i + 1 < lines.len() {
                    body.push(format!("{} \\\\", aligned));
                } else {
                    body.push(aligned);
                }
            }
            Ok(format!("\\begin{{aligned}}\n{}\n\\end{{aligned}}", body.join("\n")))
        }
    }
}

/// Insert ` &` before the first top-level symbol of the highest tier present,
/// or at the start of the line.
fn add_alignment_point(line: &str) -> RepairResult<String> {
    for tier in ALIGN_TIERS {
        for (i, _) in line.char_indices() {
            let rest = &line[i..];
            if tier.iter().any(|symbol| rest.starts_with(symbol)) && brace_depth(line, i)? == 0 {
                return Ok(format!("{} &{}", &line[..i], rest));
            }
        }
    }
    Ok(format!(" &{}", line))
}
