//! Rendered-length estimate and long equation splitting

use crate::core::scanner::{any_layer, brace_depth, environment_layer, find_in};
use crate::utils::error::RepairResult;
use phf::phf_set;

/// Function names that render as their plain letters.
static PLAIN_FUNCTIONS: phf::Set<&'static str> = phf_set! {
    "sin", "cos", "tan", "csc", "sec", "cot", "arcsin", "arccos", "arctan",
    "log", "ln", "sqrt", "sinh", "cosh", "tanh", "coth",
};

/// Relational operators: always a candidate break point.
const BREAKERS: [&str; 13] = [
    "<",
    ">",
    "\\leq",
    "\\geq",
    "=",
    "\\land",
    "\\lor",
    "\\subset",
    "\\subseteq",
    "\\not\\subset",
    "\\neq",
    "\\Rightarrow",
    "\\approx",
];

/// Additive operators: a break point once the current line is long enough.
const SOFT_BREAKERS: [&str; 6] = ["+", "-", "\\times", "\\pm", "\\mp", "\\in"];

/// `rest` opens with operator `op`. A control word must not run on into a
/// longer one, so `\in` does not match `\int`.
fn starts_with_operator(rest: &str, op: &str) -> bool {
    if !rest.starts_with(op) {
        return false;
    }
    let control_word = op.starts_with('\\') && op.ends_with(|c: char| c.is_ascii_alphabetic());
    !control_word || !rest[op.len()..].starts_with(|c: char| c.is_ascii_alphabetic())
}

/// Which collapsing steps [`calculate_eqn_length`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthOptions {
    /// Keep only the longer side of each `\frac{}{}`
    pub fractions: bool,
    /// Replace each `matrix`/`bmatrix` by its longest row
    pub matrices: bool,
}

impl Default for LengthOptions {
    fn default() -> Self {
        Self {
            fractions: true,
            matrices: true,
        }
    }
}

impl LengthOptions {
    /// Flat estimate, used on the pieces of a fraction or matrix.
    pub fn flat() -> Self {
        Self {
            fractions: false,
            matrices: false,
        }
    }
}

/// Approximate rendered width of an equation line, in characters.
///
/// Operators count as three characters, each command name as one, spaces
/// as nothing and commas as two.
pub fn calculate_eqn_length(text: &str, options: LengthOptions) -> usize {
    let mut text = text
        .replace('+', "plu")
        .replace('-', "miu")
        .replace("\\times", "tie")
        .to_lowercase();

    if options.fractions {
        while let Some(frac) = text.find("\\frac") {
            let Some(close) = fourth_closing_brace(&text, frac) else {
                break;
            };
            let longer = longer_fraction_side(&text[frac..close + 1]);
            text = format!("{}{}{}", &text[..frac], longer, &text[close + 1..]);
        }
    }

    if options.matrices {
        text = collapse_matrices(&text, "matrix");
        text = collapse_matrices(&text, "bmatrix");
    }

    for fun in PLAIN_FUNCTIONS.iter() {
        text = text.replace(&format!("\\{}", fun), fun);
    }

    let text = collapse_commands(&text).replace(' ', "").replace(',', ", ");
    text.chars().count()
}

/// Byte positions of the outer `{` and `}` of a `\frac{..}{..}`, scanning
/// after `index`.
fn fraction_braces(text: &str, index: usize) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut layer = 0i64;
    let mut prev = None;
    for (i, c) in text.char_indices() {
        if i > index && prev != Some('\\') {
            if c == '{' {
                if layer == 0 {
                    positions.push(i);
                }
                layer += 1;
            }
            if c == '}' {
                if layer == 1 {
                    positions.push(i);
                    if positions.len() == 4 {
                        return positions;
                    }
                }
                layer -= 1;
            }
        }
        prev = Some(c);
    }
    positions
}

fn fourth_closing_brace(text: &str, index: usize) -> Option<usize> {
    let positions = fraction_braces(text, index);
    (positions.len() == 4).then(|| positions[3])
}

/// The longer of numerator and denominator of `\frac{num}{den}`.
fn longer_fraction_side(frac: &str) -> &str {
    let p = fraction_braces(frac, 0);
    let numerator = &frac[p[0] + 1..p[1]];
    let denominator = &frac[p[2] + 1..p[3]];
    let num_len = calculate_eqn_length(numerator, LengthOptions::flat());
    let den_len = calculate_eqn_length(denominator, LengthOptions::flat());
    if num_len >= den_len {
        numerator
    } else {
        denominator
    }
}

/// Replace each `env` matrix by a run of `a` as long as its longest row.
fn collapse_matrices(text: &str, env: &str) -> String {
    let begin = format!("\\begin{{{}}}", env);
    let end = format!("\\end{{{}}}", env);
    let mut text = text.to_string();
    loop {
        let Some(start) = text.find(&begin) else {
            break;
        };
        let Some(stop) = find_in(&text, &end, start + begin.len(), text.len()) else {
            break;
        };
        let body = text[start + begin.len()..stop].replace('\n', "");
        let widest = body
            .split("\\\\")
            .map(|row| calculate_eqn_length(row, LengthOptions::flat()))
            .max()
            .unwrap_or(0);
        text = format!("{}{}{}", &text[..start], "a".repeat(widest), &text[stop + end.len()..]);
    }
    text
}

/// Collapse every `\command` (lower-case letters) into a single `j`.
///
/// A backslash followed by anything else is kept along with that character.
fn collapse_commands(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        if chars.peek().map_or(false, |n| n.is_ascii_lowercase()) {
            while chars.peek().map_or(false, |n| n.is_ascii_lowercase()) {
                chars.next();
            }
            out.push('j');
        } else {
            out.push(c);
            if let Some(next) = chars.next() {
                out.push(next);
            }
        }
    }
    out
}

/// Split an over-long equation into lines.
///
/// Break points sit before a relational operator, or before an additive one
/// once the current line reaches 70% of `max_len`, and only at brace depth
/// 0, outside `\left...\right` and outside environments. Fragments are then
/// packed into lines of at most half of `max_len`. `None` means the equation
/// fits or cannot be split.
pub fn split_equation(text: &str, max_len: usize) -> RepairResult<Option<Vec<String>>> {
    let text = text.trim();
    let eqn_len = calculate_eqn_length(text, LengthOptions::default());
    let breakable = BREAKERS.iter().chain(SOFT_BREAKERS.iter()).any(|op| text.contains(op));
    if eqn_len <= max_len || !breakable {
        return Ok(None);
    }

    let soft_gap = max_len * 7 / 10;
    let mut breaks = vec![0usize];
    for (i, _) in text.char_indices() {
        let rest = &text[i..];
        let last = breaks.last().copied().unwrap_or(0);
        let hit = BREAKERS.iter().any(|op| starts_with_operator(rest, op))
            || (SOFT_BREAKERS.iter().any(|op| starts_with_operator(rest, op)) && i - last >= soft_gap);
        if hit
            && brace_depth(text, i)? == 0
            && any_layer(text, i, "\\left", "\\right") == 0
            && !environment_layer(text, i)
        {
            breaks.push(i);
        }
    }
    if breaks.len() == 1 {
        return Ok(None);
    }

    let mut fragments: Vec<&str> = breaks.windows(2).map(|w| &text[w[0]..w[1]]).collect();
    if let Some(&last) = breaks.last() {
        fragments.push(&text[last..]);
    }

    let half = max_len / 2;
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for fragment in fragments {
        current.push(fragment);
        if current.len() >= 2 && calculate_eqn_length(&current.concat(), LengthOptions::default()) > half {
            current.pop();
            lines.push(current.concat());
            current = vec![fragment];
        }
    }
    if !current.is_empty() {
        lines.push(current.concat());
    }
    Ok(Some(lines))
}

/// [`split_equation`] rendered as consecutive `{ line }` groups, the shape
/// the alignment-region detector recognises.
pub fn split_equation_braced(text: &str, max_len: usize) -> RepairResult<Option<String>> {
    Ok(split_equation(text, max_len)?.map(|lines| {
        lines
            .iter()
            .map(|line| format!("{{ {} }}", line))
            .collect::<String>()
    }))
}
