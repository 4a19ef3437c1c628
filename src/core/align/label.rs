//! Numbering matrices and equation labels
//!
//! Word exports a numbered display equation as a 1×1 `matrix` whose single
//! cell reads `equation \#(4.2) \\`. These helpers recognise that shape and
//! turn the numbering comment into a usable label.

use crate::core::locate::modify_in_environment;
use crate::core::scanner::{any_layer, find_in, local_env_end};

const BEGIN_MATRIX: &str = "\\begin{matrix}";
const END_MATRIX: &str = "\\end{matrix}";
const HASHTAG: &str = "\\#";
const ROW_BREAK: &str = "\\\\";

/// Nested matrices whose contents are invisible to the cell counters.
const NESTED_MATRICES: [&str; 3] = ["matrix", "bmatrix", "pmatrix"];

/// Count `key` outside nested matrices. Single-char keys ignore their escaped
/// form (`\&` is not a column separator).
fn count_outer(text: &str, key: &str) -> usize {
    let mut text = text.to_string();
    for env in NESTED_MATRICES {
        text = modify_in_environment(&text, env, |_| String::new());
    }
    if key.len() == 1 {
        text = text.replace(&format!("\\{}", key), "");
    }
    text.matches(key).count()
}

/// Whether `matrix` is a disguised "equation + numbering comment".
///
/// The stripped text must be exactly one `\begin{matrix}...\end{matrix}` block
/// holding a single row (one `\\` terminator), no column separator, and
/// exactly one `\#` outside nested matrices.
pub fn valid_matrix(matrix: &str) -> bool {
    let matrix = matrix.trim();
    if !matrix.starts_with(BEGIN_MATRIX) || !matrix.ends_with(END_MATRIX) {
        return false;
    }
    if matrix.len() < BEGIN_MATRIX.len() + END_MATRIX.len() {
        return false;
    }
    let body = &matrix[BEGIN_MATRIX.len()..matrix.len() - END_MATRIX.len()];
    count_outer(body, ROW_BREAK) == 1 && count_outer(body, "&") == 0 && count_outer(body, HASHTAG) == 1
}

/// Split a numbering matrix into `(equation, comment)`.
///
/// The last `\#` must sit outside `\left...\right` and directly inside the
/// outer matrix. The comment runs up to the row break.
pub fn extract_matrix_equation(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    if !text.starts_with(BEGIN_MATRIX) || !text.ends_with(END_MATRIX) {
        return None;
    }
    let hashtag = text.rfind(HASHTAG)?;
    if hashtag < BEGIN_MATRIX.len() {
        return None;
    }
    if any_layer(text, hashtag, "\\left", "\\right") != 0 {
        return None;
    }
    if any_layer(text, hashtag, "\\begin", "\\end") != 1 {
        return None;
    }
    let start = hashtag + HASHTAG.len();
    let end = find_in(text, ROW_BREAK, start, text.len()).unwrap_or(text.len() - END_MATRIX.len());
    let end = end.max(start);
    let comment = text[start..end].trim().to_string();
    let equation = text[BEGIN_MATRIX.len()..hashtag].trim().to_string();
    Some((equation, comment))
}

/// A label may not contain a backslash or a brace.
pub fn check_valid_label(label: &str) -> bool {
    !label.contains(['\\', '{', '}'])
}

/// Replace every `\cmd{x}` of the listed commands by `x`.
///
/// Returns `None` when one of them never closes.
pub(crate) fn remove_local_environment(text: &str, commands: &[&str]) -> Option<String> {
    let mut text = text.to_string();
    for cmd in commands {
        let opener = format!("\\{}{{", cmd);
        while let Some(start) = text.find(&opener) {
            let end = local_env_end(&text, start).ok()?;
            text = format!("{}{}{}", &text[..start], &text[start + opener.len()..end], &text[end + 1..]);
        }
    }
    Some(text)
}

/// Label carried by a numbering comment such as `(4.2)`.
///
/// Surrounding parentheses (plain or `\left(`/`\right)`) are removed, as are
/// `\text{}` and `\mathbf{}` wrappers. Bold and emphasis wrappers are allowed
/// and kept in the result. Anything else with braces or backslashes yields
/// `None`.
pub fn get_equation_label(numbering: &str) -> Option<String> {
    if numbering.is_empty() {
        return None;
    }
    let mut numbering = numbering;
    if numbering.len() >= 2 && numbering.starts_with('(') && numbering.ends_with(')') {
        numbering = &numbering[1..numbering.len() - 1];
    } else if numbering.starts_with("\\left(")
        && numbering.ends_with("\\right)")
        && numbering.len() >= "\\left(".len() + "\\right)".len()
    {
        numbering = &numbering["\\left(".len()..numbering.len() - "\\right)".len()];
    }
    let label = remove_local_environment(numbering, &["text", "mathbf"])?;
    let visible = remove_local_environment(&label, &["textbf", "emph"])?;
    if check_valid_label(&visible) {
        Some(label.trim().to_string())
    } else {
        None
    }
}
