//! Table/longtable transformer
//!
//! Pandoc turns every Word table into a `longtable` whose cells are wrapped
//! in `minipage`s. This module takes those apart and rebuilds floating
//! `table`/`tabular` blocks with fixed-width columns, a caption and a label.
//!
//! Cell grids are split on `\\` and `&` only outside [`FORBIDDEN_ENVS`], so
//! matrices and nested tables inside a cell survive intact.

mod longtable;

pub use longtable::{add_label_to_longtable, eliminate_all_longtables, longtable_eliminator, TablePass};

use crate::core::align::detect_align_region;
use crate::core::locate::{find_not_in_any_env_tolerance, split_not_in_env};
use crate::core::scanner::find_in;
use serde::{Deserialize, Serialize};

/// Environments whose `&` and `\\` never belong to the surrounding table.
pub const FORBIDDEN_ENVS: [&str; 15] = [
    "table", "tabular", "longtable", "minipage", "texttt", "enumerate", "itemize", "align*", "gather", "matrix",
    "bmatrix", "pmatrix", "vmatrix", "Bmatrix", "Vmatrix",
];

/// Longtable conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Rebuild longtables as `table` + `tabular`; otherwise only caption them
    pub replace: bool,
    /// Turn a following `Table N: caption` paragraph into caption and label
    pub captions: bool,
    /// Float placement for the rebuilt `table`
    pub float_type: String,
    /// Text width in `em`, shared between the columns
    pub max_page_len: usize,
    pub caption_on_top: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            replace: true,
            captions: true,
            float_type: "h".to_string(),
            max_page_len: 35,
            caption_on_top: false,
        }
    }
}

// =============================================================================
// Grids
// =============================================================================

/// Split a table body into rows of cells. A trailing `\\` does not produce
/// an empty row.
pub fn table_to_lists(text: &str) -> Vec<Vec<String>> {
    let text = text.trim();
    let mut rows = split_not_in_env(text, "\\\\", &FORBIDDEN_ENVS);
    if rows.last().map_or(false, |row| row.is_empty()) {
        rows.pop();
    }
    rows.into_iter()
        .map(|row| {
            split_not_in_env(row, "&", &FORBIDDEN_ENVS)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Inverse of [`table_to_lists`]: one row per line, cells trimmed and
/// joined by ` & `, each row closed by ` \\`.
pub fn lists_to_table(table: &[Vec<String>], ending_double_backslash: bool) -> String {
    let mut rows: Vec<String> = table
        .iter()
        .map(|row| {
            let cells: Vec<&str> = row.iter().map(|cell| cell.trim()).collect();
            format!("{} \\\\", cells.join(" & "))
        })
        .collect();
    if !ending_double_backslash {
        if let Some(last) = rows.last_mut() {
            last.truncate(last.len() - 2);
        }
    }
    rows.join("\n")
}

const MINIPAGE_TOP: &str = "\\begin{minipage}[t]{\\linewidth}\\raggedright";
const MINIPAGE_BOTTOM: &str = "\\begin{minipage}[b]{\\linewidth}\\raggedright";
pub(crate) const MINIPAGE_END: &str = "\\end{minipage}";
/// Opening of a pandoc header cell.
pub(crate) const HEADER_CELL: &str = "\\begin{minipage}[b]{\\linewidth}\\raggedright\n";
pub(crate) const LONGTABLE_BEGIN: &str = "\\begin{longtable}";
pub(crate) const LONGTABLE_END: &str = "\\end{longtable}";

/// Unwrap a cell that is exactly one pandoc cell minipage.
pub fn minipage_remover(text: &str) -> String {
    let text = text.trim();
    let wrapped = (text.starts_with(MINIPAGE_TOP) || text.starts_with(MINIPAGE_BOTTOM))
        && text.ends_with(MINIPAGE_END)
        && text.len() >= MINIPAGE_TOP.len() + MINIPAGE_END.len();
    if wrapped {
        text[MINIPAGE_TOP.len()..text.len() - MINIPAGE_END.len()].trim().to_string()
    } else {
        text.to_string()
    }
}

/// Promote `\(...\)` that stands alone in its paragraph to `\[...\]`.
///
/// Word equations typed inside a table cell come out inline even when they
/// fill a whole paragraph.
pub fn force_not_inline(text: &str) -> String {
    let mut text = text.to_string();
    let mut cursor = 0usize;
    while let Some(open) = find_in(&text, "\\(", cursor, text.len()) {
        let Some(close) = find_in(&text, "\\)", open + 2, text.len()) else {
            break;
        };
        let before = &text[..open];
        let after = &text[close + 2..];
        let alone_before = open < 2 || before.ends_with("\n\n");
        let alone_after = after.len() < 2 || after.starts_with("\n\n");
        if alone_before && alone_after {
            let promoted = format!("\\[{}\\]", &text[open + 2..close]);
            text.replace_range(open..close + 2, &promoted);
        }
        cursor = close + 2;
    }
    text
}

// =============================================================================
// Equations inside cells
// =============================================================================

/// Whether the math body `inner` is a raw alignment region.
pub fn equation_in_table_checker(inner: &str) -> bool {
    matches!(detect_align_region(&format!("\\[{}\\]", inner)), Ok(Some(_)))
}

fn parbox_equations(text: &str, open: &str, close: &str, width_em: usize) -> String {
    let mut text = text.to_string();
    let mut cursor = 0usize;
    loop {
        let Some(start) = find_not_in_any_env_tolerance(&text, open, cursor, 1, 1) else {
            break;
        };
        let Some(end) = find_not_in_any_env_tolerance(&text, close, start + open.len(), 1, 1) else {
            break;
        };
        let inner = &text[start + open.len()..end];
        if !equation_in_table_checker(inner) {
            cursor = end + close.len();
            continue;
        }
        let boxed = format!("\\parbox{{{}em}}{{\n\\[{}\\]\n}}\n\n", width_em, inner);
        text.replace_range(start..end + close.len(), &boxed);
        cursor = start + boxed.len();
    }
    text
}

/// Put every inline alignment region `\(...\)` of a cell in a
/// `\parbox{Nem}` display block so it can become an `align*` later.
pub fn process_equations_in_cell(text: &str, width_em: usize) -> String {
    parbox_equations(text, "\\(", "\\)", width_em)
}

/// [`process_equations_in_cell`] for header cells, where pandoc already
/// emits display math.
pub fn process_equations_in_header(text: &str, width_em: usize) -> String {
    parbox_equations(text, "\\[", "\\]", width_em)
}
