//! Longtable elimination

use super::{
    minipage_remover, process_equations_in_cell, process_equations_in_header, TableOptions, FORBIDDEN_ENVS,
    HEADER_CELL, LONGTABLE_BEGIN, LONGTABLE_END,
};
use crate::core::align::check_valid_label;
use crate::core::locate::{find_env_end, find_not_in_any_env_tolerance, find_not_in_environment_tolerance, split_not_in_env};
use crate::core::scanner::find_in;
use crate::features::cleanup::bulk_labeling;
use crate::utils::error::{RepairError, RepairResult};
use crate::utils::report::{RepairWarning, WarningKind};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

const ESCAPED_AMPERSAND: &str = "\\&";
/// Stand-in for `\&` while cells are split on `&`.
const AMPERSAND_PLACEHOLDER: &str = "\u{1F}AMP\u{1F}";

lazy_static! {
    /// `Table 4: caption` paragraph following a table.
    static ref CAPTION_RE: Regex = Regex::new(r"(?s)^Table ([^\s:]+):[ \t]*(.*)$").unwrap();
}

/// Header cells of a pandoc longtable, in order.
fn header_cells(text: &str) -> Vec<String> {
    let mut headers = Vec::new();
    let mut skip = 1;
    while let Some(found) = find_not_in_environment_tolerance(text, HEADER_CELL, &[("longtable", 2)], 0, skip) {
        let Some(close) = find_env_end(text, found, Some("minipage")) else {
            break;
        };
        let start = (found + HEADER_CELL.len()).min(close);
        headers.push(text[start..close].trim().to_string());
        skip += 1;
    }
    headers
}

/// Rebuild one longtable (the whole environment) as a floating `table`.
///
/// Columns share `max_page_len` em; with more than one column each is an
/// `m{Nem}` column. `label` is inserted verbatim, `caption` goes into
/// `\caption{}` when non-empty.
///
/// # Errors
///
/// [`RepairError::MalformedTable`] when the table has no `\endhead`, no
/// `\bottomrule` or no header cell.
pub fn longtable_eliminator(text: &str, options: &TableOptions, label: &str, caption: &str) -> RepairResult<String> {
    let head_end = find_not_in_any_env_tolerance(text, "\\endhead", 0, 2, 1)
        .ok_or_else(|| RepairError::table("longtable without \\endhead"))?
        + "\\endhead".len();
    let body_end = find_not_in_any_env_tolerance(text, "\\bottomrule", 0, 2, 1)
        .ok_or_else(|| RepairError::table("longtable without \\bottomrule"))?;

    let headers = header_cells(text);
    if headers.is_empty() {
        return Err(RepairError::table("longtable without header cells"));
    }
    let width_em = options.max_page_len / headers.len();
    let first_row = headers
        .iter()
        .map(|header| process_equations_in_header(header, width_em))
        .collect::<Vec<_>>()
        .join(" & ");

    let column = if headers.len() > 1 {
        format!("m{{{}em}}", width_em)
    } else {
        "c".to_string()
    };
    let table_width = format!("{}|", format!("|{}", column).repeat(headers.len()));

    let data = if head_end < body_end { text[head_end..body_end].trim() } else { "" };
    let body = if data.is_empty() {
        format!("\n\\hline\n{}\n\\hline", first_row)
    } else {
        let data = data.replace(ESCAPED_AMPERSAND, AMPERSAND_PLACEHOLDER);
        let rows: Vec<String> = split_not_in_env(&data, "\\\\", &FORBIDDEN_ENVS)
            .into_iter()
            .map(|row| {
                split_not_in_env(row, "&", &FORBIDDEN_ENVS)
                    .into_iter()
                    .map(|cell| process_equations_in_cell(&minipage_remover(cell), width_em))
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect();
        format!(
            "\n\\hline\n{}\\\\ \\hline\n{}\n\\\\\\hline\n",
            first_row,
            rows.join(" \\\\ \\hline\n")
        )
        .replace(AMPERSAND_PLACEHOLDER, ESCAPED_AMPERSAND)
    };

    let caption_info = if caption.is_empty() {
        String::new()
    } else {
        format!("\\caption{{{}}}\n", caption)
    };
    let (top, bottom) = if options.caption_on_top {
        (caption_info.as_str(), "")
    } else {
        ("", caption_info.as_str())
    };
    Ok(format!(
        "\\begin{{table}}[{}]\n\\centering\n{}\n{}\n\\begin{{tabular}}{{{}}}\n{}\\end{{tabular}}\n{}\n\\end{{table}}\n",
        options.float_type, top, label, table_width, body, bottom
    ))
}

/// Caption a longtable in place, before its `\toprule`.
pub fn add_label_to_longtable(text: &str, caption: &str, label: &str) -> String {
    match text.find("\\toprule") {
        Some(at) => format!("{}\\caption{{{}}}{}\\\\{}", &text[..at], caption, label, &text[at..]),
        None => text.to_string(),
    }
}

/// Everything [`eliminate_all_longtables`] produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TablePass {
    pub text: String,
    /// Table numbers that became `table:pN` labels
    pub labels: Vec<String>,
    pub warnings: Vec<RepairWarning>,
}

/// Convert every longtable in the document.
///
/// A `Table N: caption` paragraph right after a table becomes its caption,
/// and a valid `N` its `\label{table:pN}`. Every `Table N` mention in the
/// text is then turned into `Table \ref{table:pN}`.
pub fn eliminate_all_longtables(text: &str, options: &TableOptions) -> RepairResult<TablePass> {
    let mut pass = TablePass {
        text: text.to_string(),
        ..TablePass::default()
    };
    let mut cursor = 0usize;

    while let Some(start) = find_in(&pass.text, LONGTABLE_BEGIN, cursor, pass.text.len()) {
        let end = find_env_end(&pass.text, start, Some("longtable"))
            .ok_or_else(|| RepairError::unterminated("longtable", start))?
            + LONGTABLE_END.len();
        let mut after = end;
        for _ in 0..2 {
            if pass.text[after..].starts_with('\n') {
                after += 1;
            }
        }

        let mut label = String::new();
        let mut caption = String::new();
        let mut consumed = after;
        if options.captions {
            let rest = &pass.text[after..];
            let paragraph_len = rest.find("\n\n").unwrap_or(rest.len());
            if let Some(caps) = CAPTION_RE.captures(&rest[..paragraph_len]) {
                let number = &caps[1];
                caption = caps[2].trim().to_string();
                consumed = after + paragraph_len;
                if check_valid_label(number) {
                    label = format!("\\label{{table:p{}}}\n", number);
                    pass.labels.push(number.to_string());
                } else {
                    warn!(number, "table number cannot be used as a label");
                    pass.warnings.push(
                        RepairWarning::new(WarningKind::InvalidTableNumber, "table number is not a valid label")
                            .with_snippet(number),
                    );
                }
            }
        }

        let table = &pass.text[start..end];
        let replacement = if options.replace {
            longtable_eliminator(table, options, &label, &caption)?
        } else {
            add_label_to_longtable(table, &caption, &label)
        };
        // Skipped whitespace is kept when no caption was taken.
        let tail_start = if consumed == after { end } else { consumed };
        pass.text = format!("{}{}{}", &pass.text[..start], replacement, &pass.text[tail_start..]);
        cursor = if options.replace { start } else { start + replacement.len() };
    }

    pass.text = bulk_labeling(&pass.text, &pass.labels, "table", "ref", Some("table:p"));
    debug!(tables = pass.labels.len(), "longtables converted");
    Ok(pass)
}
