//! Alignment/equation engine
//!
//! Word's equation editor has no notion of an `align` environment. Pandoc
//! renders a multi-line Word equation as a display block of consecutive
//! brace groups, `\[{a = b}{c = d}\]`, and a numbered equation as a 1×1
//! matrix whose cell ends in `\#(n)`. This module detects both shapes and
//! rebuilds them as `align`/`align*`/`equation` environments.
//!
//! ## Pipeline
//!
//! 1. [`detect_align_region`] finds the first raw alignment region
//! 2. [`process_align_region`] splits it into lines and places `&`
//! 3. [`replace_align_region`] swaps it for an `align` environment
//! 4. [`split_all_equations`] handles plain display equations afterwards

mod label;
mod length;

#[cfg(test)]
mod tests;

pub use label::{check_valid_label, extract_matrix_equation, get_equation_label, valid_matrix};
pub use length::{calculate_eqn_length, split_equation, split_equation_braced, LengthOptions};

use crate::core::scanner::{any_layer, brace_depth, environment_layer, find_in, outer_brace_groups, Region};
use crate::utils::error::{RepairError, RepairResult};
use crate::utils::report::{RepairWarning, WarningKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// =============================================================================
// Options
// =============================================================================

/// What happens to the `\#` numbering comment of an equation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    /// Comments are left alone
    #[default]
    None,
    /// `line && comment`
    Align,
    /// `\shortintertext{comment}` above the line
    ShortInterText,
    /// `\tag{label}` after the line
    Tag,
    /// Comment dropped; lines get `\nonumber` unless labelled
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignOptions {
    pub comment_mode: CommentMode,
    /// Emit `\label{eq:...}` for valid numbering comments
    pub label_equations: bool,
}

/// Options for standalone display equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquationOptions {
    /// Recognise numbering matrices
    pub numbered: bool,
    pub label: bool,
    pub tag: bool,
}

impl Default for EquationOptions {
    fn default() -> Self {
        Self {
            numbered: true,
            label: false,
            tag: true,
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// A raw alignment region found by [`detect_align_region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignRegion {
    /// Region text from `\[` through `\]`. An unbraced trailing numbering
    /// matrix is wrapped in synthetic braces here.
    pub captured: String,
    /// Where the region sits in the scanned text
    pub region: Region,
}

/// Find the first raw alignment region.
///
/// A region opens with `\[{`. Inside it, content at brace depth 0 is only
/// allowed when everything up to the closing `\]` is a numbering matrix;
/// anything else means the display block was an ordinary equation and the
/// scan moves on.
///
/// # Errors
///
/// [`RepairError::MalformedEquation`] when such content is reached in a
/// region that never closes.
pub fn detect_align_region(text: &str) -> RepairResult<Option<AlignRegion>> {
    let mut inside = false;
    let mut layer = 0i64;
    let mut opened_at = 0usize;
    let mut prev_backslash = false;
    let mut prev_open_bracket = false;
    let mut prev_index = 0usize;

    for (i, c) in text.char_indices() {
        if prev_open_bracket && c != '{' {
            inside = false;
        }
        prev_open_bracket = false;

        if inside {
            match c {
                '\\' => {}
                '[' | ']' if prev_backslash => {}
                '{' if !prev_backslash => layer += 1,
                '}' if !prev_backslash => layer -= 1,
                '\n' => {}
                _ if layer <= 0 => {
                    let close = find_in(text, "\\]", i, text.len()).ok_or_else(|| {
                        RepairError::equation(format!("display block opened at byte {} is never closed", opened_at))
                    })?;
                    if valid_matrix(text[prev_index..close].trim()) {
                        let captured = format!(
                            "{}{{{}}}{}",
                            &text[opened_at..prev_index],
                            &text[prev_index..close],
                            &text[close..close + 2]
                        );
                        return Ok(Some(AlignRegion {
                            captured,
                            region: Region::new(opened_at, close + 2),
                        }));
                    }
                    inside = false;
                }
                _ => {}
            }
        }

        if prev_backslash {
            if c == '[' {
                inside = true;
                opened_at = prev_index;
                prev_open_bracket = true;
                layer = 0;
            }
            if c == ']' && inside {
                let region = Region::new(opened_at, i + 1);
                return Ok(Some(AlignRegion {
                    captured: region.slice(text).to_string(),
                    region,
                }));
            }
        }
        prev_backslash = c == '\\';
        prev_index = i;
    }
    Ok(None)
}

// =============================================================================
// Line alignment
// =============================================================================

/// Operator tiers for `&` placement, highest priority first.
const ALIGN_TIERS: [&[&str]; 4] = [
    &["="],
    &["<", ">", "\\leq", "\\geq", "\\approx"],
    &["\\subset", "\\subseteq", "\\not\\subset"],
    &["\\neq"],
];

/// One aligned line and the label its comment produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedLine {
    pub text: String,
    pub label: Option<String>,
}

/// Insert the `&` alignment marker into one line of an alignment region.
///
/// Without `auto_align` the marker simply leads the line. Otherwise it goes
/// before the first operator of the highest tier that occurs at brace depth
/// 0, outside environments and outside `\left...\right`. Only the first
/// occurrence of each operator is considered.
///
/// `has_comments` is set when some line of the same region carries a
/// numbering comment; with [`CommentMode::Hidden`] and labelling on, the
/// other lines then get `\nonumber`.
pub fn align_expression(
    line: &str,
    auto_align: bool,
    options: &AlignOptions,
    has_comments: bool,
) -> RepairResult<AlignedLine> {
    let mode = options.comment_mode;
    let mut line = line.to_string();
    let mut inter_text = String::new();
    let mut comment = String::new();
    let mut tag = String::new();
    let mut suffix = if mode == CommentMode::Hidden && options.label_equations && has_comments {
        "\\nonumber".to_string()
    } else {
        String::new()
    };
    let mut label = None;

    if mode != CommentMode::None {
        if let Some((equation, found)) = extract_matrix_equation(&line) {
            debug!(comment = %found, "equation line carries a comment");
            line = equation;
            inter_text = format!("\\shortintertext{{{}}}\n", found);
            if let Some(eqn_label) = get_equation_label(&found) {
                if mode != CommentMode::Hidden {
                    tag = format!("\\tag{{{}}} ", eqn_label);
                }
                if options.label_equations {
                    suffix = format!("\\label{{eq:{}}}", eqn_label);
                    label = Some(eqn_label);
                }
            }
            comment = found;
        }
    }

    if !auto_align {
        return Ok(AlignedLine {
            text: format!("& {}", line),
            label,
        });
    }

    let mut aligned = None;
    for tier in ALIGN_TIERS {
        let mut best: Option<usize> = None;
        for symbol in tier {
            let Some(ind) = line.find(symbol) else {
                continue;
            };
            if brace_depth(&line, ind)? == 0
                && !environment_layer(&line, ind)
                && any_layer(&line, ind, "\\left", "\\right") == 0
            {
                best = Some(best.map_or(ind, |b| b.min(ind)));
            }
        }
        if let Some(ind) = best {
            aligned = Some(format!("{}&{}", &line[..ind], &line[ind..]));
            break;
        }
    }
    let aligned = aligned.unwrap_or_else(|| format!("&{}", line));

    let text = match mode {
        CommentMode::ShortInterText => format!("{}{}{}", inter_text, aligned, suffix),
        CommentMode::Tag | CommentMode::Hidden => format!("{}{}{}", aligned, tag, suffix),
        CommentMode::Align if !comment.is_empty() => format!("{} && {}{}", aligned, comment, suffix),
        _ => aligned,
    };
    Ok(AlignedLine { text, label })
}

// =============================================================================
// Region processing
// =============================================================================

/// Body of a rewritten alignment region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRegion {
    /// Aligned lines joined by `\\`
    pub body: String,
    /// The region needs numbered `align` rather than `align*`
    pub has_comments: bool,
    pub labels: Vec<String>,
}

/// Turn a captured region into the body of an `align` environment.
///
/// Every top-level brace group is one line. With `max_line_len`, lines
/// longer than that are split further.
pub fn process_align_region(
    captured: &str,
    auto_align: bool,
    max_line_len: Option<usize>,
    options: &AlignOptions,
) -> RepairResult<ProcessedRegion> {
    let trimmed = captured.trim();
    let inner = trimmed
        .strip_prefix("\\[")
        .and_then(|s| s.strip_suffix("\\]"))
        .unwrap_or(trimmed);

    let mut lines: Vec<String> = outer_brace_groups(inner)?
        .into_iter()
        .map(|group| group.inner().slice(inner).to_string())
        .collect();

    if let Some(max_len) = max_line_len.filter(|&n| n >= 1) {
        let mut split_lines = Vec::with_capacity(lines.len());
        for line in lines {
            match split_equation(&line, max_len)? {
                Some(parts) => split_lines.extend(parts),
                None => split_lines.push(line),
            }
        }
        lines = split_lines;
    }

    let has_comments = options.comment_mode == CommentMode::Hidden
        && options.label_equations
        && lines.iter().any(|line| valid_matrix(line));

    let mut aligned = Vec::with_capacity(lines.len());
    let mut labels = Vec::new();
    for line in &lines {
        let result = align_expression(line, auto_align, options, has_comments)?;
        labels.extend(result.label);
        aligned.push(result.text);
    }

    Ok(ProcessedRegion {
        body: aligned.join(" \\\\\n"),
        has_comments,
        labels,
    })
}

/// Rewrite the first raw alignment region of `text` as an `align`
/// environment. `None` once no region is left.
pub fn replace_align_region(
    text: &str,
    auto_align: bool,
    max_line_len: Option<usize>,
    options: &AlignOptions,
) -> RepairResult<Option<(String, Vec<String>)>> {
    let Some(found) = detect_align_region(text)? else {
        return Ok(None);
    };
    let processed = process_align_region(&found.captured, auto_align, max_line_len, options)?;
    let env = if processed.has_comments { "align" } else { "align*" };

    // The region normally starts its own line; that newline is re-emitted.
    let mut head = &text[..found.region.start];
    if head.ends_with(|c: char| c.is_whitespace()) {
        let cut = head.char_indices().last().map_or(0, |(i, _)| i);
        head = &head[..cut];
    }

    let replaced = format!(
        "{}\n\\begin{{{env}}}\n{}\n\\end{{{env}}}\n{}",
        head,
        processed.body.trim(),
        &text[found.region.end..],
        env = env
    );
    Ok(Some((replaced, processed.labels)))
}

/// Result of rewriting every alignment region of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignPass {
    pub text: String,
    pub labels: Vec<String>,
    pub regions: usize,
}

/// Apply [`replace_align_region`] until no raw region is left.
pub fn replace_all_align_regions(
    text: &str,
    auto_align: bool,
    max_line_len: Option<usize>,
    options: &AlignOptions,
) -> RepairResult<AlignPass> {
    let mut pass = AlignPass {
        text: text.to_string(),
        ..AlignPass::default()
    };
    while let Some((replaced, labels)) = replace_align_region(&pass.text, auto_align, max_line_len, options)? {
        pass.text = replaced;
        pass.labels.extend(labels);
        pass.regions += 1;
    }
    debug!(regions = pass.regions, "alignment regions rewritten");
    Ok(pass)
}

// =============================================================================
// Display equations
// =============================================================================

/// Split over-long `\[...\]` equations and number the numbered ones.
///
/// A numbering matrix whose label is valid becomes an `equation`
/// environment with `\tag`/`\label` as configured. An invalid comment, or a
/// numbered equation that had to be split, loses its comment with a warning.
/// Split equations come back as brace groups, ready for another round of
/// [`replace_all_align_regions`].
///
/// Returns the text, the generated labels and the warnings.
pub fn split_all_equations(
    text: &str,
    max_len: usize,
    options: &EquationOptions,
) -> RepairResult<(String, Vec<String>, Vec<RepairWarning>)> {
    let mut text = text.to_string();
    let mut labels = Vec::new();
    let mut warnings = Vec::new();
    let mut cursor = 0usize;

    loop {
        let Some(start) = find_in(&text, "\\[", cursor, text.len()) else {
            break;
        };
        let Some(finish) = find_in(&text, "\\]", start + 2, text.len()) else {
            break;
        };

        let mut equation = text[start + 2..finish].to_string();
        let mut comment = None;
        if options.numbered && valid_matrix(&equation) {
            let (eqn, found) = extract_matrix_equation(&equation)
                .ok_or_else(|| RepairError::equation(format!("unreadable numbering matrix at byte {}", start)))?;
            equation = eqn;
            comment = Some(found);
        }

        let replacement = match (split_equation_braced(&equation, max_len)?, comment) {
            (Some(braced), comment) => {
                if let Some(comment) = comment {
                    warn!(%comment, "numbered equation too long, comment dropped");
                    warnings.push(
                        RepairWarning::new(
                            WarningKind::LongNumberedEquation,
                            "extra long numbered equation; comment deleted",
                        )
                        .with_snippet(comment),
                    );
                }
                format!("\\[{}\\]", braced)
            }
            (None, Some(comment)) => match get_equation_label(&comment) {
                Some(eqn_label) => {
                    let mut numbering = String::new();
                    if options.tag {
                        numbering.push_str(&format!(" \\tag{{{}}} ", eqn_label));
                    }
                    if options.label {
                        numbering.push_str(&format!(" \\label{{eq:{}}}", eqn_label));
                        labels.push(eqn_label);
                    }
                    format!("\n\\begin{{equation}}\n{}{}\n\\end{{equation}}\n", equation, numbering)
                }
                None => {
                    warn!(%comment, "invalid equation comment removed");
                    warnings.push(
                        RepairWarning::new(
                            WarningKind::InvalidEquationComment,
                            "equation comment is not plain text or a number; comment removed",
                        )
                        .with_snippet(comment),
                    );
                    format!("\\[{}  \\]", equation)
                }
            },
            (None, None) => {
                cursor = finish + 2;
                continue;
            }
        };

        text.replace_range(start..finish + 2, &replacement);
        cursor = start + replacement.len();
    }
    Ok((text, labels, warnings))
}
