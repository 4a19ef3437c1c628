//! Figure captioning
//!
//! Pandoc leaves a Word picture as a bare `\includegraphics`, followed by
//! the `Figure N: caption` paragraph the author typed under it. This pass
//! wraps each graphic in a `figure`, turns that paragraph into
//! `\caption`/`\label{fig:pN}` and links every `Figure N` mention.

use crate::core::align::check_valid_label;
use crate::core::locate::check_in_environment;
use crate::core::scanner::{find_in, local_env_end};
use crate::features::cleanup::bulk_labeling;
use crate::utils::error::RepairResult;
use crate::utils::report::{RepairWarning, WarningKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const INCLUDE_GRAPHICS: &str = "\\includegraphics";

/// Graphics inside these stay where they are.
const HOST_ENVS: [&str; 4] = ["figure", "table", "tabular", "longtable"];

lazy_static! {
    /// `Figure 4: caption` paragraph following a graphic.
    static ref CAPTION_RE: Regex = Regex::new(r"(?s)^Figure ([^\s:]+):[ \t]*(.*)$").unwrap();
}

/// What happens to graphics outside tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Wrap each graphic in a `figure`
    #[default]
    Figures,
    /// Leave graphics untouched
    Keep,
    /// Drop every `\includegraphics` line
    Remove,
}

/// Figure settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureOptions {
    pub mode: ImageMode,
    /// Turn a following `Figure N: caption` paragraph into caption and label
    pub captions: bool,
    /// Float placement for the `figure`
    pub float_type: String,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            mode: ImageMode::Figures,
            captions: true,
            float_type: "H".to_string(),
        }
    }
}

/// Everything [`detect_include_graphics`] produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FigurePass {
    pub text: String,
    /// Figure numbers that became `fig:pN` labels
    pub labels: Vec<String>,
    pub warnings: Vec<RepairWarning>,
}

/// Drop every line that starts with `\includegraphics`.
///
/// Verbatim blocks must already be concealed.
pub fn remove_images(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim_start().starts_with(INCLUDE_GRAPHICS))
        .collect::<Vec<_>>()
        .join("\n")
}

/// End (exclusive) of the `\includegraphics[opts]{file}` starting at `start`.
fn graphic_end(text: &str, start: usize) -> Option<usize> {
    let mut at = start + INCLUDE_GRAPHICS.len();
    if text[at..].starts_with('[') {
        at += text[at..].find(']')? + 1;
    }
    if !text[at..].starts_with('{') {
        return None;
    }
    local_env_end(text, at).ok().map(|close| close + 1)
}

/// Wrap every graphic outside tables and figures in a `figure`.
///
/// A malformed `\includegraphics` (no file argument, unbalanced braces) is
/// left as written and reported, so a broken picture never aborts the
/// document.
pub fn detect_include_graphics(text: &str, options: &FigureOptions) -> RepairResult<FigurePass> {
    let mut pass = FigurePass {
        text: text.to_string(),
        ..FigurePass::default()
    };
    match options.mode {
        ImageMode::Keep => return Ok(pass),
        ImageMode::Remove => {
            pass.text = remove_images(text);
            return Ok(pass);
        }
        ImageMode::Figures => {}
    }

    let mut cursor = 0usize;
    while let Some(start) = find_in(&pass.text, INCLUDE_GRAPHICS, cursor, pass.text.len()) {
        let name_end = start + INCLUDE_GRAPHICS.len();
        cursor = name_end;
        if pass.text[name_end..].starts_with(|c: char| c.is_ascii_alphabetic())
            || HOST_ENVS.iter().any(|env| check_in_environment(&pass.text, env, start))
        {
            continue;
        }
        let Some(end) = graphic_end(&pass.text, start) else {
            warn!(at = start, "graphic without a usable file argument");
            let line = pass.text[start..].lines().next().unwrap_or_default();
            pass.warnings.push(
                RepairWarning::new(WarningKind::MalformedGraphic, "\\includegraphics left outside a figure")
                    .with_snippet(line),
            );
            continue;
        };

        let mut after = end;
        for _ in 0..2 {
            if pass.text[after..].starts_with('\n') {
                after += 1;
            }
        }

        let mut caption = String::new();
        let mut label = String::new();
        let mut consumed = after;
        if options.captions {
            let rest = &pass.text[after..];
            let paragraph_len = rest.find("\n\n").unwrap_or(rest.len());
            if let Some(caps) = CAPTION_RE.captures(&rest[..paragraph_len]) {
                let number = &caps[1];
                caption = format!("\\caption{{{}}}\n", caps[2].trim());
                consumed = after + paragraph_len;
                if check_valid_label(number) {
                    label = format!("\\label{{fig:p{}}}\n", number);
                    pass.labels.push(number.to_string());
                } else {
                    warn!(number, "figure number cannot be used as a label");
                    pass.warnings.push(
                        RepairWarning::new(WarningKind::InvalidFigureNumber, "figure number is not a valid label")
                            .with_snippet(number),
                    );
                }
            }
        }

        let figure = format!(
            "\\begin{{figure}}[{}]\n\\centering\n{}\n{}{}\\end{{figure}}",
            options.float_type,
            &pass.text[start..end],
            caption,
            label
        );
        let tail_start = if consumed == after { end } else { consumed };
        pass.text = format!("{}{}{}", &pass.text[..start], figure, &pass.text[tail_start..]);
        cursor = start + figure.len();
    }

    pass.text = bulk_labeling(&pass.text, &pass.labels, "figure", "ref", Some("fig:p"));
    debug!(figures = pass.labels.len(), "graphics wrapped");
    Ok(pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captioned_figure_with_reference() {
        let text = "See Figure 2 below.\n\n\\includegraphics[width=3in]{media/image1.png}\n\nFigure 2: A plot\n\nAfter.";
        let pass = detect_include_graphics(text, &FigureOptions::default()).unwrap();
        assert_eq!(
            pass.text,
            "See Figure \\ref{fig:p2} below.\n\n\\begin{figure}[H]\n\\centering\n\
             \\includegraphics[width=3in]{media/image1.png}\n\\caption{A plot}\n\\label{fig:p2}\n\
             \\end{figure}\n\nAfter."
        );
        assert_eq!(pass.labels, vec!["2".to_string()]);
        assert!(pass.warnings.is_empty());
    }

    #[test]
    fn uncaptioned_graphic_is_still_a_figure() {
        let pass = detect_include_graphics("\\includegraphics{a.png}\nText", &FigureOptions::default()).unwrap();
        assert_eq!(
            pass.text,
            "\\begin{figure}[H]\n\\centering\n\\includegraphics{a.png}\n\\end{figure}\nText"
        );
        assert!(pass.labels.is_empty());
    }

    #[test]
    fn graphics_in_tables_and_figures_stay() {
        let text = "\\begin{table}\n\\includegraphics{a}\n\\end{table}\n\\begin{figure}\n\\includegraphics{b}\n\\end{figure}";
        let pass = detect_include_graphics(text, &FigureOptions::default()).unwrap();
        assert_eq!(pass.text, text);
    }

    #[test]
    fn malformed_graphic_is_reported() {
        let text = "\\includegraphics alone\n\nmore";
        let pass = detect_include_graphics(text, &FigureOptions::default()).unwrap();
        assert_eq!(pass.text, text);
        assert_eq!(pass.warnings.len(), 1);
        assert_eq!(pass.warnings[0].kind, WarningKind::MalformedGraphic);
    }

    #[test]
    fn invalid_figure_number_keeps_caption() {
        let text = "\\includegraphics{a}\n\nFigure \\x: Bad\n\nrest";
        let pass = detect_include_graphics(text, &FigureOptions::default()).unwrap();
        assert!(pass.text.contains("\\caption{Bad}\n\\end{figure}"));
        assert!(pass.labels.is_empty());
        assert_eq!(pass.warnings[0].kind, WarningKind::InvalidFigureNumber);
    }

    #[test]
    fn keep_and_remove_modes() {
        let text = "a\n  \\includegraphics{x}\nb";
        let keep = FigureOptions {
            mode: ImageMode::Keep,
            ..FigureOptions::default()
        };
        assert_eq!(detect_include_graphics(text, &keep).unwrap().text, text);
        let remove = FigureOptions {
            mode: ImageMode::Remove,
            ..FigureOptions::default()
        };
        assert_eq!(detect_include_graphics(text, &remove).unwrap().text, "a\nb");
    }
}
