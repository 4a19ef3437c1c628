//! Whole-document repair.
//!
//! [`repair_document`] runs every pass in a fixed order. Verbatim bodies are
//! concealed first and restored last, so no pass ever sees code. A malformed
//! region aborts the whole call; recoverable problems end up in the report.

use crate::config::RepairOptions;
use crate::core::align::{replace_all_align_regions, split_all_equations};
use crate::core::environments::rewrite_environments;
use crate::core::figures::detect_include_graphics;
use crate::core::tables::eliminate_all_longtables;
use crate::features::citations::do_citations;
use crate::features::cleanup::{
    dollar_sign_equations, fix_all_texttt, hypertarget_eliminator, latexing, prime_dealer, remove_comments,
    shift_sections, subsection_limit,
};
use crate::features::structure::{abstract_wrapper, qed, toc_detector};
use crate::features::verbatim::{hide_verbatims, show_verbatims, verbatim_to_listing, ListingPlugin};
use crate::utils::error::RepairResult;
use crate::utils::report::{RepairOutput, RepairReport, RepairWarning, WarningKind};
use tracing::{debug, warn};

/// Deepest heading level pandoc emits (`\subparagraph` aside).
const DEEPEST_SECTION: usize = 6;
/// Heading levels moved by a section shift.
const SHIFT_DEPTH: usize = 8;

/// Repair a pandoc LaTeX document.
pub fn repair_document(text: &str, options: &RepairOptions) -> RepairResult<RepairOutput> {
    let mut report = RepairReport::new();

    let (text, stash) = hide_verbatims(text, options.listing_plugin);
    let mut text = hypertarget_eliminator(&text)?;
    if options.remove_comments {
        text = remove_comments(&text);
    }
    text = prime_dealer(&text);
    // The abstract ends at the first heading, which may be `Contents`.
    if options.wrap_abstract {
        text = abstract_wrapper(&text);
    }
    if options.table_of_contents {
        text = toc_detector(&text, 0);
    }
    if options.proofs {
        text = qed(&text);
    }

    let environments = options.environments.to_set()?;
    if !environments.is_empty() {
        text = rewrite_environments(&text, &environments, &options.environment_options)?;
        debug!(environments = environments.len(), "environments rewritten");
    }

    let tables = eliminate_all_longtables(&text, &options.tables)?;
    report.table_labels = tables.labels;
    report.warnings.extend(tables.warnings);

    let figures = detect_include_graphics(&tables.text, &options.figures)?;
    report.figure_labels = figures.labels;
    report.warnings.extend(figures.warnings);

    let aligned = replace_all_align_regions(&figures.text, options.auto_align, options.max_line_len, &options.align)?;
    report.alignment_regions = aligned.regions;
    report.equation_labels = aligned.labels;

    let max_equation_len = options.max_equation_len.unwrap_or(usize::MAX);
    let (split, labels, warnings) = split_all_equations(&aligned.text, max_equation_len, &options.equations)?;
    report.equation_labels.extend(labels);
    report.warnings.extend(warnings);

    // Split equations come back as raw regions.
    let aligned = replace_all_align_regions(&split, options.auto_align, options.max_line_len, &options.align)?;
    report.alignment_regions += aligned.regions;
    report.equation_labels.extend(aligned.labels);
    let mut text = aligned.text;

    if let Some(bib) = options.bibliography.as_deref() {
        text = do_citations(&text, bib, &options.citations);
    }
    if let Some(limit) = options.section_limit {
        text = subsection_limit(&text, limit, DEEPEST_SECTION)?;
    }
    if options.section_shift != 0 {
        text = shift_sections(&text, SHIFT_DEPTH, options.section_shift)?;
    }
    if options.fix_texttt {
        text = fix_all_texttt(&text)?;
    }
    if options.latexing {
        text = latexing(&text)?;
    }
    if options.dollar_signs {
        text = dollar_sign_equations(&text);
    }

    if options.listing_plugin != ListingPlugin::None && options.listing_language.is_empty() {
        for entry in stash.iter().filter(|entry| entry.language.is_none()) {
            warn!(placeholder = %entry.placeholder.escape_default(), "verbatim block without a language");
            report.warn(
                RepairWarning::new(WarningKind::UnknownLanguage, "verbatim block kept without a language")
                    .with_snippet(entry.body.lines().next().unwrap_or_default()),
            );
        }
    }
    let (listed, converted) = verbatim_to_listing(
        &text,
        &stash,
        &options.listing_language,
        options.listing_plugin,
        &options.listing_params,
    );
    report.listings_converted = converted;
    let text = show_verbatims(&listed, &stash);

    debug!(
        regions = report.alignment_regions,
        tables = report.table_labels.len(),
        figures = report.figure_labels.len(),
        warnings = report.warnings.len(),
        "document repaired"
    );
    Ok(RepairOutput::new(text, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RepairError;

    #[test]
    fn verbatim_is_never_touched() {
        let text = "LaTeX here\n\\begin{verbatim}\nLaTeX % kept\nf^{'}\n\\end{verbatim}\n% gone";
        let out = repair_document(text, &RepairOptions::default()).unwrap();
        assert_eq!(
            out.content,
            "\\LaTeX{} here\n\\begin{verbatim}\nLaTeX % kept\nf^{'}\n\\end{verbatim}\n"
        );
    }

    #[test]
    fn alignment_regions_are_counted() {
        let text = "A\n\\[{a = b}{c = d}\\]\nB";
        let out = repair_document(text, &RepairOptions::default()).unwrap();
        assert_eq!(out.report.alignment_regions, 1);
        assert!(out.content.contains("\\begin{align*}\na &= b \\\\\nc &= d\n\\end{align*}"));
    }

    #[test]
    fn long_display_equations_end_up_aligned() {
        let long = "x = aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa = bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        let options = RepairOptions {
            max_equation_len: Some(40),
            ..RepairOptions::default()
        };
        let out = repair_document(&format!("\\[{}\\]", long), &options).unwrap();
        assert_eq!(out.report.alignment_regions, 1);
        assert!(out.content.contains("\\begin{align*}"));
        assert!(!out.content.contains("\\["));
    }

    #[test]
    fn optional_passes() {
        let options = RepairOptions {
            section_limit: Some(1),
            dollar_signs: true,
            latexing: false,
            bibliography: Some("@book{Knuth,\n title={TeX}\n}".to_string()),
            ..RepairOptions::default()
        };
        let text = "\\subsection{LaTeX}\nSee (Knuth) and \\(x\\).";
        let out = repair_document(text, &options).unwrap();
        assert_eq!(out.content, "\\section{LaTeX}\nSee \\cite{Knuth} and $x$.");
    }

    #[test]
    fn unknown_listing_language_is_reported() {
        let options = RepairOptions {
            listing_plugin: ListingPlugin::Minted,
            ..RepairOptions::default()
        };
        let text = "\\begin{verbatim}\npython\nprint(1)\n\\end{verbatim}\n\\begin{verbatim}\nplain\n\\end{verbatim}";
        let out = repair_document(text, &options).unwrap();
        assert!(out.report.listings_converted);
        assert!(out.content.starts_with("\\begin{minted}{python}\nprint(1)\n\\end{minted}"));
        assert_eq!(out.report.warnings.len(), 1);
        assert_eq!(out.report.warnings[0].kind, WarningKind::UnknownLanguage);
    }

    #[test]
    fn document_structure_passes() {
        let text = "\\textbf{Abstract}\n\nShort.\n\n\\section{Contents}\n\\protect\\hyperlink{a}{A}\n\n\
                    \\section{A}\nSee Figure 1.\n\n\\includegraphics{a.png}\n\nFigure 1: Plot\n\n\
                    \\emph{Proof.} Clear \\(\\blacksquare\\)\n\nRun \\texttt{x}\\texttt{y}.";
        let out = repair_document(text, &RepairOptions::default()).unwrap();
        assert!(out.content.starts_with("\\begin{abstract}\nShort.\n\\end{abstract}\n\n"));
        assert!(out.content.contains("\\tableofcontents"));
        assert!(!out.content.contains("\\section{Contents}"));
        assert!(out.content.contains("See Figure \\ref{fig:p1}."));
        assert!(out.content.contains("\\caption{Plot}\n\\label{fig:p1}\n\\end{figure}"));
        assert!(out.content.contains("\\begin{proof} Clear \n\\end{proof}"));
        assert!(out.content.ends_with("Run \\texttt{xy}."));
        assert_eq!(out.report.figure_labels, vec!["1".to_string()]);
    }

    #[test]
    fn malformed_region_aborts() {
        let text = "\\hypertarget{a}{%\n\\section{A}";
        let err = repair_document(text, &RepairOptions::default()).unwrap_err();
        assert!(matches!(err, RepairError::UnbalancedBrace { .. }));
    }
}
