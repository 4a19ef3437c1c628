//! Integration tests for whole-document repair

use wordtex::{
    conditional_preamble, extract_bib_keys, fix_equations, repair_document, EnvironmentConfig, RepairError,
    RepairOptions, WarningKind,
};

fn longtable(headers: &[&str], rows: &str) -> String {
    let cells: Vec<String> = headers
        .iter()
        .map(|h| format!("\\begin{{minipage}}[b]{{\\linewidth}}\\raggedright\n{}\n\\end{{minipage}}", h))
        .collect();
    format!(
        "\\begin{{longtable}}[]{{@{{}}ll@{{}}}}\n\\toprule()\n{} \\\\\n\\midrule()\n\\endhead\n{}\n\\bottomrule()\n\\end{{longtable}}",
        cells.join(" & "),
        rows
    )
}

// ============================================================================
// Documents
// ============================================================================

mod documents {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pandoc_document() {
        let text = format!(
            "\\hypertarget{{intro}}{{%\n\\section{{Intro}}\\label{{intro}}}}\n\n\
             As Table 1 shows, f^{{'}} grows.\n\n{}\n\nTable 1: Growth\n\n\
             \\[{{a = b}}{{c = d}}\\]\n",
            longtable(&["A", "B"], "1 & 2 \\\\")
        );
        let out = repair_document(&text, &RepairOptions::default()).unwrap();

        assert!(out.content.starts_with("\\section{Intro}\\label{intro}\n\n"));
        assert!(out.content.contains("As Table \\ref{table:p1} shows, f' grows."));
        assert!(out.content.contains("\\caption{Growth}"));
        assert!(out.content.contains("\\label{table:p1}"));
        assert!(!out.content.contains("longtable"));
        assert!(out.content.contains("\\begin{align*}\na &= b \\\\\nc &= d\n\\end{align*}"));

        assert_eq!(out.report.table_labels, vec!["1".to_string()]);
        assert_eq!(out.report.alignment_regions, 1);
        assert!(!out.report.has_warnings());
    }

    #[test]
    fn test_figure_document() {
        let text = "As Figure 3 shows.\n\n\\includegraphics[width=2in]{media/image3.png}\n\nFigure 3: Setup\n\nEnd.";
        let out = repair_document(text, &RepairOptions::default()).unwrap();
        assert!(out
            .content
            .starts_with("As Figure \\ref{fig:p3} shows.\n\n\\begin{figure}[H]\n\\centering\n"));
        assert!(out
            .content
            .contains("\\caption{Setup}\n\\label{fig:p3}\n\\end{figure}\n\nEnd."));
        assert_eq!(out.report.figure_labels, vec!["3".to_string()]);
    }

    #[test]
    fn test_environments_from_config() {
        let options = RepairOptions::from_json(r#"{"environments": ["definition{}"]}"#).unwrap();
        let text = "Intro.\n\n\\textbf{Definition: widget.} Body text.\n\nAfter.";
        let out = repair_document(text, &options).unwrap();
        assert!(out
            .content
            .contains("\\begin{definition}{widget}\nBody text.\n\\end{definition}"));
        assert!(out.content.ends_with("After."));
    }

    #[test]
    fn test_bad_environment_declaration() {
        let options = RepairOptions {
            environments: EnvironmentConfig::Compact(vec!["a!b!c{}".to_string()]),
            ..RepairOptions::default()
        };
        let err = repair_document("text", &options).unwrap_err();
        assert!(matches!(err, RepairError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_invalid_table_number_is_reported() {
        let text = format!("{}\n\nTable \\#: Odd\n", longtable(&["A"], "1 \\\\"));
        let out = repair_document(&text, &RepairOptions::default()).unwrap();
        assert!(out.report.has_warnings());
        assert_eq!(out.report.warnings[0].kind, WarningKind::InvalidTableNumber);
        assert!(out.report.table_labels.is_empty());
    }

    #[test]
    fn test_report_serializes() {
        let out = repair_document("\\[{a = b}{c = d}\\]", &RepairOptions::default()).unwrap();
        let json = serde_json::to_value(&out.report).unwrap();
        assert_eq!(json["alignment_regions"], 1);
        assert_eq!(json["listings_converted"], false);
    }

    #[test]
    fn test_minimal_keeps_comments() {
        let out = repair_document("LaTeX % note", &RepairOptions::minimal()).unwrap();
        assert_eq!(out.content, "LaTeX % note");
    }
}

// ============================================================================
// Standalone features
// ============================================================================

mod standalone {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_word_equation() {
        assert_eq!(
            fix_equations("{x = 1}{y = 2}").unwrap(),
            "\\begin{aligned}\nx  &= 1 \\\\\ny  &= 2\n\\end{aligned}  "
        );
    }

    #[test]
    fn test_preamble_template() {
        let keys = serde_json::from_str(r#"{"minted": false}"#).unwrap();
        let template = "\\usepackage{amsmath}\n\\usepackage{minted} % CONDITION: minted==true\n\\usepackage{listings} % CONDITION: minted==false\n\\usepackage{hyperref}";
        assert_eq!(
            conditional_preamble(template, &keys),
            "\\usepackage{amsmath}\n\\usepackage{listings}\n\\usepackage{hyperref}"
        );
    }

    #[test]
    fn test_bib_keys() {
        let bib = "@article{a1,\n title={X}\n}\n@book{b2,\n title={Y}\n}";
        assert_eq!(extract_bib_keys(bib), vec!["a1".to_string(), "b2".to_string()]);
    }
}
