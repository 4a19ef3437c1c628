//! Regression tests for alignment regions and display equations

use super::*;

const NUMBERED_LINE: &str = "\\begin{matrix}\ny = 1\\#(4) \\\\\n\\end{matrix}";

fn tagged() -> AlignOptions {
    AlignOptions {
        comment_mode: CommentMode::Tag,
        label_equations: true,
    }
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn test_detect_braced_region() {
    let text = "foo \\[{9 + 10 = 21}{420 + 69 = 222}\\] bar";
    let found = detect_align_region(text).unwrap().unwrap();
    assert_eq!(found.captured, "\\[{9 + 10 = 21}{420 + 69 = 222}\\]");
    assert_eq!(found.region.start, 4);
    assert_eq!(found.region.end, text.len() - " bar".len());
}

#[test]
fn test_detect_skips_ordinary_equations() {
    assert_eq!(detect_align_region("\\[x = 1\\]").unwrap(), None);
    assert_eq!(detect_align_region("\\[{x}^2 = y\\]").unwrap(), None);
    let text = "\\[{x}^2\\] then \\[{a}{b}\\]";
    let found = detect_align_region(text).unwrap().unwrap();
    assert_eq!(found.captured, "\\[{a}{b}\\]");
}

#[test]
fn test_detect_wraps_trailing_numbering_matrix() {
    let text = "\\[{a = b}\\begin{matrix}\nc = d\\#(2) \\\\\n\\end{matrix}\\] after";
    let found = detect_align_region(text).unwrap().unwrap();
    assert_eq!(
        found.captured,
        "\\[{a = b}{\\begin{matrix}\nc = d\\#(2) \\\\\n\\end{matrix}}\\]"
    );
    assert_eq!(&text[found.region.end..], " after");
}

#[test]
fn test_detect_unterminated_region_is_an_error() {
    let err = detect_align_region("\\[{a}b and nothing else").unwrap_err();
    assert!(matches!(err, RepairError::MalformedEquation { .. }));
}

// ============================================================================
// align_expression
// ============================================================================

#[test]
fn test_align_at_first_operator() {
    let options = AlignOptions::default();
    assert_eq!(align_expression("y = x + 2", true, &options, false).unwrap().text, "y &= x + 2");
    assert_eq!(align_expression("y {>} x + 2", true, &options, false).unwrap().text, "&y {>} x + 2");
    assert_eq!(
        align_expression("y {>} < x + 2", true, &options, false).unwrap().text,
        "y {>} &< x + 2"
    );
}

#[test]
fn test_align_prefers_higher_tier() {
    let options = AlignOptions::default();
    let line = align_expression("a < b = c", true, &options, false).unwrap();
    assert_eq!(line.text, "a < b &= c");
}

#[test]
fn test_align_without_auto_align() {
    let line = align_expression("y = 1", false, &AlignOptions::default(), false).unwrap();
    assert_eq!(line.text, "& y = 1");
}

#[test]
fn test_align_tag_mode_labels() {
    let line = align_expression(NUMBERED_LINE, true, &tagged(), false).unwrap();
    assert_eq!(line.text, "y &= 1\\tag{4} \\label{eq:4}");
    assert_eq!(line.label.as_deref(), Some("4"));
}

#[test]
fn test_align_comment_modes() {
    let intertext = AlignOptions {
        comment_mode: CommentMode::ShortInterText,
        label_equations: false,
    };
    let line = align_expression(NUMBERED_LINE, true, &intertext, false).unwrap();
    assert_eq!(line.text, "\\shortintertext{(4)}\ny &= 1");
    assert_eq!(line.label, None);

    let align = AlignOptions {
        comment_mode: CommentMode::Align,
        label_equations: false,
    };
    let line = align_expression(NUMBERED_LINE, true, &align, false).unwrap();
    assert_eq!(line.text, "y &= 1 && (4)");
}

#[test]
fn test_align_hidden_mode_uses_nonumber() {
    let hidden = AlignOptions {
        comment_mode: CommentMode::Hidden,
        label_equations: true,
    };
    let numbered = align_expression(NUMBERED_LINE, true, &hidden, true).unwrap();
    assert_eq!(numbered.text, "y &= 1\\label{eq:4}");
    let plain = align_expression("x = 2", true, &hidden, true).unwrap();
    assert_eq!(plain.text, "x &= 2\\nonumber");
}

// ============================================================================
// Region processing and replacement
// ============================================================================

#[test]
fn test_process_region_joins_lines() {
    let processed = process_align_region(
        "\\[{9 + 10 = 21}{420 + 69 = 222}\\]",
        true,
        None,
        &AlignOptions::default(),
    )
    .unwrap();
    assert_eq!(processed.body, "9 + 10 &= 21 \\\\\n420 + 69 &= 222");
    assert!(!processed.has_comments);
    assert!(processed.labels.is_empty());
}

#[test]
fn test_process_region_splits_long_lines() {
    let long = "x = aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa = bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    let captured = format!("\\[{{{}}}{{c = d}}\\]", long);
    let processed = process_align_region(&captured, true, Some(40), &AlignOptions::default()).unwrap();
    assert!(processed.body.matches(" \\\\\n").count() >= 2);
    assert!(processed.body.ends_with("c &= d"));
}

#[test]
fn test_replace_region_with_align_star() {
    let text = "text\n\\[{a = b}{c = d}\\]\nafter";
    let (out, labels) = replace_align_region(text, true, None, &AlignOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(out, "text\n\\begin{align*}\na &= b \\\\\nc &= d\n\\end{align*}\n\nafter");
    assert!(labels.is_empty());
}

#[test]
fn test_replace_numbered_region_with_align() {
    let text = format!("\n\\[{{{}}}{{z = 2}}\\]", NUMBERED_LINE);
    let hidden = AlignOptions {
        comment_mode: CommentMode::Hidden,
        label_equations: true,
    };
    let (out, labels) = replace_align_region(&text, true, None, &hidden).unwrap().unwrap();
    assert!(out.starts_with("\n\\begin{align}\n"));
    assert!(out.contains("z &= 2\\nonumber"));
    assert_eq!(labels, vec!["4".to_string()]);
}

#[test]
fn test_replace_all_regions() {
    let text = "A\n\\[{a = b}{c = d}\\]\nB\n\\[x\\]\nC\n\\[{e = f}{g}\\]\n";
    let pass = replace_all_align_regions(text, true, None, &AlignOptions::default()).unwrap();
    assert_eq!(pass.regions, 2);
    assert!(pass.text.contains("\\[x\\]"));
    assert_eq!(pass.text.matches("\\begin{align*}").count(), 2);
    assert!(pass.text.contains("e &= f \\\\\n&g"));
}

// ============================================================================
// Display equations
// ============================================================================

#[test]
fn test_numbered_equation_gets_tag() {
    let text = format!("before \\[{}\\] after", NUMBERED_LINE);
    let (out, labels, warnings) = split_all_equations(&text, 40, &EquationOptions::default()).unwrap();
    assert_eq!(out, "before \n\\begin{equation}\ny = 1 \\tag{4} \n\\end{equation}\n after");
    assert!(labels.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn test_numbered_equation_gets_label() {
    let text = format!("\\[{}\\]", NUMBERED_LINE);
    let options = EquationOptions {
        label: true,
        ..EquationOptions::default()
    };
    let (out, labels, _) = split_all_equations(&text, 40, &options).unwrap();
    assert!(out.contains("y = 1 \\tag{4}  \\label{eq:4}"));
    assert_eq!(labels, vec!["4".to_string()]);
}

#[test]
fn test_invalid_comment_is_dropped_with_warning() {
    let text = "\\[\\begin{matrix}\ny = 1\\#(\\alpha) \\\\\n\\end{matrix}\\]";
    let (out, _, warnings) = split_all_equations(text, 40, &EquationOptions::default()).unwrap();
    assert_eq!(out, "\\[y = 1  \\]");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::InvalidEquationComment);
}

#[test]
fn test_long_equation_is_split_into_groups() {
    let long = "x = aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa = bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    let text = format!("\\[{}\\] and \\[y = 2\\]", long);
    let (out, _, warnings) = split_all_equations(&text, 40, &EquationOptions::default()).unwrap();
    assert!(out.starts_with("\\[{ x  }{ = "));
    assert!(out.ends_with(" and \\[y = 2\\]"));
    assert!(warnings.is_empty());
    let found = detect_align_region(&out).unwrap().unwrap();
    assert_eq!(found.region.start, 0);
}
