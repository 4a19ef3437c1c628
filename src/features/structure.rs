//! Document structure recovered from Word conventions: the abstract
//! paragraph, the generated table of contents and `Proof.` paragraphs.

use crate::core::locate::{find_env_end, find_not_in_environment};
use crate::core::scanner::{find_in, rfind_in};
use tracing::debug;

const ABSTRACT: &str = "Abstract";
const BOLD_ABSTRACT: &str = "\\textbf{Abstract}";
const MAKETITLE: &str = "\\maketitle";
const PROOF_MARKER: &str = "\n\n\\emph{Proof.}";
const PROOF_BEGIN: &str = "\n\n\\begin{proof}";
const BLACKSQUARE: &str = "\\blacksquare";
const TABLE_OF_CONTENTS: &str = "\n{\n\\setcounter{tocdepth}{3}\n\\tableofcontents\n}\n";

/// Index of the next `\chapter{` or `\section{` down to `max_depth` levels
/// of `sub`, at or after `from`. The end of the text when there is none.
pub fn find_next_section(text: &str, from: usize, max_depth: usize) -> usize {
    let mut keywords = vec!["\\chapter{".to_string()];
    keywords.extend((0..=max_depth).map(|k| format!("\\{}section{{", "sub".repeat(k))));
    keywords
        .iter()
        .filter_map(|kw| find_in(text, kw, from, text.len()))
        .min()
        .unwrap_or(text.len())
}

/// Start of an `Abstract` paragraph before `limit`, with the marker length.
fn abstract_marker(text: &str, limit: usize) -> Option<(usize, usize)> {
    let mut offset = 0usize;
    for line in text[..limit].split('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = &line[indent..];
        if body.starts_with(BOLD_ABSTRACT) {
            return Some((offset + indent, BOLD_ABSTRACT.len()));
        }
        if body.starts_with(ABSTRACT) && !body[ABSTRACT.len()..].starts_with(|c: char| c.is_alphanumeric()) {
            return Some((offset + indent, ABSTRACT.len()));
        }
        offset += line.len() + 1;
    }
    None
}

/// Wrap a leading `Abstract` paragraph in an `abstract` environment.
///
/// The abstract runs from a line starting with `Abstract` (or
/// `\textbf{Abstract}`) up to the first section, and moves right after
/// `\maketitle` when the title comes first.
pub fn abstract_wrapper(text: &str) -> String {
    let first_section = find_next_section(text, 0, 6);
    let Some((at, marker_len)) = abstract_marker(text, first_section) else {
        return text.to_string();
    };
    let body = text[at + marker_len..first_section].trim_start_matches([':', '.']).trim();
    let environment = format!("\\begin{{abstract}}\n{}\n\\end{{abstract}}\n\n", body);
    let rest = &text[first_section..];
    debug!("abstract wrapped");
    match rfind_in(text, MAKETITLE, 0, at) {
        Some(title) => {
            let title_end = title + MAKETITLE.len();
            format!("{}\n{}{}{}", &text[..title_end], environment, &text[title_end..at], rest)
        }
        None => format!("{}{}{}", &text[..at], environment, rest),
    }
}

/// Replace Word's generated table of contents by `\tableofcontents`.
///
/// Word's contents start with a `Contents` heading (`depth` levels of `sub`
/// when headings were shifted) and end at the next heading. They are only
/// replaced when they hold pandoc's `\protect\hyperlink` entries.
pub fn toc_detector(text: &str, depth: usize) -> String {
    let heading = format!("\\{}section{{Contents}}", "sub".repeat(depth));
    let Some(start) = text.find(&heading) else {
        return text.to_string();
    };
    let end = find_next_section(text, start + heading.len(), 6);
    if !text[start..end].contains("\\protect\\hyperlink") {
        return text.to_string();
    }
    debug!("table of contents replaced");
    format!("{}{}{}", &text[..start], TABLE_OF_CONTENTS, &text[end..])
}

/// Close the proof opened just before `from`. Returns the new text and the
/// index after `\end{proof}`.
fn close_proof(text: &str, from: usize) -> (String, usize) {
    let next_section = find_next_section(text, from, 6);
    let env_end = find_env_end(text, from - 1, None).unwrap_or(text.len());
    let next_proof = find_in(text, PROOF_MARKER, from, text.len()).unwrap_or(text.len());
    let limit = next_section.min(env_end).min(next_proof);

    let Some(square) = find_in(text, BLACKSQUARE, from, limit) else {
        let closing = "\n\\end{proof}\n";
        return (
            format!("{}{}{}", &text[..limit], closing, &text[limit..]),
            limit + closing.len(),
        );
    };

    let display = rfind_in(text, "\\[", from, square);
    let inline = rfind_in(text, "\\(", from, square);
    let (opener, close_kw) = match (display, inline) {
        (Some(d), Some(i)) if i > d => (Some(i), "\\)"),
        (Some(d), _) => (Some(d), "\\]"),
        (None, Some(i)) => (Some(i), "\\)"),
        (None, None) => (None, ""),
    };
    let closer = opener.and_then(|_| find_in(text, close_kw, square, text.len()));
    let (Some(opener), Some(closer)) = (opener, closer) else {
        let closing = "\n\\end{proof}";
        let after = square + BLACKSQUARE.len();
        return (
            format!("{}{}{}", &text[..square], closing, &text[after..]),
            square + closing.len(),
        );
    };

    let contents = text[opener + 2..closer].replace(BLACKSQUARE, "");
    let rest = &text[closer + 2..];
    if contents.trim().is_empty() {
        let head = format!("{}\n\\end{{proof}}", &text[..opener]);
        let end = head.len();
        (format!("{}{}", head, rest), end)
    } else {
        let head = format!("{}{}{}\n\\end{{proof}}", &text[..opener + 2], contents, close_kw);
        let end = head.len();
        (format!("{}{}", head, rest), end)
    }
}

/// Turn `\emph{Proof.}` paragraphs into `proof` environments.
///
/// A proof ends at the first `\blacksquare` before the next section, the
/// next proof or the end of the enclosing environment. The square is
/// dropped, and so is an equation holding nothing else. Without a square the
/// proof ends right before whichever of those comes first. Proofs inside
/// longtables are left alone.
pub fn qed(text: &str) -> String {
    let mut text = text.to_string();
    let mut cursor = 0usize;
    while let Some(at) = find_not_in_environment(&text, PROOF_MARKER, &["longtable"], cursor, 1) {
        let opened = format!("{}{}{}", &text[..at], PROOF_BEGIN, &text[at + PROOF_MARKER.len()..]);
        let (closed, end) = close_proof(&opened, at + PROOF_BEGIN.len());
        text = closed;
        cursor = end;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_section_or_end_of_text() {
        let text = "a \\subsection{x} b \\chapter{y}";
        assert_eq!(find_next_section(text, 0, 6), 2);
        assert_eq!(find_next_section(text, 3, 6), text.find("\\chapter").unwrap());
        assert_eq!(find_next_section("plain", 0, 6), 5);
        assert_eq!(find_next_section("\\subsubsection{z}", 0, 1), 17);
    }

    #[test]
    fn abstract_before_first_section() {
        let text = "\\textbf{Abstract}\n\nWe study things.\n\n\\section{Intro}\nBody";
        assert_eq!(
            abstract_wrapper(text),
            "\\begin{abstract}\nWe study things.\n\\end{abstract}\n\n\\section{Intro}\nBody"
        );
    }

    #[test]
    fn abstract_moves_after_title() {
        let text = "\\maketitle\n\nAbstract: Short.\n\n\\section{A}";
        assert_eq!(
            abstract_wrapper(text),
            "\\maketitle\n\\begin{abstract}\nShort.\n\\end{abstract}\n\n\n\n\\section{A}"
        );
    }

    #[test]
    fn abstract_word_elsewhere_is_ignored() {
        let text = "An Abstract idea.\n\\section{A}\nAbstract\nlater";
        assert_eq!(abstract_wrapper(text), text);
        let text = "Abstraction is key.\n\\section{A}";
        assert_eq!(abstract_wrapper(text), text);
    }

    #[test]
    fn table_of_contents_is_generated() {
        let text = "\\section{Contents}\n\\protect\\hyperlink{a}{Intro}\n\\section{Intro}\nx";
        assert_eq!(
            toc_detector(text, 0),
            "\n{\n\\setcounter{tocdepth}{3}\n\\tableofcontents\n}\n\\section{Intro}\nx"
        );
        let shifted = "\\subsection{Contents}\n\\protect\\hyperlink{a}{Intro}\n\\subsection{Intro}";
        assert!(toc_detector(shifted, 1).contains("\\tableofcontents"));
    }

    #[test]
    fn contents_section_without_links_stays() {
        let text = "\\section{Contents}\nWhat this report holds.\n\\section{Intro}";
        assert_eq!(toc_detector(text, 0), text);
    }

    #[test]
    fn proof_ends_at_blacksquare_equation() {
        let text = "Claim.\n\n\\emph{Proof.} Trivial since\n\\[x = 1 \\blacksquare\\]\n\nNext.";
        assert_eq!(
            qed(text),
            "Claim.\n\n\\begin{proof} Trivial since\n\\[x = 1 \\]\n\\end{proof}\n\nNext."
        );
    }

    #[test]
    fn lone_blacksquare_equation_is_dropped() {
        let text = "\n\n\\emph{Proof.} Obvious.\n\\[\\blacksquare\\]\nDone.";
        assert_eq!(qed(text), "\n\n\\begin{proof} Obvious.\n\n\\end{proof}\nDone.");
    }

    #[test]
    fn proof_without_square_ends_at_section_or_environment() {
        let text = "\n\n\\emph{Proof.} Left to the reader.\n\\section{Next}";
        assert_eq!(
            qed(text),
            "\n\n\\begin{proof} Left to the reader.\n\n\\end{proof}\n\\section{Next}"
        );
        let text = "\\begin{theorem}\nX\n\n\\emph{Proof.} Y\n\\end{theorem}";
        assert_eq!(
            qed(text),
            "\\begin{theorem}\nX\n\n\\begin{proof} Y\n\n\\end{proof}\n\\end{theorem}"
        );
    }

    #[test]
    fn square_of_a_later_proof_is_not_borrowed() {
        let text = "\n\n\\emph{Proof.} A\n\n\\emph{Proof.} B \\(\\blacksquare\\)";
        assert_eq!(
            qed(text),
            "\n\n\\begin{proof} A\n\\end{proof}\n\n\n\\begin{proof} B \n\\end{proof}"
        );
    }

    #[test]
    fn consecutive_proofs() {
        let text = "\n\n\\emph{Proof.} A \\(\\blacksquare\\)\n\n\\emph{Proof.} B \\(\\blacksquare\\)";
        assert_eq!(
            qed(text),
            "\n\n\\begin{proof} A \n\\end{proof}\n\n\\begin{proof} B \n\\end{proof}"
        );
    }
}
