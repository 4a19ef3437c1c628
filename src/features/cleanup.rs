//! Small whole-document passes over pandoc output.

use crate::core::scanner::{any_layer, find_in, find_unescaped, local_env_end, local_env_layer, rfind_in};
use crate::utils::error::{RepairError, RepairResult};
use regex::{Captures, Regex};
use tracing::debug;

const HYPERTARGET: &str = "\\hypertarget{";
const TEXTTT: &str = "\\texttt{";

/// Commands whose argument is never prose.
const NON_PROSE_COMMANDS: &[&str] = &["texttt", "includegraphics", "label", "ref"];

/// Sectioning commands from the top, then `depth + 2` levels of sections.
fn section_names(depth: usize) -> Vec<String> {
    let mut names = vec!["part".to_string(), "chapter".to_string()];
    names.extend((0..depth + 2).map(|k| format!("{}section", "sub".repeat(k))));
    names
}

fn section_command(level: usize) -> String {
    format!("\\{}section{{", "sub".repeat(level))
}

/// Drop every comment. Verbatim blocks must already be concealed.
pub fn remove_comments(text: &str) -> String {
    text.split('\n')
        .map(|line| match find_unescaped(line, "%", 0) {
            Some(at) => &line[..at],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cap section depth: with a limit of 2, `\subsubsection{` and anything
/// deeper (down to `deepest`) becomes `\subsection{`.
///
/// Levels are counted as Word numbers its headings, from 1.
pub fn subsection_limit(text: &str, limit: usize, deepest: usize) -> RepairResult<String> {
    if limit < 1 {
        return Err(RepairError::invalid("section limit must be at least 1"));
    }
    let target = section_command(limit - 1);
    let mut text = text.to_string();
    for level in (limit + 1..=deepest).rev() {
        text = text.replace(&section_command(level - 1), &target);
    }
    Ok(text)
}

/// Move every sectioning level `shift` steps up. A shift of -1 turns
/// sections into chapters, subsections into sections and so on.
pub fn shift_sections(text: &str, depth: usize, shift: i32) -> RepairResult<String> {
    if !(-2..=0).contains(&shift) {
        return Err(RepairError::invalid(format!("section shift {} is outside -2..=0", shift)));
    }
    let names = section_names(depth);
    let up = shift.unsigned_abs() as usize;
    let mut text = text.to_string();
    for i in 0..depth {
        let from = format!("\\{}{{", names[i + 2]);
        let to = format!("\\{}{{", names[i + 2 - up]);
        text = text.replace(&from, &to);
    }
    Ok(text)
}

/// `f^{'}` → `f'`, up to triple primes.
pub fn prime_dealer(text: &str) -> String {
    text.replace("^{'''}", "'''")
        .replace("^{''}", "''")
        .replace("^{'}", "'")
}

/// Unwrap pandoc's `\hypertarget{id}{%\n...}` around headings, keeping the
/// heading and its label.
pub fn hypertarget_eliminator(text: &str) -> RepairResult<String> {
    let mut text = text.to_string();
    let mut cursor = 0usize;
    while let Some(start) = find_in(&text, HYPERTARGET, cursor, text.len()) {
        let id_end = local_env_end(&text, start)?;
        if !text[id_end + 1..].starts_with('{') {
            cursor = id_end + 1;
            continue;
        }
        let body_end = local_env_end(&text, id_end + 1)?;
        let body = &text[id_end + 2..body_end];
        let body = body.strip_prefix('%').unwrap_or(body);
        let body = body.strip_prefix('\n').unwrap_or(body);
        text = format!("{}{}{}", &text[..start], body, &text[body_end + 1..]);
        cursor = start;
    }
    Ok(text)
}

/// `\(`/`\)` → `$` and `\[`/`\]` → `$$`. A `\\[2pt]` line break is left alone.
pub fn dollar_sign_equations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut prev_backslash = false;
    while let Some(c) = rest.chars().next() {
        if c == '\\' && !prev_backslash {
            let replacement = match rest.as_bytes().get(1) {
                Some(b'(') | Some(b')') => Some("$"),
                Some(b'[') | Some(b']') => Some("$$"),
                _ => None,
            };
            if let Some(dollars) = replacement {
                out.push_str(dollars);
                rest = &rest[2..];
                prev_backslash = false;
                continue;
            }
        }
        prev_backslash = c == '\\' && !prev_backslash;
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Typeset the word `LaTeX` as `\LaTeX{}` in prose.
///
/// Occurrences inside math, inside the arguments of `\texttt`,
/// `\includegraphics`, `\label` or `\ref`, and ones already written as a
/// command are left alone.
pub fn latexing(text: &str) -> RepairResult<String> {
    const WORD: &str = "LaTeX";
    let mut text = text.to_string();
    let mut end = text.len();
    while let Some(at) = rfind_in(&text, WORD, 0, end) {
        end = at;
        if at > 0 && text.as_bytes()[at - 1] == b'\\' {
            continue;
        }
        let mut in_command = false;
        for cmd in NON_PROSE_COMMANDS {
            if local_env_layer(&text, at, cmd)? {
                in_command = true;
                break;
            }
        }
        let in_math = any_layer(&text, at, "\\[", "\\]") == 1 || any_layer(&text, at, "\\(", "\\)") == 1;
        if !(in_command || in_math) {
            text = format!("{}\\LaTeX{{}}{}", &text[..at], &text[at + WORD.len()..]);
        }
    }
    Ok(text)
}

/// Word's typography inside inline code: curly quotes, en dashes and the
/// `{[}`/`{]}` pandoc writes for brackets.
fn plain_code(body: &str) -> String {
    body.replace("{[}", "[")
        .replace("{]}", "]")
        .replace('\u{2013}', "-")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
}

/// Merge adjacent `\texttt{a}\texttt{b}` runs and give their bodies plain
/// ASCII punctuation.
pub fn fix_all_texttt(text: &str) -> RepairResult<String> {
    let mut text = text.to_string();
    let mut cursor = 0usize;
    while let Some(open) = find_in(&text, TEXTTT, cursor, text.len()) {
        let close = local_env_end(&text, open)?;
        if text[close + 1..].starts_with(TEXTTT) {
            text.replace_range(close..close + 1 + TEXTTT.len(), "");
            continue;
        }
        let body_start = open + TEXTTT.len();
        let body = plain_code(&text[body_start..close]);
        text.replace_range(body_start..close, &body);
        cursor = body_start + body.len() + 1;
    }
    Ok(text)
}

/// Turn plain mentions such as `Table 4A` or `table 4A` into
/// `Table \ref{table:4A}` for each tag.
///
/// `ref_kw` is the label prefix and defaults to the lowercased kind without
/// spaces followed by a colon. Mentions are matched on word boundaries, so
/// tag `1` leaves `Table 12` and `Table 1.2` alone.
pub fn bulk_labeling(text: &str, tags: &[String], kind: &str, ref_cmd: &str, ref_kw: Option<&str>) -> String {
    let mut chars = kind.chars();
    let Some(first) = chars.next() else {
        return text.to_string();
    };
    let rest: String = chars.collect();
    let upper = format!("{}{}", first.to_uppercase(), rest);
    let lower = format!("{}{}", first.to_lowercase(), rest);
    let prefix = match ref_kw {
        Some(kw) => kw.to_string(),
        None => format!("{}:", kind.to_lowercase().replace(' ', "")),
    };

    let mut text = text.to_string();
    for tag in tags {
        let pattern = format!(
            r"\b({}|{}) {}([^\w.]|\.(?:[^0-9]|$)|$)",
            regex::escape(&upper),
            regex::escape(&lower),
            regex::escape(tag)
        );
        let Ok(mention) = Regex::new(&pattern) else {
            continue;
        };
        text = mention
            .replace_all(&text, |caps: &Captures| {
                format!("{} \\{}{{{}{}}}{}", &caps[1], ref_cmd, prefix, tag, &caps[2])
            })
            .into_owned();
    }
    debug!(kind, tags = tags.len(), "references labelled");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_cut_at_unescaped_percent() {
        assert_eq!(remove_comments("a % b\n50\\% off % c\nd"), "a \n50\\% off \nd");
    }

    #[test]
    fn subsection_limit_flattens_deep_headings() {
        let text = "\\section{A}\\subsection{B}\\subsubsection{C}\\paragraph{D}";
        assert_eq!(
            subsection_limit(text, 2, 6).unwrap(),
            "\\section{A}\\subsection{B}\\subsection{C}\\paragraph{D}"
        );
        assert_eq!(
            subsection_limit(text, 1, 6).unwrap(),
            "\\section{A}\\section{B}\\section{C}\\paragraph{D}"
        );
        assert!(subsection_limit(text, 0, 6).is_err());
    }

    #[test]
    fn sections_shift_to_chapters() {
        let text = "\\section{A}\n\\subsection{B}\n\\subsubsection{C}";
        assert_eq!(
            shift_sections(text, 8, -1).unwrap(),
            "\\chapter{A}\n\\section{B}\n\\subsection{C}"
        );
        assert_eq!(shift_sections(text, 8, 0).unwrap(), text);
        assert!(shift_sections(text, 8, 1).is_err());
    }

    #[test]
    fn primes() {
        assert_eq!(prime_dealer("f^{'}(x) + g^{''}(x) + h^{'''}"), "f'(x) + g''(x) + h'''");
    }

    #[test]
    fn hypertargets_are_unwrapped() {
        let text = "\\hypertarget{intro}{%\n\\section{Intro}\\label{intro}}\n\nBody";
        assert_eq!(hypertarget_eliminator(text).unwrap(), "\\section{Intro}\\label{intro}\n\nBody");
        assert!(hypertarget_eliminator("\\hypertarget{x}{%\n\\section{A}").is_err());
    }

    #[test]
    fn dollar_signs_skip_line_breaks() {
        assert_eq!(dollar_sign_equations("\\(x\\) and \\[y\\]"), "$x$ and $$y$$");
        assert_eq!(dollar_sign_equations("a \\\\[2pt] b"), "a \\\\[2pt] b");
    }

    #[test]
    fn latex_word_in_prose_only() {
        let text = "LaTeX is fine. \\texttt{LaTeX} and \\(LaTeX\\) and \\LaTeX stay.";
        assert_eq!(
            latexing(text).unwrap(),
            "\\LaTeX{} is fine. \\texttt{LaTeX} and \\(LaTeX\\) and \\LaTeX stay."
        );
    }

    #[test]
    fn bulk_labeling_respects_word_boundaries() {
        let tags = vec!["1".to_string(), "4A".to_string()];
        let text = "See Figure 1, figure 4A and Figure 12.";
        assert_eq!(
            bulk_labeling(text, &tags, "figure", "ref", None),
            "See Figure \\ref{figure:1}, figure \\ref{figure:4A} and Figure 12."
        );
        assert_eq!(
            bulk_labeling("Table 2.", &["2".to_string()], "table", "autoref", Some("tab:")),
            "Table \\autoref{tab:2}."
        );
    }

    #[test]
    fn texttt_runs_are_merged_and_plain() {
        let text = "Run \\texttt{a\u{2013}b}\\texttt{{[}x{]}} and \\texttt{\u{2018}q\u{2019}} but \u{2018}prose\u{2019}.";
        assert_eq!(
            fix_all_texttt(text).unwrap(),
            "Run \\texttt{a-b[x]} and \\texttt{'q'} but \u{2018}prose\u{2019}."
        );
        assert!(fix_all_texttt("\\texttt{open").is_err());
    }

    #[test]
    fn bulk_labeling_skips_decimal_mentions() {
        let tags = vec!["1".to_string()];
        assert_eq!(
            bulk_labeling("See Table 1.2 here.", &tags, "table", "ref", Some("table:p")),
            "See Table 1.2 here."
        );
        assert_eq!(
            bulk_labeling("As in Table 1.\nTable 1. Then", &tags, "table", "ref", Some("table:p")),
            "As in Table \\ref{table:p1}.\nTable \\ref{table:p1}. Then"
        );
    }
}
