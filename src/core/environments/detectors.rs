//! Detectors for the Word idioms that stand in for environments

use super::{ArgStyle, EnvironmentDescriptor};
use crate::core::locate::{find_env_end, find_not_in_environment_tolerance, split_not_in_env};
use crate::core::scanner::{environment_depth, find_in, find_nth, local_env_end};
use crate::core::tables::{force_not_inline, minipage_remover, HEADER_CELL, LONGTABLE_BEGIN, LONGTABLE_END, MINIPAGE_END};
use crate::utils::error::{RepairError, RepairResult};
use tracing::debug;

/// Environments whose rows never split the surrounding one-column table.
const ROW_FORBIDDEN: [&str; 6] = ["matrix", "bmatrix", "pmatrix", "minipage", "align*", "longtable"];

/// Characters that close any open legacy environment.
const UNICODE_ENDERS: [char; 3] = ['◾', '▨', '◺'];

/// Separators between keyword and title in a bold lead-in.
const DASHES: [&str; 4] = ["- ", "– ", "— ", "--"];

/// Paragraph starts that continue the previous lead-in paragraph.
const CONTINUATIONS: [&str; 3] = ["\\[", "\\begin{enumerate}", "\\begin{itemize}"];

const QUOTE_BEGIN: &str = "\\begin{quote}\n";
const QUOTE_END: &str = "\n\\end{quote}";
const BOLD: &str = "\\textbf{";

/// Longtable, its end (after `\end{longtable}`) and its first header cell.
struct TableHead {
    start: usize,
    end: usize,
    header: String,
    /// Start of the header cell's `\end{minipage}`
    header_end: usize,
}

enum Slot {
    Table(TableHead),
    /// A longtable without a readable header cell
    Unusable,
}

/// The n-th longtable of `text` with its first header cell.
fn table_head(text: &str, n: usize) -> Option<Slot> {
    let start = find_nth(text, LONGTABLE_BEGIN, n, None, None)?;
    let close = find_env_end(text, start, Some("longtable"))?;
    let end = close + LONGTABLE_END.len();
    let Some(cell) = find_in(text, HEADER_CELL, start, close) else {
        return Some(Slot::Unusable);
    };
    let header_start = cell + HEADER_CELL.len();
    let Some(header_end) = find_env_end(text, cell, Some("minipage")) else {
        return Some(Slot::Unusable);
    };
    Some(Slot::Table(TableHead {
        start,
        end,
        header: text[header_start.min(header_end)..header_end].trim().to_string(),
        header_end,
    }))
}

/// Turn every one-cell longtable into a `framed` box.
pub fn framed(text: &str) -> String {
    let mut text = text.to_string();
    let mut skip = 1;
    while let Some(found) = table_head(&text, skip) {
        let Slot::Table(head) = found else {
            skip += 1;
            continue;
        };
        let rest = &text[head.header_end..head.end - LONGTABLE_END.len()];
        let Some(mut rest) = rest.strip_prefix(MINIPAGE_END).map(str::to_string) else {
            skip += 1;
            continue;
        };
        for token in ["\\\\", "\\midrule()", "\\midrule", "\\endhead", "\\bottomrule()", "\\bottomrule"] {
            rest = rest.replace(token, "");
        }
        if !rest.trim().is_empty() {
            skip += 1;
            continue;
        }
        let boxed = format!("\\begin{{framed}}\n\n{}\n\n\\end{{framed}}\n\n", head.header);
        text = format!("{}{}{}", &text[..head.start], boxed, &text[head.end..]);
    }
    text
}

/// Rewrite one-column longtables headed by the environment's keyword.
///
/// The header may be the bare keyword or `\textbf{}`/`\emph{}` of it, in any
/// case and with a trailing period. A table with two body rows takes the
/// first as the title; one with a single row has no title.
///
/// # Errors
///
/// [`RepairError::MalformedTable`] when a matching table has no `\endhead`
/// or `\bottomrule`.
pub fn longtable_environment(text: &str, env: &EnvironmentDescriptor) -> RepairResult<String> {
    let keyword = env.keyword().to_lowercase();
    let accepted = [
        keyword.clone(),
        format!("\\textbf{{{}}}", keyword),
        format!("\\emph{{{}}}", keyword),
    ];
    let name = env.env_name();
    let middlefix = env.middlefix_text();

    let mut text = text.to_string();
    let mut skip = 1;
    while let Some(found) = table_head(&text, skip) {
        let Slot::Table(head) = found else {
            skip += 1;
            continue;
        };
        let header = head.header.to_lowercase();
        let header = header.trim().trim_matches('.');
        if !accepted.iter().any(|a| a == header)
            || !text[head.header_end..].starts_with(&format!("{} \\\\", MINIPAGE_END))
        {
            skip += 1;
            continue;
        }

        let depth = environment_depth(&text, head.start, Some("longtable"));
        let tolerance = [("longtable", 2 + depth)];
        let body_start = find_not_in_environment_tolerance(&text, "\\endhead", &tolerance, head.header_end, 1)
            .ok_or_else(|| RepairError::table("environment table without \\endhead"))?
            + "\\endhead".len();
        let body_end = find_not_in_environment_tolerance(&text, "\\bottomrule", &tolerance, head.header_end, 1)
            .ok_or_else(|| RepairError::table("environment table without \\bottomrule"))?;
        if body_start > body_end || body_end > head.end {
            skip += 1;
            continue;
        }

        let rows: Vec<String> = split_not_in_env(&text[body_start..body_end], "\\\\", &ROW_FORBIDDEN)
            .into_iter()
            .map(minipage_remover)
            .collect();
        let rewritten = match rows.as_slice() {
            [title, body] => {
                let title = if env.accepts_title() {
                    env.args.wrap(title)
                } else {
                    String::new()
                };
                format!(
                    "\\begin{{{name}}}{middlefix}{title}{suffix}\n\n{body}\n\\end{{{name}}}",
                    suffix = env.suffix,
                    body = force_not_inline(body),
                )
            }
            [body] => {
                let forced = if env.args == ArgStyle::Brace { "{}" } else { "" };
                format!(
                    "\\begin{{{name}}}{middlefix}{forced}\n\n{body}\n\\end{{{name}}}",
                    body = force_not_inline(body),
                )
            }
            _ => {
                skip += 1;
                continue;
            }
        };
        debug!(env = %name, "longtable rewritten as environment");
        text = format!("{}{}{}", &text[..head.start], rewritten, &text[head.end..]);
    }
    Ok(text)
}

/// Rewrite quotes that open with `\textbf{Keyword...}`.
///
/// For environments with a title, `\textbf{Definition: Title.}` gives the
/// title `Title`: everything after the first colon, periods trimmed.
///
/// # Errors
///
/// [`RepairError::UnbalancedBrace`] when the bold lead-in is never closed.
pub fn quote_to_environment(text: &str, env: &EnvironmentDescriptor) -> RepairResult<String> {
    let keyword = env.keyword().to_lowercase();
    let name = env.env_name();
    let mut text = text.to_string();
    let mut skip = 1;

    while let Some(start) = find_nth(&text, QUOTE_BEGIN, skip, None, None) {
        let body_start = start + QUOTE_BEGIN.len();
        let Some(body_end) = find_in(&text, QUOTE_END, body_start, text.len()) else {
            break;
        };
        let during = &text[body_start..body_end];
        if !during.starts_with(BOLD) {
            skip += 1;
            continue;
        }
        let declare_end = local_env_end(during, 0)?;
        let bold = &during[BOLD.len()..declare_end];
        if !bold.to_lowercase().starts_with(&keyword) {
            skip += 1;
            continue;
        }

        let args = if env.has_extra_args {
            let title = bold
                .split_once(':')
                .map(|(_, title)| title.trim().replace('\n', " "))
                .unwrap_or_default();
            env.args.wrap(title.trim_end_matches('.').trim())
        } else {
            String::new()
        };
        let rewritten = format!(
            "{prefix}\\begin{{{name}}}{args}{suffix}\n{body}\n\\end{{{name}}}",
            prefix = env.prefix,
            suffix = env.suffix,
            body = during[declare_end + 1..].trim(),
        );
        text = format!("{}{}{}", &text[..start], rewritten, &text[body_end + QUOTE_END.len()..]);
    }
    Ok(text)
}

/// Clean a lead-in title: trailing colon and period go, and for the
/// parenthesis form the closing parenthesis too.
fn clean_term(term: &str, parenthesised: bool) -> String {
    let mut term = term.trim();
    term = term.strip_suffix(':').unwrap_or(term);
    term = term.strip_suffix('.').unwrap_or(term);
    if parenthesised {
        term = term.strip_suffix(')').unwrap_or(term);
    }
    term.trim().to_string()
}

/// Parse what follows `\textbf{Keyword` at `after`. Returns the title and
/// where the body starts.
fn parse_lead_in(text: &str, start: usize, after: usize) -> RepairResult<Option<(String, usize)>> {
    let rest = &text[after..];

    // \textbf{Theorem - Title:} and \textbf{Theorem (Title).}
    if let Some(separated) = rest.strip_prefix(' ') {
        let dash = DASHES.iter().find(|d| separated.starts_with(*d));
        if dash.is_some() || separated.starts_with('(') {
            let close = local_env_end(text, start)?;
            let term_start = (after + 1 + dash.map_or(1, |d| d.len())).min(close);
            let term = clean_term(&text[term_start..close], dash.is_none());
            return Ok(Some((term, close + 1)));
        }
    }
    // \textbf{Definition.} and \textbf{Definition:}
    if rest.starts_with(".}") || rest.starts_with(":}") {
        return Ok(Some((String::new(), after + 2)));
    }
    // \textbf{Definition: Title.}
    if rest.starts_with(':') {
        let close = local_env_end(text, start)?;
        return Ok(Some((clean_term(&text[after + 1..close], false), close + 1)));
    }
    // \textbf{Definition} (Title).
    if rest.starts_with("} (") {
        let Some(close) = find_in(text, ")", after + 3, text.len()) else {
            return Ok(None);
        };
        let term = text[after + 3..close].trim().to_string();
        let tail = &text[close + 1..];
        let body_start = ["\\textbf{.}", "\\textbf{. }", "."]
            .iter()
            .find(|dot| tail.starts_with(*dot))
            .map_or(close + 1, |dot| close + 1 + dot.len());
        return Ok(Some((term, body_start)));
    }
    Ok(None)
}

/// End of the lead-in paragraph: the next blank line that is not followed
/// by display math, a list or lower-case text. End of text if none.
fn paragraph_end(text: &str, from: usize) -> usize {
    let mut search = from;
    while let Some(blank) = find_in(text, "\n\n", search, text.len()) {
        let next = &text[blank + 2..];
        let continues = next.starts_with(|c: char| c.is_ascii_lowercase())
            || CONTINUATIONS.iter().any(|c| next.starts_with(c));
        if !continues {
            return blank;
        }
        search = blank + 2;
    }
    text.len()
}

/// Rewrite paragraphs that open with a bold lead-in naming the environment.
///
/// Accepted after a blank line:
///
/// * `\textbf{Theorem - Title:} body` (any dash)
/// * `\textbf{Theorem (Title).} body`
/// * `\textbf{Definition: Title.} body`
/// * `\textbf{Definition.} body`
/// * `\textbf{Definition} (Title). body`
///
/// The environment closes at the end of the paragraph. Bracket-style
/// environments with a middlefix are left alone.
pub fn bold_lead_in_environment(text: &str, env: &EnvironmentDescriptor) -> RepairResult<String> {
    if env.args == ArgStyle::Bracket && !env.middlefix.is_empty() {
        return Ok(text.to_string());
    }
    let opener = format!("{}{}", BOLD, env.capitalized_keyword());
    let name = env.env_name();
    let mut text = text.to_string();
    let mut skip = 1;

    while let Some(start) = find_nth(&text, &opener, skip, None, None) {
        if !text[..start].ends_with("\n\n") || environment_depth(&text, start, Some(&name)) > 0 {
            skip += 1;
            continue;
        }
        let Some((term, body_start)) = parse_lead_in(&text, start, start + opener.len())? else {
            skip += 1;
            continue;
        };
        let body_start = body_start.min(text.len());
        let body_end = paragraph_end(&text, body_start);
        let args = if term.is_empty() {
            String::new()
        } else {
            env.args.wrap(&term)
        };
        let rewritten = format!(
            "{prefix}\\begin{{{name}}}{middlefix}{args}{suffix}\n{body}\n\\end{{{name}}}",
            prefix = env.prefix,
            middlefix = env.middlefix_text(),
            suffix = env.suffix,
            body = text[body_start..body_end].trim(),
        );
        text = format!("{}{}{}", &text[..start], rewritten, &text[body_end..]);
    }
    Ok(text)
}

/// Wrap text between legacy start and end markers.
///
/// Any of `◾ ▨ ◺` also ends the environment. For environments with a title,
/// the first paragraph becomes the title when the body goes on for at least
/// ten more bytes.
pub fn marker_environment(text: &str, env: &EnvironmentDescriptor) -> String {
    let (Some(start_marker), Some(end_marker)) = (env.start_marker(), env.end_marker()) else {
        return text.to_string();
    };
    let start_marker = if env.initial_newline && !start_marker.starts_with('\n') {
        format!("\n{}", start_marker)
    } else {
        start_marker
    };
    if start_marker.is_empty() {
        return text.to_string();
    }
    let name = env.env_name();
    let mut text = text.to_string();
    let mut cursor = 0usize;

    while let Some(s1) = find_in(&text, &start_marker, cursor, text.len()) {
        let s2 = s1 + start_marker.len();
        let special = UNICODE_ENDERS
            .iter()
            .filter_map(|c| text[s2..].find(*c).map(|at| (s2 + at, s2 + at + c.len_utf8())))
            .min();
        let marked = find_in(&text, &end_marker, s2, text.len()).map(|at| (at, at + end_marker.len()));
        let (e1, e2) = match (marked, special) {
            (Some(m), Some(s)) => m.min(s),
            (Some(m), None) => m,
            (None, Some(s)) => s,
            (None, None) => break,
        };

        let mut begin = format!("\n\\begin{{{}}}", name);
        let mut body_start = s2;
        if env.has_extra_args {
            match find_in(&text, "\n\n", s2, text.len()) {
                Some(s3) if e1 > s3 && e1 - s3 >= 10 => {
                    begin.push_str(&env.prefix);
                    begin.push_str(&env.args.wrap(text[s2..s3].trim()));
                    begin.push_str(&env.suffix);
                    body_start = s3;
                }
                _ if !env.suffix.is_empty() => {
                    begin.push_str(&env.prefix);
                    begin.push_str(&env.args.wrap(""));
                    begin.push_str(&env.suffix);
                }
                _ => {}
            }
        }
        let rewritten = format!("{}\n{}\n\\end{{{}}}\n", begin, text[body_start..e1].trim(), name);
        text = format!("{}{}{}", &text[..s1], rewritten, &text[e2..]);
        cursor = s1 + rewritten.len();
    }
    text
}
