//! In-text citations
//!
//! Word users type citations by hand: `(Smith)`, `(Smith, p. 39)` or
//! `(Smith, Jones)`. Given the keys of a BibTeX file these become `\cite`
//! commands.

use crate::core::scanner::{brace_depth, find_in};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How page numbers are written inside the parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// `(Smith, 39)`
    Apa1,
    /// `(Smith, p. 39)`
    #[default]
    Apa2,
    /// `(Smith 39)`
    Mla,
}

impl CitationStyle {
    fn page_opener(self, key: &str) -> String {
        match self {
            CitationStyle::Apa1 => format!("({},", key),
            CitationStyle::Apa2 => format!("({}, p. ", key),
            CitationStyle::Mla => format!("({} ", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationOptions {
    /// Citation command without the backslash. Default: `cite`
    pub command: String,
    pub style: CitationStyle,
    /// Keep visible parentheses: ` (\cite{key})`
    pub brackets: bool,
    /// Prefix page numbers with `p. `
    pub page_prefix: bool,
}

impl Default for CitationOptions {
    fn default() -> Self {
        Self {
            command: "cite".to_string(),
            style: CitationStyle::Apa2,
            brackets: false,
            page_prefix: false,
        }
    }
}

impl CitationOptions {
    fn render(&self, keys: &str, page: Option<&str>) -> String {
        let cite = match page {
            Some(page) if self.page_prefix => format!("\\{}[p. {}]{{{}}}", self.command, page, keys),
            Some(page) => format!("\\{}[{}]{{{}}}", self.command, page, keys),
            None => format!("\\{}{{{}}}", self.command, keys),
        };
        if self.brackets {
            format!(" ({})", cite)
        } else {
            cite
        }
    }
}

/// Keys of the `@type{key, ...}` records of a BibTeX file, in order.
///
/// An `@` nested inside a record (an e-mail address in a field) is skipped.
pub fn extract_bib_keys(bib: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = 0usize;
    while let Some(at) = find_in(bib, "@", cursor, bib.len()) {
        cursor = at + 1;
        if !matches!(brace_depth(bib, at), Ok(depth) if depth <= 0) {
            continue;
        }
        let Some(open) = find_in(bib, "{", at, bib.len()) else {
            break;
        };
        let Some(comma) = find_in(bib, ",", open, bib.len()) else {
            break;
        };
        let key = bib[open + 1..comma].trim();
        if !key.is_empty() {
            keys.push(key.to_string());
        }
    }
    keys
}

/// `(key)` → `\cite{key}` for every key.
pub fn cite_plain(text: &str, keys: &[String], options: &CitationOptions) -> String {
    let mut text = text.to_string();
    for key in keys {
        let written = format!("({})", key);
        text = text.replace(&written, &options.render(key, None));
    }
    text
}

/// Page citations of one key in the configured style. The space before
/// the parenthesis goes with it.
///
/// `you are (John, p. 39) not.` → `you are\cite[39]{John} not.`
pub fn cite_with_pages(text: &str, key: &str, options: &CitationOptions) -> String {
    let opener = options.style.page_opener(key);
    let mut text = text.to_string();
    let mut cursor = 0usize;
    while let Some(start) = find_in(&text, &opener, cursor, text.len()) {
        let page_start = start + opener.len();
        let Some(close) = find_in(&text, ")", page_start, text.len()) else {
            break;
        };
        let page = text[page_start..close].trim().to_string();
        let cut = text[..start].char_indices().next_back().map_or(0, |(i, _)| i);
        let cite = options.render(key, Some(&page));
        text = format!("{}{}{}", &text[..cut], cite, &text[close + 1..]);
        cursor = cut + cite.len();
    }
    text
}

/// `(key, other, third)` → `\cite{key,other,third}`.
///
/// Every name in the parentheses must be a known key; anything else is
/// left as written.
pub fn cite_multi(text: &str, key: &str, keys: &[String], options: &CitationOptions) -> String {
    let opener = format!("({}, ", key);
    let mut text = text.to_string();
    let mut cursor = 0usize;
    while let Some(start) = find_in(&text, &opener, cursor, text.len()) {
        let Some(close) = find_in(&text, ")", start, text.len()) else {
            break;
        };
        let names: Vec<&str> = text[start + 1..close].split(',').map(str::trim).collect();
        if !names.iter().all(|name| keys.iter().any(|k| k == name)) {
            cursor = close;
            continue;
        }
        let cite = options.render(&names.join(","), None);
        text = format!("{}{}{}", &text[..start], cite, &text[close + 1..]);
        cursor = start + cite.len();
    }
    text
}

/// Convert every hand-written citation of the keys found in `bib`.
///
/// Plain citations first, then page citations, then multi-key ones.
pub fn do_citations(text: &str, bib: &str, options: &CitationOptions) -> String {
    let keys = extract_bib_keys(bib);
    debug!(keys = keys.len(), "citation keys extracted");
    let mut text = cite_plain(text, &keys, options);
    for key in &keys {
        text = cite_with_pages(&text, key, options);
    }
    for key in &keys {
        text = cite_multi(&text, key, &keys, options);
    }
    text
}
