//! Verbatim blocks and code listings
//!
//! Verbatim bodies are swapped for placeholders before any other pass runs,
//! so nothing rewrites code. A body may open with a language tag (`python`,
//! `# python`, `// cpp`); with a listing plugin configured the tag is
//! recognised, removed, and later used to turn the block into a `minted` or
//! `lstlisting` environment.

use crate::core::scanner::find_in;
use phf::phf_set;
use serde::{Deserialize, Serialize};
use tracing::debug;

static MINTED_LANGUAGES: phf::Set<&'static str> = phf_set! {
    "cucumber", "abap", "ada", "ahk", "antlr", "apacheconf", "applescript", "as", "aspectj",
    "autoit", "asy", "awk", "basemake", "bash", "bat", "bbcode", "befunge", "bmax", "boo",
    "bro", "bugs", "c", "ceylon", "cfm", "cfs", "cheetah", "clj", "cmake", "cobol", "cl",
    "console", "control", "coq", "cpp", "croc", "csharp", "css", "cuda", "cyx", "d", "dg",
    "diff", "django", "dpatch", "duel", "dylan", "ec", "erb", "evoque", "fan", "fancy",
    "fortran", "gas", "genshi", "glsl", "gnuplot", "go", "gosu", "groovy", "gst", "haml",
    "haskell", "hxml", "html", "http", "hx", "idl", "irc", "ini", "java", "jade", "js", "json",
    "jsp", "kconfig", "koka", "lasso", "livescrit", "llvm", "logos", "lua", "mako", "mason",
    "matlab", "minid", "monkey", "moon", "mxml", "myghty", "mysql", "nasm", "newlisp",
    "newspeak", "numpy", "ocaml", "octave", "ooc", "perl", "php", "plpgsql", "postgresql",
    "postscript", "pot", "prolog", "psql", "puppet", "python", "qml", "ragel", "raw", "ruby",
    "rhtml", "sass", "scheme", "smalltalk", "sql", "ssp", "tcl", "tea", "tex", "text", "vala",
    "vgl", "vim", "xml", "xquery", "yaml", "ts",
};

/// `listings` language names, lower-cased.
static LISTING_LANGUAGES: phf::Set<&'static str> = phf_set! {
    "abap", "acsl", "ada", "algol", "ant", "assembler", "awk", "bash", "basic", "c", "c++",
    "caml", "cil", "clean", "cobol", "comal", "80", "command.com", "comsol", "csh", "delphi",
    "eiffel", "elan", "erlang", "euphoria", "fortran", "gcl", "gnuplot", "haskell", "html",
    "idl", "inform", "java", "jvmis", "ksh", "lingo", "lisp", "logo", "make", "mathematica",
    "matlab", "mercury", "metapost", "miranda", "mizar", "ml", "modula-2", "mupad", "nastran",
    "oberon-2", "ocl", "octave", "oz", "pascal", "perl", "php", "pl/i", "plasm", "postscript",
    "pov", "prolog", "promela", "pstricks", "python", "r", "reduce", "rexx", "rsl", "ruby", "s",
    "sas", "scilab", "sh", "shelxl", "simula", "sparql", "sql", "tcl", "tex", "vbscript",
    "verilog", "vhdl", "vrml", "xml", "xslt", "ts",
};

/// Languages accepted on the first line of a Word code block.
static CODE_BLOCK_LANGUAGES: phf::Set<&'static str> = phf_set! {
    "80", "abap", "acsl", "ada", "algol", "ant", "assembler", "awk", "bash", "basic", "c",
    "c++", "caml", "cil", "clean", "cobol", "comal", "command.com", "comsol", "csh", "delphi",
    "eiffel", "elan", "erlang", "euphoria", "fortran", "gcl", "gnuplot", "haskell", "html",
    "idl", "inform", "java", "jvmis", "ksh", "lingo", "lisp", "logo", "make", "mathematica",
    "matlab", "mercury", "metapost", "miranda", "mizar", "ml", "modula-2", "mupad", "nastran",
    "oberon-2", "ocl", "octave", "oz", "pascal", "perl", "php", "pl/i", "plasm", "postscript",
    "pov", "prolog", "promela", "pstricks", "python", "r", "reduce", "rexx", "rsl", "ruby", "s",
    "sas", "scilab", "sh", "shelxl", "simula", "sparql", "sql", "tcl", "tex", "ts", "vbscript",
    "verilog", "vhdl", "vrml", "xml", "xslt",
};

const VERBATIM_BEGIN: &str = "\\begin{verbatim}";
const VERBATIM_END: &str = "\\end{verbatim}";

/// Environment used for code listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingPlugin {
    /// Keep plain `verbatim`
    #[default]
    None,
    Minted,
    #[serde(alias = "lstlisting")]
    Listings,
}

impl ListingPlugin {
    fn languages(self) -> Option<&'static phf::Set<&'static str>> {
        match self {
            ListingPlugin::None => None,
            ListingPlugin::Minted => Some(&MINTED_LANGUAGES),
            ListingPlugin::Listings => Some(&LISTING_LANGUAGES),
        }
    }
}

/// Read the language tag opening a verbatim body.
///
/// One leading `#`, `//` or `--` is skipped, then the first word must be a
/// language the plugin knows (`ts` becomes `js`). Returns the language and
/// the body without the tag, or `None` and the trimmed body.
pub fn identify_language(body: &str, plugin: ListingPlugin) -> (Option<&'static str>, String) {
    let held = body.trim();
    let Some(languages) = plugin.languages() else {
        return (None, body.to_string());
    };

    let mut text = held;
    if let Some(rest) = text.strip_prefix("//").or_else(|| text.strip_prefix("--")) {
        text = rest.trim();
    } else if let Some(rest) = text.strip_prefix('#') {
        text = rest.trim();
    }
    let Some(breaker) = text.find(|c: char| c == '\n' || c == ' ') else {
        return (None, held.to_string());
    };
    let tag = text[..breaker].trim().to_lowercase();
    match languages.get_key(tag.as_str()) {
        Some(&"ts") => (Some("js"), text[breaker + 1..].trim_matches('\n').to_string()),
        Some(language) => (Some(*language), text[breaker + 1..].trim_matches('\n').to_string()),
        None => (None, held.to_string()),
    }
}

/// A concealed verbatim body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashedVerbatim {
    pub placeholder: String,
    pub body: String,
    pub language: Option<&'static str>,
}

/// Verbatim bodies taken out by [`hide_verbatims`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerbatimStash {
    entries: Vec<StashedVerbatim>,
}

impl VerbatimStash {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StashedVerbatim> {
        self.entries.iter()
    }
}

fn placeholder(index: usize) -> String {
    format!("\u{E000}VERBATIM{}\u{E001}", index)
}

/// Replace every verbatim body by a placeholder line.
///
/// `\begin{verbatim}` and `\end{verbatim}` stay in the text. Curly quotes
/// in the body are straightened.
pub fn hide_verbatims(text: &str, plugin: ListingPlugin) -> (String, VerbatimStash) {
    let mut text = text.to_string();
    let mut stash = VerbatimStash::default();
    let mut cursor = 0usize;

    while let Some(start) = find_in(&text, VERBATIM_BEGIN, cursor, text.len()) {
        let body_start = start + VERBATIM_BEGIN.len();
        let Some(end) = find_in(&text, VERBATIM_END, body_start, text.len()) else {
            break;
        };
        let raw = text[body_start..end]
            .replace(['“', '”'], "\"")
            .replace(['‘', '’'], "'");
        let (language, body) = identify_language(&raw, plugin);
        let marker = placeholder(stash.entries.len());
        let concealed = format!("\n{}\n", marker);
        text.replace_range(body_start..end, &concealed);
        cursor = body_start + concealed.len() + VERBATIM_END.len();
        stash.entries.push(StashedVerbatim {
            placeholder: marker,
            body: body.trim_matches('\n').to_string(),
            language,
        });
    }
    debug!(count = stash.len(), "verbatim blocks concealed");
    (text, stash)
}

/// Put the concealed bodies back.
pub fn show_verbatims(text: &str, stash: &VerbatimStash) -> String {
    let mut text = text.to_string();
    for entry in &stash.entries {
        text = text.replace(&entry.placeholder, &entry.body);
    }
    text
}

/// Turn concealed verbatim blocks into listings.
///
/// Runs on the text produced by [`hide_verbatims`], before
/// [`show_verbatims`]. A block without its own language tag uses
/// `default_lang`; with neither it stays `verbatim`. Returns whether any
/// block was converted.
pub fn verbatim_to_listing(
    text: &str,
    stash: &VerbatimStash,
    default_lang: &str,
    plugin: ListingPlugin,
    params: &str,
) -> (String, bool) {
    if plugin == ListingPlugin::None {
        return (text.to_string(), false);
    }
    let bare = params
        .strip_prefix('[')
        .and_then(|p| p.strip_suffix(']'))
        .unwrap_or(params);

    let mut text = text.to_string();
    let mut converted = false;
    for entry in &stash.entries {
        let language = match entry.language {
            Some(language) => language,
            None if !default_lang.is_empty() => default_lang,
            None => continue,
        };
        let block = format!("{}\n{}\n{}", VERBATIM_BEGIN, entry.placeholder, VERBATIM_END);
        let listing = match (plugin, bare.is_empty()) {
            (ListingPlugin::Minted, true) => format!(
                "\\begin{{minted}}{{{}}}\n{}\n\\end{{minted}}",
                language, entry.placeholder
            ),
            (ListingPlugin::Minted, false) => format!(
                "\\begin{{minted}}[{}]{{{}}}\n{}\n\\end{{minted}}",
                bare, language, entry.placeholder
            ),
            (_, true) => format!(
                "\\begin{{lstlisting}}[language={}]\n{}\n\\end{{lstlisting}}",
                language, entry.placeholder
            ),
            (_, false) => format!(
                "\\begin{{lstlisting}}[language={}, {}]\n{}\n\\end{{lstlisting}}",
                language, bare, entry.placeholder
            ),
        };
        if text.contains(&block) {
            text = text.replace(&block, &listing);
            converted = true;
        }
    }
    (text, converted)
}

/// Language tag on the first line of a Word code block.
///
/// `py` stands for `python`. The tag line is removed when recognised, and
/// tabs become four spaces either way.
pub fn code_block_language(text: &str) -> (Option<&'static str>, String) {
    let trimmed = text.trim();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let tag = first.trim().to_lowercase();
    let tag = if tag == "py" { "python".to_string() } else { tag };
    match CODE_BLOCK_LANGUAGES.get_key(tag.as_str()) {
        Some(language) => (Some(*language), rest.replace('\t', "    ")),
        None => (None, text.replace('\t', "    ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_language_variants() {
        let plugin = ListingPlugin::Minted;
        assert_eq!(
            identify_language("python def foo(bar): # body", plugin),
            (Some("python"), "def foo(bar): # body".to_string())
        );
        assert_eq!(
            identify_language("# python def foo(bar): # body", plugin),
            (Some("python"), "def foo(bar): # body".to_string())
        );
        assert_eq!(
            identify_language("def foo(bar): # body", plugin),
            (None, "def foo(bar): # body".to_string())
        );
        assert_eq!(identify_language("// TS\nlet x = 1;", plugin).0, Some("js"));
    }

    #[test]
    fn identify_language_without_plugin_keeps_body() {
        assert_eq!(
            identify_language(" python x ", ListingPlugin::None),
            (None, " python x ".to_string())
        );
    }

    #[test]
    fn hide_and_show_round_trip() {
        let text = "a\n\\begin{verbatim}\nx = “1” % not a comment\n\\end{verbatim}\nb\n\\begin{verbatim}y\\end{verbatim}";
        let (hidden, stash) = hide_verbatims(text, ListingPlugin::None);
        assert_eq!(stash.len(), 2);
        assert!(!hidden.contains("not a comment"));
        let shown = show_verbatims(&hidden, &stash);
        assert_eq!(
            shown,
            "a\n\\begin{verbatim}\nx = \"1\" % not a comment\n\\end{verbatim}\nb\n\\begin{verbatim}\ny\n\\end{verbatim}"
        );
    }

    #[test]
    fn listings_use_detected_or_default_language() {
        let text = "\\begin{verbatim}\npython\nprint(1)\n\\end{verbatim}\n\\begin{verbatim}\nplain\n\\end{verbatim}";
        let (hidden, stash) = hide_verbatims(text, ListingPlugin::Minted);
        let (listed, converted) = verbatim_to_listing(&hidden, &stash, "", ListingPlugin::Minted, "linenos");
        assert!(converted);
        let shown = show_verbatims(&listed, &stash);
        assert!(shown.starts_with("\\begin{minted}[linenos]{python}\nprint(1)\n\\end{minted}"));
        assert!(shown.ends_with("\\begin{verbatim}\nplain\n\\end{verbatim}"));

        let (listed, _) = verbatim_to_listing(&hidden, &stash, "c", ListingPlugin::Listings, "[numbers=left]");
        let shown = show_verbatims(&listed, &stash);
        assert!(shown.ends_with("\\begin{lstlisting}[language=c, numbers=left]\nplain\n\\end{lstlisting}"));
    }

    #[test]
    fn listing_without_plugin_is_noop() {
        let (hidden, stash) = hide_verbatims("\\begin{verbatim}x\\end{verbatim}", ListingPlugin::None);
        let (out, converted) = verbatim_to_listing(&hidden, &stash, "c", ListingPlugin::None, "");
        assert!(!converted);
        assert_eq!(out, hidden);
    }

    #[test]
    fn code_block_first_line_language() {
        assert_eq!(
            code_block_language("Py\nif x:\n\treturn 1"),
            (Some("python"), "if x:\n    return 1".to_string())
        );
        assert_eq!(
            code_block_language("x = 1\n\ty"),
            (None, "x = 1\n    y".to_string())
        );
    }
}
