//! Environment rewriter
//!
//! Word has no notion of a LaTeX environment, so authors fake them: a one
//! column table headed "Theorem", a quote starting with **Definition:**, or a
//! paragraph opening with a bold lead-in. Each [`EnvironmentDescriptor`]
//! names one target environment and how its title argument is written; the
//! detectors in this module find the Word idioms and emit
//! `\begin{env}...\end{env}`.
//!
//! Descriptors come either from a JSON mapping or from the compact string
//! syntax parsed by [`EnvironmentDescriptor::from_compact`]:
//!
//! | compact              | environment | args    | middlefix | suffix |
//! |----------------------|-------------|---------|-----------|--------|
//! | `theorem`            | theorem     | bracket |           |        |
//! | `theorem{}`          | theorem     | brace   |           |        |
//! | `theo!theorem[]`     | theorem     | bracket |           |        |
//! | `x!name[mid]{}{s}`   | name        | brace   | `[mid]`   | `{s}`  |

mod detectors;

pub use detectors::{
    bold_lead_in_environment, framed, longtable_environment, marker_environment, quote_to_environment,
};

use crate::utils::error::{RepairError, RepairResult};
use fxhash::FxHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Middlefix value meaning "empty, but still no bracket title".
pub const EMPTY_MIDDLEFIX: &str = "[EMPTY]";

/// How the title argument of an environment is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgStyle {
    /// `\begin{env}[title]`
    Bracket,
    /// `\begin{env}{title}`
    #[default]
    Brace,
}

impl ArgStyle {
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            ArgStyle::Bracket => ("[", "]"),
            ArgStyle::Brace => ("{", "}"),
        }
    }

    /// Wrap `title` in this style's delimiters.
    pub fn wrap(self, title: &str) -> String {
        let (open, close) = self.delimiters();
        format!("{}{}{}", open, title, close)
    }
}

/// One target environment and the Word idioms that produce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentDescriptor {
    /// LaTeX environment name. Default: the mapping key
    #[serde(alias = "env_name")]
    pub name: String,
    /// Word-side keyword, e.g. `theo` for `theorem`. Default: `name`
    #[serde(alias = "name_alt")]
    pub alias: Option<String>,
    /// Legacy start marker
    pub start: Option<String>,
    /// Legacy end marker
    pub end: Option<String>,
    /// Command wrapped around the legacy markers, `\enc{start}`
    pub encapsulation: Option<String>,
    /// Legacy start marker must follow a newline
    pub initial_newline: bool,
    /// Higher priorities are rewritten first. Default: 3
    pub priority: i32,
    /// Whether the environment takes a title argument
    #[serde(alias = "extra_args")]
    pub has_extra_args: bool,
    /// Title delimiters. Default: brace
    #[serde(alias = "extra_args_type")]
    pub args: ArgStyle,
    /// Emitted before `\begin{env}`
    #[serde(alias = "env_prefix")]
    pub prefix: String,
    /// Emitted after the title argument
    #[serde(alias = "env_suffix")]
    pub suffix: String,
    /// Emitted between `\begin{env}` and the title argument
    #[serde(alias = "env_middlefix")]
    pub middlefix: String,
}

impl Default for EnvironmentDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            alias: None,
            start: None,
            end: None,
            encapsulation: None,
            initial_newline: false,
            priority: 3,
            has_extra_args: false,
            args: ArgStyle::Brace,
            prefix: String::new(),
            suffix: String::new(),
            middlefix: String::new(),
        }
    }
}

impl EnvironmentDescriptor {
    /// Descriptor for `name` with every other field at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse the compact declaration syntax (see the module docs).
    ///
    /// Compact descriptors always take a title argument and have priority 0.
    ///
    /// # Errors
    ///
    /// [`RepairError::InvalidDescriptor`] on an empty name or more than one `!`.
    pub fn from_compact(declaration: &str) -> RepairResult<Self> {
        let declaration = declaration.trim();
        let bracket = declaration.find("[]").unwrap_or(declaration.len());
        let brace = declaration.find("{}").unwrap_or(declaration.len());
        let args = if bracket <= brace {
            ArgStyle::Bracket
        } else {
            ArgStyle::Brace
        };
        let split = bracket.min(brace);
        let mut head = &declaration[..split];
        let suffix = declaration.get(split + 2..).unwrap_or("");

        let mut middlefix = "";
        if head.ends_with(']') {
            if let Some(open) = head.find('[') {
                middlefix = &head[open..];
                head = &head[..open];
            }
        }

        let parts: Vec<&str> = head.split('!').collect();
        let (alias, name) = match parts.as_slice() {
            [name] => (None, name.trim()),
            [alias, name] => (Some(alias.trim().to_string()), name.trim()),
            _ => return Err(RepairError::descriptor(declaration, "more than one '!'")),
        };
        if name.is_empty() {
            return Err(RepairError::descriptor(declaration, "missing environment name"));
        }

        Ok(Self {
            name: name.to_lowercase(),
            alias: alias.filter(|a| !a.is_empty()),
            priority: 0,
            has_extra_args: true,
            args,
            suffix: suffix.to_string(),
            middlefix: middlefix.to_string(),
            ..Self::default()
        })
    }

    /// Name used in `\begin{..}`.
    pub fn env_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Word-side keyword, as declared.
    pub fn keyword(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ => &self.name,
        }
    }

    /// Keyword with its first letter upper-cased, as it opens a paragraph.
    pub fn capitalized_keyword(&self) -> String {
        let keyword = self.keyword();
        let mut chars = keyword.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Middlefix as emitted; the `[EMPTY]` sentinel renders as nothing.
    pub fn middlefix_text(&self) -> &str {
        if self.middlefix == EMPTY_MIDDLEFIX {
            ""
        } else {
            &self.middlefix
        }
    }

    /// Whether a bracket title may follow the middlefix.
    pub(crate) fn accepts_title(&self) -> bool {
        self.args == ArgStyle::Brace || self.middlefix.is_empty()
    }

    /// Effective legacy start marker, wrapped in the encapsulation command.
    pub fn start_marker(&self) -> Option<String> {
        self.start.as_deref().map(|m| self.encapsulate(m))
    }

    /// Effective legacy end marker.
    pub fn end_marker(&self) -> Option<String> {
        self.end.as_deref().map(|m| self.encapsulate(m))
    }

    fn encapsulate(&self, marker: &str) -> String {
        match self.encapsulation.as_deref() {
            Some(cmd) if !cmd.is_empty() => format!("\\{}{{{}}}", cmd, marker),
            _ => marker.to_string(),
        }
    }
}

// =============================================================================
// Descriptor sets
// =============================================================================

/// Descriptors in rewrite order: highest priority first, declaration order
/// among equals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSet {
    descriptors: Vec<EnvironmentDescriptor>,
}

impl EnvironmentSet {
    /// # Errors
    ///
    /// [`RepairError::InvalidDescriptor`] when two descriptors share a name
    /// (compared case-insensitively) or a name is empty.
    pub fn new(mut descriptors: Vec<EnvironmentDescriptor>) -> RepairResult<Self> {
        let mut seen = FxHashSet::default();
        for descriptor in &descriptors {
            let name = descriptor.env_name();
            if name.is_empty() {
                return Err(RepairError::descriptor(&descriptor.name, "missing environment name"));
            }
            if !seen.insert(name) {
                return Err(RepairError::descriptor(&descriptor.name, "environment declared twice"));
            }
        }
        descriptors.sort_by_key(|d| std::cmp::Reverse(d.priority));
        debug!(count = descriptors.len(), "environment set built");
        Ok(Self { descriptors })
    }

    /// Parse a list of compact declarations.
    pub fn from_compact<S: AsRef<str>>(declarations: &[S]) -> RepairResult<Self> {
        let descriptors = declarations
            .iter()
            .map(|d| EnvironmentDescriptor::from_compact(d.as_ref()))
            .collect::<RepairResult<Vec<_>>>()?;
        Self::new(descriptors)
    }

    /// Build from the mapping form; an empty `name` is taken from its key.
    pub fn from_mapping(mapping: IndexMap<String, EnvironmentDescriptor>) -> RepairResult<Self> {
        let descriptors = mapping
            .into_iter()
            .map(|(key, mut descriptor)| {
                if descriptor.name.is_empty() {
                    descriptor.name = key;
                }
                descriptor
            })
            .collect();
        Self::new(descriptors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Environment declarations as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentConfig {
    /// `["theo!theorem[]", "definition{}"]`
    Compact(Vec<String>),
    /// `{"theorem": {"alias": "theo", "args": "bracket", ...}}`
    Mapping(IndexMap<String, EnvironmentDescriptor>),
}

impl EnvironmentConfig {
    pub fn to_set(&self) -> RepairResult<EnvironmentSet> {
        match self {
            EnvironmentConfig::Compact(list) => EnvironmentSet::from_compact(list),
            EnvironmentConfig::Mapping(map) => EnvironmentSet::from_mapping(map.clone()),
        }
    }
}

// =============================================================================
// Rewriting
// =============================================================================

/// Which optional detectors [`rewrite_environments`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOptions {
    /// Turn one-cell longtables into `framed` boxes
    pub framed: bool,
    /// Also wrap text between legacy start/end markers
    pub legacy: bool,
}

/// Run every detector for every descriptor.
///
/// Order: framed boxes, table form, quote form, bold lead-ins (descriptors
/// with a title argument only), then legacy markers.
pub fn rewrite_environments(text: &str, set: &EnvironmentSet, options: &EnvironmentOptions) -> RepairResult<String> {
    let mut text = if options.framed {
        framed(text)
    } else {
        text.to_string()
    };
    for descriptor in set.iter() {
        text = longtable_environment(&text, descriptor)?;
    }
    for descriptor in set.iter() {
        text = quote_to_environment(&text, descriptor)?;
    }
    for descriptor in set.iter().filter(|d| d.has_extra_args) {
        text = bold_lead_in_environment(&text, descriptor)?;
    }
    if options.legacy {
        for descriptor in set.iter() {
            text = marker_environment(&text, descriptor);
        }
    }
    Ok(text)
}
