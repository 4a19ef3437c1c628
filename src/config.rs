//! Repair configuration
//!
//! [`RepairOptions`] gathers the settings of every pass. It deserialises
//! from JSON with every field optional:
//!
//! ```json
//! {
//!   "environments": ["theo!theorem[]", "definition{}"],
//!   "tables": { "max_page_len": 40 },
//!   "section_limit": 3,
//!   "listing_plugin": "minted"
//! }
//! ```

use crate::core::align::{AlignOptions, CommentMode, EquationOptions};
use crate::core::environments::{EnvironmentConfig, EnvironmentOptions};
use crate::core::figures::FigureOptions;
use crate::core::tables::TableOptions;
use crate::features::citations::CitationOptions;
use crate::features::verbatim::ListingPlugin;
use crate::utils::error::RepairResult;
use serde::{Deserialize, Serialize};

// =============================================================================
// Repair Options
// =============================================================================

/// Options for a whole-document repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairOptions {
    /// Environments recognised in the text
    /// Default: none
    pub environments: EnvironmentConfig,

    /// Optional environment detectors
    pub environment_options: EnvironmentOptions,

    /// Longtable conversion
    pub tables: TableOptions,

    /// Graphics, figure captions and `Figure N` references
    pub figures: FigureOptions,

    /// Alignment region comments and labels
    pub align: AlignOptions,

    /// Insert `&` at the main operator of each aligned line
    /// Default: true
    pub auto_align: bool,

    /// Split aligned lines longer than this; `None` keeps them whole
    /// Default: 80
    pub max_line_len: Option<usize>,

    /// Split display equations longer than this; `None` keeps them whole
    /// Default: 80
    pub max_equation_len: Option<usize>,

    /// Numbering of display equations
    pub equations: EquationOptions,

    /// BibTeX source used to resolve hand-written citations
    /// Default: none, citations are left alone
    pub bibliography: Option<String>,

    pub citations: CitationOptions,

    /// Strip `%` comments
    /// Default: true
    pub remove_comments: bool,

    /// Replace Word's `Contents` section by `\tableofcontents`
    /// Default: true
    pub table_of_contents: bool,

    /// Wrap a leading `Abstract` paragraph in `abstract`
    /// Default: true
    pub wrap_abstract: bool,

    /// Turn `\emph{Proof.}` paragraphs into `proof` environments
    /// Default: true
    pub proofs: bool,

    /// Deepest heading level kept, counted from 1 as in Word
    /// Default: none
    pub section_limit: Option<usize>,

    /// Move every heading up this many levels (-1 makes sections chapters)
    /// Default: 0
    pub section_shift: i32,

    /// Merge adjacent `\texttt` runs and plain their punctuation
    /// Default: true
    pub fix_texttt: bool,

    /// Typeset the word `LaTeX` as `\LaTeX{}`
    /// Default: true
    pub latexing: bool,

    /// Write math with `$`/`$$` instead of `\(`/`\[`
    /// Default: false
    pub dollar_signs: bool,

    /// Environment for verbatim blocks with a known language
    /// Default: none, blocks stay `verbatim`
    pub listing_plugin: ListingPlugin,

    /// Language for verbatim blocks without a language tag
    pub listing_language: String,

    /// Extra options for every listing, e.g. `linenos`
    pub listing_params: String,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            environments: EnvironmentConfig::Compact(Vec::new()),
            environment_options: EnvironmentOptions::default(),
            tables: TableOptions::default(),
            figures: FigureOptions::default(),
            align: AlignOptions::default(),
            auto_align: true,
            max_line_len: Some(80),
            max_equation_len: Some(80),
            equations: EquationOptions::default(),
            bibliography: None,
            citations: CitationOptions::default(),
            remove_comments: true,
            table_of_contents: true,
            wrap_abstract: true,
            proofs: true,
            section_limit: None,
            section_shift: 0,
            fix_texttt: true,
            latexing: true,
            dollar_signs: false,
            listing_plugin: ListingPlugin::None,
            listing_language: String::new(),
            listing_params: String::new(),
        }
    }
}

impl RepairOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> RepairResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Options for mathematical papers: the usual theorem-like
    /// environments, labelled equations and `\tag` numbering.
    pub fn math_paper() -> Self {
        let environments = [
            "theo!theorem[]",
            "lem!lemma[]",
            "coro!corollary[]",
            "prop!proposition[]",
            "defn!definition[]",
            "example[]",
            "remark[]",
        ];
        Self {
            environments: EnvironmentConfig::Compact(environments.iter().map(|e| e.to_string()).collect()),
            align: AlignOptions {
                comment_mode: CommentMode::Hidden,
                label_equations: true,
            },
            equations: EquationOptions {
                numbered: true,
                label: true,
                tag: true,
            },
            ..Self::default()
        }
    }

    /// Only structural repair: no comment stripping, no `\LaTeX` or
    /// `\texttt` touch-ups, longtables captioned but kept.
    pub fn minimal() -> Self {
        Self {
            tables: TableOptions {
                replace: false,
                ..TableOptions::default()
            },
            remove_comments: false,
            fix_texttt: false,
            latexing: false,
            ..Self::default()
        }
    }
}
