//! # wordtex
//!
//! Structural repair of the LaTeX that pandoc produces from Word documents.
//!
//! Word has no multi-line equations, no theorem environments and no
//! captions in the LaTeX sense, so its exports arrive as garbled alignment
//! regions, bold paragraphs and minipage-wrapped longtables. wordtex finds
//! those patterns in the text and rewrites them as proper LaTeX.
//!
//! ## Example
//!
//! ```
//! use wordtex::{repair_document, RepairOptions};
//!
//! let text = "A\n\\[{a = b}{c = d}\\]\nB";
//! let output = repair_document(text, &RepairOptions::default()).unwrap();
//! assert!(output.content.contains("\\begin{align*}"));
//! assert_eq!(output.report.alignment_regions, 1);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: scanner, region locator, alignment engine, environments, tables, figures
//! - [`features`]: citations, preamble, verbatim listings, Word math, document structure, cleanup
//! - [`config`]: [`RepairOptions`]
//! - [`pipeline`]: [`repair_document`]

pub mod config;
pub mod core;
pub mod features;
pub mod pipeline;
pub mod utils;

pub use config::RepairOptions;
pub use pipeline::repair_document;
pub use utils::{RepairError, RepairOutput, RepairReport, RepairResult, RepairWarning, WarningKind};

pub use crate::core::align::{align_expression, detect_align_region, replace_all_align_regions, split_equation};
pub use crate::core::environments::{rewrite_environments, EnvironmentConfig, EnvironmentDescriptor, EnvironmentSet};
pub use crate::core::figures::{detect_include_graphics, FigureOptions, ImageMode};
pub use crate::core::tables::{eliminate_all_longtables, TableOptions};
pub use features::{conditional_preamble, do_citations, extract_bib_keys, fix_equations};
