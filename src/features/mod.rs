//! Document features beyond the core engine
//!
//! - In-text citations against a BibTeX file
//! - Conditional preamble templates
//! - Verbatim concealment and code listings
//! - Per-equation fixes for Word math
//! - Abstract, table of contents and proofs
//! - Small cleanup passes

pub mod citations;
pub mod cleanup;
pub mod equation_filter;
pub mod preamble;
pub mod structure;
pub mod verbatim;

pub use citations::{do_citations, extract_bib_keys, CitationOptions, CitationStyle};
pub use equation_filter::fix_equations;
pub use preamble::{conditional_preamble, ConditionValue, Conditions};
pub use structure::{abstract_wrapper, qed, toc_detector};
pub use verbatim::{hide_verbatims, show_verbatims, verbatim_to_listing, ListingPlugin, VerbatimStash};
