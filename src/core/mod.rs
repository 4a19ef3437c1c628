//! Core repair engine
//!
//! Everything here works on byte offsets into the LaTeX text, never on a
//! parsed tree: pandoc output is too irregular to parse reliably, so the
//! passes scan for markers and count nesting as they go.

pub mod align;
pub mod environments;
pub mod figures;
pub mod locate;
pub mod scanner;
pub mod tables;
