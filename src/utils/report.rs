//! Reporting for recoverable repair problems.
//!
//! Fatal problems abort with [`RepairError`](super::error::RepairError); everything
//! that only degrades the output (a dropped equation comment, a table number that
//! cannot become a label) is collected here instead.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    InvalidEquationComment,
    LongNumberedEquation,
    InvalidTableNumber,
    InvalidFigureNumber,
    MalformedGraphic,
    UnknownLanguage,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairWarning {
    pub kind: WarningKind,
    pub message: String,
    pub snippet: Option<String>,
}

impl RepairWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl fmt::Display for RepairWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Warning: {}", self.message)?;
        if let Some(ref snippet) = self.snippet {
            write!(f, " ({})", snippet)?;
        }
        Ok(())
    }
}

/// Everything a full document repair learned on the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    /// Labels generated from equation comments (`eq:` prefix omitted)
    pub equation_labels: Vec<String>,
    /// Table numbers turned into `table:p` labels
    pub table_labels: Vec<String>,
    /// Figure numbers turned into `fig:p` labels
    pub figure_labels: Vec<String>,
    /// Alignment regions rewritten into `align`/`align*`
    pub alignment_regions: usize,
    /// Whether any verbatim block was turned into a listing
    pub listings_converted: bool,
    pub warnings: Vec<RepairWarning>,
}

impl RepairReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: RepairWarning) {
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Repaired document plus its report.
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutput {
    pub content: String,
    pub report: RepairReport,
}

impl RepairOutput {
    pub fn new(content: String, report: RepairReport) -> Self {
        Self { content, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_kind_serializes_kebab_case() {
        let warning = RepairWarning::new(WarningKind::InvalidEquationComment, "dropped");
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"invalid-equation-comment\""));
    }

    #[test]
    fn report_tracks_warnings() {
        let mut report = RepairReport::new();
        assert!(!report.has_warnings());
        report.warn(RepairWarning::new(WarningKind::Other, "x").with_snippet("\\[x\\]"));
        assert!(report.has_warnings());
        assert_eq!(report.warnings[0].to_string(), "Warning: x (\\[x\\])");
    }
}
