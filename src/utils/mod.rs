//! Utility modules
//!
//! This module contains utilities shared by every pass:
//! - Error types and result types
//! - The repair report and its warnings

pub mod error;
pub mod report;

// Re-export commonly used items
pub use error::{RepairError, RepairResult};
pub use report::{RepairOutput, RepairReport, RepairWarning, WarningKind};
