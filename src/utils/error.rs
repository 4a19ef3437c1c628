//! Error handling for wordtex repairs
//!
//! Not finding something is never an error here: scanners return `Option`.
//! `RepairError` is reserved for input that is structurally broken, where the
//! repair of the current document has to stop.

use std::fmt;

/// Repair error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairError {
    /// A `{` without its matching `}` (or the reverse)
    UnbalancedBrace { index: usize },
    /// A scan index past the end of the text
    IndexOutOfBounds { index: usize, len: usize },
    /// `\begin{env}` that never closes
    UnterminatedEnvironment { env: String, index: usize },
    /// An equation or numbering matrix that cannot be repaired
    MalformedEquation { message: String },
    /// A table the longtable transformer cannot take apart
    MalformedTable { message: String },
    /// An environment declaration that cannot be understood
    InvalidDescriptor { declaration: String, message: String },
    /// Invalid input or configuration
    InvalidInput { message: String },
    /// IO error (for file operations)
    IoError { message: String },
}

impl fmt::Display for RepairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairError::UnbalancedBrace { index } => {
                write!(f, "Unbalanced brace: no closing brace for the group at byte {}", index)
            }
            RepairError::IndexOutOfBounds { index, len } => {
                write!(f, "Index {} is out of bounds for text of length {}", index, len)
            }
            RepairError::UnterminatedEnvironment { env, index } => {
                write!(f, "Environment '{}' opened at byte {} is never closed", env, index)
            }
            RepairError::MalformedEquation { message } => {
                write!(f, "Malformed equation: {}", message)
            }
            RepairError::MalformedTable { message } => {
                write!(f, "Malformed table: {}", message)
            }
            RepairError::InvalidDescriptor {
                declaration,
                message,
            } => {
                write!(f, "Invalid environment declaration '{}': {}", declaration, message)
            }
            RepairError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            RepairError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for RepairError {}

impl From<std::io::Error> for RepairError {
    fn from(err: std::io::Error) -> Self {
        RepairError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RepairError {
    fn from(err: serde_json::Error) -> Self {
        RepairError::InvalidInput {
            message: err.to_string(),
        }
    }
}

/// Result type for repair operations
pub type RepairResult<T> = Result<T, RepairError>;

// Convenience constructors for errors
impl RepairError {
    pub fn equation(message: impl Into<String>) -> Self {
        RepairError::MalformedEquation {
            message: message.into(),
        }
    }

    pub fn table(message: impl Into<String>) -> Self {
        RepairError::MalformedTable {
            message: message.into(),
        }
    }

    pub fn descriptor(declaration: impl Into<String>, message: impl Into<String>) -> Self {
        RepairError::InvalidDescriptor {
            declaration: declaration.into(),
            message: message.into(),
        }
    }

    pub fn unterminated(env: impl Into<String>, index: usize) -> Self {
        RepairError::UnterminatedEnvironment {
            env: env.into(),
            index,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        RepairError::InvalidInput {
            message: message.into(),
        }
    }
}
