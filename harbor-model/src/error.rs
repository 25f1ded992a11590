use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Resource name failed validation.
    InvalidResourceName { name: String, reason: &'static str },
    /// Endpoint declaration failed validation.
    InvalidEndpoint { name: String, reason: &'static str },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidResourceName { name, reason } => {
                write!(f, "invalid resource name '{name}': {reason}")
            }
            ModelError::InvalidEndpoint { name, reason } => {
                write!(f, "invalid endpoint '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
