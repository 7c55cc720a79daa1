use thiserror::Error;

use crate::catalog::{Category, Scope};
use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query at '{path}': {message}")]
    InvalidQuery { path: String, message: String },

    #[error("field '{field}' is not supported by category '{category}'")]
    FieldNotSupported {
        path: String,
        category: Category,
        field: String,
    },

    #[error("category '{category}' is not searchable under scope '{scope}'")]
    CategoryNotInScope {
        path: String,
        scope: Scope,
        category: Category,
    },

    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("all {origin} values cannot be null")]
    AllValuesNull { origin: &'static str },

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("composition: {0}")]
    Composition(String),

    #[error("storage: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SearchError {
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidQuery { .. }
            | Self::FieldNotSupported { .. }
            | Self::CategoryNotInScope { .. }
            | Self::TypeMismatch { .. }
            | Self::AllValuesNull { .. }
            | Self::Codec(_) => 400,
            Self::Composition(_) | Self::Storage(_) => 500,
        }
    }

    /// Location of the offending input, when the error can point at one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::InvalidQuery { path, .. }
            | Self::FieldNotSupported { path, .. }
            | Self::CategoryNotInScope { path, .. }
            | Self::TypeMismatch { path, .. } => Some(path),
            Self::AllValuesNull { origin } => Some(origin),
            Self::Codec(_) | Self::Composition(_) | Self::Storage(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
