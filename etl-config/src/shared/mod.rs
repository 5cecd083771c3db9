//! Shared configuration structures for the ingestion pipeline.

mod bigquery;
mod dataset;
mod extract;
mod ingestor;
mod normalize;
mod source;

pub use bigquery::*;
pub use dataset::*;
pub use extract::*;
pub use ingestor::*;
pub use normalize::*;
pub use source::*;

use thiserror::Error;

/// Errors raised when validating configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside its allowed domain.
    #[error("invalid value for field `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },

    /// A required section or entry is missing entirely.
    #[error("missing required configuration: {0}")]
    MissingRequired(String),
}
