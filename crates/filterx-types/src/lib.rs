//! Shared types for filterx.
//!
//! This crate defines the source-span type and the construction-time error
//! taxonomy shared between the expression builder and the evaluator crate.

mod error;
mod span;

pub use error::{ConstructionErrors, ErrorCategory, ErrorCode, FilterxError, Severity};
pub use span::{SourceFile, Span};

/// Result type used for expression construction.
pub type Result<T> = std::result::Result<T, FilterxError>;
