use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of construction errors reported before fail-fast.
pub const MAX_ERRORS: usize = 20;

/// Error severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Construction-error category, determined by error code range.
///
/// These correspond to the build-time failure modes a function or operator
/// constructor can raise before any expression is ever evaluated: wrong
/// argument count, an argument that must be a literal but isn't, a type name
/// that doesn't resolve, a cast target filterx has no conversion for, or a
/// malformed separator/flag argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Arity,
    LiteralRequired,
    UnknownType,
    InvalidCast,
    InvalidArgument,
}

/// Numeric error code (E100–E599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Arity errors (E100–E199) ──
    pub const WRONG_ARG_COUNT: Self = Self(100);
    pub const MISSING_REQUIRED_ARG: Self = Self(101);
    pub const TOO_MANY_ARGS: Self = Self(102);

    // ── Literal-required errors (E200–E299) ──
    pub const EXPECTED_LITERAL: Self = Self(200);
    pub const EXPECTED_LITERAL_STRING: Self = Self(201);
    pub const EXPECTED_LITERAL_BOOL: Self = Self(202);

    // ── Unknown-type errors (E300–E399) ──
    pub const UNKNOWN_TYPE_NAME: Self = Self(300);

    // ── Invalid-cast errors (E400–E499) ──
    pub const NO_CONVERSION: Self = Self(400);
    pub const CAST_TARGET_NOT_SCALAR: Self = Self(401);

    // ── Invalid-argument errors (E500–E599) ──
    pub const INVALID_SEPARATOR: Self = Self(500);
    pub const INVALID_FLAG_VALUE: Self = Self(501);
    pub const FILE_READ_FAILED: Self = Self(502);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Arity,
            200..=299 => ErrorCategory::LiteralRequired,
            300..=399 => ErrorCategory::UnknownType,
            400..=499 => ErrorCategory::InvalidCast,
            500..=599 => ErrorCategory::InvalidArgument,
            _ => ErrorCategory::Arity, // fallback
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured construction-time error: raised while a function or
/// operator node is being built, before any expression tree is evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterxError {
    /// Name of the expression (function, operator) the error was raised in.
    pub context: String,
    /// Error code (e.g., E301).
    pub code: ErrorCode,
    /// Error severity.
    pub severity: Severity,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location, when the construction site carries one.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl FilterxError {
    /// Create a new construction error.
    pub fn new(
        context: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for FilterxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}: {}",
            self.span, self.code, self.category, self.context, self.message
        )
    }
}

impl std::error::Error for FilterxError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arity => write!(f, "arity"),
            Self::LiteralRequired => write!(f, "literal-required"),
            Self::UnknownType => write!(f, "unknown-type"),
            Self::InvalidCast => write!(f, "invalid-cast"),
            Self::InvalidArgument => write!(f, "invalid-argument"),
        }
    }
}

/// Aggregated construction errors collected while building an expression
/// tree out of its constituent function/operator nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionErrors {
    pub errors: Vec<FilterxError>,
    pub total_errors: usize,
}

impl ConstructionErrors {
    /// Create an empty result (no errors).
    pub fn empty() -> Self {
        Self {
            errors: Vec::new(),
            total_errors: 0,
        }
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: FilterxError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::WRONG_ARG_COUNT.category(), ErrorCategory::Arity);
        assert_eq!(
            ErrorCode::EXPECTED_LITERAL.category(),
            ErrorCategory::LiteralRequired
        );
        assert_eq!(
            ErrorCode::UNKNOWN_TYPE_NAME.category(),
            ErrorCategory::UnknownType
        );
        assert_eq!(
            ErrorCode::NO_CONVERSION.category(),
            ErrorCategory::InvalidCast
        );
        assert_eq!(
            ErrorCode::INVALID_SEPARATOR.category(),
            ErrorCategory::InvalidArgument
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::WRONG_ARG_COUNT), "E100");
        assert_eq!(format!("{}", ErrorCode::UNKNOWN_TYPE_NAME), "E300");
    }

    #[test]
    fn test_filterx_error_creation() {
        let err = FilterxError::new(
            "istype",
            ErrorCode::UNKNOWN_TYPE_NAME,
            "unknown type name 'frobnicate'",
            Span::new(1, 5, 1, 22),
            "istype(\"$MESSAGE\", \"frobnicate\")",
        );
        assert_eq!(err.code, ErrorCode::UNKNOWN_TYPE_NAME);
        assert_eq!(err.severity, Severity::Error);
        assert_eq!(err.category, ErrorCategory::UnknownType);
    }

    #[test]
    fn test_filterx_error_with_suggestion() {
        let err = FilterxError::new(
            "istype",
            ErrorCode::UNKNOWN_TYPE_NAME,
            "unknown type name 'frobnicate'",
            Span::new(1, 1, 1, 10),
            "istype(x, \"frobnicate\")",
        )
        .with_suggestion("did you mean 'json'?");
        assert_eq!(err.suggestion.as_deref(), Some("did you mean 'json'?"));
    }

    #[test]
    fn test_filterx_error_json_round_trip() {
        let err = FilterxError::new(
            "istype",
            ErrorCode::UNKNOWN_TYPE_NAME,
            "unknown type name 'frobnicate'",
            Span::new(12, 5, 12, 22),
            "istype(x, \"frobnicate\")",
        )
        .with_suggestion("did you mean 'json'?");

        let json = serde_json::to_string_pretty(&err).unwrap();
        assert!(json.contains("\"code\""));
        assert!(json.contains("\"message\""));
        assert!(json.contains("\"source_line\""));
        assert!(json.contains("\"suggestion\""));
        assert!(json.contains("\"start_line\""));

        let deserialized: FilterxError = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.code, err.code);
        assert_eq!(deserialized.message, err.message);
    }

    #[test]
    fn test_construction_errors_max_limit() {
        let mut errs = ConstructionErrors::empty();
        for i in 0..25 {
            errs.push_error(FilterxError::new(
                "cast",
                ErrorCode::NO_CONVERSION,
                format!("error {i}"),
                Span::point(i as u32 + 1, 1),
                "",
            ));
        }
        assert_eq!(errs.errors.len(), 20);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.has_errors());
    }

    #[test]
    fn test_construction_errors_empty() {
        let errs = ConstructionErrors::empty();
        assert!(!errs.has_errors());
        assert_eq!(errs.total_errors, 0);
    }

    #[test]
    fn test_error_determinism_100_iterations() {
        let first = FilterxError::new(
            "cast",
            ErrorCode::NO_CONVERSION,
            "no conversion from list to int",
            Span::new(12, 5, 12, 22),
            "int(x)",
        );
        let first_json = serde_json::to_string(&first).unwrap();

        for i in 0..100 {
            let err = FilterxError::new(
                "cast",
                ErrorCode::NO_CONVERSION,
                "no conversion from list to int",
                Span::new(12, 5, 12, 22),
                "int(x)",
            );
            let json = serde_json::to_string(&err).unwrap();
            assert_eq!(first_json, json, "Determinism failure at iteration {i}");
        }
    }
}
