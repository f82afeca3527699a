//! Runtime error types for the filterx evaluator.
//!
//! Construction-time failures (wrong arity, non-literal where a literal is
//! required, unknown type names, ...) are reported as
//! [`filterx_types::FilterxError`] from the builder functions in
//! [`crate::builtins`]. This module covers failures raised while walking an
//! already-built expression tree against a live scope.

use thiserror::Error;

/// Evaluation error — raised while walking an expression tree.
///
/// An `eval` call that fails returns `Ok(None)` at the API boundary (per the
/// core contract in the external interfaces), with the triggering
/// `EvalError` queued on the [`crate::scope::EvalScope`] so the host can
/// report it with location context. Internally, node implementations just
/// propagate `Err(EvalError)` with `?`.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// A child expression failed; this node has nothing further to add.
    #[error("operand evaluation failed")]
    OperandFailed,

    /// `getattr`/`setattr` on an object that isn't a dict (or dict-like).
    #[error("attribute '{0}' not found")]
    AttributeMissing(String),

    /// `get_subscript`/`set_subscript` index out of range on a list.
    #[error("index {0} out of range (len {1})")]
    IndexOutOfRange(i64, usize),

    /// A mutating operation was attempted on a readonly object.
    #[error("object is readonly")]
    ReadonlyViolation,

    /// A coercion failed and there is no fallback representation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Variable read against an unknown name/prefix.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// A built-in function raised a runtime (not build-time) error.
    #[error("{0}")]
    FunctionError(String),

    /// Failure parsing `parse_xml`/`parse_csv` input at eval time.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A cast target has no conversion from the source type.
    #[error("no conversion to {target} from {source}")]
    NoConversion { target: &'static str, source: &'static str },

    /// The evaluation step budget (`EvalOptions::step_limit`) was exhausted.
    #[error("step limit exceeded")]
    StepLimitExceeded,

    /// Catch-all for conditions not otherwise categorized above.
    #[error("{0}")]
    Runtime(String),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
