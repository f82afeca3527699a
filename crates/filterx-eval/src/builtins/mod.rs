//! Built-in functions (§4.4).
//!
//! The source distinguishes two function-constructor shapes (§4.3.8): a
//! simple callable that just receives evaluated argument objects
//! (`cast`, `format_json`, `parse_xml` here), and a ctor shape that
//! validates literal arguments at *construction* time and bakes the result
//! into a specialized expression node (`istype`, `unset_empties`,
//! `cache_json_file`, `format_kv` — each gets its own [`crate::ast::Expr`]
//! variant, built by the functions in this module's submodules).
//!
//! Construction-time validation failures are [`filterx_types::FilterxError`]
//! values; the builder functions never evaluate anything, matching §7's
//! "construction errors are never caught by the runtime — they surface to
//! the host configuration loader."

pub mod cache_json_file;
pub mod cast;
pub mod format_json;
pub mod format_kv;
pub mod istype;
pub mod parse_xml;
pub mod unset_empties;

use crate::ast::Expr;
use crate::object::Object;
use filterx_types::{ErrorCode, FilterxError, Span};

/// Extracts a literal string from an already-built expression, or fails
/// with [`ErrorCode::EXPECTED_LITERAL_STRING`]. Mirrors
/// `filterx_expr_is_literal` + string extraction in the original
/// `func-istype.c`/`func-*` constructors: build-time argument validation
/// only ever looks at `Expr::Literal`, never evaluates.
pub fn expect_literal_string(expr: &Expr, context: &str, span: Span) -> Result<String, FilterxError> {
    match expr {
        Expr::Literal(obj) if obj.type_tag() == crate::types::TypeTag::String => Ok(obj.repr()),
        _ => Err(FilterxError::new(
            context,
            ErrorCode::EXPECTED_LITERAL_STRING,
            "argument must be a literal string",
            span,
            "",
        )),
    }
}

/// Extracts a literal boolean, or fails with
/// [`ErrorCode::EXPECTED_LITERAL_BOOL`]. Used for `unset_empties`'s flag
/// arguments, all of which "must be boolean literals" per §4.4.
pub fn expect_literal_bool(expr: &Expr, context: &str, span: Span) -> Result<bool, FilterxError> {
    match expr {
        Expr::Literal(obj) if obj.type_tag() == crate::types::TypeTag::Boolean => Ok(obj.truthy()),
        _ => Err(FilterxError::new(
            context,
            ErrorCode::EXPECTED_LITERAL_BOOL,
            "argument must be a literal boolean",
            span,
            "",
        )),
    }
}

/// `unset_empties`'s named boolean flags all default to `true` when absent
/// — `find_named` just does the presence check described in §6.2's
/// `get_named_expr`.
pub fn find_named<'a>(named: &'a [(String, Expr)], name: &str) -> Option<&'a Expr> {
    named.iter().find(|(n, _)| n == name).map(|(_, e)| e)
}

pub(crate) fn arity_error(context: &str, expected: usize, got: usize, span: Span) -> FilterxError {
    FilterxError::new(
        context,
        ErrorCode::WRONG_ARG_COUNT,
        format!("expected {expected} argument(s), got {got}"),
        span,
        "",
    )
}

/// Convenience used by every builder below: `Object::string` wrapped as a
/// literal expression, for round-tripping a resolved literal back into the
/// tree when a node still needs the raw expression (not used once a
/// specialized node exists, but kept for `Expr::Call`'s simple-callable
/// path).
pub fn literal_string(s: impl Into<String>) -> Expr {
    Expr::Literal(Object::string(s.into()))
}
