//! `cache_json_file("/path")` (§4.4): the only built-in whose work happens
//! entirely at construction time. The file is read, parsed as JSON,
//! converted to a filterx object, frozen and marked readonly, and baked
//! into the [`crate::ast::Expr::CachedJson`] node — every evaluation just
//! hands back the same cached object, no I/O at message time (§5
//! "long-running steps happen at build time").

use super::{arity_error, expect_literal_string};
use crate::ast::Expr;
use crate::container::json_value_to_object;
use filterx_types::{ErrorCode, FilterxError, Span};

pub fn build(args: Vec<Expr>, span: Span) -> Result<Expr, FilterxError> {
    if args.len() != 1 {
        return Err(arity_error("cache_json_file", 1, args.len(), span));
    }
    let path = expect_literal_string(&args[0], "cache_json_file", span)?;

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        FilterxError::new(
            "cache_json_file",
            ErrorCode::FILE_READ_FAILED,
            format!("failed to read '{path}': {e}"),
            span,
            "",
        )
    })?;

    let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
        FilterxError::new(
            "cache_json_file",
            ErrorCode::FILE_READ_FAILED,
            format!("failed to parse '{path}' as JSON: {e}"),
            span,
            "",
        )
    })?;

    let obj = json_value_to_object(&value);
    obj.freeze();
    Ok(Expr::CachedJson(obj))
}
