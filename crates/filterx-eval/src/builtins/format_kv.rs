//! `format_kv(dict, value_separator="=", pair_separator=", ")` (§4.4).
//!
//! Build time: both separators, if given, must be string literals;
//! `value_separator` must be exactly one character, `pair_separator` must
//! be non-empty. Runtime: iterates the dict in insertion order; values
//! whose `repr` contains whitespace (or either separator character) are
//! quoted with minimal escaping; nested dict/list values are skipped
//! (counted on the scope rather than logged — see
//! [`crate::scope::EvalScope::record_kv_value_skipped`]).

use super::{arity_error, find_named};
use crate::ast::Expr;
use crate::error::EvalResult;
use crate::object::Object;
use crate::scope::EvalScope;
use crate::types::TypeTag;
use filterx_types::{ErrorCode, FilterxError, Span};

pub fn build(mut args: Vec<Expr>, named: Vec<(String, Expr)>, span: Span) -> Result<Expr, FilterxError> {
    if args.len() != 1 {
        return Err(arity_error("format_kv", 1, args.len(), span));
    }
    let obj_expr = args.remove(0);

    let value_separator = match find_named(&named, "value_separator") {
        Some(e) => {
            let s = super::expect_literal_string(e, "format_kv", span)?;
            let mut chars = s.chars();
            let c = chars.next().ok_or_else(|| {
                FilterxError::new("format_kv", ErrorCode::INVALID_SEPARATOR, "value_separator must be one character", span, "")
            })?;
            if chars.next().is_some() {
                return Err(FilterxError::new(
                    "format_kv",
                    ErrorCode::INVALID_SEPARATOR,
                    "value_separator must be exactly one character",
                    span,
                    "",
                ));
            }
            c
        }
        None => '=',
    };

    let pair_separator = match find_named(&named, "pair_separator") {
        Some(e) => {
            let s = super::expect_literal_string(e, "format_kv", span)?;
            if s.is_empty() {
                return Err(FilterxError::new(
                    "format_kv",
                    ErrorCode::INVALID_SEPARATOR,
                    "pair_separator must be non-empty",
                    span,
                    "",
                ));
            }
            s
        }
        None => ", ".to_string(),
    };

    Ok(Expr::FormatKv {
        obj: Box::new(obj_expr),
        value_separator,
        pair_separator,
    })
}

fn needs_quoting(s: &str, value_separator: char, pair_separator: &str) -> bool {
    s.chars().any(|c| c.is_whitespace())
        || s.contains(value_separator)
        || s.contains(pair_separator)
        || s.contains('"')
}

fn quote_escaped(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn eval(
    obj: &Object,
    value_separator: char,
    pair_separator: &str,
    scope: &mut EvalScope,
) -> EvalResult<Object> {
    if obj.type_tag() != TypeTag::JsonObject {
        return Err(crate::error::EvalError::TypeMismatch("format_kv requires a dict".into()));
    }
    let keys = obj.dict_keys()?;
    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let value = obj.getattr(&key, scope)?;
        if matches!(value.type_tag(), TypeTag::JsonObject | TypeTag::JsonArray) {
            scope.record_kv_value_skipped();
            continue;
        }
        let repr = value.repr();
        let rendered = if needs_quoting(&repr, value_separator, pair_separator) {
            quote_escaped(&repr)
        } else {
            repr
        };
        parts.push(format!("{key}{value_separator}{rendered}"));
    }
    Ok(Object::string(parts.join(pair_separator)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_format_kv() {
        let dict = Object::empty_dict();
        let mut scope = EvalScope::default();
        dict.setattr("foo", Object::string("bar".to_string()), &mut scope).unwrap();
        dict.setattr("bar", Object::string("almafa korte\"fa".to_string()), &mut scope).unwrap();
        let result = eval(&dict, '=', ", ", &mut scope).unwrap();
        assert_eq!(result.repr(), r#"foo=bar, bar="almafa korte\"fa""#);
    }
}
