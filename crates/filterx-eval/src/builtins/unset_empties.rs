//! `unset_empties(obj, recursive=true, string=true, number=true, null=true,
//! dict=true, list=true)` (§4.4), grounded on `func-unset-empties.c`.
//!
//! Build time validates exactly one positional argument and that every
//! named flag, if present, is a boolean literal (`_extract_optional_literal_
//! bool_arg` in the source). Runtime recurses into nested containers first
//! (when `recursive`), then collects the keys/indices to drop during one
//! pass and mutates in a second pass — the source does this specifically to
//! avoid invalidating the iterator it's walking, and lists are walked
//! backward (`len-1` down to `0`) for the same reason on an index-based
//! structure.
//!
//! The §9 Open Question ("silently skips sub-errors past the first... the
//! spec treats the first error as fatal") is implemented literally: the
//! first `unset_key`/`unset_index` failure short-circuits the whole call.

use super::{arity_error, expect_literal_bool, find_named};
use crate::ast::Expr;
use crate::error::EvalResult;
use crate::object::Object;
use crate::scope::EvalScope;
use crate::types::TypeTag;
use filterx_types::{FilterxError, Span};

pub struct UnsetEmptiesFlags {
    pub recursive: bool,
    pub drop_strings: bool,
    pub drop_numbers: bool,
    pub drop_nulls: bool,
    pub drop_dicts: bool,
    pub drop_lists: bool,
}

pub fn build(mut args: Vec<Expr>, named: Vec<(String, Expr)>, span: Span) -> Result<Expr, FilterxError> {
    if args.len() != 1 {
        return Err(arity_error("unset_empties", 1, args.len(), span));
    }
    let obj_expr = args.remove(0);

    let flag = |n: &str| -> Result<bool, FilterxError> {
        match find_named(&named, n) {
            Some(e) => expect_literal_bool(e, "unset_empties", span),
            None => Ok(true),
        }
    };

    Ok(Expr::UnsetEmpties {
        obj: Box::new(obj_expr),
        recursive: flag("recursive")?,
        drop_strings: flag("string")?,
        drop_numbers: flag("number")?,
        drop_nulls: flag("null")?,
        drop_dicts: flag("dict")?,
        drop_lists: flag("list")?,
    })
}

fn should_unset(obj: &Object, flags: &UnsetEmptiesFlags) -> EvalResult<bool> {
    Ok(match obj.type_tag() {
        TypeTag::String => flags.drop_strings && obj.len()? == 0,
        TypeTag::Integer | TypeTag::Double => flags.drop_numbers && obj.numeric_value() == 0.0,
        TypeTag::Null => flags.drop_nulls,
        TypeTag::JsonObject => flags.drop_dicts && obj.len()? == 0,
        TypeTag::JsonArray => flags.drop_lists && obj.len()? == 0,
        _ => false,
    })
}

fn process_dict(obj: &Object, flags: &UnsetEmptiesFlags, scope: &mut EvalScope) -> EvalResult<()> {
    let keys = obj.dict_keys()?;
    let mut to_unset = Vec::new();
    for key in keys {
        let child = obj.getattr(&key, scope)?;
        if flags.recursive {
            match child.type_tag() {
                TypeTag::JsonObject => process_dict(&child, flags, scope)?,
                TypeTag::JsonArray => process_list(&child, flags, scope)?,
                _ => {}
            }
        }
        if should_unset(&child, flags)? {
            to_unset.push(key);
        }
    }
    for key in to_unset {
        obj.unset_key(&key)?;
    }
    Ok(())
}

fn process_list(obj: &Object, flags: &UnsetEmptiesFlags, scope: &mut EvalScope) -> EvalResult<()> {
    let len = obj.len()? as i64;
    for idx in (0..len).rev() {
        let child = obj.get_subscript(idx, scope)?;
        if flags.recursive {
            match child.type_tag() {
                TypeTag::JsonObject => process_dict(&child, flags, scope)?,
                TypeTag::JsonArray => process_list(&child, flags, scope)?,
                _ => {}
            }
        }
        if should_unset(&child, flags)? {
            obj.unset_index(idx)?;
        }
    }
    Ok(())
}

pub fn eval(obj: &Object, flags: &UnsetEmptiesFlags, scope: &mut EvalScope) -> EvalResult<Object> {
    match obj.type_tag() {
        TypeTag::JsonObject => process_dict(obj, flags, scope)?,
        TypeTag::JsonArray => process_list(obj, flags, scope)?,
        other => {
            return Err(crate::error::EvalError::TypeMismatch(format!(
                "unset_empties requires a dict or list, got {}",
                other.name()
            )))
        }
    }
    Ok(Object::boolean(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::format_json::format_json;

    fn flags() -> UnsetEmptiesFlags {
        UnsetEmptiesFlags {
            recursive: true,
            drop_strings: true,
            drop_numbers: true,
            drop_nulls: true,
            drop_dicts: true,
            drop_lists: true,
        }
    }

    #[test]
    fn s4_recursive_unset_empties() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a":0,"b":{"c":""},"d":[0]}"#).unwrap();
        let obj = crate::container::json_value_to_object(&json);
        let mut scope = EvalScope::default();
        eval(&obj, &flags(), &mut scope).unwrap();
        assert_eq!(format_json(&obj), "{}");
    }

    #[test]
    fn invariant_12_idempotent() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a":0,"b":"x"}"#).unwrap();
        let obj = crate::container::json_value_to_object(&json);
        let mut scope = EvalScope::default();
        eval(&obj, &flags(), &mut scope).unwrap();
        let once = format_json(&obj);
        eval(&obj, &flags(), &mut scope).unwrap();
        let twice = format_json(&obj);
        assert_eq!(once, twice);
    }
}
