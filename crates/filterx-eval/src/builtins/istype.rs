//! `istype(obj, "typename")` (§4.4), grounded on `func-istype.c`.
//!
//! Build-time: validates exactly two arguments, requires the second to be
//! a literal string (`filterx_expr_is_literal` + `_extract_type` in the
//! source), and resolves it in the [`crate::types::TypeRegistry`] —
//! unknown names fail construction, they are never deferred to eval time.
//! Runtime: walks `obj`'s super-type chain via [`crate::object::Object::is_type`].

use super::{arity_error, expect_literal_string};
use crate::ast::{Expr, IsTypeTarget};
use crate::error::EvalResult;
use crate::object::Object;
use crate::types::{TypeRegistry, OBJECT_PSEUDO_TYPE};
use filterx_types::{ErrorCode, FilterxError, Span};

pub fn build(mut args: Vec<Expr>, registry: &TypeRegistry, span: Span) -> Result<Expr, FilterxError> {
    if args.len() != 2 {
        return Err(arity_error("istype", 2, args.len(), span));
    }
    let type_expr = args.remove(1);
    let obj_expr = args.remove(0);
    let name = expect_literal_string(&type_expr, "istype", span)?;

    let target = if name == OBJECT_PSEUDO_TYPE {
        IsTypeTarget::Object
    } else if let Some(tag) = registry.lookup(&name) {
        IsTypeTarget::Type(tag)
    } else {
        return Err(FilterxError::new(
            "istype",
            ErrorCode::UNKNOWN_TYPE_NAME,
            format!("unknown type name '{name}'"),
            span,
            "",
        ));
    };

    Ok(Expr::IsType {
        obj: Box::new(obj_expr),
        target,
    })
}

pub fn eval(obj: &Object, target: IsTypeTarget) -> EvalResult<Object> {
    let result = match target {
        IsTypeTarget::Object => obj.type_tag().is_object(),
        IsTypeTarget::Type(t) => obj.is_type(t),
    };
    Ok(Object::boolean(result))
}
