//! Type-cast functions: `string`, `bytes`, `protobuf`, `integer`, `double`,
//! `boolean` (§4.4, §6.3 cast-target matrix). All take exactly one
//! argument; wrong arity fails at construction, never at eval time.

use super::arity_error;
use crate::ast::{CastTarget, Expr};
use crate::error::{EvalError, EvalResult};
use crate::object::Object;
use crate::types::TypeTag;
use filterx_types::{FilterxError, Span};

pub fn build(target: CastTarget, mut args: Vec<Expr>, span: Span) -> Result<Expr, FilterxError> {
    if args.len() != 1 {
        return Err(arity_error(cast_name(target), 1, args.len(), span));
    }
    Ok(Expr::Cast {
        target,
        arg: Box::new(args.remove(0)),
    })
}

fn cast_name(target: CastTarget) -> &'static str {
    match target {
        CastTarget::String => "string",
        CastTarget::Bytes => "bytes",
        CastTarget::Protobuf => "protobuf",
        CastTarget::Integer => "integer",
        CastTarget::Double => "double",
        CastTarget::Boolean => "boolean",
    }
}

/// Runtime cast evaluation (§6.3). Casts that cannot be performed fail —
/// they never return `null` as a "couldn't convert" sentinel.
pub fn eval(target: CastTarget, obj: &Object) -> EvalResult<Object> {
    match target {
        CastTarget::String => Ok(Object::string(obj.repr())),
        CastTarget::Bytes => match obj.type_tag() {
            TypeTag::String | TypeTag::Bytes | TypeTag::Protobuf => {
                Ok(Object::bytes(obj.as_bytes().expect("string/bytes/protobuf always has bytes")))
            }
            other => Err(no_conversion("bytes", other)),
        },
        CastTarget::Protobuf => match obj.type_tag() {
            TypeTag::Bytes | TypeTag::Protobuf => {
                Ok(Object::protobuf(obj.as_bytes().expect("bytes/protobuf always has bytes")))
            }
            other => Err(no_conversion("protobuf", other)),
        },
        CastTarget::Integer => cast_integer(obj),
        CastTarget::Double => cast_double(obj),
        CastTarget::Boolean => Ok(Object::boolean(match obj.type_tag() {
            TypeTag::Null => false,
            _ => obj.truthy(),
        })),
    }
}

fn no_conversion(target: &'static str, source: TypeTag) -> EvalError {
    EvalError::NoConversion {
        target,
        source: source.name(),
    }
}

fn cast_integer(obj: &Object) -> EvalResult<Object> {
    match obj.type_tag() {
        TypeTag::Integer => Ok(obj.clone()),
        TypeTag::Double => Ok(Object::integer(round_half_to_even(obj.numeric_value()))),
        TypeTag::String => parse_integer_literal(&obj.repr())
            .map(Object::integer)
            .ok_or(EvalError::TypeMismatch(format!(
                "'{}' is not a valid integer literal",
                obj.repr()
            ))),
        other => Err(no_conversion("integer", other)),
    }
}

fn cast_double(obj: &Object) -> EvalResult<Object> {
    match obj.type_tag() {
        TypeTag::Integer | TypeTag::Double => Ok(Object::double(obj.numeric_value())),
        TypeTag::String => obj
            .repr()
            .trim()
            .parse::<f64>()
            .map(Object::double)
            .map_err(|_| EvalError::TypeMismatch(format!("'{}' is not a valid double literal", obj.repr()))),
        other => Err(no_conversion("double", other)),
    }
}

fn round_half_to_even(d: f64) -> i64 {
    d.round_ties_even() as i64
}

/// Accepts base-10 or `0x`-prefixed integers; a leading `+`/`-` and leading
/// zeros are fine; a decimal point fails (invariant 13).
fn parse_integer_literal(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.contains('.') {
        return None;
    }
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1i64, r),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok().map(|v| sign * v)
    } else {
        rest.parse::<i64>().ok().map(|v| sign * v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_cast_rejects_decimal_point() {
        assert!(parse_integer_literal("3.5").is_none());
    }

    #[test]
    fn integer_cast_accepts_hex_and_signs() {
        assert_eq!(parse_integer_literal("0x1F"), Some(31));
        assert_eq!(parse_integer_literal("-007"), Some(-7));
        assert_eq!(parse_integer_literal("+42"), Some(42));
    }

    #[test]
    fn invariant_11_bytes_string_hex_roundtrip() {
        let original = Object::bytes(b"hi".to_vec());
        let as_string = eval(CastTarget::String, &original).unwrap();
        assert_eq!(as_string.repr(), "6869");

        let s = Object::string("hello".to_string());
        let back = eval(CastTarget::Bytes, &s).unwrap();
        assert_eq!(back.as_bytes().unwrap(), b"hello".to_vec());
    }
}
