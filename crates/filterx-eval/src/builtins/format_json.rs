//! `format_json(obj)` (§4.4, §6.4): RFC-8259 serialization.
//!
//! [`crate::object::Object::map_to_json`] already applies every conversion
//! rule in §6.4 (bytes/protobuf to base64, datetime to its canonical
//! textual form, message-value unmarshaled and recursed into, dict/list in
//! iteration order via the `preserve_order` `serde_json::Map`); this just
//! hands the resulting DOM to `serde_json` for text rendering, which
//! applies the same minimal-escaping/control-char/`\uXXXX` rules §6.4
//! calls for.

use crate::object::Object;

pub fn format_json(obj: &Object) -> String {
    serde_json::to_string(&obj.map_to_json()).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::EvalScope;

    #[test]
    fn scalars_serialize_per_rules() {
        assert_eq!(format_json(&Object::null()), "null");
        assert_eq!(format_json(&Object::boolean(true)), "true");
        assert_eq!(format_json(&Object::integer(-7)), "-7");
        assert_eq!(format_json(&Object::string("hi".to_string())), "\"hi\"");
    }

    #[test]
    fn dict_preserves_insertion_order() {
        let mut scope = EvalScope::default();
        let dict = Object::empty_dict();
        dict.setattr("z", Object::integer(1), &mut scope).unwrap();
        dict.setattr("a", Object::integer(2), &mut scope).unwrap();
        assert_eq!(format_json(&dict), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn list_preserves_index_order() {
        let mut scope = EvalScope::default();
        let list = Object::empty_list();
        list.append(Object::integer(1), &mut scope).unwrap();
        list.append(Object::integer(2), &mut scope).unwrap();
        assert_eq!(format_json(&list), "[1,2]");
    }
}
