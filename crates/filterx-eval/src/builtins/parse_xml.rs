//! `parse_xml(string)` (§4.4, §6.5): converts XML into a nested dict
//! following the attribute-handling and repeated-element promotion rules in
//! §6.5. `parse_xml` is a simple callable (§4.3.8 shape (a)) — no
//! construction-time literal validation, just a runtime conversion.
//!
//! Implemented as a streaming pass over `quick_xml` events that builds a
//! `serde_json::Value` tree bottom-up (each element's final value — string
//! leaf or child dict — is known by the time its `End` event arrives), which
//! sidesteps the original scanner's need for a mutable string placeholder
//! that gets converted to a dict in place once a child shows up: building
//! bottom-up just defers the choice until we already know the answer.

use crate::error::{EvalError, EvalResult};
use crate::object::Object;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

enum FrameContent {
    Text(String),
    Children(Map<String, Value>),
}

struct Frame {
    attrs: Value,
    content: FrameContent,
}

fn attrs_to_value(e: &quick_xml::events::BytesStart) -> EvalResult<Value> {
    let mut map = Map::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| EvalError::ParseError(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| EvalError::ParseError(err.to_string()))?
            .into_owned();
        map.insert(key, Value::String(value));
    }
    Ok(if map.is_empty() { Value::Null } else { Value::Object(map) })
}

/// Inserts one finished element's `(value, attrs)` into its parent map per
/// the not-seen / seen-once / seen-many promotion rules in §6.5.
fn insert_element(parent: &mut Map<String, Value>, name: &str, value: Value, attrs_val: Value) {
    let attrs_key = format!("{name}.attrs");
    match parent.get(name).cloned() {
        None => {
            parent.insert(name.to_string(), value);
            if !matches!(attrs_val, Value::Null) {
                parent.insert(attrs_key, attrs_val);
            }
        }
        Some(Value::Array(mut arr)) => {
            arr.push(value);
            parent.insert(name.to_string(), Value::Array(arr));
            let mut attr_arr = match parent.get(&attrs_key).cloned() {
                Some(Value::Array(a)) => a,
                _ => Vec::new(),
            };
            attr_arr.push(attrs_val);
            parent.insert(attrs_key, Value::Array(attr_arr));
        }
        Some(existing) => {
            let prev_attrs = parent.remove(&attrs_key).unwrap_or(Value::Null);
            parent.insert(name.to_string(), Value::Array(vec![existing, value]));
            parent.insert(attrs_key, Value::Array(vec![prev_attrs, attrs_val]));
        }
    }
}

fn parse_xml_to_map(xml: &str) -> EvalResult<Map<String, Value>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = Map::new();
    let mut stack: Vec<(String, Frame)> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| EvalError::ParseError(e.to_string()))? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = attrs_to_value(&e)?;
                if let Some((_, parent)) = stack.last_mut() {
                    if let FrameContent::Text(_) = parent.content {
                        parent.content = FrameContent::Children(Map::new());
                    }
                }
                stack.push((
                    name,
                    Frame {
                        attrs,
                        content: FrameContent::Text(String::new()),
                    },
                ));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = attrs_to_value(&e)?;
                let target = match stack.last_mut() {
                    Some((_, parent)) => {
                        if let FrameContent::Text(_) = parent.content {
                            parent.content = FrameContent::Children(Map::new());
                        }
                        match &mut parent.content {
                            FrameContent::Children(m) => m,
                            FrameContent::Text(_) => unreachable!(),
                        }
                    }
                    None => &mut root,
                };
                insert_element(target, &name, Value::String(String::new()), attrs);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| EvalError::ParseError(e.to_string()))?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if let Some((_, frame)) = stack.last_mut() {
                        if let FrameContent::Text(s) = &mut frame.content {
                            s.push_str(trimmed);
                        }
                    }
                }
            }
            Event::End(_) => {
                let (name, frame) = match stack.pop() {
                    Some(f) => f,
                    None => continue,
                };
                let value = match frame.content {
                    FrameContent::Text(s) => Value::String(s),
                    FrameContent::Children(m) => Value::Object(m),
                };
                let target = match stack.last_mut() {
                    Some((_, parent)) => match &mut parent.content {
                        FrameContent::Children(m) => m,
                        FrameContent::Text(_) => unreachable!("parent was promoted to Children before push"),
                    },
                    None => &mut root,
                };
                insert_element(target, &name, value, frame.attrs);
            }
            _ => {}
        }
    }

    Ok(root)
}

pub fn eval(input: &str) -> EvalResult<Object> {
    let map = parse_xml_to_map(input)?;
    Ok(Object::dict_from_json(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::format_json::format_json;
    use crate::scope::EvalScope;

    #[test]
    fn leaf_and_attrs() {
        let obj = eval(r#"<root><a x="1">hi</a></root>"#).unwrap();
        let mut scope = EvalScope::default();
        let root = obj.getattr("root", &mut scope).unwrap();
        assert_eq!(root.getattr("a", &mut scope).unwrap().repr(), "hi");
        let attrs = root.getattr("a.attrs", &mut scope).unwrap();
        assert_eq!(attrs.getattr("x", &mut scope).unwrap().repr(), "1");
    }

    #[test]
    fn repeated_elements_promote_to_list() {
        let obj = eval(r#"<root><a>1</a><a>2</a><a>3</a></root>"#).unwrap();
        let mut scope = EvalScope::default();
        let root = obj.getattr("root", &mut scope).unwrap();
        let a = root.getattr("a", &mut scope).unwrap();
        assert_eq!(a.len().unwrap(), 3);
        assert_eq!(a.get_subscript(0, &mut scope).unwrap().repr(), "1");
        assert_eq!(a.get_subscript(2, &mut scope).unwrap().repr(), "3");
    }

    #[test]
    fn format_json_round_trips_to_valid_json() {
        let obj = eval(r#"<root><a x="1">hi</a><a>bye</a></root>"#).unwrap();
        let text = format_json(&obj);
        let _: serde_json::Value = serde_json::from_str(&text).expect("must parse back as JSON");
    }
}
