//! The polymorphic, reference-counted filterx object.
//!
//! The original type descriptor is a table of function pointers, with
//! "inheritance" copying missing slots from a super type at registration
//! (§3.2, §9). Per the re-architecture guidance in §9 we instead model the
//! fixed set of built-in types as a closed enum (`ObjectData`) and dispatch
//! each operation with a `match` — there is exactly one implementation per
//! type (the Open Question about a legacy/new pair is resolved in
//! DESIGN.md: ship one).
//!
//! `Object` wraps `Rc<ObjectCell>` rather than aliasing it directly, so the
//! dispatch operations below can live as inherent methods instead of a
//! scattering of free functions — `Rc<T>` is a foreign type and Rust won't
//! allow inherent impls on a bare alias of it.
//!
//! Reference counting is exactly `Rc`'s own strong count: no atomics, no
//! thread-identity assertion. `Rc<ObjectCell>` is `!Send`/`!Sync`, which
//! already makes cross-thread object sharing a compile error rather than a
//! runtime assertion — the single-thread-per-scope rule from §4.1 falls out
//! of ownership discipline for free, per the §9 design note.

use crate::container::{self, JsonDict, JsonList, PathSegment};
use crate::error::{EvalError, EvalResult};
use crate::scope::EvalScope;
use crate::types::TypeTag;
use chrono::{DateTime, FixedOffset};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Semantic type tag carried by a `message-value`, and the tag half of
/// `marshal`'s `(string, tag)` result pair (§3.2, §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticTag {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    Bytes,
    Protobuf,
    Json,
    List,
    Datetime,
}

/// Type-private payload (§3.2's "type descriptor" collapsed to a closed
/// enum, §9). `Dict`/`List` are the `json_object`/`json_array` concrete
/// implementations of the abstract dict/list super-types — there being
/// only one implementation of each, the enum doesn't need separate
/// abstract-vs-concrete variants.
pub enum ObjectData {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Protobuf(Vec<u8>),
    Datetime(DateTime<FixedOffset>),
    MessageValue { raw: Vec<u8>, tag: SemanticTag },
    Dict(Rc<RefCell<JsonDict>>),
    List(Rc<RefCell<JsonList>>),
}

/// The reference-counted object cell (§3.1). `readonly` and
/// `modified_in_place` are `Cell<bool>` rather than plain fields because
/// readonly propagation and dirty-bit bubbling both mutate them through a
/// shared `&Object` — there is no `&mut` access to an object once it has
/// more than one living reference, which is the common case here.
pub struct ObjectCell {
    pub data: RefCell<ObjectData>,
    pub readonly: Cell<bool>,
    pub modified_in_place: Cell<bool>,
    pub frozen: Cell<bool>,
}

/// A filterx value: `Rc<ObjectCell>` behind a newtype so dispatch methods
/// can be inherent `impl`s.
#[derive(Clone)]
pub struct Object(Rc<ObjectCell>);

impl std::ops::Deref for Object {
    type Target = ObjectCell;
    fn deref(&self) -> &ObjectCell {
        &self.0
    }
}

impl Object {
    fn from_data(data: ObjectData, mutable: bool) -> Self {
        Self(Rc::new(ObjectCell {
            data: RefCell::new(data),
            readonly: Cell::new(!mutable),
            modified_in_place: Cell::new(false),
            frozen: Cell::new(false),
        }))
    }

    /// The `null` singleton. Per §9's re-architecture note, "frozen with a
    /// sentinel refcount" becomes "owned by whoever holds it, with no
    /// special-cased counting" — `Rc` can't live in a `static` without
    /// `Sync`, so each call mints an independent, still-immutable, still
    /// `frozen`-flagged cell rather than sharing one process-wide instance.
    /// Equality/truthiness/repr never depend on identity, so this is
    /// observably equivalent to interning.
    pub fn null() -> Self {
        let obj = Self::from_data(ObjectData::Null, false);
        obj.frozen.set(true);
        obj
    }

    pub fn boolean(b: bool) -> Self {
        Self::from_data(ObjectData::Boolean(b), false)
    }

    pub fn integer(i: i64) -> Self {
        Self::from_data(ObjectData::Integer(i), false)
    }

    pub fn double(d: f64) -> Self {
        Self::from_data(ObjectData::Double(d), false)
    }

    pub fn string(s: String) -> Self {
        Self::from_data(ObjectData::String(s), false)
    }

    pub fn bytes(b: Vec<u8>) -> Self {
        Self::from_data(ObjectData::Bytes(b), false)
    }

    pub fn protobuf(b: Vec<u8>) -> Self {
        Self::from_data(ObjectData::Protobuf(b), false)
    }

    pub fn datetime(dt: DateTime<FixedOffset>) -> Self {
        Self::from_data(ObjectData::Datetime(dt), false)
    }

    pub fn message_value(raw: Vec<u8>, tag: SemanticTag) -> Self {
        Self::from_data(ObjectData::MessageValue { raw, tag }, false)
    }

    pub fn dict_from_json(value: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_data(ObjectData::Dict(Rc::new(RefCell::new(JsonDict::owned(value)))), true)
    }

    pub fn list_from_json(value: Vec<serde_json::Value>) -> Self {
        Self::from_data(ObjectData::List(Rc::new(RefCell::new(JsonList::owned(value)))), true)
    }

    pub fn empty_dict() -> Self {
        Self::dict_from_json(serde_json::Map::new())
    }

    pub fn empty_list() -> Self {
        Self::list_from_json(Vec::new())
    }

    /// A dict whose data lives in an ancestor's own storage, at `path`
    /// (§3.4, §4.5) — materialized lazily by `dict_getattr`/
    /// `list_get_subscript` rather than copied.
    pub(crate) fn dict_nested(root: Weak<ObjectCell>, path: Vec<PathSegment>) -> Self {
        Self::from_data(ObjectData::Dict(Rc::new(RefCell::new(JsonDict::nested(root, path)))), true)
    }

    pub(crate) fn list_nested(root: Weak<ObjectCell>, path: Vec<PathSegment>) -> Self {
        Self::from_data(ObjectData::List(Rc::new(RefCell::new(JsonList::nested(root, path)))), true)
    }

    /// Weak reference to this object, for use as a container's `root`.
    pub fn downgrade(&self) -> Weak<ObjectCell> {
        Rc::downgrade(&self.0)
    }

    /// Upgrades a weak reference taken by [`Object::downgrade`] back into a
    /// strong [`Object`] handle (`weakref_get`, §4.6).
    pub fn upgrade(weak: &Weak<ObjectCell>) -> Option<Object> {
        weak.upgrade().map(Object)
    }

    /// The concrete type of this object (§4.2's `object_is_type` walks this
    /// tag's super-type chain).
    pub fn type_tag(&self) -> TypeTag {
        match &*self.data.borrow() {
            ObjectData::Null => TypeTag::Null,
            ObjectData::Boolean(_) => TypeTag::Boolean,
            ObjectData::Integer(_) => TypeTag::Integer,
            ObjectData::Double(_) => TypeTag::Double,
            ObjectData::String(_) => TypeTag::String,
            ObjectData::Bytes(_) => TypeTag::Bytes,
            ObjectData::Protobuf(_) => TypeTag::Protobuf,
            ObjectData::Datetime(_) => TypeTag::Datetime,
            ObjectData::MessageValue { .. } => TypeTag::MessageValue,
            ObjectData::Dict(_) => TypeTag::JsonObject,
            ObjectData::List(_) => TypeTag::JsonArray,
        }
    }

    /// `object_is_type` (§4.2, invariants 1 and 9).
    pub fn is_type(&self, target: TypeTag) -> bool {
        self.type_tag().is_type(target)
    }

    /// `truthy` (§3.2). `message-value` unmarshals first.
    pub fn truthy(&self) -> bool {
        match &*self.data.borrow() {
            ObjectData::Null => false,
            ObjectData::Boolean(b) => *b,
            ObjectData::Integer(i) => *i != 0,
            ObjectData::Double(d) => *d != 0.0,
            ObjectData::String(s) => !s.is_empty(),
            ObjectData::Bytes(b) | ObjectData::Protobuf(b) => !b.is_empty(),
            ObjectData::Datetime(_) => true,
            ObjectData::MessageValue { .. } => self.unmarshal().map(|o| o.truthy()).unwrap_or(false),
            ObjectData::Dict(cell) => !cell.borrow().is_empty().unwrap_or(true),
            ObjectData::List(cell) => !cell.borrow().is_empty().unwrap_or(true),
        }
    }

    /// `repr` (§3.2): human-readable form for string construction and
    /// error messages. Datetime's canonical textual form resolves the
    /// §9 Open Question as `<epoch>.<usec>±HH:MM`.
    pub fn repr(&self) -> String {
        match &*self.data.borrow() {
            ObjectData::Null => "null".to_string(),
            ObjectData::Boolean(b) => b.to_string(),
            ObjectData::Integer(i) => i.to_string(),
            ObjectData::Double(d) => format_double(*d),
            ObjectData::String(s) => s.clone(),
            ObjectData::Bytes(b) | ObjectData::Protobuf(b) => hex_encode(b),
            ObjectData::Datetime(dt) => format_datetime_canonical(dt),
            ObjectData::MessageValue { .. } => self.unmarshal().map(|o| o.repr()).unwrap_or_default(),
            ObjectData::Dict(_) | ObjectData::List(_) => self.marshal().0,
        }
    }

    /// `len` (§3.2). Scalars other than string/bytes/protobuf have no
    /// length.
    pub fn len(&self) -> EvalResult<usize> {
        match &*self.data.borrow() {
            ObjectData::String(s) => Ok(s.len()),
            ObjectData::Bytes(b) | ObjectData::Protobuf(b) => Ok(b.len()),
            ObjectData::Dict(cell) => cell.borrow().len(),
            ObjectData::List(cell) => cell.borrow().len(),
            _ => Err(EvalError::TypeMismatch("len() unsupported for this type".into())),
        }
    }

    /// `NUM_BASED` numeric conversion (§4.3.4): integers/doubles trivially,
    /// null to 0, booleans to 0/1, strings parsed, datetime to epoch
    /// seconds (possibly fractional). Anything else that fails to convert
    /// becomes NaN, which the comparison engine treats as "always
    /// not-equal, never less/greater".
    pub fn numeric_value(&self) -> f64 {
        match &*self.data.borrow() {
            ObjectData::Integer(i) => *i as f64,
            ObjectData::Double(d) => *d,
            ObjectData::Null => 0.0,
            ObjectData::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ObjectData::String(s) => s.trim().parse().unwrap_or(f64::NAN),
            ObjectData::Datetime(dt) => dt.timestamp() as f64 + dt.timestamp_subsec_micros() as f64 / 1_000_000.0,
            ObjectData::MessageValue { .. } => self.unmarshal().map(|o| o.numeric_value()).unwrap_or(f64::NAN),
            ObjectData::Bytes(_) | ObjectData::Protobuf(_) | ObjectData::Dict(_) | ObjectData::List(_) => f64::NAN,
        }
    }

    /// Raw byte view for `bytes`/`protobuf`/`string`, used by the `bytes`
    /// cast target (§6.3).
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match &*self.data.borrow() {
            ObjectData::String(s) => Some(s.clone().into_bytes()),
            ObjectData::Bytes(b) | ObjectData::Protobuf(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// Whether this type's instances are mutable (used to decide clone vs.
    /// ref-and-share semantics, §4.1 invariant 4). Only containers are.
    pub fn is_mutable_type(&self) -> bool {
        matches!(&*self.data.borrow(), ObjectData::Dict(_) | ObjectData::List(_))
    }

    /// `clone(o)`: readonly objects are ref-and-shared; mutable ones get an
    /// independent, writable deep copy (invariant 4).
    pub fn clone_obj(obj: &Object) -> Object {
        if obj.readonly.get() || !obj.is_mutable_type() {
            return obj.clone();
        }
        match &*obj.data.borrow() {
            ObjectData::Dict(cell) => container::deep_clone_dict(cell),
            ObjectData::List(cell) => container::deep_clone_list(cell),
            _ => obj.clone(),
        }
    }

    /// `object_freeze` (§4.1): marks the object interned. With `Rc`-based
    /// counting this has no effect on lifetime management beyond the flag
    /// itself — there is no sentinel refcount to install.
    pub fn freeze(&self) {
        self.frozen.set(true);
        self.readonly.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    /// `marshal`: `(string, semantic tag)` pair handed back to the log
    /// record (§3.2).
    pub fn marshal(&self) -> (String, SemanticTag) {
        match &*self.data.borrow() {
            ObjectData::Null => (String::new(), SemanticTag::Null),
            ObjectData::Boolean(b) => (b.to_string(), SemanticTag::Boolean),
            ObjectData::Integer(i) => (i.to_string(), SemanticTag::Integer),
            ObjectData::Double(d) => (format_double(*d), SemanticTag::Double),
            ObjectData::String(s) => (s.clone(), SemanticTag::String),
            ObjectData::Bytes(b) => (base64_encode(b), SemanticTag::Bytes),
            ObjectData::Protobuf(b) => (base64_encode(b), SemanticTag::Protobuf),
            ObjectData::Datetime(dt) => (format_datetime_canonical(dt), SemanticTag::Datetime),
            ObjectData::MessageValue { raw, tag } => (String::from_utf8_lossy(raw).into_owned(), *tag),
            ObjectData::Dict(_) | ObjectData::List(_) => {
                (crate::builtins::format_json::format_json(self), SemanticTag::Json)
            }
        }
    }

    /// `unmarshal`: materializes a `message-value` into its concrete typed
    /// object, lazily, per §3.3.
    pub fn unmarshal(&self) -> EvalResult<Object> {
        let (raw, tag) = match &*self.data.borrow() {
            ObjectData::MessageValue { raw, tag } => (raw.clone(), *tag),
            _ => return Ok(self.clone()),
        };
        let text = || String::from_utf8_lossy(&raw).into_owned();
        Ok(match tag {
            SemanticTag::Null => Object::null(),
            SemanticTag::Boolean => Object::boolean(text() == "true"),
            SemanticTag::Integer => Object::integer(
                text()
                    .parse()
                    .map_err(|_| EvalError::TypeMismatch("message-value not an integer".into()))?,
            ),
            SemanticTag::Double => Object::double(
                text()
                    .parse()
                    .map_err(|_| EvalError::TypeMismatch("message-value not a double".into()))?,
            ),
            SemanticTag::String => Object::string(text()),
            SemanticTag::Bytes => Object::bytes(raw),
            SemanticTag::Protobuf => Object::protobuf(raw),
            SemanticTag::Datetime => parse_datetime_canonical(&text())
                .map(Object::datetime)
                .ok_or_else(|| EvalError::TypeMismatch("message-value not a datetime".into()))?,
            SemanticTag::Json | SemanticTag::List => {
                let value: serde_json::Value = serde_json::from_slice(&raw)
                    .map_err(|e| EvalError::ParseError(e.to_string()))?;
                container::json_value_to_object(&value)
            }
        })
    }

    /// `map_to_json`: JSON-DOM view of this object (§3.2).
    pub fn map_to_json(&self) -> serde_json::Value {
        match &*self.data.borrow() {
            ObjectData::Null => serde_json::Value::Null,
            ObjectData::Boolean(b) => serde_json::Value::Bool(*b),
            ObjectData::Integer(i) => serde_json::Value::Number((*i).into()),
            ObjectData::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ObjectData::String(s) => serde_json::Value::String(s.clone()),
            ObjectData::Bytes(b) | ObjectData::Protobuf(b) => serde_json::Value::String(base64_encode(b)),
            ObjectData::Datetime(dt) => serde_json::Value::String(format_datetime_canonical(dt)),
            ObjectData::MessageValue { .. } => self
                .unmarshal()
                .map(|o| o.map_to_json())
                .unwrap_or(serde_json::Value::Null),
            ObjectData::Dict(cell) => serde_json::Value::Object(cell.borrow().snapshot().unwrap_or_default()),
            ObjectData::List(cell) => serde_json::Value::Array(cell.borrow().snapshot().unwrap_or_default()),
        }
    }

    /// Materializes `key`, registering a fresh root weakref with `scope` if
    /// this container is itself the root being navigated from (§3.5, §4.6).
    pub fn getattr(&self, key: &str, scope: &mut EvalScope) -> EvalResult<Object> {
        container::dict_getattr(self, key, scope)
    }

    pub fn dict_keys(&self) -> EvalResult<Vec<String>> {
        container::dict_keys(self)
    }

    pub fn setattr(&self, key: &str, value: Object, scope: &mut EvalScope) -> EvalResult<()> {
        container::dict_setattr(self, key, value, scope)
    }

    pub fn is_key_set(&self, key: &str) -> EvalResult<bool> {
        container::dict_is_key_set(self, key)
    }

    pub fn unset_key(&self, key: &str) -> EvalResult<bool> {
        container::dict_unset_key(self, key)
    }

    pub fn get_subscript(&self, index: i64, scope: &mut EvalScope) -> EvalResult<Object> {
        container::list_get_subscript(self, index, scope)
    }

    pub fn set_subscript(&self, index: i64, value: Object, scope: &mut EvalScope) -> EvalResult<()> {
        container::list_set_subscript(self, index, value, scope)
    }

    pub fn append(&self, value: Object, scope: &mut EvalScope) -> EvalResult<()> {
        container::list_append(self, value, scope)
    }

    pub fn unset_index(&self, index: i64) -> EvalResult<()> {
        container::list_unset_index(self, index)
    }
}

fn format_double(d: f64) -> String {
    serde_json::Number::from_f64(d)
        .map(|n| n.to_string())
        .unwrap_or_else(|| "NaN".to_string())
}

fn base64_encode(b: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(b)
}

/// Lowercase hex, used by `repr` for bytes/protobuf (§3.3). No dedicated
/// hex crate is in the dependency set, so this is the same few lines any
/// of these crates would write under the hood.
pub fn hex_encode(b: &[u8]) -> String {
    let mut out = String::with_capacity(b.len() * 2);
    for byte in b {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Canonical `STRING_BASED` textual form for datetime values, resolving the
/// §9 Open Question: `<epoch-seconds>.<microseconds>±HH:MM`.
pub fn format_datetime_canonical(dt: &DateTime<FixedOffset>) -> String {
    let epoch = dt.timestamp();
    let micros = dt.timestamp_subsec_micros();
    let offset = dt.offset();
    format!("{epoch}.{micros:06}{}", format_offset(offset))
}

fn format_offset(offset: &FixedOffset) -> String {
    let total_minutes = offset.local_minus_utc() / 60;
    let sign = if total_minutes < 0 { '-' } else { '+' };
    let abs = total_minutes.abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

fn parse_datetime_canonical(s: &str) -> Option<DateTime<FixedOffset>> {
    let (sign_idx, _) = s
        .char_indices()
        .rev()
        .find(|(_, c)| *c == '+' || *c == '-')?;
    let (epoch_part, offset_part) = s.split_at(sign_idx);
    let mut epoch_fields = epoch_part.splitn(2, '.');
    let secs: i64 = epoch_fields.next()?.parse().ok()?;
    let micros: u32 = epoch_fields.next().unwrap_or("0").parse().ok()?;
    let mut offset_fields = offset_part[1..].splitn(2, ':');
    let oh: i32 = offset_fields.next()?.parse().ok()?;
    let om: i32 = offset_fields.next()?.parse().ok()?;
    let sign = if offset_part.starts_with('-') { -1 } else { 1 };
    let offset_secs = sign * (oh * 3600 + om * 60);
    let offset = FixedOffset::east_opt(offset_secs)?;
    offset.timestamp_opt(secs, micros * 1000).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_falsy_and_frozen() {
        let n = Object::null();
        assert!(!n.truthy());
        assert!(n.is_frozen());
        assert_eq!(n.repr(), "null");
    }

    #[test]
    fn clone_of_readonly_shares_identity() {
        let dict = Object::empty_dict();
        dict.readonly.set(true);
        let cloned = Object::clone_obj(&dict);
        assert!(Rc::ptr_eq(&dict.0, &cloned.0));
    }

    #[test]
    fn clone_of_mutable_dict_is_independent() {
        let mut scope = EvalScope::default();
        let dict = Object::empty_dict();
        dict.setattr("a", Object::integer(1), &mut scope).unwrap();
        let cloned = Object::clone_obj(&dict);
        assert!(!Rc::ptr_eq(&dict.0, &cloned.0));
        cloned.setattr("b", Object::integer(2), &mut scope).unwrap();
        assert!(dict.getattr("b", &mut scope).is_err());
    }

    #[test]
    fn datetime_roundtrip_canonical_format() {
        let dt = FixedOffset::east_opt(3600)
            .unwrap()
            .timestamp_opt(1_700_000_000, 123_000)
            .unwrap();
        let text = format_datetime_canonical(&dt);
        assert_eq!(text, "1700000000.000123+01:00");
        let parsed = parse_datetime_canonical(&text).unwrap();
        assert_eq!(parsed.timestamp(), dt.timestamp());
        assert_eq!(parsed.timestamp_subsec_micros(), dt.timestamp_subsec_micros());
    }

    #[test]
    fn is_type_walks_super_chain() {
        let dict = Object::empty_dict();
        assert!(dict.is_type(TypeTag::JsonObject));
        assert!(dict.is_type(TypeTag::Dict));
        assert!(!dict.is_type(TypeTag::List));
    }
}
