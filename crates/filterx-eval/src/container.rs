//! JSON-DOM-backed dict/list containers.
//!
//! `json-object`/`json-array` are, per spec, the only concrete
//! implementations of the abstract `dict`/`list` super-types, backed by a
//! `serde_json::Value` tree. A container's storage is either:
//! - `Owned`: it holds the real `serde_json::Map`/`Vec` directly, or
//! - `Nested`: it holds a path into an ancestor's `Owned` storage — reads and
//!   writes navigate there on every access, so a mutation made through a
//!   nested handle is visible immediately from the root (and from any other
//!   handle reached through the same root), rather than living in a
//!   disconnected copy.
//!
//! Every container also keeps a cache mapping already-read keys/indices to
//! the [`Object`] handed out last time (the cache invariant: repeated reads
//! return the *same* object identity, object-json.c's
//! `_convert_json_to_object_cached`). `Nested` containers clear their cache
//! whenever they're rebound under a new parent (§4.5) — a cached child's own
//! path would otherwise silently point at the wrong ancestor after a move.

use crate::error::{EvalError, EvalResult};
use crate::object::{Object, ObjectCell, ObjectData};
use crate::scope::EvalScope;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// One step of a path from a root container's own storage down to a nested
/// descendant's JSON value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Where a `JsonDict`'s payload actually lives.
pub enum DictStorage {
    Owned(serde_json::Map<String, serde_json::Value>),
    Nested { root: Weak<ObjectCell>, path: Vec<PathSegment> },
}

/// Where a `JsonList`'s payload actually lives.
pub enum ListStorage {
    Owned(Vec<serde_json::Value>),
    Nested { root: Weak<ObjectCell>, path: Vec<PathSegment> },
}

/// Backing store for a `json_object` (dict).
pub struct JsonDict {
    storage: DictStorage,
    cache: HashMap<String, Object>,
}

/// Backing store for a `json_array` (list). The cache is keyed by index
/// rather than held as a parallel `Vec`, since a `Nested` list's length isn't
/// known without navigating — removal explicitly reindexes the cache instead
/// (`shift_cache_after_remove`).
pub struct JsonList {
    storage: ListStorage,
    cache: HashMap<usize, Object>,
}

fn stale_path_error() -> EvalError {
    EvalError::Runtime("nested container path no longer resolves".into())
}

fn step_value<'a>(value: &'a serde_json::Value, seg: &PathSegment) -> Option<&'a serde_json::Value> {
    match (value, seg) {
        (serde_json::Value::Object(map), PathSegment::Key(k)) => map.get(k),
        (serde_json::Value::Array(arr), PathSegment::Index(i)) => arr.get(*i),
        _ => None,
    }
}

fn step_value_mut<'a>(value: &'a mut serde_json::Value, seg: &PathSegment) -> Option<&'a mut serde_json::Value> {
    match (value, seg) {
        (serde_json::Value::Object(map), PathSegment::Key(k)) => map.get_mut(k),
        (serde_json::Value::Array(arr), PathSegment::Index(i)) => arr.get_mut(*i),
        _ => None,
    }
}

/// Walks from `root`'s own `Owned` storage through `path`, handing the
/// resolved `serde_json::Value` to `f`. `root` must still upgrade and its
/// storage must still be `Owned` at the first path step — both conditions
/// only fail if the ancestor the path was minted against has since been
/// dropped, which `stale_path_error` reports rather than panicking on.
fn with_nested_value<R>(
    root: &Weak<ObjectCell>,
    path: &[PathSegment],
    f: impl FnOnce(&serde_json::Value) -> R,
) -> EvalResult<R> {
    let root_obj = Object::upgrade(root).ok_or_else(stale_path_error)?;
    let (first, rest) = path.split_first().ok_or_else(stale_path_error)?;
    let data = root_obj.data.borrow();
    match &*data {
        ObjectData::Dict(cell) => {
            let dict = cell.borrow();
            let map = match &dict.storage {
                DictStorage::Owned(m) => m,
                DictStorage::Nested { .. } => return Err(stale_path_error()),
            };
            let key = match first {
                PathSegment::Key(k) => k,
                PathSegment::Index(_) => return Err(stale_path_error()),
            };
            let mut value = map.get(key).ok_or_else(stale_path_error)?;
            for seg in rest {
                value = step_value(value, seg).ok_or_else(stale_path_error)?;
            }
            Ok(f(value))
        }
        ObjectData::List(cell) => {
            let list = cell.borrow();
            let vec = match &list.storage {
                ListStorage::Owned(v) => v,
                ListStorage::Nested { .. } => return Err(stale_path_error()),
            };
            let idx = match first {
                PathSegment::Index(i) => *i,
                PathSegment::Key(_) => return Err(stale_path_error()),
            };
            let mut value = vec.get(idx).ok_or_else(stale_path_error)?;
            for seg in rest {
                value = step_value(value, seg).ok_or_else(stale_path_error)?;
            }
            Ok(f(value))
        }
        _ => Err(stale_path_error()),
    }
}

/// Mutable counterpart of [`with_nested_value`].
fn with_nested_value_mut<R>(
    root: &Weak<ObjectCell>,
    path: &[PathSegment],
    f: impl FnOnce(&mut serde_json::Value) -> R,
) -> EvalResult<R> {
    let root_obj = Object::upgrade(root).ok_or_else(stale_path_error)?;
    let (first, rest) = path.split_first().ok_or_else(stale_path_error)?;
    let data = root_obj.data.borrow();
    match &*data {
        ObjectData::Dict(cell) => {
            let mut dict = cell.borrow_mut();
            let map = match &mut dict.storage {
                DictStorage::Owned(m) => m,
                DictStorage::Nested { .. } => return Err(stale_path_error()),
            };
            let key = match first {
                PathSegment::Key(k) => k,
                PathSegment::Index(_) => return Err(stale_path_error()),
            };
            let mut value = map.get_mut(key).ok_or_else(stale_path_error)?;
            for seg in rest {
                value = step_value_mut(value, seg).ok_or_else(stale_path_error)?;
            }
            Ok(f(value))
        }
        ObjectData::List(cell) => {
            let mut list = cell.borrow_mut();
            let vec = match &mut list.storage {
                ListStorage::Owned(v) => v,
                ListStorage::Nested { .. } => return Err(stale_path_error()),
            };
            let idx = match first {
                PathSegment::Index(i) => *i,
                PathSegment::Key(_) => return Err(stale_path_error()),
            };
            let mut value = vec.get_mut(idx).ok_or_else(stale_path_error)?;
            for seg in rest {
                value = step_value_mut(value, seg).ok_or_else(stale_path_error)?;
            }
            Ok(f(value))
        }
        _ => Err(stale_path_error()),
    }
}

impl JsonDict {
    pub fn owned(value: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            storage: DictStorage::Owned(value),
            cache: HashMap::new(),
        }
    }

    pub fn nested(root: Weak<ObjectCell>, path: Vec<PathSegment>) -> Self {
        Self {
            storage: DictStorage::Nested { root, path },
            cache: HashMap::new(),
        }
    }

    fn with_map<R>(&self, f: impl FnOnce(&serde_json::Map<String, serde_json::Value>) -> R) -> EvalResult<R> {
        match &self.storage {
            DictStorage::Owned(m) => Ok(f(m)),
            DictStorage::Nested { root, path } => with_nested_value(root, path, |v| match v {
                serde_json::Value::Object(m) => Ok(f(m)),
                _ => Err(stale_path_error()),
            })?,
        }
    }

    fn with_map_mut<R>(&mut self, f: impl FnOnce(&mut serde_json::Map<String, serde_json::Value>) -> R) -> EvalResult<R> {
        match &mut self.storage {
            DictStorage::Owned(m) => Ok(f(m)),
            DictStorage::Nested { root, path } => with_nested_value_mut(&*root, &path[..], |v| match v {
                serde_json::Value::Object(m) => Ok(f(m)),
                _ => Err(stale_path_error()),
            })?,
        }
    }

    pub fn len(&self) -> EvalResult<usize> {
        self.with_map(|m| m.len())
    }

    pub fn is_empty(&self) -> EvalResult<bool> {
        self.with_map(|m| m.is_empty())
    }

    /// Independent clone of this dict's current JSON payload — navigates to
    /// the live data first if `Nested`, so the snapshot reflects whatever's
    /// actually there right now rather than a value captured at mint time.
    pub fn snapshot(&self) -> EvalResult<serde_json::Map<String, serde_json::Value>> {
        self.with_map(|m| m.clone())
    }
}

impl JsonList {
    pub fn owned(value: Vec<serde_json::Value>) -> Self {
        Self {
            storage: ListStorage::Owned(value),
            cache: HashMap::new(),
        }
    }

    pub fn nested(root: Weak<ObjectCell>, path: Vec<PathSegment>) -> Self {
        Self {
            storage: ListStorage::Nested { root, path },
            cache: HashMap::new(),
        }
    }

    fn with_vec<R>(&self, f: impl FnOnce(&Vec<serde_json::Value>) -> R) -> EvalResult<R> {
        match &self.storage {
            ListStorage::Owned(v) => Ok(f(v)),
            ListStorage::Nested { root, path } => with_nested_value(root, path, |v| match v {
                serde_json::Value::Array(a) => Ok(f(a)),
                _ => Err(stale_path_error()),
            })?,
        }
    }

    fn with_vec_mut<R>(&mut self, f: impl FnOnce(&mut Vec<serde_json::Value>) -> R) -> EvalResult<R> {
        match &mut self.storage {
            ListStorage::Owned(v) => Ok(f(v)),
            ListStorage::Nested { root, path } => with_nested_value_mut(&*root, &path[..], |v| match v {
                serde_json::Value::Array(a) => Ok(f(a)),
                _ => Err(stale_path_error()),
            })?,
        }
    }

    pub fn len(&self) -> EvalResult<usize> {
        self.with_vec(|v| v.len())
    }

    pub fn is_empty(&self) -> EvalResult<bool> {
        self.with_vec(|v| v.is_empty())
    }

    pub fn snapshot(&self) -> EvalResult<Vec<serde_json::Value>> {
        self.with_vec(|v| v.clone())
    }
}

/// Converts a raw `serde_json::Value` into a filterx [`Object`]. Always
/// builds a detached, `Owned` top-level container when the value is itself
/// an object/array — nested values stay raw JSON until a `getattr`/
/// `get_subscript` materializes them against a live root.
pub fn json_value_to_object(value: &serde_json::Value) -> Object {
    match value {
        serde_json::Value::Null => Object::null(),
        serde_json::Value::Bool(b) => Object::boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Object::integer(i)
            } else {
                Object::double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Object::string(s.clone()),
        serde_json::Value::Object(map) => Object::dict_from_json(map.clone()),
        serde_json::Value::Array(arr) => Object::list_from_json(arr.clone()),
    }
}

/// `(root, path)` a *new* child minted at `seg` under `container`'s dict
/// storage should record. If `container` is itself `Nested`, the child
/// shares the same ultimate root with `seg` appended to the path; if
/// `container` is `Owned`, it is the root, and minting it as one registers
/// the weakref with `scope` so it stays resolvable for the scope's lifetime
/// (§3.5, §4.6).
fn dict_child_location(
    container: &Object,
    cell: &Rc<RefCell<JsonDict>>,
    seg: PathSegment,
    scope: &mut EvalScope,
) -> (Weak<ObjectCell>, Vec<PathSegment>) {
    match &cell.borrow().storage {
        DictStorage::Owned(_) => (scope.register_weak(container), vec![seg]),
        DictStorage::Nested { root, path } => {
            let mut p = path.clone();
            p.push(seg);
            (root.clone(), p)
        }
    }
}

fn list_child_location(
    container: &Object,
    cell: &Rc<RefCell<JsonList>>,
    seg: PathSegment,
    scope: &mut EvalScope,
) -> (Weak<ObjectCell>, Vec<PathSegment>) {
    match &cell.borrow().storage {
        ListStorage::Owned(_) => (scope.register_weak(container), vec![seg]),
        ListStorage::Nested { root, path } => {
            let mut p = path.clone();
            p.push(seg);
            (root.clone(), p)
        }
    }
}

fn dict_own_root(cell: &Rc<RefCell<JsonDict>>) -> Option<Weak<ObjectCell>> {
    match &cell.borrow().storage {
        DictStorage::Owned(_) => None,
        DictStorage::Nested { root, .. } => Some(root.clone()),
    }
}

fn list_own_root(cell: &Rc<RefCell<JsonList>>) -> Option<Weak<ObjectCell>> {
    match &cell.borrow().storage {
        ListStorage::Owned(_) => None,
        ListStorage::Nested { root, .. } => Some(root.clone()),
    }
}

/// Sets `modified_in_place` on `container` and, if it has a live root
/// weakref, upgrades it and sets the flag there too. Silent no-op if the
/// weakref has gone dangling (scope torn down) — per §4.5.
fn mark_modified(container: &Object, own_root: Option<&Weak<ObjectCell>>) {
    container.modified_in_place.set(true);
    if let Some(w) = own_root {
        if let Some(root_obj) = Object::upgrade(w) {
            root_obj.modified_in_place.set(true);
        }
    }
}

/// Rewrites `child`'s storage to `Nested { root, path }` — it has just been
/// inserted under a parent and any further mutation of `child` must resolve
/// through this new location. The cache is cleared: a cached grandchild's
/// path was relative to `child`'s *previous* location and would otherwise
/// silently resolve against the wrong ancestor.
fn rebind_child(child: &Object, root: Weak<ObjectCell>, path: Vec<PathSegment>) {
    match &mut *child.data.borrow_mut() {
        ObjectData::Dict(cell) => {
            let mut dict = cell.borrow_mut();
            dict.storage = DictStorage::Nested { root, path };
            dict.cache.clear();
        }
        ObjectData::List(cell) => {
            let mut list = cell.borrow_mut();
            list.storage = ListStorage::Nested { root, path };
            list.cache.clear();
        }
        _ => {}
    }
}

pub fn dict_getattr(container: &Object, key: &str, scope: &mut EvalScope) -> EvalResult<Object> {
    let cell = match &*container.data.borrow() {
        ObjectData::Dict(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("getattr on non-dict".into())),
    };
    if let Some(obj) = cell.borrow().cache.get(key) {
        let obj = obj.clone();
        if container.readonly.get() {
            obj.readonly.set(true);
        }
        return Ok(obj);
    }
    let value = cell
        .borrow()
        .with_map(|m| m.get(key).cloned())?
        .ok_or_else(|| EvalError::AttributeMissing(key.to_string()))?;
    let obj = match &value {
        serde_json::Value::Object(_) => {
            let (root, path) = dict_child_location(container, &cell, PathSegment::Key(key.to_string()), scope);
            Object::dict_nested(root, path)
        }
        serde_json::Value::Array(_) => {
            let (root, path) = dict_child_location(container, &cell, PathSegment::Key(key.to_string()), scope);
            Object::list_nested(root, path)
        }
        other => json_value_to_object(other),
    };
    if container.readonly.get() {
        obj.readonly.set(true);
    }
    cell.borrow_mut().cache.insert(key.to_string(), obj.clone());
    Ok(obj)
}

pub fn dict_setattr(container: &Object, key: &str, value: Object, scope: &mut EvalScope) -> EvalResult<()> {
    if container.readonly.get() {
        return Err(EvalError::ReadonlyViolation);
    }
    let cell = match &*container.data.borrow() {
        ObjectData::Dict(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("setattr on non-dict".into())),
    };
    let stored = Object::clone_obj(&value);
    let json_value = stored.map_to_json();
    let (root, path) = dict_child_location(container, &cell, PathSegment::Key(key.to_string()), scope);
    rebind_child(&stored, root, path);
    cell.borrow_mut().with_map_mut(|m| {
        m.insert(key.to_string(), json_value);
    })?;
    cell.borrow_mut().cache.insert(key.to_string(), stored);
    let own_root = dict_own_root(&cell);
    mark_modified(container, own_root.as_ref());
    Ok(())
}

/// Keys in insertion order, as stored by `serde_json::Map` (which preserves
/// insertion order with the `preserve_order` feature; absent that feature
/// it is sorted-map order — either way deterministic, which is all
/// `unset_empties`'s iterate-then-mutate pass needs).
pub fn dict_keys(container: &Object) -> EvalResult<Vec<String>> {
    match &*container.data.borrow() {
        ObjectData::Dict(cell) => cell.borrow().with_map(|m| m.keys().cloned().collect()),
        _ => Err(EvalError::TypeMismatch("iteration on non-dict".into())),
    }
}

pub fn dict_is_key_set(container: &Object, key: &str) -> EvalResult<bool> {
    match &*container.data.borrow() {
        ObjectData::Dict(cell) => cell.borrow().with_map(|m| m.contains_key(key)),
        _ => Err(EvalError::TypeMismatch("is_key_set on non-dict".into())),
    }
}

pub fn dict_unset_key(container: &Object, key: &str) -> EvalResult<bool> {
    if container.readonly.get() {
        return Err(EvalError::ReadonlyViolation);
    }
    let cell = match &*container.data.borrow() {
        ObjectData::Dict(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("unset_key on non-dict".into())),
    };
    let removed = {
        let mut dict = cell.borrow_mut();
        let removed = dict.with_map_mut(|m| m.remove(key).is_some())?;
        dict.cache.remove(key);
        removed
    };
    if removed {
        let own_root = dict_own_root(&cell);
        mark_modified(container, own_root.as_ref());
    }
    Ok(removed)
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let idx = index as usize;
        if idx < len {
            Some(idx)
        } else {
            None
        }
    } else {
        let from_end = (-index) as usize;
        if from_end <= len {
            Some(len - from_end)
        } else {
            None
        }
    }
}

pub fn list_get_subscript(container: &Object, index: i64, scope: &mut EvalScope) -> EvalResult<Object> {
    let cell = match &*container.data.borrow() {
        ObjectData::List(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("get_subscript on non-list".into())),
    };
    let len = cell.borrow().len()?;
    let idx = normalize_index(index, len).ok_or(EvalError::IndexOutOfRange(index, len))?;
    if let Some(obj) = cell.borrow().cache.get(&idx) {
        let obj = obj.clone();
        if container.readonly.get() {
            obj.readonly.set(true);
        }
        return Ok(obj);
    }
    let value = cell
        .borrow()
        .with_vec(|v| v.get(idx).cloned())?
        .ok_or(EvalError::IndexOutOfRange(index, len))?;
    let obj = match &value {
        serde_json::Value::Object(_) => {
            let (root, path) = list_child_location(container, &cell, PathSegment::Index(idx), scope);
            Object::dict_nested(root, path)
        }
        serde_json::Value::Array(_) => {
            let (root, path) = list_child_location(container, &cell, PathSegment::Index(idx), scope);
            Object::list_nested(root, path)
        }
        other => json_value_to_object(other),
    };
    if container.readonly.get() {
        obj.readonly.set(true);
    }
    cell.borrow_mut().cache.insert(idx, obj.clone());
    Ok(obj)
}

/// `set_subscript` with no index (append). Used by list-construction and the
/// `append` shape of `set_subscript` described in §3.4.
pub fn list_append(container: &Object, value: Object, scope: &mut EvalScope) -> EvalResult<()> {
    if container.readonly.get() {
        return Err(EvalError::ReadonlyViolation);
    }
    let cell = match &*container.data.borrow() {
        ObjectData::List(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("append on non-list".into())),
    };
    let stored = Object::clone_obj(&value);
    let json_value = stored.map_to_json();
    let idx = cell.borrow().len()?;
    let (root, path) = list_child_location(container, &cell, PathSegment::Index(idx), scope);
    rebind_child(&stored, root, path);
    cell.borrow_mut().with_vec_mut(|v| v.push(json_value))?;
    cell.borrow_mut().cache.insert(idx, stored);
    let own_root = list_own_root(&cell);
    mark_modified(container, own_root.as_ref());
    Ok(())
}

pub fn list_set_subscript(container: &Object, index: i64, value: Object, scope: &mut EvalScope) -> EvalResult<()> {
    if container.readonly.get() {
        return Err(EvalError::ReadonlyViolation);
    }
    let cell = match &*container.data.borrow() {
        ObjectData::List(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("set_subscript on non-list".into())),
    };
    let len = cell.borrow().len()?;
    let idx = normalize_index(index, len).ok_or(EvalError::IndexOutOfRange(index, len))?;
    let stored = Object::clone_obj(&value);
    let json_value = stored.map_to_json();
    let (root, path) = list_child_location(container, &cell, PathSegment::Index(idx), scope);
    rebind_child(&stored, root, path);
    cell.borrow_mut().with_vec_mut(|v| {
        v[idx] = json_value;
    })?;
    cell.borrow_mut().cache.insert(idx, stored);
    let own_root = list_own_root(&cell);
    mark_modified(container, own_root.as_ref());
    Ok(())
}

/// Shifts every cached index above `removed_idx` down by one and drops the
/// entry at `removed_idx`, keeping the cache's keys aligned with the list
/// after a `Vec::remove`.
fn shift_cache_after_remove(cache: &mut HashMap<usize, Object>, removed_idx: usize) {
    let shifted: Vec<(usize, Object)> = cache
        .drain()
        .filter_map(|(i, obj)| match i.cmp(&removed_idx) {
            std::cmp::Ordering::Less => Some((i, obj)),
            std::cmp::Ordering::Greater => Some((i - 1, obj)),
            std::cmp::Ordering::Equal => None,
        })
        .collect();
    cache.extend(shifted);
}

pub fn list_unset_index(container: &Object, index: i64) -> EvalResult<()> {
    if container.readonly.get() {
        return Err(EvalError::ReadonlyViolation);
    }
    let cell = match &*container.data.borrow() {
        ObjectData::List(cell) => cell.clone(),
        _ => return Err(EvalError::TypeMismatch("unset_index on non-list".into())),
    };
    let len = cell.borrow().len()?;
    let idx = normalize_index(index, len).ok_or(EvalError::IndexOutOfRange(index, len))?;
    {
        let mut list = cell.borrow_mut();
        list.with_vec_mut(|v| {
            v.remove(idx);
        })?;
        shift_cache_after_remove(&mut list.cache, idx);
    }
    let own_root = list_own_root(&cell);
    mark_modified(container, own_root.as_ref());
    Ok(())
}

/// Deep-copies a dict/list's current JSON payload into a brand-new,
/// unrelated, `Owned` container (fresh cache, no root) — the `clone()` a
/// mutable container must produce (object-json.c's
/// `_clone`/`filterx_json_deep_copy`). Falls back to an empty container if
/// the source is a `Nested` handle whose path no longer resolves, rather
/// than panicking on an already-dangling ancestor.
pub fn deep_clone_dict(cell: &Rc<RefCell<JsonDict>>) -> Object {
    let value = cell.borrow().snapshot().unwrap_or_default();
    Object::dict_from_json(value)
}

pub fn deep_clone_list(cell: &Rc<RefCell<JsonList>>) -> Object {
    let value = cell.borrow().snapshot().unwrap_or_default();
    Object::list_from_json(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::format_json::format_json;

    #[test]
    fn nested_mutation_is_visible_at_root() {
        let json: serde_json::Value = serde_json::from_str(r#"{"b":{"c":""}}"#).unwrap();
        let root = json_value_to_object(&json);
        let mut scope = EvalScope::default();
        let b = root.getattr("b", &mut scope).unwrap();
        assert!(b.unset_key("c").unwrap());
        assert_eq!(format_json(&root), r#"{"b":{}}"#);
    }

    #[test]
    fn nested_write_through_setattr_is_visible_at_root() {
        let json: serde_json::Value = serde_json::from_str(r#"{"b":{}}"#).unwrap();
        let root = json_value_to_object(&json);
        let mut scope = EvalScope::default();
        let b = root.getattr("b", &mut scope).unwrap();
        b.setattr("c", Object::integer(1), &mut scope).unwrap();
        assert_eq!(format_json(&root), r#"{"b":{"c":1}}"#);
    }

    #[test]
    fn repeated_getattr_returns_same_identity() {
        let json: serde_json::Value = serde_json::from_str(r#"{"b":{}}"#).unwrap();
        let root = json_value_to_object(&json);
        let mut scope = EvalScope::default();
        let first = root.getattr("b", &mut scope).unwrap();
        let second = root.getattr("b", &mut scope).unwrap();
        first.setattr("c", Object::integer(1), &mut scope).unwrap();
        assert_eq!(second.getattr("c", &mut scope).unwrap().repr(), "1");
    }

    #[test]
    fn grandchild_mutation_bubbles_to_root() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a":{"b":{"c":1}}}"#).unwrap();
        let root = json_value_to_object(&json);
        let mut scope = EvalScope::default();
        let a = root.getattr("a", &mut scope).unwrap();
        let b = a.getattr("b", &mut scope).unwrap();
        b.unset_key("c").unwrap();
        assert_eq!(format_json(&root), r#"{"a":{"b":{}}}"#);
        assert!(root.modified_in_place.get());
    }

    #[test]
    fn list_element_nested_dict_mutation_bubbles() {
        let json: serde_json::Value = serde_json::from_str(r#"[{"a":1}]"#).unwrap();
        let root = json_value_to_object(&json);
        let mut scope = EvalScope::default();
        let first = root.get_subscript(0, &mut scope).unwrap();
        first.setattr("b", Object::integer(2), &mut scope).unwrap();
        assert_eq!(format_json(&root), r#"[{"a":1,"b":2}]"#);
    }

    #[test]
    fn unset_index_shifts_cache() {
        let list = Object::empty_list();
        let mut scope = EvalScope::default();
        for i in 0..3 {
            list.append(Object::integer(i), &mut scope).unwrap();
        }
        let second = list.get_subscript(1, &mut scope).unwrap();
        let third = list.get_subscript(2, &mut scope).unwrap();
        assert_eq!(second.repr(), "1");
        assert_eq!(third.repr(), "2");
        list.unset_index(0).unwrap();
        assert_eq!(list.get_subscript(0, &mut scope).unwrap().repr(), "1");
        assert_eq!(list.get_subscript(1, &mut scope).unwrap().repr(), "2");
    }

    #[test]
    fn rebinding_child_clears_its_cache() {
        let outer = Object::empty_dict();
        let mut scope = EvalScope::default();
        let inner = Object::empty_dict();
        inner.setattr("x", Object::integer(1), &mut scope).unwrap();
        // Prime inner's cache before it's adopted by outer.
        inner.getattr("x", &mut scope).unwrap();
        outer.setattr("inner", inner.clone(), &mut scope).unwrap();
        let reread = outer.getattr("inner", &mut scope).unwrap();
        assert_eq!(reread.getattr("x", &mut scope).unwrap().repr(), "1");
    }
}
