//! Process-wide type registry.
//!
//! A real syslog-ng deployment registers types and builtin functions once at
//! startup and treats both registries as read-only for the rest of the
//! process's life (§5 "shared-resource policy"). The closed variant set
//! means the registry here is a fixed table, not a `lazy_static`/`OnceCell`
//! with runtime registration — the only two "implementations" of dict/list
//! the source ships (json-object, json-array) are baked in, per the Open
//! Question in spec §9 resolved in DESIGN.md: we ship one implementation
//! per type, not a legacy/new pair.

use std::collections::HashMap;

/// Identifies a built-in filterx type. Mirrors the type descriptor's `name`
/// plus super-type link from the original source, collapsed to an enum
/// since the set of built-in types is fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    Bytes,
    Protobuf,
    Datetime,
    MessageValue,
    /// Abstract super-type; `JsonObject` is its only concrete implementation.
    Dict,
    /// Abstract super-type; `JsonArray` is its only concrete implementation.
    List,
    JsonObject,
    JsonArray,
}

impl TypeTag {
    /// The registered type name, as `istype("...")` would spell it.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Protobuf => "protobuf",
            Self::Datetime => "datetime",
            Self::MessageValue => "message_value",
            Self::Dict => "dict",
            Self::List => "list",
            Self::JsonObject => "json_object",
            Self::JsonArray => "json_array",
        }
    }

    /// Direct super-type, if any. `JsonObject`/`JsonArray` implement the
    /// abstract `Dict`/`List` interfaces; everything else's super is the
    /// universal `object` root (invariant 9: `is_type(o, "object")` holds
    /// for every object, represented here by `is_type` always matching
    /// `"object"` without it needing its own chain link).
    pub fn super_type(self) -> Option<TypeTag> {
        match self {
            Self::JsonObject => Some(Self::Dict),
            Self::JsonArray => Some(Self::List),
            _ => None,
        }
    }

    /// Walk `self`'s super-type chain and test whether `target` appears on
    /// it, including `self` itself. Implements invariant 1 (`is_type`) and
    /// invariant 9 (every object is-a `"object"`).
    pub fn is_type(self, target: TypeTag) -> bool {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if t == target {
                return true;
            }
            cur = t.super_type();
        }
        false
    }

    /// `is_type` against the universal root, per invariant 9.
    pub fn is_object(self) -> bool {
        true
    }
}

/// Maps a type name to its [`TypeTag`], the Rust stand-in for the source's
/// process-wide `GHashTable`-backed type registry (`filterx-private.h`).
/// Read-only after construction.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_name: HashMap<&'static str, TypeTag>,
}

impl TypeRegistry {
    /// Build the registry with every built-in type plus the universal
    /// `"object"` pseudo-type accepted by `istype`.
    pub fn new() -> Self {
        use TypeTag::*;
        let all = [
            Null, Boolean, Integer, Double, String, Bytes, Protobuf, Datetime, MessageValue,
            Dict, List, JsonObject, JsonArray,
        ];
        let by_name = all.into_iter().map(|t| (t.name(), t)).collect();
        Self { by_name }
    }

    /// Look up a type by name. `"object"` is accepted but has no `TypeTag`
    /// of its own — callers test membership via [`TypeTag::is_object`]
    /// instead of a registry round-trip for that one case.
    pub fn lookup(&self, name: &str) -> Option<TypeTag> {
        self.by_name.get(name).copied()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `istype` also accepts the pseudo-type name `"object"`, matching every
/// object unconditionally (invariant 9). This is checked before falling
/// back to [`TypeRegistry::lookup`].
pub const OBJECT_PSEUDO_TYPE: &str = "object";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_is_a_dict_and_an_object() {
        assert!(TypeTag::JsonObject.is_type(TypeTag::JsonObject));
        assert!(TypeTag::JsonObject.is_type(TypeTag::Dict));
        assert!(!TypeTag::JsonObject.is_type(TypeTag::List));
    }

    #[test]
    fn registry_round_trips_names() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.lookup("json_object"), Some(TypeTag::JsonObject));
        assert_eq!(reg.lookup("dict"), Some(TypeTag::Dict));
        assert_eq!(reg.lookup("nonexistent"), None);
    }
}
