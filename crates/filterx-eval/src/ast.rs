//! The expression tree (§2 item 5, §4.3). Built once at configuration time
//! by the (out-of-scope) grammar/config loader and evaluated repeatedly,
//! per log record, against a fresh [`crate::scope::EvalScope`]. Trees are
//! immutable after construction — evaluation is pure with respect to tree
//! structure (§4.3 "common contract").

use crate::comparison::CompareMode;
use crate::object::Object;
use regex::Regex;

/// Where a variable read/assignment targets: a record attribute (the
/// message the host handed the evaluator) or a scratch variable scoped to
/// this one evaluation (§4.3.10, §GLOSSARY "Scope").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarRef {
    Attribute(String),
    Scratch(String),
}

/// One (condition, body, else) link in a conditional chain (§4.3.5).
/// `condition: None` marks the trailing `else` — construction enforces that
/// only the last link in the chain may omit a condition.
pub struct Conditional {
    pub condition: Option<Expr>,
    pub body: Vec<Expr>,
    pub false_branch: Option<Box<Conditional>>,
}

/// A resolved function-call argument bundle: positional expressions plus
/// named expressions in declaration order (§4.3.8, §6.2).
#[derive(Default)]
pub struct ArgBundle {
    pub positional: Vec<Expr>,
    pub named: Vec<(String, Expr)>,
}

impl ArgBundle {
    pub fn positional_only(args: Vec<Expr>) -> Self {
        Self {
            positional: args,
            named: Vec::new(),
        }
    }
}

/// An expression tree node. Each variant knows how to evaluate itself
/// against a context and scope in [`crate::evaluator`]; this module only
/// carries the shape.
pub enum Expr {
    /// Wraps an already-materialized object (§4.3.1). The evaluator's
    /// constant-folding checks (e.g. `istype`'s literal-string argument)
    /// recognize this variant directly rather than attempting partial
    /// evaluation of arbitrary subtrees.
    Literal(Object),

    /// §4.3.2.
    Not(Box<Expr>),

    /// §4.3.3: AND, short-circuit.
    And(Box<Expr>, Box<Expr>),

    /// §4.3.3: OR, short-circuit.
    Or(Box<Expr>, Box<Expr>),

    /// §4.3.4.
    Comparison {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        operator: u8,
        mode: CompareMode,
    },

    /// §4.3.5: recursive chain, `NO_CONDITION` modeled as `condition: None`
    /// on the trailing link.
    Conditional(Box<Conditional>),

    /// §4.3.6: ordered key/value-expression pairs.
    Dict(Vec<(String, Expr)>),

    /// §4.3.7: `fillable` must resolve to a `list`-typed object; each value
    /// expression is evaluated and a clone appended, in order.
    List { fillable: Box<Expr>, values: Vec<Expr> },

    /// §4.3.8. `name` is resolved against the built-in registry at
    /// evaluation time (construction-time resolution/validation for
    /// functions with a ctor shape happens in [`crate::builtins`] before
    /// the tree is assembled).
    Call { name: String, args: ArgBundle },

    /// §4.3.9: regex search-style generator. The pattern is compiled once
    /// at construction (carried here as an already-compiled `Regex`); each
    /// evaluation matches `lhs` and materializes a dict or list depending
    /// on whether the pattern has named capture groups.
    Generator { pattern: Regex, lhs: Box<Expr> },

    /// §4.3.10.
    VarRead(VarRef),

    /// §4.3.10: writes the evaluated rhs back through the variable's
    /// setter.
    Assign { target: VarRef, value: Box<Expr> },

    /// §6.1 builder list: merges `source`'s keys into `target` (both must
    /// resolve to dict-typed objects).
    Merge { target: Box<Expr>, source: Box<Expr> },

    /// `string`/`bytes`/`protobuf`/`integer`/`double`/`boolean` (§4.4, §6.3).
    /// Arity is fixed at exactly one argument, enforced at construction in
    /// [`crate::builtins::cast`].
    Cast { target: CastTarget, arg: Box<Expr> },

    /// `istype(obj, "typename")` (§4.4): the ctor-validated shape — the
    /// type name literal is resolved once, at construction, in
    /// [`crate::builtins::istype`].
    IsType { obj: Box<Expr>, target: IsTypeTarget },

    /// `unset_empties(obj, ...)` (§4.4): flags are boolean literals,
    /// resolved at construction in [`crate::builtins::unset_empties`].
    UnsetEmpties {
        obj: Box<Expr>,
        recursive: bool,
        drop_strings: bool,
        drop_numbers: bool,
        drop_nulls: bool,
        drop_dicts: bool,
        drop_lists: bool,
    },

    /// `cache_json_file("/path")` (§4.4): the file is read, parsed, and
    /// frozen once at construction in
    /// [`crate::builtins::cache_json_file`]; every evaluation just hands
    /// back the same cached, readonly object.
    CachedJson(Object),

    /// `format_kv(dict, value_separator="=", pair_separator=", ")` (§4.4).
    /// Separators are validated and resolved at construction in
    /// [`crate::builtins::format_kv`].
    FormatKv {
        obj: Box<Expr>,
        value_separator: char,
        pair_separator: String,
    },

    /// `format_json(obj)` (§4.4, §6.4).
    FormatJson(Box<Expr>),

    /// `parse_xml(string)` (§4.4, §6.5).
    ParseXml(Box<Expr>),
}

/// Cast target for the [`Expr::Cast`] node (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    String,
    Bytes,
    Protobuf,
    Integer,
    Double,
    Boolean,
}

/// What `istype`'s second argument resolved to at construction time.
/// `Object` is the pseudo-type every object matches (invariant 9); `Type`
/// is a concrete registry entry.
#[derive(Debug, Clone, Copy)]
pub enum IsTypeTarget {
    Object,
    Type(crate::types::TypeTag),
}
