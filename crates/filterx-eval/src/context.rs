//! The evaluation context (§2 item 8, §3.5): "a context containing one or
//! more log messages and evaluation options." Everything about routing,
//! correlation, and multi-message pipelines is an external-collaborator
//! concern (§1); what the evaluator needs from it is just the one message
//! that variable reads/assignments (§4.3.10) address.

use crate::object::Object;

/// The log record an expression tree runs against. `message` is expected to
/// be a dict-typed [`Object`] — `VarRef::Attribute` reads/writes go through
/// its `getattr`/`setattr`.
pub struct EvalContext {
    pub message: Object,
}

impl EvalContext {
    pub fn new(message: Object) -> Self {
        Self { message }
    }
}

/// Evaluation options (§4.7, ambient — not a spec.md feature). `step_limit`
/// bounds a pathological tree (e.g. a generator against a huge string) the
/// way a host's own scheduler timeout would in production; `None` disables
/// the bound entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalOptions {
    pub step_limit: Option<u64>,
}
