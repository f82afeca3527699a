//! The evaluation dispatcher (§4.3): one `eval` per [`crate::ast::Expr`]
//! variant, matching the "common contract" — propagate a child's failure,
//! release nothing explicitly (Rust's drop glue handles it), return a fresh
//! [`Object`] handle on success.
//!
//! Two node kinds get contract exceptions documented inline where they
//! diverge from plain `?`-propagation: `Conditional`'s body-statement
//! sequencing treats a failing or falsy statement as "stop this block and
//! yield `boolean(false)`" rather than propagating the error (§4.3.5, §7),
//! and `And`/`Or` short-circuit without evaluating the untaken operand
//! (invariant 7).

use crate::ast::{ArgBundle, Conditional, Expr, VarRef};
use crate::builtins;
use crate::builtins::unset_empties::UnsetEmptiesFlags;
use crate::comparison;
use crate::context::{EvalContext, EvalOptions};
use crate::error::{EvalError, EvalResult};
use crate::object::Object;
use crate::scope::EvalScope;
use crate::types::TypeTag;

/// The entry point (§2 item 8): opens a scope, dispatches into `expr`
/// against a context built from `message`, and returns the result. Every
/// other `eval()` call in this module is a node within that one dispatch.
pub fn evaluate(expr: &Expr, message: Object, options: EvalOptions) -> EvalResult<Object> {
    let mut ctx = EvalContext::new(message);
    let mut scope = EvalScope::new(options.step_limit);
    eval(expr, &mut ctx, &mut scope)
}

/// Evaluates `expr` against `ctx` and `scope`, producing a fresh strong
/// reference on success (§4.3's common contract, §6.1's `eval(expression,
/// ctx) -> Option<Object>` collapsed to `Result` per §9's "Result-like sum"
/// re-architecture note).
pub fn eval(expr: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    scope.tick()?;
    match expr {
        Expr::Literal(obj) => Ok(obj.clone()),
        Expr::Not(operand) => eval_not(operand, ctx, scope),
        Expr::And(lhs, rhs) => eval_and(lhs, rhs, ctx, scope),
        Expr::Or(lhs, rhs) => eval_or(lhs, rhs, ctx, scope),
        Expr::Comparison { lhs, rhs, operator, mode } => eval_comparison(lhs, rhs, *operator, *mode, ctx, scope),
        Expr::Conditional(chain) => eval_conditional(chain, ctx, scope),
        Expr::Dict(pairs) => eval_dict(pairs, ctx, scope),
        Expr::List { fillable, values } => eval_list(fillable, values, ctx, scope),
        Expr::Call { name, args } => eval_call(name, args, ctx, scope),
        Expr::Generator { pattern, lhs } => eval_generator(pattern, lhs, ctx, scope),
        Expr::VarRead(var) => eval_var_read(var, ctx, scope),
        Expr::Assign { target, value } => eval_assign(target, value, ctx, scope),
        Expr::Merge { target, source } => eval_merge(target, source, ctx, scope),
        Expr::Cast { target, arg } => {
            let obj = eval(arg, ctx, scope)?;
            builtins::cast::eval(*target, &obj)
        }
        Expr::IsType { obj, target } => {
            let o = eval(obj, ctx, scope)?;
            builtins::istype::eval(&o, *target)
        }
        Expr::UnsetEmpties {
            obj,
            recursive,
            drop_strings,
            drop_numbers,
            drop_nulls,
            drop_dicts,
            drop_lists,
        } => {
            let o = eval(obj, ctx, scope)?;
            let flags = UnsetEmptiesFlags {
                recursive: *recursive,
                drop_strings: *drop_strings,
                drop_numbers: *drop_numbers,
                drop_nulls: *drop_nulls,
                drop_dicts: *drop_dicts,
                drop_lists: *drop_lists,
            };
            builtins::unset_empties::eval(&o, &flags, scope)
        }
        Expr::CachedJson(cached) => Ok(cached.clone()),
        Expr::FormatKv {
            obj,
            value_separator,
            pair_separator,
        } => {
            let o = eval(obj, ctx, scope)?;
            builtins::format_kv::eval(&o, *value_separator, pair_separator, scope)
        }
        Expr::FormatJson(inner) => {
            let o = eval(inner, ctx, scope)?;
            Ok(Object::string(builtins::format_json::format_json(&o)))
        }
        Expr::ParseXml(inner) => {
            let o = eval(inner, ctx, scope)?;
            match o.type_tag() {
                TypeTag::String => builtins::parse_xml::eval(&o.repr()),
                other => Err(EvalError::TypeMismatch(format!(
                    "parse_xml requires a string, got {}",
                    other.name()
                ))),
            }
        }
    }
}

/// §4.3.2: evaluate the operand; propagate failure; else negate truthiness.
fn eval_not(operand: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let v = eval(operand, ctx, scope)?;
    Ok(Object::boolean(!v.truthy()))
}

/// §4.3.3, invariant 7: rhs is never evaluated once lhs decides the result.
fn eval_and(lhs: &Expr, rhs: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let l = eval(lhs, ctx, scope)?;
    if !l.truthy() {
        return Ok(Object::boolean(false));
    }
    let r = eval(rhs, ctx, scope)?;
    Ok(Object::boolean(r.truthy()))
}

fn eval_or(lhs: &Expr, rhs: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let l = eval(lhs, ctx, scope)?;
    if l.truthy() {
        return Ok(Object::boolean(true));
    }
    let r = eval(rhs, ctx, scope)?;
    Ok(Object::boolean(r.truthy()))
}

fn eval_comparison(
    lhs: &Expr,
    rhs: &Expr,
    operator: u8,
    mode: comparison::CompareMode,
    ctx: &mut EvalContext,
    scope: &mut EvalScope,
) -> EvalResult<Object> {
    let l = eval(lhs, ctx, scope)?;
    let r = eval(rhs, ctx, scope)?;
    Ok(Object::boolean(comparison::compare(&l, &r, operator, mode)))
}

/// §4.3.5. The body-statement loop deliberately does *not* use `?` on a
/// per-statement failure: per §7, "Conditional's body-statement sequencing
/// treats None or falsy as 'stop this block and yield false'" — a failing
/// statement does not propagate out of the conditional, it just makes the
/// whole taken branch evaluate to `boolean(false)`. The condition
/// expression itself is not covered by that rule and propagates normally.
fn eval_conditional(chain: &Conditional, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let take_branch = match &chain.condition {
        None => true,
        Some(cond) => eval(cond, ctx, scope)?.truthy(),
    };

    if !take_branch {
        return match &chain.false_branch {
            Some(next) => eval_conditional(next, ctx, scope),
            // Rule 1: "end of chain with no else" evaluates to boolean(true).
            None => Ok(Object::boolean(true)),
        };
    }

    let mut last = Object::boolean(true);
    for stmt in &chain.body {
        match eval(stmt, ctx, scope) {
            Ok(v) if v.truthy() => last = v,
            Ok(_) | Err(_) => return Ok(Object::boolean(false)),
        }
    }
    Ok(last)
}

/// §4.3.6: pairs evaluate and `setattr` in declaration order (§5).
fn eval_dict(pairs: &[(String, Expr)], ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let dict = Object::empty_dict();
    for (key, value_expr) in pairs {
        let value = eval(value_expr, ctx, scope)?;
        dict.setattr(key, value, scope)?;
    }
    Ok(dict)
}

/// §4.3.7: `fillable` must resolve to a list; each value is evaluated and
/// appended (appending already clones mutable values, §3.4).
fn eval_list(fillable: &Expr, values: &[Expr], ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let container = eval(fillable, ctx, scope)?;
    if !container.is_type(TypeTag::List) {
        return Err(EvalError::TypeMismatch(format!(
            "list construction requires a list-typed fillable, got {}",
            container.type_tag().name()
        )));
    }
    for value_expr in values {
        let value = eval(value_expr, ctx, scope)?;
        container.append(value, scope)?;
    }
    Ok(container)
}

/// §4.3.8, §6.1: every built-in with build-time-checkable shape already got
/// a dedicated [`Expr`] variant during construction (see
/// [`crate::builtins`]); anything still shaped as a generic `Call` by the
/// time it reaches eval is a name the core's own registry never resolved to
/// one of those — this is the `lookup_builtin`-miss path, a runtime
/// `FunctionError` rather than the build-time `FUNCTION_NOT_FOUND` in §6.2,
/// since the lookup that matters for the built-ins in this crate already
/// happened at tree-construction time. Positional arguments evaluate
/// left-to-right, then named arguments in declaration order, per §5's
/// ordering guarantee, even though the result is uniformly an error here.
fn eval_call(name: &str, args: &ArgBundle, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    for positional in &args.positional {
        eval(positional, ctx, scope)?;
    }
    for (_, named) in &args.named {
        eval(named, ctx, scope)?;
    }
    Err(EvalError::FunctionError(format!("unknown function '{name}'")))
}

/// §4.3.9. The container shape (dict vs. list) is chosen by whether the
/// pattern has any named capture group; group 0 (the whole match) and any
/// unnamed group are keyed by their numeric index, named groups by name —
/// captures that didn't participate in the match are skipped rather than
/// written as null.
fn eval_generator(pattern: &regex::Regex, lhs: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let lhs_obj = eval(lhs, ctx, scope)?;
    let text = lhs_obj.repr();
    let has_named_groups = pattern.capture_names().flatten().next().is_some();
    let container = if has_named_groups { Object::empty_dict() } else { Object::empty_list() };

    if let Some(caps) = pattern.captures(&text) {
        let names: Vec<Option<&str>> = pattern.capture_names().collect();
        for (idx, name) in names.iter().enumerate() {
            let Some(m) = caps.get(idx) else { continue };
            let value = Object::string(m.as_str().to_string());
            if has_named_groups {
                let key = name.map(|n| n.to_string()).unwrap_or_else(|| idx.to_string());
                container.setattr(&key, value, scope)?;
            } else {
                container.append(value, scope)?;
            }
        }
    }
    Ok(container)
}

/// §4.3.10: record-attribute reads go through the message dict; scratch
/// reads go through the scope's scratch table.
fn eval_var_read(var: &VarRef, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    match var {
        VarRef::Attribute(name) => ctx.message.getattr(name, scope),
        VarRef::Scratch(name) => scope
            .get_scratch(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
    }
}

/// §4.3.10: evaluates the rhs, writes it back through the target's setter.
/// The source doesn't specify assignment's own result value; this ships
/// `boolean(true)` on success, matching the other mutating built-ins
/// (`unset_empties`) so an assignment used as a conditional-body statement
/// (§4.3.5) is always truthy regardless of what was assigned.
fn eval_assign(target: &VarRef, value: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let result = eval(value, ctx, scope)?;
    match target {
        VarRef::Attribute(name) => ctx.message.setattr(name, result, scope)?,
        VarRef::Scratch(name) => scope.set_scratch(name.clone(), result),
    }
    Ok(Object::boolean(true))
}

/// §6.1's builder list: merges `source`'s keys into `target`; both must be
/// dict-typed. Returns `target` so the merged dict can be used directly in
/// expression position.
fn eval_merge(target: &Expr, source: &Expr, ctx: &mut EvalContext, scope: &mut EvalScope) -> EvalResult<Object> {
    let t = eval(target, ctx, scope)?;
    let s = eval(source, ctx, scope)?;
    if !t.is_type(TypeTag::Dict) || !s.is_type(TypeTag::Dict) {
        return Err(EvalError::TypeMismatch("merge requires two dict-typed operands".into()));
    }
    for key in s.dict_keys()? {
        let value = s.getattr(&key, scope)?;
        t.setattr(&key, value, scope)?;
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CastTarget, IsTypeTarget};
    use crate::comparison::{op, CompareMode};

    fn ctx() -> EvalContext {
        EvalContext::new(Object::empty_dict())
    }

    #[test]
    fn not_short_circuits_nothing_but_negates() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let result = eval(&Expr::Not(Box::new(Expr::Literal(Object::boolean(false)))), &mut c, &mut scope).unwrap();
        assert!(result.truthy());
    }

    #[test]
    fn and_short_circuits_on_falsy_lhs() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        // rhs is an UndefinedVariable read; if AND evaluated it, this would error.
        let rhs = Expr::VarRead(VarRef::Scratch("never".into()));
        let expr = Expr::And(Box::new(Expr::Literal(Object::boolean(false))), Box::new(rhs));
        let result = eval(&expr, &mut c, &mut scope).unwrap();
        assert!(!result.truthy());
    }

    #[test]
    fn or_short_circuits_on_truthy_lhs() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let rhs = Expr::VarRead(VarRef::Scratch("never".into()));
        let expr = Expr::Or(Box::new(Expr::Literal(Object::boolean(true))), Box::new(rhs));
        let result = eval(&expr, &mut c, &mut scope).unwrap();
        assert!(result.truthy());
    }

    #[test]
    fn s1_comparison_num_based_eq() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let expr = Expr::Comparison {
            lhs: Box::new(Expr::Literal(Object::integer(6))),
            rhs: Box::new(Expr::Literal(Object::integer(6))),
            operator: op::EQ,
            mode: CompareMode::NumBased,
        };
        assert!(eval(&expr, &mut c, &mut scope).unwrap().truthy());
    }

    #[test]
    fn s7_conditional_chain_picks_elif() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        c.message.setattr("a", Object::string("default".into()), &mut scope).unwrap();

        let else_branch = Conditional {
            condition: None,
            body: vec![Expr::Assign {
                target: VarRef::Attribute("a".into()),
                value: Box::new(Expr::Literal(Object::string("else-matching".into()))),
            }],
            false_branch: None,
        };
        let elif_branch = Conditional {
            condition: Some(Expr::Literal(Object::boolean(true))),
            body: vec![Expr::Assign {
                target: VarRef::Attribute("a".into()),
                value: Box::new(Expr::Literal(Object::string("elif-matching".into()))),
            }],
            false_branch: Some(Box::new(else_branch)),
        };
        let chain = Conditional {
            condition: Some(Expr::Literal(Object::boolean(false))),
            body: vec![Expr::Assign {
                target: VarRef::Attribute("a".into()),
                value: Box::new(Expr::Literal(Object::string("matching".into()))),
            }],
            false_branch: Some(Box::new(elif_branch)),
        };

        eval(&Expr::Conditional(Box::new(chain)), &mut c, &mut scope).unwrap();
        assert_eq!(c.message.getattr("a", &mut scope).unwrap().repr(), "elif-matching");
    }

    #[test]
    fn conditional_body_failure_yields_false_without_propagating() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let chain = Conditional {
            condition: Some(Expr::Literal(Object::boolean(true))),
            body: vec![Expr::VarRead(VarRef::Attribute("missing".into()))],
            false_branch: None,
        };
        let result = eval(&Expr::Conditional(Box::new(chain)), &mut c, &mut scope).unwrap();
        assert!(!result.truthy());
    }

    #[test]
    fn s8_generator_named_and_numeric_groups() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let pattern = regex::Regex::new(r"(?P<first>foo)(bar)(?P<third>baz)").unwrap();
        let expr = Expr::Generator {
            pattern,
            lhs: Box::new(Expr::Literal(Object::string("foobarbaz".into()))),
        };
        let result = eval(&expr, &mut c, &mut scope).unwrap();
        assert_eq!(result.getattr("0", &mut scope).unwrap().repr(), "foobarbaz");
        assert_eq!(result.getattr("first", &mut scope).unwrap().repr(), "foo");
        assert_eq!(result.getattr("2", &mut scope).unwrap().repr(), "bar");
        assert_eq!(result.getattr("third", &mut scope).unwrap().repr(), "baz");
    }

    #[test]
    fn generator_without_named_groups_yields_list() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let pattern = regex::Regex::new(r"(foo)(bar)").unwrap();
        let expr = Expr::Generator {
            pattern,
            lhs: Box::new(Expr::Literal(Object::string("foobar".into()))),
        };
        let result = eval(&expr, &mut c, &mut scope).unwrap();
        assert!(result.is_type(TypeTag::JsonArray));
        assert_eq!(result.get_subscript(0, &mut scope).unwrap().repr(), "foobar");
        assert_eq!(result.get_subscript(1, &mut scope).unwrap().repr(), "foo");
        assert_eq!(result.get_subscript(2, &mut scope).unwrap().repr(), "bar");
    }

    #[test]
    fn cast_and_istype_dispatch() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let cast = Expr::Cast {
            target: CastTarget::Integer,
            arg: Box::new(Expr::Literal(Object::string("42".into()))),
        };
        assert_eq!(eval(&cast, &mut c, &mut scope).unwrap().repr(), "42");

        let istype = Expr::IsType {
            obj: Box::new(Expr::Literal(Object::empty_dict())),
            target: IsTypeTarget::Object,
        };
        assert!(eval(&istype, &mut c, &mut scope).unwrap().truthy());
    }

    #[test]
    fn dict_and_list_construction() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let dict_expr = Expr::Dict(vec![("a".to_string(), Expr::Literal(Object::integer(1)))]);
        let dict = eval(&dict_expr, &mut c, &mut scope).unwrap();
        assert_eq!(dict.getattr("a", &mut scope).unwrap().repr(), "1");

        let list_expr = Expr::List {
            fillable: Box::new(Expr::Literal(Object::empty_list())),
            values: vec![Expr::Literal(Object::integer(1)), Expr::Literal(Object::integer(2))],
        };
        let list = eval(&list_expr, &mut c, &mut scope).unwrap();
        assert_eq!(list.len().unwrap(), 2);
    }

    #[test]
    fn merge_copies_source_keys_into_target() {
        let mut c = ctx();
        let mut scope = EvalScope::default();
        let target = Object::empty_dict();
        target.setattr("a", Object::integer(1), &mut scope).unwrap();
        let source = Object::empty_dict();
        source.setattr("b", Object::integer(2), &mut scope).unwrap();
        let expr = Expr::Merge {
            target: Box::new(Expr::Literal(target)),
            source: Box::new(Expr::Literal(source)),
        };
        let merged = eval(&expr, &mut c, &mut scope).unwrap();
        assert_eq!(merged.getattr("a", &mut scope).unwrap().repr(), "1");
        assert_eq!(merged.getattr("b", &mut scope).unwrap().repr(), "2");
    }
}
