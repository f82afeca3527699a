//! Four-mode comparison engine (§4.3.4), grounded on the `FCMPX_*` bitmask
//! constants in `expr-comparison.h`. The actual `_eval` in
//! `expr-comparison.c` is a stub in the source (always returns `TRUE`), so
//! this implements the fully specified semantics from the spec rather than
//! the source's placeholder.

use crate::object::Object;
use crate::types::TypeTag;
use std::cmp::Ordering;

/// Operator bitmask. `NE` is exactly `LT | GT` (invariant 15).
pub mod op {
    pub const EQ: u8 = 0b001;
    pub const LT: u8 = 0b010;
    pub const GT: u8 = 0b100;
    pub const NE: u8 = LT | GT;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    NumBased,
    StringBased,
    TypeAware,
    TypeAndValueBased,
}

/// Either a well-defined three-way order, or the "one side was NaN" case,
/// where only `NE` may pass.
enum OrderResult {
    Ordered(Ordering),
    NanNe,
}

/// Evaluate `lhs <operator> rhs` under `mode`.
pub fn compare(lhs: &Object, rhs: &Object, operator: u8, mode: CompareMode) -> bool {
    let order = compute_order(lhs, rhs, mode);
    apply_operator(order, operator)
}

fn apply_operator(order: OrderResult, operator: u8) -> bool {
    match order {
        OrderResult::NanNe => operator == op::NE,
        OrderResult::Ordered(Ordering::Less) => operator & op::LT != 0,
        OrderResult::Ordered(Ordering::Equal) => operator & op::EQ != 0,
        OrderResult::Ordered(Ordering::Greater) => operator & op::GT != 0,
    }
}

fn compute_order(lhs: &Object, rhs: &Object, mode: CompareMode) -> OrderResult {
    match mode {
        CompareMode::NumBased => order_num(lhs, rhs),
        CompareMode::StringBased => OrderResult::Ordered(lhs.repr().cmp(&rhs.repr())),
        CompareMode::TypeAware => order_type_aware(lhs, rhs),
        CompareMode::TypeAndValueBased => order_type_and_value(lhs, rhs),
    }
}

fn order_num(lhs: &Object, rhs: &Object) -> OrderResult {
    let a = lhs.numeric_value();
    let b = rhs.numeric_value();
    if a.is_nan() || b.is_nan() {
        return OrderResult::NanNe;
    }
    OrderResult::Ordered(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
}

fn is_string_like(t: TypeTag) -> bool {
    matches!(
        t,
        TypeTag::String | TypeTag::Bytes | TypeTag::Protobuf | TypeTag::JsonObject | TypeTag::JsonArray | TypeTag::MessageValue
    )
}

fn order_type_aware(lhs: &Object, rhs: &Object) -> OrderResult {
    let lhs_null = lhs.type_tag() == TypeTag::Null;
    let rhs_null = rhs.type_tag() == TypeTag::Null;
    if lhs_null || rhs_null {
        return OrderResult::Ordered(match (lhs_null, rhs_null) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => unreachable!(),
        });
    }
    if is_string_like(lhs.type_tag()) {
        OrderResult::Ordered(lhs.repr().cmp(&rhs.repr()))
    } else {
        order_num(lhs, rhs)
    }
}

/// Stable, arbitrary rank used only to produce a *consistent* (not
/// semantically meaningful) ordering between mismatched types in
/// `TYPE_AND_VALUE_BASED` mode, per §4.3.4: "ordering is undefined-but-
/// consistent" when runtime types don't match.
fn type_rank(t: TypeTag) -> u8 {
    match t {
        TypeTag::Null => 0,
        TypeTag::Boolean => 1,
        TypeTag::Integer => 2,
        TypeTag::Double => 3,
        TypeTag::String => 4,
        TypeTag::Bytes => 5,
        TypeTag::Protobuf => 6,
        TypeTag::Datetime => 7,
        TypeTag::MessageValue => 8,
        TypeTag::Dict => 9,
        TypeTag::List => 10,
        TypeTag::JsonObject => 11,
        TypeTag::JsonArray => 12,
    }
}

fn order_type_and_value(lhs: &Object, rhs: &Object) -> OrderResult {
    if lhs.type_tag() != rhs.type_tag() {
        return OrderResult::Ordered(type_rank(lhs.type_tag()).cmp(&type_rank(rhs.type_tag())));
    }
    order_type_aware(lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_num_based_eq() {
        assert!(compare(&Object::integer(6), &Object::integer(6), op::EQ, CompareMode::NumBased));
    }

    #[test]
    fn s2_type_aware_string_lhs() {
        assert!(compare(
            &Object::string("3".to_string()),
            &Object::integer(3),
            op::EQ,
            CompareMode::TypeAware
        ));
    }

    #[test]
    fn s3_type_and_value_based() {
        assert!(compare(&Object::integer(5), &Object::integer(5), op::EQ, CompareMode::TypeAndValueBased));
        assert!(!compare(
            &Object::string("5".to_string()),
            &Object::integer(5),
            op::EQ,
            CompareMode::TypeAndValueBased
        ));
    }

    #[test]
    fn ne_is_lt_or_gt() {
        assert_eq!(op::NE, op::LT | op::GT);
    }

    #[test]
    fn nan_makes_ne_true_and_rest_false() {
        let s = Object::string("not-a-number".to_string());
        let n = Object::integer(1);
        assert!(compare(&s, &n, op::NE, CompareMode::NumBased));
        assert!(!compare(&s, &n, op::EQ, CompareMode::NumBased));
        assert!(!compare(&s, &n, op::LT, CompareMode::NumBased));
        assert!(!compare(&s, &n, op::GT, CompareMode::NumBased));
    }

    #[test]
    fn null_orders_below_everything_in_type_aware() {
        assert!(compare(&Object::null(), &Object::integer(0), op::LT, CompareMode::TypeAware));
        assert!(compare(&Object::null(), &Object::null(), op::EQ, CompareMode::TypeAware));
    }
}
