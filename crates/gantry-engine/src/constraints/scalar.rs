//! Built-in scalar and collection constraint kinds.

use super::{
    Constraint, ConstraintContext, ConstraintError, ConstraintKind, opt_bool, opt_f64, opt_i64,
    opt_str, opt_u64,
};
use gantry_kernel::error::EngineError;
use gantry_kernel::params::PriorValue;
use regex::Regex;
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// string
// ─────────────────────────────────────────────────────────────────────────────

/// `string`: scalar-to-string coercion with length and pattern checks.
pub struct StringKind;

struct StringConstraint {
    min_length: Option<u64>,
    max_length: Option<u64>,
    pattern: Option<Regex>,
}

impl ConstraintKind for StringKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        let pattern = match opt_str(&ctx.options, "pattern")? {
            None => None,
            Some(raw) => Some(Regex::new(raw).map_err(|e| {
                EngineError::misconfigured(format!("option 'pattern' is not a valid regex: {e}"))
            })?),
        };
        Ok(Box::new(StringConstraint {
            min_length: opt_u64(&ctx.options, "min_length")?,
            max_length: opt_u64(&ctx.options, "max_length")?,
            pattern,
        }))
    }
}

impl Constraint for StringConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let s = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(ConstraintError::invalid("Must be a string.")),
        };
        let length = s.chars().count() as u64;
        if let Some(min) = self.min_length {
            if length < min {
                return Err(ConstraintError::invalid(format!(
                    "Must be at least {min} characters long."
                )));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Err(ConstraintError::invalid(format!(
                    "Must be at most {max} characters long."
                )));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&s) {
                return Err(ConstraintError::invalid(
                    "Does not match the required pattern.",
                ));
            }
        }
        Ok(Value::String(s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// integer / number
// ─────────────────────────────────────────────────────────────────────────────

/// `integer`: accepts integers, integral floats and numeric strings; a
/// fractional float is rejected rather than silently truncated.
pub struct IntegerKind;

struct IntegerConstraint {
    min: Option<i64>,
    max: Option<i64>,
}

impl ConstraintKind for IntegerKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(IntegerConstraint {
            min: opt_i64(&ctx.options, "min")?,
            max: opt_i64(&ctx.options, "max")?,
        }))
    }
}

/// Coerce a JSON value to `i64` without truncation.
pub(crate) fn coerce_integer(value: &Value) -> Result<i64, ConstraintError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Ok(f as i64)
                } else {
                    Err(ConstraintError::invalid("Must be an integer."))
                }
            } else {
                Err(ConstraintError::invalid("Must be an integer."))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConstraintError::invalid("Must be an integer.")),
        _ => Err(ConstraintError::invalid("Must be an integer.")),
    }
}

impl Constraint for IntegerConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let i = coerce_integer(value)?;
        if let Some(min) = self.min {
            if i < min {
                return Err(ConstraintError::invalid(format!("Must be at least {min}.")));
            }
        }
        if let Some(max) = self.max {
            if i > max {
                return Err(ConstraintError::invalid(format!("Must be at most {max}.")));
            }
        }
        Ok(Value::from(i))
    }
}

/// `number`: accepts numbers and numeric strings, with range checks.
pub struct NumberKind;

struct NumberConstraint {
    min: Option<f64>,
    max: Option<f64>,
}

impl ConstraintKind for NumberKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(NumberConstraint {
            min: opt_f64(&ctx.options, "min")?,
            max: opt_f64(&ctx.options, "max")?,
        }))
    }
}

impl Constraint for NumberConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let f = match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ConstraintError::invalid("Must be a number."))?,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ConstraintError::invalid("Must be a number."))?,
            _ => return Err(ConstraintError::invalid("Must be a number.")),
        };
        if !f.is_finite() {
            return Err(ConstraintError::invalid("Must be a number."));
        }
        if let Some(min) = self.min {
            if f < min {
                return Err(ConstraintError::invalid(format!("Must be at least {min}.")));
            }
        }
        if let Some(max) = self.max {
            if f > max {
                return Err(ConstraintError::invalid(format!("Must be at most {max}.")));
            }
        }
        Ok(Value::from(f))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// choice
// ─────────────────────────────────────────────────────────────────────────────

/// `choice`: membership in the declared `choices` set.
pub struct ChoiceKind;

struct ChoiceConstraint {
    choices: Vec<Value>,
}

impl ConstraintKind for ChoiceKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        let choices = ctx
            .options
            .get("choices")
            .and_then(Value::as_array)
            .ok_or_else(|| EngineError::misconfigured("option 'choices' must be a list"))?;
        if choices.is_empty() {
            return Err(EngineError::misconfigured("option 'choices' must not be empty"));
        }
        Ok(Box::new(ChoiceConstraint {
            choices: choices.clone(),
        }))
    }
}

impl Constraint for ChoiceConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        if self.choices.contains(value) {
            Ok(value.clone())
        } else {
            Err(ConstraintError::invalid("Not a valid choice."))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// boolean
// ─────────────────────────────────────────────────────────────────────────────

/// `boolean`: accepts exactly `true`, `false`, `1`, `0`, `"1"`, `"0"`,
/// `"true"`, `"false"`, `"yes"`, `"no"` (words case-sensitive), nothing
/// else.  With the `permanent` option, a truthy previous value can never
/// be turned off again.
pub struct BooleanKind;

struct BooleanConstraint {
    permanent: bool,
    previous_truthy: bool,
}

/// The exact acceptance set; anything else is invalid.
fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl ConstraintKind for BooleanKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        let previous_truthy = ctx
            .previous
            .known()
            .and_then(coerce_boolean)
            .unwrap_or(false);
        Ok(Box::new(BooleanConstraint {
            permanent: opt_bool(&ctx.options, "permanent")?,
            previous_truthy,
        }))
    }
}

impl Constraint for BooleanConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let b = coerce_boolean(value)
            .ok_or_else(|| ConstraintError::invalid("Must be a boolean value."))?;
        if self.permanent && self.previous_truthy && !b {
            return Err(ConstraintError::invalid(
                "Cannot be disabled once enabled.",
            ));
        }
        Ok(Value::Bool(b))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// list
// ─────────────────────────────────────────────────────────────────────────────

/// `list`: length checks plus optional per-item validation against an
/// `item` sub-schema.  Each element sees the previous list's element at the
/// same index as its previous value; when the previous list is shorter the
/// element has no previous value, and surplus previous items are unused.
pub struct ListKind;

struct ListConstraint {
    min_length: Option<u64>,
    max_length: Option<u64>,
    item: Option<ItemSchema>,
    context: ConstraintContext,
    previous_items: Vec<Value>,
}

struct ItemSchema {
    kind: String,
    options: Map<String, Value>,
}

impl ConstraintKind for ListKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        let item = match ctx.options.get("item") {
            None => None,
            Some(spec) => {
                let spec = spec
                    .as_object()
                    .ok_or_else(|| EngineError::misconfigured("option 'item' must be a mapping"))?;
                let kind = spec
                    .get("kind")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        EngineError::misconfigured("option 'item' must declare a 'kind'")
                    })?
                    .to_string();
                // Fail at compile time, not per element, when the item kind
                // is unknown.
                ctx.registry.get(&kind)?;
                let options = match spec.get("options") {
                    None => Map::new(),
                    Some(options) => options
                        .as_object()
                        .cloned()
                        .ok_or_else(|| {
                            EngineError::misconfigured("item 'options' must be a mapping")
                        })?,
                };
                Some(ItemSchema { kind, options })
            }
        };

        let previous_items = match ctx.previous.known() {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        Ok(Box::new(ListConstraint {
            min_length: opt_u64(&ctx.options, "min_length")?,
            max_length: opt_u64(&ctx.options, "max_length")?,
            item,
            context: ctx.clone(),
            previous_items,
        }))
    }
}

impl Constraint for ListConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let items = value
            .as_array()
            .ok_or_else(|| ConstraintError::invalid("Must be a list."))?;
        let length = items.len() as u64;
        if let Some(min) = self.min_length {
            if length < min {
                return Err(ConstraintError::invalid(format!(
                    "Must have at least {min} items."
                )));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Err(ConstraintError::invalid(format!(
                    "Must have at most {max} items."
                )));
            }
        }

        let Some(item) = &self.item else {
            return Ok(Value::Array(items.clone()));
        };

        let kind = self.context.registry.get(&item.kind)?;
        let mut resolved = Vec::with_capacity(items.len());
        for (index, element) in items.iter().enumerate() {
            let previous = match self.previous_items.get(index) {
                Some(prev) => PriorValue::Known(prev.clone()),
                None => PriorValue::Absent,
            };
            let child = self.context.child(item.options.clone(), previous);
            let constraint = kind.build(&child)?;
            match constraint.resolve(element) {
                Ok(value) => resolved.push(value),
                Err(ConstraintError::Invalid(message)) => {
                    return Err(ConstraintError::invalid(format!(
                        "Item {}: {message}",
                        index + 1
                    )));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Value::Array(resolved))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintRegistry;
    use crate::constraints::testutil::NullCloud;
    use serde_json::json;
    use std::sync::Arc;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn context(options: Value, previous: PriorValue) -> ConstraintContext {
        ConstraintContext {
            registry: ConstraintRegistry::builtin(),
            lookup: Arc::new(NullCloud),
            options: options.as_object().cloned().unwrap_or_default(),
            previous,
        }
    }

    fn build(kind: &dyn ConstraintKind, options: Value) -> Box<dyn Constraint> {
        kind.build(&context(options, PriorValue::Absent)).unwrap()
    }

    fn invalid_message(result: Result<Value, ConstraintError>) -> String {
        match result {
            Err(ConstraintError::Invalid(message)) => message,
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    // ── string ────────────────────────────────────────────────────────────────

    #[test]
    fn string_coerces_scalars() {
        let constraint = build(&StringKind, json!({}));
        assert_eq!(constraint.resolve(&json!("abc")).unwrap(), json!("abc"));
        assert_eq!(constraint.resolve(&json!(42)).unwrap(), json!("42"));
        assert_eq!(constraint.resolve(&json!(true)).unwrap(), json!("true"));
        assert!(constraint.resolve(&json!(["x"])).is_err());
    }

    #[test]
    fn string_length_bounds() {
        let constraint = build(&StringKind, json!({"min_length": 2, "max_length": 4}));
        assert!(constraint.resolve(&json!("ab")).is_ok());
        assert_eq!(
            invalid_message(constraint.resolve(&json!("a"))),
            "Must be at least 2 characters long."
        );
        assert_eq!(
            invalid_message(constraint.resolve(&json!("abcde"))),
            "Must be at most 4 characters long."
        );
    }

    #[test]
    fn string_pattern() {
        let constraint = build(&StringKind, json!({"pattern": "^[a-z-]+$"}));
        assert!(constraint.resolve(&json!("my-cluster")).is_ok());
        assert_eq!(
            invalid_message(constraint.resolve(&json!("My Cluster"))),
            "Does not match the required pattern."
        );
    }

    #[test]
    fn invalid_pattern_is_a_configuration_error() {
        let err = StringKind
            .build(&context(json!({"pattern": "("}), PriorValue::Absent))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::ImproperlyConfigured(_)));
    }

    // ── integer ───────────────────────────────────────────────────────────────

    #[test]
    fn integer_accepts_numeric_strings() {
        let constraint = build(&IntegerKind, json!({}));
        assert_eq!(constraint.resolve(&json!("42")).unwrap(), json!(42));
        assert_eq!(constraint.resolve(&json!(" 7 ")).unwrap(), json!(7));
    }

    #[test]
    fn integer_never_truncates_floats() {
        let constraint = build(&IntegerKind, json!({}));
        assert_eq!(constraint.resolve(&json!(3.0)).unwrap(), json!(3));
        assert_eq!(
            invalid_message(constraint.resolve(&json!(3.7))),
            "Must be an integer."
        );
    }

    #[test]
    fn integer_range() {
        let constraint = build(&IntegerKind, json!({"min": 1, "max": 10}));
        assert!(constraint.resolve(&json!(1)).is_ok());
        assert_eq!(
            invalid_message(constraint.resolve(&json!(0))),
            "Must be at least 1."
        );
        assert_eq!(
            invalid_message(constraint.resolve(&json!(11))),
            "Must be at most 10."
        );
    }

    // ── number ────────────────────────────────────────────────────────────────

    #[test]
    fn number_range_and_coercion() {
        let constraint = build(&NumberKind, json!({"min": 0.5, "max": 2.0}));
        assert!(constraint.resolve(&json!(1.5)).is_ok());
        assert!(constraint.resolve(&json!("0.75")).is_ok());
        assert!(constraint.resolve(&json!(0.1)).is_err());
        assert!(constraint.resolve(&json!("abc")).is_err());
    }

    // ── choice ────────────────────────────────────────────────────────────────

    #[test]
    fn choice_membership() {
        let constraint = build(&ChoiceKind, json!({"choices": ["calico", "flannel"]}));
        assert!(constraint.resolve(&json!("calico")).is_ok());
        assert_eq!(
            invalid_message(constraint.resolve(&json!("cilium"))),
            "Not a valid choice."
        );
    }

    #[test]
    fn choice_requires_choices_option() {
        let err = ChoiceKind
            .build(&context(json!({}), PriorValue::Absent))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::ImproperlyConfigured(_)));
    }

    // ── boolean ───────────────────────────────────────────────────────────────

    #[test]
    fn boolean_exact_acceptance_set() {
        let constraint = build(&BooleanKind, json!({}));
        for (input, expected) in [
            (json!(true), true),
            (json!(false), false),
            (json!(1), true),
            (json!(0), false),
            (json!("1"), true),
            (json!("0"), false),
            (json!("true"), true),
            (json!("false"), false),
            (json!("yes"), true),
            (json!("no"), false),
        ] {
            assert_eq!(constraint.resolve(&input).unwrap(), json!(expected));
        }
        for rejected in [json!("True"), json!("YES"), json!("on"), json!(2), json!(1.0)] {
            assert!(constraint.resolve(&rejected).is_err(), "accepted {rejected}");
        }
    }

    #[test]
    fn permanent_boolean_cannot_be_disabled() {
        let ctx = context(json!({"permanent": true}), PriorValue::Known(json!(true)));
        let constraint = BooleanKind.build(&ctx).unwrap();
        assert_eq!(
            invalid_message(constraint.resolve(&json!(false))),
            "Cannot be disabled once enabled."
        );
        // Re-submitting the same truthy value is idempotent.
        assert_eq!(constraint.resolve(&json!(true)).unwrap(), json!(true));
    }

    #[test]
    fn permanent_boolean_with_falsy_previous_can_toggle() {
        let ctx = context(json!({"permanent": true}), PriorValue::Known(json!(false)));
        let constraint = BooleanKind.build(&ctx).unwrap();
        assert!(constraint.resolve(&json!(false)).is_ok());
        assert!(constraint.resolve(&json!(true)).is_ok());
    }

    // ── list ──────────────────────────────────────────────────────────────────

    #[test]
    fn list_length_bounds() {
        let constraint = build(&ListKind, json!({"min_length": 1, "max_length": 2}));
        assert!(constraint.resolve(&json!(["a"])).is_ok());
        assert_eq!(
            invalid_message(constraint.resolve(&json!([]))),
            "Must have at least 1 items."
        );
        assert_eq!(
            invalid_message(constraint.resolve(&json!(["a", "b", "c"]))),
            "Must have at most 2 items."
        );
    }

    #[test]
    fn list_validates_items_positionally() {
        let constraint = build(
            &ListKind,
            json!({"item": {"kind": "integer", "options": {"min": 1}}}),
        );
        assert_eq!(
            constraint.resolve(&json!([1, "2", 3.0])).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            invalid_message(constraint.resolve(&json!([1, 0]))),
            "Item 2: Must be at least 1."
        );
    }

    #[test]
    fn list_items_see_previous_values_by_index() {
        // permanent booleans: index 0 was enabled, index 1 was not, index 2
        // has no previous value (previous list was shorter).
        let ctx = context(
            json!({"item": {"kind": "boolean", "options": {"permanent": true}}}),
            PriorValue::Known(json!([true, false])),
        );
        let constraint = ListKind.build(&ctx).unwrap();

        assert_eq!(
            invalid_message(constraint.resolve(&json!([false, false, false]))),
            "Item 1: Cannot be disabled once enabled."
        );
        assert!(constraint.resolve(&json!([true, true, false])).is_ok());
    }

    #[test]
    fn surplus_previous_items_are_unused() {
        let ctx = context(
            json!({"item": {"kind": "boolean", "options": {"permanent": true}}}),
            PriorValue::Known(json!([true, true, true])),
        );
        let constraint = ListKind.build(&ctx).unwrap();
        // Only index 0 is checked against its previous value; the surplus
        // previous items do not constrain anything.
        assert_eq!(
            invalid_message(constraint.resolve(&json!([false]))),
            "Item 1: Cannot be disabled once enabled."
        );
        assert!(constraint.resolve(&json!([true])).is_ok());
    }

    #[test]
    fn unknown_item_kind_fails_at_build_time() {
        let err = ListKind
            .build(&context(
                json!({"item": {"kind": "no-such-kind"}}),
                PriorValue::Absent,
            ))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::ImproperlyConfigured(_)));
    }
}
