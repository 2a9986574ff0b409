//! Constraint registry and built-in parameter constraint kinds.
//!
//! A *kind* names the validation strategy for one parameter (`integer`,
//! `choice`, `cloud.size`, …).  Each kind is a factory: given the compile
//! context (options, previous value, live cloud lookup) it builds a
//! single-value [`Constraint`].  The registry is constructor-injected,
//! with no process-global registration, so tests can register
//! scenario-specific kinds without cross-test interference, and new kinds
//! can be added without touching the schema compiler.

mod cloud;
mod scalar;

pub use cloud::{ClusterKind, IpKind, MachineKind, SizeKind, VolumeKind, VolumeSizeKind};
pub use scalar::{BooleanKind, ChoiceKind, IntegerKind, ListKind, NumberKind, StringKind};

use gantry_kernel::cloud::CloudLookup;
use gantry_kernel::error::EngineError;
use gantry_kernel::params::PriorValue;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Check outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Failure channel of a single-value constraint check.
///
/// The compiler collects [`ConstraintError::Invalid`] messages per field
/// and keeps going; an [`ConstraintError::Engine`] failure aborts the whole
/// validation run.
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// User-correctable: the submitted value is malformed, out of range,
    /// or references something that does not (or no longer) exist.
    #[error("{0}")]
    Invalid(String),

    /// Operational: the lookup backend failed, or the constraint itself is
    /// misconfigured.  Not attributable to the submitted value.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ConstraintError {
    /// Shorthand for [`ConstraintError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// A compiled single-value validator.
pub trait Constraint {
    /// Check one submitted value and return its resolved (coerced,
    /// normalized) form.
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Kind factory
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a kind factory may consult while building a constraint.
#[derive(Clone)]
pub struct ConstraintContext {
    /// Registry building this constraint; lets composite kinds (`list`)
    /// build their item constraints.
    pub registry: ConstraintRegistry,
    /// Live cloud session supplied by the caller.
    pub lookup: Arc<dyn CloudLookup>,
    /// Kind-specific options from the parameter declaration.
    pub options: Map<String, Value>,
    /// Previous-value sentinel for the parameter being compiled.
    pub previous: PriorValue,
}

impl ConstraintContext {
    /// Derive a context for a child constraint (used by `list` items).
    pub fn child(&self, options: Map<String, Value>, previous: PriorValue) -> Self {
        Self {
            registry: self.registry.clone(),
            lookup: self.lookup.clone(),
            options,
            previous,
        }
    }
}

/// Factory for one constraint kind.
///
/// Option defects (wrong type, invalid regex, missing `choices`) are
/// configuration errors, reported as [`EngineError::ImproperlyConfigured`],
/// never as validation failures.
pub trait ConstraintKind: Send + Sync {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Mapping from kind name to factory, resolved once at schema-compile time.
#[derive(Clone, Default)]
pub struct ConstraintRegistry {
    kinds: HashMap<String, Arc<dyn ConstraintKind>>,
}

impl ConstraintRegistry {
    /// A registry with no kinds at all; mainly for tests.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in kind registered.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("string", Arc::new(StringKind));
        registry.register("integer", Arc::new(IntegerKind));
        registry.register("number", Arc::new(NumberKind));
        registry.register("choice", Arc::new(ChoiceKind));
        registry.register("boolean", Arc::new(BooleanKind));
        registry.register("list", Arc::new(ListKind));
        registry.register("cloud.size", Arc::new(SizeKind));
        registry.register("cloud.machine", Arc::new(MachineKind));
        registry.register("cloud.ip", Arc::new(IpKind));
        registry.register("cloud.volume", Arc::new(VolumeKind));
        registry.register("cloud.volume_size", Arc::new(VolumeSizeKind));
        registry.register("cloud.cluster", Arc::new(ClusterKind));
        registry
    }

    /// Register (or replace) a kind under `name`.
    pub fn register(&mut self, name: impl Into<String>, kind: Arc<dyn ConstraintKind>) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Resolve a kind by name.
    ///
    /// An unknown kind is a catalog defect, not a validation failure.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ConstraintKind>, EngineError> {
        self.kinds.get(name).cloned().ok_or_else(|| {
            EngineError::misconfigured(format!("unknown constraint kind '{name}'"))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Option readers
// ─────────────────────────────────────────────────────────────────────────────
//
// Shared by the built-in kinds: read a typed option or fail with
// ImproperlyConfigured naming the option.

pub(crate) fn opt_u64(options: &Map<String, Value>, key: &str) -> Result<Option<u64>, EngineError> {
    match options.get(key) {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            EngineError::misconfigured(format!("option '{key}' must be a non-negative integer"))
        }),
    }
}

pub(crate) fn opt_i64(options: &Map<String, Value>, key: &str) -> Result<Option<i64>, EngineError> {
    match options.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| EngineError::misconfigured(format!("option '{key}' must be an integer"))),
    }
}

pub(crate) fn opt_f64(options: &Map<String, Value>, key: &str) -> Result<Option<f64>, EngineError> {
    match options.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| EngineError::misconfigured(format!("option '{key}' must be a number"))),
    }
}

pub(crate) fn opt_str<'a>(
    options: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, EngineError> {
    match options.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| EngineError::misconfigured(format!("option '{key}' must be a string"))),
    }
}

pub(crate) fn opt_bool(options: &Map<String, Value>, key: &str) -> Result<bool, EngineError> {
    match options.get(key) {
        None => Ok(false),
        Some(value) => value
            .as_bool()
            .ok_or_else(|| EngineError::misconfigured(format!("option '{key}' must be a boolean"))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::testutil::NullCloud;
    use serde_json::json;

    struct UppercaseKind;

    struct UppercaseConstraint;

    impl Constraint for UppercaseConstraint {
        fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
            let s = value
                .as_str()
                .ok_or_else(|| ConstraintError::invalid("Must be a string."))?;
            Ok(Value::String(s.to_uppercase()))
        }
    }

    impl ConstraintKind for UppercaseKind {
        fn build(&self, _ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
            Ok(Box::new(UppercaseConstraint))
        }
    }

    fn context(registry: &ConstraintRegistry) -> ConstraintContext {
        ConstraintContext {
            registry: registry.clone(),
            lookup: Arc::new(NullCloud),
            options: Map::new(),
            previous: PriorValue::Absent,
        }
    }

    #[test]
    fn unknown_kind_is_a_configuration_error() {
        let registry = ConstraintRegistry::empty();
        let err = registry.get("no-such-kind").err().unwrap();
        assert!(matches!(err, EngineError::ImproperlyConfigured(_)));
    }

    #[test]
    fn builtin_registry_knows_all_kinds() {
        let registry = ConstraintRegistry::builtin();
        for kind in [
            "string",
            "integer",
            "number",
            "choice",
            "boolean",
            "list",
            "cloud.size",
            "cloud.machine",
            "cloud.ip",
            "cloud.volume",
            "cloud.volume_size",
            "cloud.cluster",
        ] {
            assert!(registry.contains(kind), "missing builtin kind {kind}");
        }
    }

    #[test]
    fn scenario_specific_kinds_can_be_injected() {
        let mut registry = ConstraintRegistry::empty();
        registry.register("uppercase", Arc::new(UppercaseKind));

        let ctx = context(&registry);
        let constraint = registry.get("uppercase").unwrap().build(&ctx).unwrap();
        assert_eq!(constraint.resolve(&json!("abc")).unwrap(), json!("ABC"));
    }

    #[test]
    fn option_readers_reject_wrong_types() {
        let mut options = Map::new();
        options.insert("min".into(), json!("three"));
        assert!(opt_u64(&options, "min").is_err());
        assert!(opt_u64(&options, "absent").unwrap().is_none());
    }
}
