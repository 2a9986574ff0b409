//! Parameter model: declarations, raw input, validated output and the
//! previous-value sentinel.
//!
//! The central design decision is that *raw* and *validated* parameter sets
//! are distinct types.  [`RawParams`] is whatever the caller submitted;
//! [`ValidatedParams`] can only be produced by the schema compiler in
//! `gantry-engine`.  Downstream code (resource calculators, the creation
//! path) accepts only [`ValidatedParams`], so accidentally re-validating or
//! consuming unvalidated input is a type error rather than a runtime check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// ParameterDeclaration
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable descriptor of one provisioning parameter.
///
/// The declarations for one cluster/application type form an ordered `Vec`;
/// order is insignificant for validation but the sequence as a whole is the
/// type's contract.
///
/// # Example
///
/// ```rust
/// use gantry_kernel::ParameterDeclaration;
///
/// let workers = ParameterDeclaration::new("workers", "cloud.size")
///     .required()
///     .with_option("min_cpus", 4);
/// assert!(workers.required);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    /// Unique key within one type's declaration sequence.
    pub name: String,
    /// Selects the constraint-registry entry used to validate values.
    pub kind: String,
    /// Kind-specific configuration (`min`, `max`, `choices`, `min_cpus`, …).
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Missing-and-no-default is a field-level failure when set.
    #[serde(default)]
    pub required: bool,
    /// Synthesized when the parameter is absent from the input.
    #[serde(default)]
    pub default: Option<Value>,
    /// The value may never change after first acceptance.
    #[serde(default)]
    pub immutable: bool,
    /// Presentation-only flag; irrelevant to validation.
    #[serde(default)]
    pub hidden: bool,
}

impl ParameterDeclaration {
    /// Construct a minimal declaration of the given constraint kind.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: Map::new(),
            required: false,
            default: None,
            immutable: false,
            hidden: false,
        }
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the parameter as immutable after first acceptance.
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Hide the parameter from catalog presentation.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Set the default value synthesized when the parameter is absent.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Add one kind-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RawParams
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-submitted parameter values, untrusted until compiled + validated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawParams(HashMap<String, Value>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one submitted value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Value>> for RawParams {
    fn from(values: HashMap<String, Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<(String, Value)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ValidatedParams
// ─────────────────────────────────────────────────────────────────────────────

/// A fully resolved parameter set: defaults applied, kind-specific coercion
/// applied (e.g. a `cloud.size` parameter holds the size *id* string).
///
/// Only the schema compiler constructs this type; everything downstream
/// treats it as read-only and never re-validates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedParams {
    values: HashMap<String, Value>,
}

impl ValidatedParams {
    /// Wrap a fully resolved value map.
    ///
    /// Reserved for the schema compiler (and for test fixtures); calling
    /// this with unvalidated input defeats the type-level guarantee.
    pub fn from_resolved(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The value for `name`, if it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate resolved `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Previous values
// ─────────────────────────────────────────────────────────────────────────────

/// Three-state previous-value sentinel.
///
/// "No previous value" must be distinguishable from "previous value was
/// explicitly `null`/empty": immutability and idempotent re-selection rules
/// behave differently in the two cases, so `Option<Value>` is not enough.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorValue {
    /// The parameter had no previously accepted value.
    Absent,
    /// The previously accepted value, which may itself be `null`.
    Known(Value),
}

impl PriorValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, PriorValue::Absent)
    }

    /// The previous value, if one was accepted.
    pub fn known(&self) -> Option<&Value> {
        match self {
            PriorValue::Absent => None,
            PriorValue::Known(value) => Some(value),
        }
    }

    /// True when a previous value exists and equals `value`.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(self, PriorValue::Known(prev) if prev == value)
    }
}

/// The last-accepted value for each parameter of an existing resource.
///
/// Absence of a key means "no previous value"; [`PreviousValues::get`]
/// returns the explicit [`PriorValue`] sentinel rather than an `Option` so
/// callers cannot conflate the two.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PreviousValues(HashMap<String, Value>);

impl PreviousValues {
    /// No previous values at all (first-time provisioning).
    pub fn none() -> Self {
        Self::default()
    }

    /// Record the last-accepted value for one parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// The previous-value sentinel for `name`.
    pub fn get(&self, name: &str) -> PriorValue {
        match self.0.get(name) {
            Some(value) => PriorValue::Known(value.clone()),
            None => PriorValue::Absent,
        }
    }
}

impl From<HashMap<String, Value>> for PreviousValues {
    fn from(values: HashMap<String, Value>) -> Self {
        Self(values)
    }
}

// =============================================================================
// Tests
// =============================================================================
