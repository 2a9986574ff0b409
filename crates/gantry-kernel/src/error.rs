//! Crate-level error types for `gantry-kernel`.
//!
//! Two disjoint failure categories exist in the admission engine:
//!
//! * [`EngineError`]: operational failures that resubmitting the same
//!   request cannot fix: an unreachable lookup backend, a failed emission
//!   call, a catalog definition naming an unknown constraint kind.  These
//!   propagate through `Result` and are logged by the engine.
//! * [`ValidationErrors`]: user-correctable, per-field failures.  These are
//!   *data*, not errors: the HTTP layer serializes them verbatim so the
//!   caller can fix every reported field in a single round trip.  They are
//!   never logged as errors.
//!
//! An admission rejection (quota does not fit) is neither: it is a
//! successful computation whose answer is "no", reported as a
//! [`QuotaProjection`](crate::quota::QuotaProjection).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Operational error type for the admission engine.
///
/// All variants are non-user-correctable; the engine performs no retries
/// itself and propagates these to the caller unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A reference that should resolve (e.g. a size id carried in an
    /// already-validated parameter set) no longer does.
    #[error("{kind} '{id}' not found")]
    ObjectNotFound { kind: &'static str, id: String },

    /// A lookup backend or the scheduling backend could not be reached.
    #[error("communication with {target} failed: {message}")]
    CommunicationFailure { target: String, message: String },

    /// A catalog or schema definition defect: unknown constraint kind,
    /// malformed constraint options, a non-numeric count parameter.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for [`EngineError::ObjectNotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for [`EngineError::CommunicationFailure`].
    pub fn communication(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommunicationFailure {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`EngineError::ImproperlyConfigured`].
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::ImproperlyConfigured(message.into())
    }
}

/// Per-field validation failures, keyed by parameter name.
///
/// Failures are collected across *all* fields before being reported (never
/// fail-fast), and the map is ordered so messages render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Create an empty failure set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a failure set with a single entry.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Record a failure for `field`.  A later failure for the same field
    /// replaces the earlier one.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Absorb every failure from `other`.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// The failure message for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate failures in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
