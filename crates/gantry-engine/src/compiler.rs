//! Parameter schema compiler.
//!
//! [`SchemaCompiler::compile`] turns an ordered sequence of
//! [`ParameterDeclaration`]s plus the previous-value set into a
//! [`CompiledSchema`]: one constraint chain per field, resolved against the
//! registry exactly once.  Running the compiled schema against raw input
//! either yields a [`ValidatedParams`] or the *complete* set of per-field
//! failures.  Validation never stops at the first bad field, so the caller
//! can correct everything in a single round trip.

use crate::constraints::{Constraint, ConstraintContext, ConstraintError, ConstraintRegistry};
use gantry_kernel::cloud::CloudLookup;
use gantry_kernel::error::{EngineError, ValidationErrors};
use gantry_kernel::params::{
    ParameterDeclaration, PreviousValues, PriorValue, RawParams, ValidatedParams,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a validation run could not produce a [`ValidatedParams`].
#[derive(Debug, Error)]
pub enum ValidateFailure {
    /// One or more fields failed; all failures are reported together.
    #[error("validation failed: {0}")]
    Invalid(ValidationErrors),

    /// An operational failure unrelated to the submitted values.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ValidateFailure {
    /// The per-field failures, when this is a validation outcome.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ValidateFailure::Invalid(errors) => Some(errors),
            ValidateFailure::Engine(_) => None,
        }
    }
}

/// Compiles declaration sequences into runnable schemas.
pub struct SchemaCompiler {
    registry: ConstraintRegistry,
}

impl SchemaCompiler {
    pub fn new(registry: ConstraintRegistry) -> Self {
        Self { registry }
    }

    /// Compile one type's declarations against the previous-value set.
    ///
    /// Fails with [`EngineError::ImproperlyConfigured`] when a declaration
    /// names an unknown kind or carries malformed options: catalog
    /// defects, not validation failures.
    pub fn compile(
        &self,
        declarations: &[ParameterDeclaration],
        previous: &PreviousValues,
        lookup: Arc<dyn CloudLookup>,
    ) -> Result<CompiledSchema, EngineError> {
        let mut fields = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            let prior = previous.get(&declaration.name);
            let kind = self.registry.get(&declaration.kind)?;
            let ctx = ConstraintContext {
                registry: self.registry.clone(),
                lookup: lookup.clone(),
                options: declaration.options.clone(),
                previous: prior.clone(),
            };
            let constraint = kind.build(&ctx)?;
            fields.push(CompiledField {
                declaration: declaration.clone(),
                previous: prior,
                constraint,
            });
        }
        debug!(fields = fields.len(), "compiled parameter schema");
        Ok(CompiledSchema { fields })
    }
}

struct CompiledField {
    declaration: ParameterDeclaration,
    previous: PriorValue,
    constraint: Box<dyn Constraint>,
}

/// A ready-to-run validator for one type's whole parameter set.
pub struct CompiledSchema {
    fields: Vec<CompiledField>,
}

impl CompiledSchema {
    /// Validate raw input, producing the fully resolved parameter set.
    ///
    /// Per field: the immutability rule is checked first (an immutable
    /// parameter with a previous value may only be re-submitted unchanged),
    /// then the kind constraint.  Absent fields are synthesized from their
    /// default when one exists; absent required fields without a default
    /// are field-level failures; absent optional fields are simply omitted
    /// from the output.
    pub fn validate(&self, raw: &RawParams) -> Result<ValidatedParams, ValidateFailure> {
        let mut errors = ValidationErrors::new();
        let mut resolved = HashMap::with_capacity(self.fields.len());

        for field in &self.fields {
            let declaration = &field.declaration;
            let submitted = raw
                .get(&declaration.name)
                .cloned()
                .or_else(|| declaration.default.clone());
            let Some(value) = submitted else {
                if declaration.required {
                    errors.insert(&declaration.name, "This field is required.");
                }
                continue;
            };

            if declaration.immutable {
                if let PriorValue::Known(previous) = &field.previous {
                    if *previous != value {
                        errors.insert(&declaration.name, "This field cannot be changed.");
                        continue;
                    }
                }
            }

            match field.constraint.resolve(&value) {
                Ok(value) => {
                    resolved.insert(declaration.name.clone(), value);
                }
                Err(ConstraintError::Invalid(message)) => {
                    errors.insert(&declaration.name, message);
                }
                Err(ConstraintError::Engine(err)) => return Err(ValidateFailure::Engine(err)),
            }
        }

        if errors.is_empty() {
            Ok(ValidatedParams::from_resolved(resolved))
        } else {
            Err(ValidateFailure::Invalid(errors))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
