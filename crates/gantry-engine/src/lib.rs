//! Gantry engine: admission control for provisioning requests.
//!
//! The engine answers one question: *may this request be created, and what
//! does admitting it cost?*  It does so in four stages, each usable on its
//! own:
//!
//! 1. **Validation**: [`SchemaCompiler`] compiles a type's parameter
//!    declarations into a [`CompiledSchema`] using the kinds in a
//!    [`ConstraintRegistry`], then runs raw input through it to obtain a
//!    validated parameter set or the complete per-field failure map.
//! 2. **Calculation**: [`ledger_from_params`] / [`ledger_from_cluster`]
//!    translate the accepted request into a [`ResourceLedger`] of machine,
//!    volume and external-IP requirements.
//! 3. **Projection**: [`project`] folds the ledger summary into the
//!    tenant's quota snapshot and yields the admit/reject verdict.
//! 4. **Emission**: [`ScheduleEmitter`] materializes the admitted
//!    footprint in the scheduling layer as a reservation or expiry record.
//!
//! All stages are synchronous and side-effect free except emission, which
//! talks to a [`ReservationBackend`].

pub mod calculators;
pub mod compiler;
pub mod constraints;
pub mod emitter;
pub mod ledger;
pub mod projector;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use calculators::{ClusterSpec, NodeGroup, ledger_from_cluster, ledger_from_params};
pub use compiler::{CompiledSchema, SchemaCompiler, ValidateFailure};
pub use constraints::{Constraint, ConstraintContext, ConstraintError, ConstraintKind, ConstraintRegistry};
pub use emitter::{
    EmitOutcome, ExpiryRequest, MachineReservation, OwnerRef, ReservationBackend,
    ReservationRequest, ReservationResources, ScheduleEmitter,
};
pub use ledger::{MachineRequirement, ResourceLedger, ResourceSummary, VolumeRequirement};
pub use projector::project;
