//! Gantry kernel: contract types for the provisioning admission engine.
//!
//! This crate defines the *data shapes and trait seams* shared between the
//! admission engine and its callers.  No validation logic, no resource
//! arithmetic and no I/O live here; those belong in `gantry-engine`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              gantry-kernel  (this crate)                    │
//! │  ParameterDeclaration   RawParams / ValidatedParams         │
//! │  PriorValue / PreviousValues   CloudLookup trait            │
//! │  QuotaEntry / ProjectedQuotaEntry   Schedule                │
//! │  EngineError / ValidationErrors                             │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              gantry-engine  (runtime crate)                 │
//! │  ConstraintRegistry + built-in kinds                        │
//! │  SchemaCompiler → ValidatedParams                           │
//! │  ResourceLedger / calculators / quota projector             │
//! │  ScheduleEmitter  (reservation / expiry emission)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cloud;
pub mod error;
pub mod params;
pub mod quota;
pub mod schedule;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use cloud::{
    CloudLookup, ClusterRecord, ClusterStatus, ExternalIpRecord, MachineRecord, SizeRecord,
    VolumeRecord,
};
pub use error::{EngineError, ValidationErrors};
pub use params::{ParameterDeclaration, PreviousValues, PriorValue, RawParams, ValidatedParams};
pub use quota::{ProjectedQuotaEntry, QuotaEntry, QuotaProjection};
pub use schedule::Schedule;
