//! Scheduling resource emitter.
//!
//! After an admitted request is persisted, the emitter materializes its
//! time-bounded footprint in the scheduling layer.  Backends that support
//! reservations get a reservation request (open-ended when no schedule was
//! supplied); backends that do not, but where the request carries a
//! schedule, get a standalone expiry record; otherwise nothing is emitted.

use crate::ledger::ResourceLedger;
use chrono::{DateTime, Utc};
use gantry_kernel::error::EngineError;
use gantry_kernel::schedule::Schedule;
use serde::Serialize;
use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// Owner reference attached to every emitted resource so the scheduling
/// layer garbage-collects it with the admitted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

impl OwnerRef {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// One machine line of a reservation, by size id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineReservation {
    pub size_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResources {
    pub machines: Vec<MachineReservation>,
}

/// Reservation of the admitted footprint, optionally time-bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub name: String,
    pub owner_ref: OwnerRef,
    pub cloud_credentials_secret_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    pub resources: ReservationResources,
}

/// Standalone expiry record for backends without reservation support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryRequest {
    pub name: String,
    pub owner_ref: OwnerRef,
    /// The object to tear down when the deadline passes.
    #[serde(rename = "ref")]
    pub target_ref: String,
    pub not_after: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend seam and emitter
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduling-layer operations the emitter depends on.
pub trait ReservationBackend: Send + Sync {
    /// Whether the backend accepts reservation requests at all.
    fn supports_reservations(&self) -> Result<bool, EngineError>;

    fn create_reservation(&self, request: &ReservationRequest) -> Result<(), EngineError>;

    fn create_expiry_record(&self, request: &ExpiryRequest) -> Result<(), EngineError>;
}

impl<B: ReservationBackend + ?Sized> ReservationBackend for std::sync::Arc<B> {
    fn supports_reservations(&self) -> Result<bool, EngineError> {
        (**self).supports_reservations()
    }

    fn create_reservation(&self, request: &ReservationRequest) -> Result<(), EngineError> {
        (**self).create_reservation(request)
    }

    fn create_expiry_record(&self, request: &ExpiryRequest) -> Result<(), EngineError> {
        (**self).create_expiry_record(request)
    }
}

/// What the emitter did for one admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    Reservation { name: String },
    ExpiryRecord { name: String },
    Skipped,
}

pub struct ScheduleEmitter<B> {
    backend: B,
}

impl<B: ReservationBackend> ScheduleEmitter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Emit the scheduling resource for one admitted request.
    ///
    /// Emitted names are deterministic functions of the owner and schedule,
    /// so a retried admission overwrites its own earlier emission instead
    /// of accumulating duplicates.
    pub fn emit(
        &self,
        owner: &OwnerRef,
        credentials_secret: &str,
        target_ref: &str,
        ledger: &ResourceLedger,
        schedule: Option<&Schedule>,
    ) -> Result<EmitOutcome, EngineError> {
        if self.backend.supports_reservations()? {
            let request = ReservationRequest {
                name: format!("{}-resv", owner.name),
                owner_ref: owner.clone(),
                cloud_credentials_secret_name: credentials_secret.to_owned(),
                ends_at: schedule.map(|s| s.end_time),
                resources: ReservationResources {
                    machines: ledger
                        .machines()
                        .map(|(id, requirement)| MachineReservation {
                            size_id: id.to_owned(),
                            count: requirement.count,
                        })
                        .collect(),
                },
            };
            if let Err(err) = self.backend.create_reservation(&request) {
                warn!(name = %request.name, error = %err, "reservation request failed");
                return Err(err);
            }
            return Ok(EmitOutcome::Reservation { name: request.name });
        }

        let Some(schedule) = schedule else {
            return Ok(EmitOutcome::Skipped);
        };
        let digest = schedule.digest();
        let request = ExpiryRequest {
            name: format!("{}-exp-{}", owner.name, &digest[..8]),
            owner_ref: owner.clone(),
            target_ref: target_ref.to_owned(),
            not_after: schedule.end_time,
        };
        if let Err(err) = self.backend.create_expiry_record(&request) {
            warn!(name = %request.name, error = %err, "expiry record failed");
            return Err(err);
        }
        Ok(EmitOutcome::ExpiryRecord { name: request.name })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_kernel::cloud::SizeRecord;
    use serde_json::json;
    use std::sync::Mutex;

    // ── Helpers ───────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingBackend {
        supports: bool,
        reservations: Mutex<Vec<ReservationRequest>>,
        expiries: Mutex<Vec<ExpiryRequest>>,
    }

    impl ReservationBackend for RecordingBackend {
        fn supports_reservations(&self) -> Result<bool, EngineError> {
            Ok(self.supports)
        }

        fn create_reservation(&self, request: &ReservationRequest) -> Result<(), EngineError> {
            self.reservations.lock().unwrap().push(request.clone());
            Ok(())
        }

        fn create_expiry_record(&self, request: &ExpiryRequest) -> Result<(), EngineError> {
            self.expiries.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    struct DownBackend;

    impl ReservationBackend for DownBackend {
        fn supports_reservations(&self) -> Result<bool, EngineError> {
            Err(EngineError::communication(
                "scheduler",
                "connection refused",
            ))
        }

        fn create_reservation(&self, _: &ReservationRequest) -> Result<(), EngineError> {
            unreachable!()
        }

        fn create_expiry_record(&self, _: &ExpiryRequest) -> Result<(), EngineError> {
            unreachable!()
        }
    }

    fn owner() -> OwnerRef {
        OwnerRef::new("gantry.dev/v1", "App", "web-1", "uid-1234")
    }

    fn ledger() -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        ledger.add_machines(2, SizeRecord::new("size-large", "m1.large", 8, 16_384));
        ledger
    }

    fn schedule() -> Schedule {
        let end = "2026-03-02T12:00:00Z".parse().unwrap();
        let now = "2026-03-01T00:00:00Z".parse().unwrap();
        Schedule::accept(end, now).unwrap()
    }

    // ── Reservation path ──────────────────────────────────────────────────────

    #[test]
    fn supporting_backend_gets_a_time_bounded_reservation() {
        let backend = RecordingBackend {
            supports: true,
            ..RecordingBackend::default()
        };
        let emitter = ScheduleEmitter::new(backend);
        let outcome = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), Some(&schedule()))
            .unwrap();

        assert_eq!(
            outcome,
            EmitOutcome::Reservation {
                name: "web-1-resv".into()
            }
        );
        let reservations = emitter.backend.reservations.lock().unwrap();
        assert_eq!(reservations.len(), 1);
        let request = &reservations[0];
        assert_eq!(request.cloud_credentials_secret_name, "cloud-creds");
        assert_eq!(request.ends_at, Some(schedule().end_time));
        assert_eq!(request.resources.machines.len(), 1);
        assert_eq!(request.resources.machines[0].size_id, "size-large");
        assert_eq!(request.resources.machines[0].count, 2);
    }

    #[test]
    fn supporting_backend_without_schedule_gets_open_ended_reservation() {
        let backend = RecordingBackend {
            supports: true,
            ..RecordingBackend::default()
        };
        let emitter = ScheduleEmitter::new(backend);
        let outcome = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), None)
            .unwrap();

        assert!(matches!(outcome, EmitOutcome::Reservation { .. }));
        let reservations = emitter.backend.reservations.lock().unwrap();
        assert_eq!(reservations[0].ends_at, None);
    }

    #[test]
    fn open_ended_reservation_omits_ends_at_on_the_wire() {
        let request = ReservationRequest {
            name: "web-1-resv".into(),
            owner_ref: owner(),
            cloud_credentials_secret_name: "cloud-creds".into(),
            ends_at: None,
            resources: ReservationResources {
                machines: vec![MachineReservation {
                    size_id: "size-large".into(),
                    count: 2,
                }],
            },
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("endsAt").is_none());
        assert_eq!(wire["ownerRef"]["apiVersion"], json!("gantry.dev/v1"));
        assert_eq!(wire["resources"]["machines"][0]["sizeId"], json!("size-large"));
    }

    // ── Expiry path ───────────────────────────────────────────────────────────

    #[test]
    fn non_supporting_backend_with_schedule_gets_expiry_record() {
        let emitter = ScheduleEmitter::new(RecordingBackend::default());
        let outcome = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), Some(&schedule()))
            .unwrap();

        let digest = schedule().digest();
        let expected = format!("web-1-exp-{}", &digest[..8]);
        assert_eq!(outcome, EmitOutcome::ExpiryRecord { name: expected.clone() });

        let expiries = emitter.backend.expiries.lock().unwrap();
        assert_eq!(expiries.len(), 1);
        assert_eq!(expiries[0].name, expected);
        assert_eq!(expiries[0].target_ref, "apps/web-1");
        assert_eq!(expiries[0].not_after, schedule().end_time);
        assert!(emitter.backend.reservations.lock().unwrap().is_empty());
    }

    #[test]
    fn expiry_record_wire_form_uses_ref_key() {
        let request = ExpiryRequest {
            name: "web-1-exp-0a1b2c3d".into(),
            owner_ref: owner(),
            target_ref: "apps/web-1".into(),
            not_after: schedule().end_time,
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["ref"], json!("apps/web-1"));
        assert_eq!(wire["notAfter"], json!("2026-03-02T12:00:00Z"));
    }

    #[test]
    fn emitted_names_are_deterministic() {
        let emitter = ScheduleEmitter::new(RecordingBackend::default());
        let first = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), Some(&schedule()))
            .unwrap();
        let second = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), Some(&schedule()))
            .unwrap();
        assert_eq!(first, second);
    }

    // ── Skip path ─────────────────────────────────────────────────────────────

    #[test]
    fn no_capability_and_no_schedule_emits_nothing() {
        let emitter = ScheduleEmitter::new(RecordingBackend::default());
        let outcome = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), None)
            .unwrap();

        assert_eq!(outcome, EmitOutcome::Skipped);
        assert!(emitter.backend.reservations.lock().unwrap().is_empty());
        assert!(emitter.backend.expiries.lock().unwrap().is_empty());
    }

    // ── Failure propagation ───────────────────────────────────────────────────

    #[test]
    fn backend_failure_propagates_as_engine_error() {
        let emitter = ScheduleEmitter::new(DownBackend);
        let err = emitter
            .emit(&owner(), "cloud-creds", "apps/web-1", &ledger(), Some(&schedule()))
            .unwrap_err();
        assert!(matches!(err, EngineError::CommunicationFailure { .. }));
    }
}
