//! Time-boxed provisioning schedules.
//!
//! The only persisted/wire representation this core defines: a single JSON
//! object with one key, `end_time`, as an RFC-3339 UTC timestamp.

use crate::error::ValidationErrors;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A schedule limiting how long the provisioned resources may live.
///
/// Accepted from the caller, validated once, and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub end_time: DateTime<Utc>,
}

impl Schedule {
    /// Accept a schedule, requiring the end time to be strictly in the
    /// future at acceptance time.
    ///
    /// A non-future end time is a user-correctable failure keyed
    /// `"schedule"`, not an operational error.
    pub fn accept(end_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        if end_time <= now {
            return Err(ValidationErrors::single(
                "schedule",
                "End time must be in the future.",
            ));
        }
        Ok(Self { end_time })
    }

    /// Canonical wire form of the end time (second precision, `Z` suffix).
    pub fn end_time_rfc3339(&self) -> String {
        self.end_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Hex SHA-256 over the canonical wire form.
    ///
    /// Folded into emitted scheduling-resource names so that re-emitting
    /// the same schedule resolves to the same backend object.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.end_time_rfc3339().as_bytes());
        hex::encode(hasher.finalize())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn future_end_time_is_accepted() {
        let end = now() + chrono::Duration::hours(2);
        let schedule = Schedule::accept(end, now()).unwrap();
        assert_eq!(schedule.end_time, end);
    }

    #[test]
    fn past_end_time_is_a_field_failure() {
        let errors = Schedule::accept(now() - chrono::Duration::hours(1), now()).unwrap_err();
        assert_eq!(errors.get("schedule"), Some("End time must be in the future."));
    }

    #[test]
    fn end_time_equal_to_now_is_rejected() {
        assert!(Schedule::accept(now(), now()).is_err());
    }

    #[test]
    fn wire_form_is_a_single_end_time_key() {
        let schedule = Schedule::accept(now() + chrono::Duration::days(1), now()).unwrap();
        let json = serde_json::to_value(schedule).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["end_time"], "2026-03-02T12:00:00Z");

        let back: Schedule = serde_json::from_value(json).unwrap();
        assert_eq!(back, schedule);
    }

    #[test]
    fn digest_is_stable_for_equal_schedules() {
        let a = Schedule::accept(now() + chrono::Duration::hours(1), now()).unwrap();
        let b = Schedule::accept(now() + chrono::Duration::hours(1), now()).unwrap();
        let c = Schedule::accept(now() + chrono::Duration::hours(2), now()).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
