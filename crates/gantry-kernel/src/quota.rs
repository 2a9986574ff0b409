//! Tenant quota types: the current snapshot and its projection.
//!
//! A [`QuotaEntry`] is one line of the tenant's quota snapshot as reported
//! by the provider; [`ProjectedQuotaEntry`] extends it with the delta a
//! pending request would add.  Both serialize directly into the HTTP
//! layer's conflict responses.

use serde::{Deserialize, Serialize};

/// One quota dimension of the tenant's current snapshot.
///
/// `resource` is drawn from a known but open vocabulary (`cpus`, `ram`,
/// `machines`, `external_ips`, `storage`, `volumes`, …).  A negative
/// `allocated` means unlimited and is never violated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    pub resource: String,
    /// Display label (defaults to the resource name).
    #[serde(default)]
    pub label: String,
    /// Display units ("", "MB", "GB", …).
    #[serde(default)]
    pub units: String,
    pub allocated: i64,
    pub used: u64,
}

impl QuotaEntry {
    /// Construct an entry with the resource name doubling as its label.
    pub fn new(resource: impl Into<String>, allocated: i64, used: u64) -> Self {
        let resource = resource.into();
        Self {
            label: resource.clone(),
            resource,
            units: String::new(),
            allocated,
            used,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.allocated < 0
    }
}

/// A quota entry projected forward by a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedQuotaEntry {
    #[serde(flatten)]
    pub entry: QuotaEntry,
    /// What the pending request would add.
    pub delta: u64,
    /// `used + delta`.
    pub projected: u64,
    /// False only when the dimension is limited and `projected` exceeds it.
    pub fits: bool,
}

impl ProjectedQuotaEntry {
    /// Project `entry` forward by `delta`.
    pub fn project(entry: QuotaEntry, delta: u64) -> Self {
        let projected = entry.used + delta;
        let fits = entry.is_unlimited() || projected <= entry.allocated as u64;
        Self {
            entry,
            delta,
            projected,
            fits,
        }
    }
}

/// The overall admission answer for one request.
///
/// `fits == false` is not an error: it is a successful computation whose
/// answer is "no", and `entries` carries the full per-dimension projection
/// for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaProjection {
    pub fits: bool,
    pub entries: Vec<ProjectedQuotaEntry>,
}

// =============================================================================
// Tests
// =============================================================================
