//! Quota projector: the admission verdict.

use crate::ledger::ResourceSummary;
use gantry_kernel::quota::{ProjectedQuotaEntry, QuotaEntry, QuotaProjection};

/// Project a request's resource summary against the tenant's quota
/// snapshot.
///
/// Pure function of its inputs: identical `(summary, quotas)` always yield
/// the identical projection.  For every quota dimension the tenant has, the
/// corresponding summary field is the delta (0 for dimensions the ledger
/// does not track); dimensions the ledger tracks but the tenant has no
/// quota line for are *not* independently checked; per the provider's
/// contract, an absent quota line means "no specific limit".
///
/// The snapshot is read once and never re-validated: two concurrent
/// admissions that each individually fit can jointly exceed quota.  Callers
/// needing at-most-one-concurrent-admission must serialize externally
/// (e.g. optimistic concurrency on the owning resource).
pub fn project(summary: &ResourceSummary, quotas: &[QuotaEntry]) -> QuotaProjection {
    let mut fits = true;
    let entries = quotas
        .iter()
        .map(|quota| {
            let delta = dimension_delta(summary, &quota.resource);
            let projected = ProjectedQuotaEntry::project(quota.clone(), delta);
            fits &= projected.fits;
            projected
        })
        .collect();
    QuotaProjection { fits, entries }
}

/// The summary field backing one quota dimension; unknown dimensions read
/// as zero.
fn dimension_delta(summary: &ResourceSummary, resource: &str) -> u64 {
    match resource {
        "cpus" => summary.cpus,
        "ram" => summary.ram_mb,
        "machines" => summary.machines,
        "external_ips" => summary.external_ips,
        "storage" => summary.storage_gb,
        "volumes" => summary.volumes,
        _ => 0,
    }
}

// =============================================================================
// Tests
// =============================================================================
