//! Request-scoped accumulator of resource requirements.
//!
//! A [`ResourceLedger`] is created fresh for each admission decision,
//! populated by a calculator, summarized, projected against quota and then
//! discarded.  Machine requirements merge per size; volume requirements are
//! independent entries; external IPs are a single counter.

use gantry_kernel::cloud::SizeRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Merged machine requirement for one size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineRequirement {
    pub count: u64,
    pub size: SizeRecord,
}

/// One volume requirement; never merged with others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeRequirement {
    pub count: u64,
    pub size_gb: u64,
}

/// Accumulator of the compute/storage/network resources one request needs.
///
/// All counts and sizes are strictly positive by construction: the `add_*`
/// methods assert it, so every reachable ledger state satisfies the
/// invariant and [`ResourceLedger::summarize`] can never go negative.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    machines: BTreeMap<String, MachineRequirement>,
    volumes: Vec<VolumeRequirement>,
    external_ips: u64,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `count` machines of `size`.  Requirements for the same size
    /// id merge by summing counts; the entry is never overwritten.
    ///
    /// # Panics
    ///
    /// When `count` is zero (a caller bug, not a user-facing failure).
    pub fn add_machines(&mut self, count: u64, size: SizeRecord) {
        assert!(count > 0, "machine count must be strictly positive");
        self.machines
            .entry(size.id.clone())
            .and_modify(|requirement| requirement.count += count)
            .or_insert(MachineRequirement { count, size });
    }

    /// Require `count` volumes of `size_gb` each.  Every call appends an
    /// independent entry.
    ///
    /// # Panics
    ///
    /// When `count` or `size_gb` is zero.
    pub fn add_volumes(&mut self, count: u64, size_gb: u64) {
        assert!(count > 0, "volume count must be strictly positive");
        assert!(size_gb > 0, "volume size must be strictly positive");
        self.volumes.push(VolumeRequirement { count, size_gb });
    }

    /// Require `count` more external IPs.
    ///
    /// # Panics
    ///
    /// When `count` is zero.
    pub fn add_external_ips(&mut self, count: u64) {
        assert!(count > 0, "external IP count must be strictly positive");
        self.external_ips += count;
    }

    /// Machine requirements in size-id order.
    pub fn machines(&self) -> impl Iterator<Item = (&str, &MachineRequirement)> {
        self.machines.iter().map(|(id, req)| (id.as_str(), req))
    }

    pub fn volumes(&self) -> &[VolumeRequirement] {
        &self.volumes
    }

    pub fn external_ips(&self) -> u64 {
        self.external_ips
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty() && self.volumes.is_empty() && self.external_ips == 0
    }

    /// Pure scalar totals over the current ledger state.
    pub fn summarize(&self) -> ResourceSummary {
        let mut summary = ResourceSummary {
            external_ips: self.external_ips,
            ..ResourceSummary::default()
        };
        for requirement in self.machines.values() {
            summary.machines += requirement.count;
            summary.cpus += requirement.count * requirement.size.cpus;
            summary.ram_mb += requirement.count * requirement.size.ram_mb;
        }
        for requirement in &self.volumes {
            summary.volumes += requirement.count;
            summary.storage_gb += requirement.count * requirement.size_gb;
        }
        summary
    }
}

/// Immutable scalar totals of a ledger; every field is a delta the request
/// would add to the tenant's usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub machines: u64,
    pub volumes: u64,
    pub external_ips: u64,
    pub cpus: u64,
    pub ram_mb: u64,
    pub storage_gb: u64,
}

// =============================================================================
// Tests
// =============================================================================
