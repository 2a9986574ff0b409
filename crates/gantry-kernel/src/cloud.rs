//! Cloud record types and the lookup trait seam.
//!
//! [`CloudLookup`] is the single kernel-level abstraction over the live
//! cloud session.  Concrete implementations (OpenStack, Cluster API, test
//! fakes) live with the provider adapters; the engine only ever sees this
//! trait.
//!
//! Every finder returns `Result<Option<Record>, EngineError>`: `Ok(None)`
//! is the ordinary not-found signal and never an error, while `Err` means
//! the backend itself could not be reached ([`EngineError::CommunicationFailure`]).

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// A machine size ("flavor") offered by the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRecord {
    /// Stable identifier; this is what a validated `cloud.size` parameter
    /// resolves to.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    pub cpus: u64,
    pub ram_mb: u64,
    #[serde(default)]
    pub disk_gb: u64,
    #[serde(default)]
    pub ephemeral_gb: u64,
    /// Provider extra specs (GPU models, CPU pinning, …).
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl SizeRecord {
    /// Construct a minimal size record.
    pub fn new(id: impl Into<String>, name: impl Into<String>, cpus: u64, ram_mb: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cpus,
            ram_mb,
            disk_gb: 0,
            ephemeral_gb: 0,
            properties: HashMap::new(),
        }
    }

    pub fn with_disk(mut self, disk_gb: u64) -> Self {
        self.disk_gb = disk_gb;
        self
    }

    pub fn with_ephemeral(mut self, ephemeral_gb: u64) -> Self {
        self.ephemeral_gb = ephemeral_gb;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// An already-provisioned machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: String,
    pub name: String,
}

/// A floating/external IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIpRecord {
    pub id: String,
    pub address: String,
    /// True when the address is currently bound to a port/machine.
    pub attached: bool,
}

/// A block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub id: String,
    pub size_gb: u64,
}

/// Lifecycle status of a cluster as reported by the cluster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterStatus {
    Ready,
    Provisioning,
    Degraded,
    Error,
}

impl ClusterStatus {
    pub fn is_ready(self) -> bool {
        self == ClusterStatus::Ready
    }
}

/// A provisioned Kubernetes cluster, looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub status: ClusterStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ClusterRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookup seam
// ─────────────────────────────────────────────────────────────────────────────

/// Live lookup capability supplied by the caller's cloud session.
///
/// Calls are ordinary synchronous network calls; timeout and cancellation
/// policy are the implementor's concern.
pub trait CloudLookup: Send + Sync {
    fn find_size(&self, id: &str) -> Result<Option<SizeRecord>, EngineError>;

    fn find_machine(&self, id: &str) -> Result<Option<MachineRecord>, EngineError>;

    fn find_external_ip(&self, id: &str) -> Result<Option<ExternalIpRecord>, EngineError>;

    fn find_volume(&self, id: &str) -> Result<Option<VolumeRecord>, EngineError>;

    /// Clusters are addressed by name, not id.
    fn find_cluster(&self, name: &str) -> Result<Option<ClusterRecord>, EngineError>;
}

// =============================================================================
// Tests
// =============================================================================
