//! Built-in cloud-reference constraint kinds.
//!
//! These resolve a submitted identifier (or, for clusters, a name) against
//! the caller's live [`CloudLookup`] session.  A not-found answer from the
//! lookup is always a *validation* failure attributable to the field; only
//! an unreachable backend surfaces as an operational error.

use super::{Constraint, ConstraintContext, ConstraintError, ConstraintKind, opt_str, opt_u64};
use gantry_kernel::cloud::CloudLookup;
use gantry_kernel::error::EngineError;
use gantry_kernel::params::PriorValue;
use serde_json::Value;
use std::sync::Arc;

fn value_as_id(value: &Value) -> Result<&str, ConstraintError> {
    match value.as_str() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ConstraintError::invalid("Must be an identifier string.")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// cloud.size
// ─────────────────────────────────────────────────────────────────────────────

/// `cloud.size`: the id must resolve to a size, optionally meeting minimum
/// hardware requirements.  Resolves to the size id string, not the record.
pub struct SizeKind;

struct SizeConstraint {
    lookup: Arc<dyn CloudLookup>,
    min_cpus: Option<u64>,
    min_ram: Option<u64>,
    min_disk: Option<u64>,
    min_ephemeral_disk: Option<u64>,
    required_properties: Vec<String>,
}

impl ConstraintKind for SizeKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        let required_properties = match ctx.options.get("has_properties") {
            None => Vec::new(),
            Some(value) => value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| {
                            item.as_str().map(str::to_string).ok_or_else(|| {
                                EngineError::misconfigured(
                                    "option 'has_properties' must be a list of strings",
                                )
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()
                })
                .ok_or_else(|| {
                    EngineError::misconfigured("option 'has_properties' must be a list of strings")
                })??,
        };
        Ok(Box::new(SizeConstraint {
            lookup: ctx.lookup.clone(),
            min_cpus: opt_u64(&ctx.options, "min_cpus")?,
            min_ram: opt_u64(&ctx.options, "min_ram")?,
            min_disk: opt_u64(&ctx.options, "min_disk")?,
            min_ephemeral_disk: opt_u64(&ctx.options, "min_ephemeral_disk")?,
            required_properties,
        }))
    }
}

impl Constraint for SizeConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let id = value_as_id(value)?;
        let Some(size) = self.lookup.find_size(id)? else {
            return Err(ConstraintError::invalid("Size not found."));
        };
        if self.min_cpus.is_some_and(|min| size.cpus < min) {
            return Err(ConstraintError::invalid("Size does not have enough CPUs."));
        }
        if self.min_ram.is_some_and(|min| size.ram_mb < min) {
            return Err(ConstraintError::invalid("Size does not have enough RAM."));
        }
        if self.min_disk.is_some_and(|min| size.disk_gb < min) {
            return Err(ConstraintError::invalid("Size does not have enough disk."));
        }
        if self
            .min_ephemeral_disk
            .is_some_and(|min| size.ephemeral_gb < min)
        {
            return Err(ConstraintError::invalid(
                "Size does not have enough ephemeral disk.",
            ));
        }
        if self
            .required_properties
            .iter()
            .any(|key| !size.properties.contains_key(key))
        {
            return Err(ConstraintError::invalid(
                "Size does not have required properties.",
            ));
        }
        Ok(Value::String(size.id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// cloud.machine / cloud.volume
// ─────────────────────────────────────────────────────────────────────────────

/// `cloud.machine`: the id must resolve to an existing machine.
pub struct MachineKind;

struct MachineConstraint {
    lookup: Arc<dyn CloudLookup>,
}

impl ConstraintKind for MachineKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(MachineConstraint {
            lookup: ctx.lookup.clone(),
        }))
    }
}

impl Constraint for MachineConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let id = value_as_id(value)?;
        match self.lookup.find_machine(id)? {
            Some(machine) => Ok(Value::String(machine.id)),
            None => Err(ConstraintError::invalid("Machine not found.")),
        }
    }
}

/// `cloud.volume`: the id must resolve to an existing volume.
pub struct VolumeKind;

struct VolumeConstraint {
    lookup: Arc<dyn CloudLookup>,
}

impl ConstraintKind for VolumeKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(VolumeConstraint {
            lookup: ctx.lookup.clone(),
        }))
    }
}

impl Constraint for VolumeConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let id = value_as_id(value)?;
        match self.lookup.find_volume(id)? {
            Some(volume) => Ok(Value::String(volume.id)),
            None => Err(ConstraintError::invalid("Volume not found.")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// cloud.volume_size
// ─────────────────────────────────────────────────────────────────────────────

/// `cloud.volume_size`: a strictly positive whole number of gigabytes for
/// a volume to be created.
pub struct VolumeSizeKind;

struct VolumeSizeConstraint {
    min: Option<u64>,
    max: Option<u64>,
}

impl ConstraintKind for VolumeSizeKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(VolumeSizeConstraint {
            min: opt_u64(&ctx.options, "min")?,
            max: opt_u64(&ctx.options, "max")?,
        }))
    }
}

impl Constraint for VolumeSizeConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let gb = super::scalar::coerce_integer(value)?;
        if gb < 1 {
            return Err(ConstraintError::invalid("Must be at least 1 GB."));
        }
        let gb = gb as u64;
        if let Some(min) = self.min {
            if gb < min {
                return Err(ConstraintError::invalid(format!("Must be at least {min} GB.")));
            }
        }
        if let Some(max) = self.max {
            if gb > max {
                return Err(ConstraintError::invalid(format!("Must be at most {max} GB.")));
            }
        }
        Ok(Value::from(gb))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// cloud.ip
// ─────────────────────────────────────────────────────────────────────────────

/// `cloud.ip`: the id must resolve to an external IP that is currently
/// unattached, unless it equals the previous value, so re-submitting an
/// update that keeps its own IP stays valid.
pub struct IpKind;

struct IpConstraint {
    lookup: Arc<dyn CloudLookup>,
    previous: PriorValue,
}

impl ConstraintKind for IpKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(IpConstraint {
            lookup: ctx.lookup.clone(),
            previous: ctx.previous.clone(),
        }))
    }
}

impl Constraint for IpConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let id = value_as_id(value)?;
        let Some(ip) = self.lookup.find_external_ip(id)? else {
            return Err(ConstraintError::invalid("External IP not found."));
        };
        if ip.attached && !self.previous.matches(value) {
            return Err(ConstraintError::invalid("External IP is already in use."));
        }
        Ok(Value::String(ip.id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// cloud.cluster
// ─────────────────────────────────────────────────────────────────────────────

/// `cloud.cluster`: the *name* must resolve to a cluster in ready status
/// (unless it equals the previous value), optionally carrying a required tag.
pub struct ClusterKind;

struct ClusterConstraint {
    lookup: Arc<dyn CloudLookup>,
    previous: PriorValue,
    required_tag: Option<String>,
}

impl ConstraintKind for ClusterKind {
    fn build(&self, ctx: &ConstraintContext) -> Result<Box<dyn Constraint>, EngineError> {
        Ok(Box::new(ClusterConstraint {
            lookup: ctx.lookup.clone(),
            previous: ctx.previous.clone(),
            required_tag: opt_str(&ctx.options, "tag")?.map(str::to_string),
        }))
    }
}

impl Constraint for ClusterConstraint {
    fn resolve(&self, value: &Value) -> Result<Value, ConstraintError> {
        let name = value_as_id(value)?;
        let Some(cluster) = self.lookup.find_cluster(name)? else {
            return Err(ConstraintError::invalid("Cluster not found."));
        };
        if !cluster.status.is_ready() && !self.previous.matches(value) {
            return Err(ConstraintError::invalid("Cluster is not ready."));
        }
        if let Some(tag) = &self.required_tag {
            if !cluster.has_tag(tag) {
                return Err(ConstraintError::invalid(format!(
                    "Cluster does not have the '{tag}' tag."
                )));
            }
        }
        Ok(Value::String(cluster.name))
    }
}

// =============================================================================
// Tests
// =============================================================================
