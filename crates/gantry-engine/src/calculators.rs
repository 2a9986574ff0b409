//! Resource calculators: translate an accepted request into a ledger.
//!
//! Two independent translators populate a [`ResourceLedger`]:
//!
//! * [`ledger_from_params`] walks a type's parameter declarations against
//!   the validated parameter set (cluster-type and app provisioning).
//! * [`ledger_from_cluster`] walks a structured control-plane/node-group
//!   specification (template-based cluster provisioning).

use crate::ledger::ResourceLedger;
use gantry_kernel::cloud::CloudLookup;
use gantry_kernel::error::EngineError;
use gantry_kernel::params::{ParameterDeclaration, ValidatedParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Parameter-driven calculator
// ─────────────────────────────────────────────────────────────────────────────

/// Populate a ledger from a validated parameter set.
///
/// Only `cloud.size` and `cloud.volume_size` parameters consume new quota.
/// `cloud.volume` and `cloud.ip` parameters reference already-provisioned
/// resources and are deliberately excluded.  A parameter's `count_parameter`
/// option names another parameter holding its multiplier (default 1; a zero
/// multiplier contributes nothing).
///
/// The parameter set has already been validated, so a size id that no
/// longer resolves here is [`EngineError::ObjectNotFound`], not a
/// validation failure.
pub fn ledger_from_params(
    declarations: &[ParameterDeclaration],
    params: &ValidatedParams,
    lookup: &dyn CloudLookup,
) -> Result<ResourceLedger, EngineError> {
    let mut ledger = ResourceLedger::new();
    for declaration in declarations {
        let Some(value) = params.get(&declaration.name) else {
            continue;
        };
        if is_empty_value(value) {
            continue;
        }
        let count = multiplier(declaration, params)?;
        if count == 0 {
            continue;
        }
        match declaration.kind.as_str() {
            "cloud.size" => {
                let id = value.as_str().ok_or_else(|| {
                    EngineError::misconfigured(format!(
                        "parameter '{}' did not resolve to a size id",
                        declaration.name
                    ))
                })?;
                let size = lookup
                    .find_size(id)?
                    .ok_or_else(|| EngineError::not_found("size", id))?;
                ledger.add_machines(count, size);
            }
            "cloud.volume_size" => {
                let size_gb = value.as_u64().ok_or_else(|| {
                    EngineError::misconfigured(format!(
                        "parameter '{}' did not resolve to a volume size",
                        declaration.name
                    ))
                })?;
                ledger.add_volumes(count, size_gb);
            }
            _ => {}
        }
    }
    Ok(ledger)
}

/// A value present in the set but empty contributes no requirements.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn multiplier(
    declaration: &ParameterDeclaration,
    params: &ValidatedParams,
) -> Result<u64, EngineError> {
    let Some(name) = declaration.options.get("count_parameter").and_then(Value::as_str) else {
        return Ok(1);
    };
    match params.get(name) {
        None => Ok(1),
        Some(value) => value.as_u64().ok_or_else(|| {
            EngineError::misconfigured(format!(
                "count parameter '{name}' must be a non-negative integer"
            ))
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Structured-spec calculator
// ─────────────────────────────────────────────────────────────────────────────

/// One worker node group of a templated cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,
    /// Size id for every machine in the group.
    pub size: String,
    /// Fixed machine count when autoscaling is disabled.
    pub count: u64,
    /// Autoscaler floor; the conservative admission estimate.
    #[serde(default)]
    pub min_count: u64,
    #[serde(default)]
    pub autoscale: bool,
}

/// Structured cluster specification for template-based provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub control_plane_size: String,
    #[serde(default = "default_control_plane_count")]
    pub control_plane_count: u64,
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
}

fn default_control_plane_count() -> u64 {
    1
}

impl ClusterSpec {
    pub fn new(control_plane_size: impl Into<String>) -> Self {
        Self {
            control_plane_size: control_plane_size.into(),
            control_plane_count: default_control_plane_count(),
            node_groups: Vec::new(),
        }
    }

    pub fn with_control_plane_count(mut self, count: u64) -> Self {
        self.control_plane_count = count;
        self
    }

    pub fn with_node_group(mut self, group: NodeGroup) -> Self {
        self.node_groups.push(group);
        self
    }
}

/// Populate a ledger from a structured cluster specification.
///
/// The control-plane requirement is added exactly once; a zero
/// `control_plane_count` is rejected as a configuration error.  Autoscaling
/// groups are admitted at their floor (`min_count`); fixed groups at
/// `count`.  Ingress/monitoring volumes and external IPs are drawn from
/// pre-allocated pools, not freshly consumed quota, and are deliberately
/// excluded here.
pub fn ledger_from_cluster(
    spec: &ClusterSpec,
    lookup: &dyn CloudLookup,
) -> Result<ResourceLedger, EngineError> {
    // The spec may come straight off the wire; a zero control-plane count
    // is a template defect and must not reach the ledger's assertions.
    if spec.control_plane_count == 0 {
        return Err(EngineError::misconfigured(
            "control plane count must be at least 1",
        ));
    }

    let mut ledger = ResourceLedger::new();

    let control_plane = lookup
        .find_size(&spec.control_plane_size)?
        .ok_or_else(|| EngineError::not_found("size", &spec.control_plane_size))?;
    ledger.add_machines(spec.control_plane_count, control_plane);

    for group in &spec.node_groups {
        let size = lookup
            .find_size(&group.size)?
            .ok_or_else(|| EngineError::not_found("size", &group.size))?;
        let count = if group.autoscale { group.min_count } else { group.count };
        if count > 0 {
            ledger.add_machines(count, size);
        }
    }

    Ok(ledger)
}

// =============================================================================
// Tests
// =============================================================================
