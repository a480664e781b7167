//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads the provider-facing description of every resource kind
//! from embedded JSON files: which CLI operations list, describe, delete and
//! stop it, where the interesting fields live in the responses, and how the
//! provider's status strings map onto [`ResourceState`].

use super::kind::ResourceKind;
use super::state::ResourceState;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/sagemaker.json"),
    include_str!("../resources/bedrock.json"),
    include_str!("../resources/compute.json"),
];

/// One CLI operation against a single resource
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDef {
    pub operation: String,
    /// Flag carrying the resource name (or id, see `use_id`)
    pub id_param: String,
    /// Pass the provider-assigned id instead of the name
    #[serde(default)]
    pub use_id: bool,
    /// Flag carrying the descriptor's parent
    #[serde(default)]
    pub parent_param: Option<String>,
    /// Extra fixed arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Dot path to the resource object in the response ("" = top level)
    #[serde(default)]
    pub response_path: String,
}

/// Listing of parents that a child kind must be enumerated under
#[derive(Debug, Clone, Deserialize)]
pub struct FanOutDef {
    pub operation: String,
    pub response_path: String,
    pub name_field: String,
}

/// How the emergency stop treats a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAction {
    Delete,
    Stop,
}

impl SweepAction {
    pub fn verb(self) -> &'static str {
        match self {
            SweepAction::Delete => "delete",
            SweepAction::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepDef {
    pub action: SweepAction,
    /// States in which the resource is still billing
    pub states: Vec<ResourceState>,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub service: String,
    pub list_operation: String,
    #[serde(default)]
    pub list_args: Vec<String>,
    /// Values passed after a single `--filters` flag
    #[serde(default)]
    pub filters: Vec<String>,
    /// Dot path to the item array in the list response ("" = top level)
    pub response_path: String,
    /// List output is paginated through `--max-items` / `--starting-token`
    #[serde(default)]
    pub paginated: bool,
    pub name_field: String,
    /// Keep only the segment after the last ':' of the name field
    #[serde(default)]
    pub name_from_arn: bool,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub status_field: Option<String>,
    #[serde(default)]
    pub created_field: Option<String>,
    #[serde(default)]
    pub parent_field: Option<String>,
    /// Server-side substring filter flag (e.g. `--name-contains`)
    #[serde(default)]
    pub name_filter_param: Option<String>,
    /// Server-side parent filter flag (e.g. `--domain-id-equals`)
    #[serde(default)]
    pub parent_filter_param: Option<String>,
    #[serde(default)]
    pub fan_out: Option<FanOutDef>,
    #[serde(default)]
    pub describe: Option<OperationDef>,
    #[serde(default)]
    pub delete: Option<OperationDef>,
    #[serde(default)]
    pub stop: Option<OperationDef>,
    /// Provider status string -> normalized state
    #[serde(default)]
    pub status_map: HashMap<String, ResourceState>,
    /// State of status-less kinds that exist at all
    #[serde(default)]
    pub default_state: Option<ResourceState>,
    #[serde(default)]
    pub sweep: Option<SweepDef>,
}

impl ResourceDef {
    /// Map a provider status onto a normalized state
    pub fn state_for(&self, status: Option<&str>) -> ResourceState {
        match status {
            Some(s) => self
                .status_map
                .get(s)
                .copied()
                .unwrap_or(ResourceState::Unknown),
            None => self.default_state.unwrap_or(ResourceState::Unknown),
        }
    }

    /// Whether a resource in `state` should be acted on by a sweep
    pub fn is_billable(&self, state: ResourceState) -> bool {
        self.sweep
            .as_ref()
            .map(|s| s.states.contains(&state))
            .unwrap_or(false)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get the definition of a resource kind
pub fn get_resource(kind: ResourceKind) -> Option<&'static ResourceDef> {
    get_registry().resources.get(kind.key())
}
