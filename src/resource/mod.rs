//! Resource abstraction layer
//!
//! This module provides a data-driven approach to managing provider resources.
//! Resource definitions are loaded from JSON files at compile time, so the
//! CLI operations and status strings of a kind live in one place.
//!
//! # Architecture
//!
//! - [`kind`] - Resource kinds, descriptors and summaries
//! - [`state`] - Normalized states and per-kind transition tables
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`fetcher`] - Lists resources through the aws CLI with pagination support
//! - [`dispatch`] - Runs describe / delete / stop against one resource
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `sagemaker.json` - domains, profiles, endpoints, models, jobs, notebooks
//! - `bedrock.json` - agents and provisioned throughput
//! - `compute.json` - tagged EC2 instances and Lambda provisioned concurrency

pub mod dispatch;
pub mod fetcher;
mod filter;
mod kind;
mod registry;
mod state;

pub use dispatch::{describe_resource, execute_action};
pub use fetcher::{extract_json_value, fetch_resources};
pub use filter::{NamePattern, ResourceFilter};
pub use kind::{ConflictPolicy, ResourceDescriptor, ResourceKind, ResourceSummary};
pub use registry::*;
pub use state::{Lifecycle, ResourceState, TerminalStates};
