//! Control plane seam
//!
//! Every provider call made by the locator, provisioner, decommissioner and
//! poller goes through [`ControlPlane`].

use super::spec::ProvisionSpec;
use crate::aws::error::Result;
use crate::resource::{ResourceDescriptor, ResourceFilter, ResourceKind, ResourceSummary};
use async_trait::async_trait;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// All resources of `kind` in `region` matching `filter`, in provider order
    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
        region: &str,
    ) -> Result<Vec<ResourceSummary>>;

    /// Current view of one resource, `None` when it does not exist
    async fn describe(&self, descriptor: &ResourceDescriptor) -> Result<Option<ResourceSummary>>;

    /// Issue the create call; returns the provider-assigned id if any
    async fn create(&self, spec: &ProvisionSpec, region: &str) -> Result<Option<String>>;

    /// Push `spec` onto an existing resource
    async fn update(&self, spec: &ProvisionSpec, existing: &ResourceSummary) -> Result<()>;

    async fn delete(&self, target: &ResourceSummary) -> Result<()>;

    async fn stop(&self, target: &ResourceSummary) -> Result<()>;

    /// Activate a resource that needs an explicit step before use (agents)
    async fn prepare(&self, target: &ResourceSummary) -> Result<()>;
}
