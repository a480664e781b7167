//! Resource Locator

use super::plane::ControlPlane;
use crate::aws::error::Result;
use crate::resource::{NamePattern, ResourceDescriptor, ResourceFilter, ResourceKind, ResourceSummary};

/// All resources of `kind` in `region` whose name matches `pattern`.
///
/// No match is an empty list, never an error.
pub async fn find(
    plane: &dyn ControlPlane,
    kind: ResourceKind,
    pattern: &NamePattern,
    region: &str,
) -> Result<Vec<ResourceSummary>> {
    let filter = ResourceFilter {
        pattern: pattern.clone(),
        parent: None,
    };
    find_filtered(plane, kind, &filter, region).await
}

/// Like [`find`], with a parent restriction
pub async fn find_filtered(
    plane: &dyn ControlPlane,
    kind: ResourceKind,
    filter: &ResourceFilter,
    region: &str,
) -> Result<Vec<ResourceSummary>> {
    let found = plane.list(kind, filter, region).await?;
    // Provider-side narrowing is substring based
    let matched: Vec<ResourceSummary> = found.into_iter().filter(|s| filter.matches(s)).collect();
    tracing::debug!("find {} {} in {}: {} match(es)", kind, filter.pattern, region, matched.len());
    Ok(matched)
}

/// The resource with exactly this key, if it exists
pub async fn find_one(
    plane: &dyn ControlPlane,
    descriptor: &ResourceDescriptor,
) -> Result<Option<ResourceSummary>> {
    let filter = ResourceFilter::exact(descriptor.name.clone()).under(descriptor.parent.clone());
    let mut found = find_filtered(plane, descriptor.kind, &filter, &descriptor.region).await?;
    Ok(if found.is_empty() { None } else { Some(found.remove(0)) })
}
