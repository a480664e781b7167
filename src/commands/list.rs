use super::Status;
use crate::lifecycle::locator::find;
use crate::lifecycle::ControlPlane;
use crate::resource::{get_resource, NamePattern, ResourceKind, ResourceSummary};
use colored::Colorize;

/// Kinds shown by a bare `list`
pub const DEFAULT_LIST_KINDS: [ResourceKind; 6] = [
    ResourceKind::Domain,
    ResourceKind::UserProfile,
    ResourceKind::Model,
    ResourceKind::EndpointConfig,
    ResourceKind::Endpoint,
    ResourceKind::Agent,
];

pub async fn handle(
    plane: &dyn ControlPlane,
    region: &str,
    kind: Option<ResourceKind>,
) -> anyhow::Result<Status> {
    let kinds = match kind {
        Some(k) => vec![k],
        None => DEFAULT_LIST_KINDS.to_vec(),
    };

    let mut failed = false;
    for kind in kinds {
        println!("{}", heading(kind, region).bold());
        match find(plane, kind, &NamePattern::Any, region).await {
            Ok(found) if found.is_empty() => println!("  {}", "none".dimmed()),
            Ok(found) => {
                for summary in &found {
                    println!("  {}", format_row(summary));
                }
            }
            Err(e) => {
                failed = true;
                println!("  {}", crate::aws::cli::format_aws_error(&e).red());
            }
        }
    }

    Ok(Status::from_success(!failed))
}

/// Section heading: the kind's display name, its CLI key and the region
pub fn heading(kind: ResourceKind, region: &str) -> String {
    match get_resource(kind) {
        Some(def) => format!("{} [{}] ({})", def.display_name, kind, region),
        None => format!("{} ({})", kind, region),
    }
}

/// One line per resource: name, status, id and creation time
pub fn format_row(summary: &ResourceSummary) -> String {
    let mut row = match &summary.descriptor.parent {
        Some(parent) => format!("{}/{}", parent, summary.descriptor.name),
        None => summary.descriptor.name.clone(),
    };
    row.push_str(&format!("  {}", summary.status));
    if let Some(id) = &summary.id {
        if id != &summary.descriptor.name {
            row.push_str(&format!("  id={}", id));
        }
    }
    if let Some(created) = summary.created_at {
        row.push_str(&format!("  created {}", created.format("%Y-%m-%d %H:%M")));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceDescriptor, ResourceState};

    #[test]
    fn test_heading_uses_display_name() {
        assert_eq!(heading(ResourceKind::Endpoint, "us-east-1"), "Endpoints [endpoint] (us-east-1)");
    }

    #[test]
    fn test_row_shows_parent_and_id() {
        let d = ResourceDescriptor::new(ResourceKind::UserProfile, "ai-bot-workspace", "us-east-1")
            .with_parent("d-abc123");
        let row = format_row(&ResourceSummary::new(d, "InService", ResourceState::Ready));
        assert_eq!(row, "d-abc123/ai-bot-workspace  InService");

        let d = ResourceDescriptor::new(ResourceKind::Agent, "databy-code-agent", "us-east-1");
        let row = format_row(&ResourceSummary::new(d, "PREPARED", ResourceState::Ready).with_id("AG123"));
        assert_eq!(row, "databy-code-agent  PREPARED  id=AG123");
    }
}
