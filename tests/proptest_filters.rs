//! Property-based tests using proptest
//!
//! These tests verify name matching, response parsing and the status
//! mapping of list results using randomized inputs.

use databy_cloud::resource::fetcher::{lookup_path, to_summary};
use databy_cloud::resource::{
    get_resource, NamePattern, ResourceDescriptor, ResourceFilter, ResourceKind, ResourceState, ResourceSummary,
};
use proptest::prelude::*;
use serde_json::{json, Value};

const ENDPOINT_STATUSES: [&str; 8] = [
    "OutOfService",
    "Creating",
    "Updating",
    "SystemUpdating",
    "RollingBack",
    "InService",
    "Deleting",
    "Failed",
];

/// Generate an item shaped like one entry of `list-endpoints`
fn arb_endpoint() -> impl Strategy<Value = Value> {
    (
        "[a-z][a-z0-9-]{0,40}", // name
        prop::sample::select(ENDPOINT_STATUSES.to_vec()),
    )
        .prop_map(|(name, status)| {
            json!({
                "EndpointName": name,
                "EndpointArn": format!("arn:aws:sagemaker:us-east-1:123456789012:endpoint/{}", name),
                "EndpointStatus": status,
                "CreationTime": "2024-05-01T10:00:00.000000+00:00"
            })
        })
}

fn summary(name: &str) -> ResourceSummary {
    ResourceSummary::new(
        ResourceDescriptor::new(ResourceKind::Endpoint, name, "us-east-1"),
        "InService",
        ResourceState::Ready,
    )
}

proptest! {
    #[test]
    fn prefix_matches_exactly_the_names_starting_with_it(
        name in "[a-z0-9-]{0,20}",
        prefix in "[a-z0-9-]{0,6}"
    ) {
        let filter = ResourceFilter::prefix(prefix.clone());
        prop_assert_eq!(filter.matches(&summary(&name)), name.starts_with(&prefix));
    }

    #[test]
    fn exact_match_is_equality(name in "[a-z0-9-]{1,20}", other in "[a-z0-9-]{1,20}") {
        let pattern = NamePattern::Exact(name.clone());
        prop_assert!(pattern.matches(&name));
        prop_assert_eq!(pattern.matches(&other), name == other);
    }

    #[test]
    fn any_matches_everything(name in ".{0,30}") {
        prop_assert!(NamePattern::Any.matches(&name));
    }

    #[test]
    fn prefix_filter_never_increases_count(
        names in prop::collection::vec("[a-z]{1,3}-[a-z0-9]{1,6}", 0..50),
        prefix in "[a-z]{0,3}"
    ) {
        let filter = ResourceFilter::prefix(prefix);
        let kept = names.iter().filter(|n| filter.matches(&summary(n))).count();
        prop_assert!(kept <= names.len());
    }

    #[test]
    fn server_hint_is_never_empty(text in "[a-z0-9-]{0,10}") {
        for pattern in [NamePattern::Exact(text.clone()), NamePattern::Prefix(text.clone())] {
            if let Some(hint) = pattern.server_hint() {
                prop_assert!(!hint.is_empty());
            }
        }
    }

    #[test]
    fn endpoint_items_keep_name_and_known_status(item in arb_endpoint()) {
        let def = get_resource(ResourceKind::Endpoint).unwrap();
        let parsed = to_summary(def, ResourceKind::Endpoint, "us-east-1", &item, None, None).unwrap();

        prop_assert_eq!(parsed.descriptor.name.as_str(), item["EndpointName"].as_str().unwrap());
        prop_assert_eq!(parsed.status.as_str(), item["EndpointStatus"].as_str().unwrap());
        prop_assert_ne!(parsed.state, ResourceState::Unknown);
        prop_assert!(parsed.created_at.is_some());
    }

    #[test]
    fn empty_path_returns_original(item in arb_endpoint()) {
        prop_assert_eq!(lookup_path(&item, ""), Some(&item));
    }

    #[test]
    fn nonexistent_path_returns_none(item in arb_endpoint()) {
        prop_assert!(lookup_path(&item, "nonexistent.deeply.nested").is_none());
    }
}
