//! Name patterns and list filters

use super::kind::ResourceSummary;
use std::fmt;

/// How a listed resource name is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Any,
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(n) => name == n,
            NamePattern::Prefix(p) => name.starts_with(p.as_str()),
            NamePattern::Any => true,
        }
    }

    /// Substring usable for provider-side narrowing (`--name-contains`)
    pub fn server_hint(&self) -> Option<&str> {
        match self {
            NamePattern::Exact(s) | NamePattern::Prefix(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(n) => write!(f, "{}", n),
            NamePattern::Prefix(p) => write!(f, "{}*", p),
            NamePattern::Any => write!(f, "*"),
        }
    }
}

/// Filter for resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub pattern: NamePattern,
    /// Restrict to children of this parent (domain id, function name)
    pub parent: Option<String>,
}

impl ResourceFilter {
    pub fn any() -> Self {
        Self {
            pattern: NamePattern::Any,
            parent: None,
        }
    }

    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            pattern: NamePattern::Exact(name.into()),
            parent: None,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            pattern: NamePattern::Prefix(prefix.into()),
            parent: None,
        }
    }

    pub fn under(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }

    pub fn matches(&self, summary: &ResourceSummary) -> bool {
        if !self.pattern.matches(&summary.descriptor.name) {
            return false;
        }
        match (&self.parent, &summary.descriptor.parent) {
            (Some(want), Some(have)) => want == have,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceDescriptor, ResourceKind, ResourceState};

    fn summary(name: &str, parent: Option<&str>) -> ResourceSummary {
        let mut d = ResourceDescriptor::new(ResourceKind::UserProfile, name, "us-east-1");
        d.parent = parent.map(str::to_string);
        ResourceSummary::new(d, "InService", ResourceState::Ready)
    }

    #[test]
    fn test_prefix_does_not_match_substring() {
        let p = NamePattern::Prefix("databy".into());
        assert!(p.matches("databy-a"));
        assert!(!p.matches("old-databy-a"));
    }

    #[test]
    fn test_exact_rejects_longer_names() {
        let p = NamePattern::Exact("databy-endpoint".into());
        assert!(p.matches("databy-endpoint"));
        assert!(!p.matches("databy-endpoint-2"));
    }

    #[test]
    fn test_empty_prefix_has_no_server_hint() {
        assert_eq!(NamePattern::Prefix(String::new()).server_hint(), None);
        assert_eq!(NamePattern::Any.server_hint(), None);
        assert_eq!(NamePattern::Prefix("databy".into()).server_hint(), Some("databy"));
    }

    #[test]
    fn test_parent_must_match_when_requested() {
        let f = ResourceFilter::exact("ai-bot-workspace").under(Some("d-1".into()));
        assert!(f.matches(&summary("ai-bot-workspace", Some("d-1"))));
        assert!(!f.matches(&summary("ai-bot-workspace", Some("d-2"))));
        assert!(!f.matches(&summary("ai-bot-workspace", None)));
        assert!(ResourceFilter::exact("ai-bot-workspace").matches(&summary("ai-bot-workspace", Some("d-2"))));
    }
}
