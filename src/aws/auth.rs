//! AWS identity and region resolution
//!
//! Credentials themselves are left to the aws CLI (environment, shared
//! credentials file, SSO). This module only resolves the default region
//! through the SDK's provider chain and asks STS who we are.

use super::cli::AwsCli;
use super::error::{CloudError, Result};
use aws_config::environment::EnvironmentVariableRegionProvider;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileRegionProvider;
use serde::Deserialize;

/// Identity returned by `sts get-caller-identity`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallerIdentity {
    pub user_id: String,
    pub account: String,
    pub arn: String,
}

/// Ask STS which principal the configured credentials belong to
pub async fn caller_identity(cli: &AwsCli, region: &str) -> Result<CallerIdentity> {
    let value = cli.run("sts", "get-caller-identity", region, &[]).await?;
    serde_json::from_value(value).map_err(|e| CloudError::UnexpectedResponse {
        operation: "sts get-caller-identity".to_string(),
        detail: e.to_string(),
    })
}

/// Validate a region name ("us-east-1", "ap-southeast-2", "us-gov-west-1")
pub fn validate_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    let Some((last, rest)) = parts.split_last() else {
        return false;
    };

    !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
}

/// Validate an IAM role ARN (`arn:<partition>:iam::<12 digits>:role/<name>`)
pub fn validate_role_arn(arn: &str) -> bool {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    let [prefix, partition, service, region, account, resource] = parts.as_slice() else {
        return false;
    };

    *prefix == "arn"
        && partition.starts_with("aws")
        && *service == "iam"
        && region.is_empty()
        && account.len() == 12
        && account.chars().all(|c| c.is_ascii_digit())
        && resource
            .strip_prefix("role/")
            .is_some_and(|name| !name.is_empty())
}

/// Default region as the CLI would pick it: `AWS_REGION`/`AWS_DEFAULT_REGION`
/// first, then the selected profile of the shared config files.
pub async fn default_region(profile: Option<&str>) -> Option<String> {
    let mut file = ProfileFileRegionProvider::builder();
    if let Some(name) = profile {
        file = file.profile_name(name);
    }

    let chain = RegionProviderChain::first_try(EnvironmentVariableRegionProvider::new()).or_else(file.build());
    let region = chain.region().await?.as_ref().to_string();

    if validate_region(&region) {
        Some(region)
    } else {
        tracing::warn!("Ignoring malformed default region {:?}", region);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_region_is_always_well_formed() {
        // Whatever the environment holds, a resolved region is usable as-is
        if let Some(region) = default_region(Some("databy-cloud-missing-profile")).await {
            assert!(validate_region(&region), "{region}");
        }
    }

    #[test]
    fn test_validate_region() {
        assert!(validate_region("us-east-1"));
        assert!(validate_region("us-gov-west-1"));
        assert!(!validate_region("us-east"));
        assert!(!validate_region("US-EAST-1"));
        assert!(!validate_region("us-east-1; rm -rf /"));
    }

    #[test]
    fn test_validate_role_arn() {
        assert!(validate_role_arn("arn:aws:iam::123456789012:role/SageMakerExecution"));
        assert!(validate_role_arn("arn:aws:iam::123456789012:role/service-role/BedrockAgent"));
        assert!(!validate_role_arn("arn:aws:iam::123456789012:user/alice"));
        assert!(!validate_role_arn("arn:aws:iam::1234:role/Short"));
        assert!(!validate_role_arn("SageMakerExecution"));
        assert!(!validate_role_arn(""));
    }

    #[test]
    fn test_caller_identity_deserializes() {
        let v = serde_json::json!({
            "UserId": "AIDAEXAMPLE",
            "Account": "123456789012",
            "Arn": "arn:aws:iam::123456789012:user/alice"
        });
        let id: CallerIdentity = serde_json::from_value(v).unwrap();
        assert_eq!(id.account, "123456789012");
    }
}
