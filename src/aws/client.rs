//! AWS Client
//!
//! Control plane backed by the aws CLI: registry-driven list / describe /
//! delete / stop plus the create and update calls of each kind.

use super::auth::{caller_identity, CallerIdentity};
use super::cli::AwsCli;
use super::error::{CloudError, Result};
use super::provision::{self, CliCall};
use crate::lifecycle::{ControlPlane, ProvisionSpec};
use crate::resource::fetcher::lookup_path;
use crate::resource::{
    describe_resource, execute_action, fetch_resources, ResourceDescriptor, ResourceFilter, ResourceKind,
    ResourceSummary, SweepAction,
};
use async_trait::async_trait;
use serde_json::Value;

/// Main AWS client
#[derive(Clone, Debug)]
pub struct AwsClient {
    pub cli: AwsCli,
    pub region: String,
    /// Tag selecting which EC2 instances belong to us
    instance_tag: Option<(String, String)>,
}

impl AwsClient {
    pub fn new(cli: AwsCli, region: &str) -> Self {
        Self {
            cli,
            region: region.to_string(),
            instance_tag: None,
        }
    }

    pub fn with_instance_tag(mut self, key: &str, value: &str) -> Self {
        self.instance_tag = Some((key.to_string(), value.to_string()));
        self
    }

    pub async fn caller_identity(&self) -> Result<CallerIdentity> {
        caller_identity(&self.cli, &self.region).await
    }

    /// Default VPC of `region` and its subnets
    pub async fn default_network(&self, region: &str) -> Result<(String, Vec<String>)> {
        let vpcs = self.run(&provision::default_vpc(), region).await?;
        let vpc_id = lookup_path(&vpcs, "Vpcs.0.VpcId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CloudError::NotFound(format!("default VPC in {}", region)))?
            .to_string();

        let subnets = self.run(&provision::subnets_of(&vpc_id), region).await?;
        let subnet_ids: Vec<String> = subnets
            .get("Subnets")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|s| s.get("SubnetId").and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if subnet_ids.is_empty() {
            return Err(CloudError::NotFound(format!("subnets of {}", vpc_id)));
        }

        tracing::info!("Using default VPC {} ({} subnets)", vpc_id, subnet_ids.len());
        Ok((vpc_id, subnet_ids))
    }

    fn extra_filters(&self, kind: ResourceKind) -> Vec<String> {
        match (&self.instance_tag, kind) {
            (Some((key, value)), ResourceKind::ComputeInstance) => {
                vec![format!("Name=tag:{},Values={}", key, value)]
            }
            _ => Vec::new(),
        }
    }

    async fn run(&self, call: &CliCall, region: &str) -> Result<Value> {
        self.cli.run(call.service, call.operation, region, &call.args).await
    }
}

/// Domain id from a domain ARN (`...:domain/d-xxxxxxxx`)
fn domain_id_from_arn(arn: &str) -> Option<String> {
    arn.rsplit('/').next().filter(|s| !s.is_empty()).map(str::to_string)
}

#[async_trait]
impl ControlPlane for AwsClient {
    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
        region: &str,
    ) -> Result<Vec<ResourceSummary>> {
        fetch_resources(&self.cli, kind, region, filter, &self.extra_filters(kind)).await
    }

    async fn describe(&self, descriptor: &ResourceDescriptor) -> Result<Option<ResourceSummary>> {
        describe_resource(&self.cli, descriptor, &self.extra_filters(descriptor.kind)).await
    }

    async fn create(&self, spec: &ProvisionSpec, region: &str) -> Result<Option<String>> {
        match spec {
            ProvisionSpec::Domain(domain) => {
                let (vpc_id, subnet_ids) = match &domain.vpc_id {
                    Some(vpc) => (vpc.clone(), domain.subnet_ids.clone()),
                    None => self.default_network(region).await?,
                };
                let response = self
                    .run(&provision::create_domain(domain, &vpc_id, &subnet_ids), region)
                    .await?;
                Ok(response
                    .get("DomainArn")
                    .and_then(|v| v.as_str())
                    .and_then(domain_id_from_arn))
            }
            ProvisionSpec::UserProfile(profile) => {
                self.run(&provision::create_user_profile(profile), region).await?;
                Ok(None)
            }
            ProvisionSpec::Model(model) => {
                self.run(&provision::create_model(model, region), region).await?;
                Ok(None)
            }
            ProvisionSpec::EndpointConfig(config) => {
                self.run(&provision::create_endpoint_config(config), region).await?;
                Ok(None)
            }
            ProvisionSpec::Endpoint(endpoint) => {
                self.run(&provision::create_endpoint(endpoint), region).await?;
                Ok(None)
            }
            ProvisionSpec::Agent(agent) => {
                let response = self.run(&provision::create_agent(agent), region).await?;
                Ok(lookup_path(&response, "agent.agentId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string))
            }
            ProvisionSpec::CodeInterpreterSession(session) => {
                let response = self
                    .run(&provision::start_code_interpreter_session(session), region)
                    .await?;
                Ok(response
                    .get("sessionId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string))
            }
        }
    }

    async fn update(&self, spec: &ProvisionSpec, existing: &ResourceSummary) -> Result<()> {
        match spec {
            ProvisionSpec::Endpoint(endpoint) => {
                self.run(&provision::update_endpoint(endpoint), &existing.descriptor.region)
                    .await?;
                Ok(())
            }
            other => Err(CloudError::Unsupported(format!(
                "in-place update of {}",
                other.kind()
            ))),
        }
    }

    async fn delete(&self, target: &ResourceSummary) -> Result<()> {
        execute_action(&self.cli, SweepAction::Delete, target).await?;
        Ok(())
    }

    async fn stop(&self, target: &ResourceSummary) -> Result<()> {
        execute_action(&self.cli, SweepAction::Stop, target).await?;
        Ok(())
    }

    async fn prepare(&self, target: &ResourceSummary) -> Result<()> {
        if target.descriptor.kind != ResourceKind::Agent {
            return Err(CloudError::Unsupported(format!(
                "prepare of {}",
                target.descriptor.kind
            )));
        }

        let region = &target.descriptor.region;
        let agent_id = target.provider_id();

        match self.run(&provision::create_code_interpreter_group(agent_id), region).await {
            Ok(_) => tracing::info!("Attached code interpreter to {}", target.descriptor),
            Err(e) if e.is_conflict() => {
                tracing::debug!("Code interpreter already attached to {}", target.descriptor)
            }
            Err(e) => return Err(e),
        }

        self.run(&provision::prepare_agent(agent_id), region).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_id_from_arn() {
        assert_eq!(
            domain_id_from_arn("arn:aws:sagemaker:us-east-1:123456789012:domain/d-abc123").as_deref(),
            Some("d-abc123")
        );
        assert_eq!(domain_id_from_arn("arn:aws:sagemaker:us-east-1:123456789012:domain/"), None);
    }

    #[test]
    fn test_instance_tag_only_filters_instances() {
        let client = AwsClient::new(AwsCli::new(None), "us-east-1").with_instance_tag("Project", "databy");
        assert_eq!(
            client.extra_filters(ResourceKind::ComputeInstance),
            vec!["Name=tag:Project,Values=databy"]
        );
        assert!(client.extra_filters(ResourceKind::Endpoint).is_empty());
    }
}
