//! Configuration Management
//!
//! Persistent defaults for databy-cloud. Command-line flags and their
//! environment fallbacks always win over what is stored here.

use crate::lifecycle::poller::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::lifecycle::PollConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_RESOURCE_PREFIX: &str = "databy";
pub const DEFAULT_INSTANCE_TAG: (&str, &str) = ("Project", "databy");

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    /// SageMaker execution role
    #[serde(default)]
    pub execution_role_arn: Option<String>,
    /// Role assumed by Bedrock agents
    #[serde(default)]
    pub agent_role_arn: Option<String>,
    /// Domain created by the last setup-domain
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub resource_prefix: Option<String>,
    /// `KEY=VALUE` tag marking our EC2 instances
    #[serde(default)]
    pub instance_tag: Option<String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("databy-cloud").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from `path`; a missing file is an empty config
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;

        Ok(())
    }

    /// Get effective profile (CLI > config)
    pub fn effective_profile(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.profile.clone())
    }

    /// Get effective region (CLI > config > aws config > us-east-1)
    pub async fn effective_region(&self, cli: Option<&str>, profile: Option<&str>) -> String {
        if let Some(region) = cli.map(str::to_string).or_else(|| self.region.clone()) {
            return region;
        }

        crate::aws::auth::default_region(profile)
            .await
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn effective_execution_role(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.execution_role_arn.clone())
    }

    /// Agent role, falling back to the execution role
    pub fn effective_agent_role(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.agent_role_arn.clone())
            .or_else(|| self.execution_role_arn.clone())
    }

    pub fn effective_domain_id(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.domain_id.clone())
    }

    pub fn effective_prefix(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.resource_prefix.clone())
            .unwrap_or_else(|| DEFAULT_RESOURCE_PREFIX.to_string())
    }

    /// Instance tag as (key, value); malformed entries fall back to the default
    pub fn effective_instance_tag(&self) -> (String, String) {
        self.instance_tag
            .as_deref()
            .and_then(|tag| tag.split_once('='))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .unwrap_or_else(|| (DEFAULT_INSTANCE_TAG.0.to_string(), DEFAULT_INSTANCE_TAG.1.to_string()))
    }

    /// Poll settings (CLI > config > built-in)
    pub fn effective_poll(&self, interval_secs: Option<u64>, max_attempts: Option<u32>) -> PollConfig {
        let interval = interval_secs
            .or(self.poll_interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let attempts = max_attempts.or(self.max_attempts).unwrap_or(DEFAULT_MAX_ATTEMPTS);
        PollConfig::new(attempts, interval)
    }

    /// Remember the domain id and save
    pub fn set_domain_id(&mut self, domain_id: &str) -> Result<()> {
        self.domain_id = Some(domain_id.to_string());
        self.save()
    }
}
