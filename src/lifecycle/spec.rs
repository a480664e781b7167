//! Desired-state descriptions handed to `ensure`

use super::error::{LifecycleError, Result};
use crate::aws::auth::validate_role_arn;
use crate::resource::{ResourceDescriptor, ResourceKind};

pub const DEFAULT_DOMAIN_NAME: &str = "databy-ai-domain";
pub const DEFAULT_USER_PROFILE: &str = "ai-bot-workspace";
pub const DEFAULT_MODEL_NAME: &str = "databy-hf-model";
pub const DEFAULT_ENDPOINT_CONFIG_NAME: &str = "databy-endpoint-config";
pub const DEFAULT_ENDPOINT_NAME: &str = "databy-endpoint";
pub const DEFAULT_INSTANCE_TYPE: &str = "ml.t3.medium";
pub const DEFAULT_HF_MODEL_ID: &str = "distilbert-base-uncased";
pub const DEFAULT_HF_TASK: &str = "fill-mask";
pub const DEFAULT_AGENT_NAME: &str = "databy-code-agent";
pub const DEFAULT_FOUNDATION_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
pub const DEFAULT_SESSION_NAME: &str = "databy-code-session";
/// AWS-managed code interpreter
pub const DEFAULT_CODE_INTERPRETER: &str = "aws.codeinterpreter.v1";
pub const DEFAULT_SESSION_TIMEOUT_SECS: u32 = 900;
/// Bounds of a client token, which doubles as the caller's session id
pub const MIN_SESSION_ID_LEN: usize = 33;
pub const MAX_SESSION_ID_LEN: usize = 256;
pub const MAX_SESSION_TIMEOUT_SECS: u32 = 28_800;
pub const DEFAULT_AGENT_INSTRUCTION: &str =
    "You are a data analysis assistant. Write and run Python code to answer questions about the data you are given.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    pub name: String,
    /// `None` uses the region's default VPC and its subnets
    pub vpc_id: Option<String>,
    pub subnet_ids: Vec<String>,
    pub execution_role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfileSpec {
    pub domain_id: String,
    pub name: String,
    pub execution_role_arn: String,
}

/// Hosted Hugging Face model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub execution_role_arn: String,
    pub hf_model_id: String,
    pub hf_task: String,
    /// Instance type the model will be served on (selects the CPU or GPU image)
    pub instance_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfigSpec {
    pub name: String,
    pub model_name: String,
    pub instance_type: String,
    pub instance_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub name: String,
    pub config_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    pub foundation_model: String,
    pub execution_role_arn: String,
    pub instruction: String,
}

/// Code interpreter session started under a caller-chosen session id.
///
/// The session id is sent as the client token, so starting the same
/// session twice yields one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInterpreterSessionSpec {
    pub name: String,
    pub code_interpreter_id: String,
    pub session_id: String,
    pub timeout_secs: u32,
}

/// What a resource should look like after `ensure`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionSpec {
    Domain(DomainSpec),
    UserProfile(UserProfileSpec),
    Model(ModelSpec),
    EndpointConfig(EndpointConfigSpec),
    Endpoint(EndpointSpec),
    Agent(AgentSpec),
    CodeInterpreterSession(CodeInterpreterSessionSpec),
}

impl ProvisionSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ProvisionSpec::Domain(_) => ResourceKind::Domain,
            ProvisionSpec::UserProfile(_) => ResourceKind::UserProfile,
            ProvisionSpec::Model(_) => ResourceKind::Model,
            ProvisionSpec::EndpointConfig(_) => ResourceKind::EndpointConfig,
            ProvisionSpec::Endpoint(_) => ResourceKind::Endpoint,
            ProvisionSpec::Agent(_) => ResourceKind::Agent,
            ProvisionSpec::CodeInterpreterSession(_) => ResourceKind::CodeInterpreterSession,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProvisionSpec::Domain(s) => &s.name,
            ProvisionSpec::UserProfile(s) => &s.name,
            ProvisionSpec::Model(s) => &s.name,
            ProvisionSpec::EndpointConfig(s) => &s.name,
            ProvisionSpec::Endpoint(s) => &s.name,
            ProvisionSpec::Agent(s) => &s.name,
            ProvisionSpec::CodeInterpreterSession(s) => &s.name,
        }
    }

    pub fn descriptor(&self, region: &str) -> ResourceDescriptor {
        let d = ResourceDescriptor::new(self.kind(), self.name(), region);
        match self {
            ProvisionSpec::UserProfile(s) => d.with_parent(s.domain_id.clone()),
            ProvisionSpec::CodeInterpreterSession(s) => d.with_parent(s.code_interpreter_id.clone()),
            _ => d,
        }
    }

    /// Check inputs before any cloud call is made
    pub fn validate(&self) -> Result<()> {
        require_name(self.kind(), self.name())?;

        match self {
            ProvisionSpec::Domain(s) => {
                require_role(&s.execution_role_arn)?;
                if s.vpc_id.is_some() && s.subnet_ids.is_empty() {
                    return Err(precondition("a VPC id was given without any subnet ids"));
                }
            }
            ProvisionSpec::UserProfile(s) => {
                if s.domain_id.trim().is_empty() {
                    return Err(precondition(
                        "domain id is required (pass it or set AWS_SAGEMAKER_DOMAIN_ID)",
                    ));
                }
                require_role(&s.execution_role_arn)?;
            }
            ProvisionSpec::Model(s) => {
                require_role(&s.execution_role_arn)?;
                if s.hf_model_id.trim().is_empty() {
                    return Err(precondition("model id must not be empty"));
                }
                if s.hf_task.trim().is_empty() {
                    return Err(precondition("task must not be empty"));
                }
            }
            ProvisionSpec::EndpointConfig(s) => {
                require_name(ResourceKind::Model, &s.model_name)?;
                if s.instance_count == 0 {
                    return Err(precondition("instance count must be at least 1"));
                }
                if !s.instance_type.starts_with("ml.") {
                    return Err(precondition(format!(
                        "instance type {} is not a SageMaker instance type (ml.*)",
                        s.instance_type
                    )));
                }
            }
            ProvisionSpec::Endpoint(s) => require_name(ResourceKind::EndpointConfig, &s.config_name)?,
            ProvisionSpec::Agent(s) => {
                require_role(&s.execution_role_arn)?;
                if s.foundation_model.trim().is_empty() {
                    return Err(precondition("foundation model must not be empty"));
                }
            }
            ProvisionSpec::CodeInterpreterSession(s) => {
                require_session_id(&s.session_id)?;
                if s.code_interpreter_id.trim().is_empty() {
                    return Err(precondition("code interpreter identifier must not be empty"));
                }
                if s.timeout_secs == 0 || s.timeout_secs > MAX_SESSION_TIMEOUT_SECS {
                    return Err(precondition(format!(
                        "session timeout must be between 1 and {} seconds",
                        MAX_SESSION_TIMEOUT_SECS
                    )));
                }
            }
        }

        Ok(())
    }
}

fn precondition(msg: impl Into<String>) -> LifecycleError {
    LifecycleError::Precondition(msg.into())
}

fn require_name(kind: ResourceKind, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(precondition(format!("{} name must not be empty", kind)));
    }
    Ok(())
}

fn require_role(arn: &str) -> Result<()> {
    if arn.trim().is_empty() {
        return Err(precondition("execution role ARN is required"));
    }
    if !validate_role_arn(arn) {
        return Err(precondition(format!("malformed execution role ARN: {}", arn)));
    }
    Ok(())
}

fn require_session_id(id: &str) -> Result<()> {
    let len = id.chars().count();
    if len < MIN_SESSION_ID_LEN {
        return Err(precondition(format!(
            "session id must be at least {} characters (got {})",
            MIN_SESSION_ID_LEN, len
        )));
    }
    if len > MAX_SESSION_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(precondition(format!(
            "session id must be at most {} letters, digits or '-'",
            MAX_SESSION_ID_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/DatabyExecution";

    fn endpoint_config(count: u32) -> ProvisionSpec {
        ProvisionSpec::EndpointConfig(EndpointConfigSpec {
            name: DEFAULT_ENDPOINT_CONFIG_NAME.into(),
            model_name: DEFAULT_MODEL_NAME.into(),
            instance_type: DEFAULT_INSTANCE_TYPE.into(),
            instance_count: count,
        })
    }

    #[test]
    fn test_domain_without_role_is_precondition_error() {
        let spec = ProvisionSpec::Domain(DomainSpec {
            name: DEFAULT_DOMAIN_NAME.into(),
            vpc_id: None,
            subnet_ids: vec![],
            execution_role_arn: String::new(),
        });
        assert!(matches!(spec.validate(), Err(LifecycleError::Precondition(_))));
    }

    #[test]
    fn test_domain_with_default_network_is_valid() {
        let spec = ProvisionSpec::Domain(DomainSpec {
            name: DEFAULT_DOMAIN_NAME.into(),
            vpc_id: None,
            subnet_ids: vec![],
            execution_role_arn: ROLE.into(),
        });
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_zero_instances_rejected() {
        assert!(endpoint_config(0).validate().is_err());
        assert!(endpoint_config(1).validate().is_ok());
    }

    #[test]
    fn test_user_profile_descriptor_has_domain_parent() {
        let spec = ProvisionSpec::UserProfile(UserProfileSpec {
            domain_id: "d-abc123".into(),
            name: DEFAULT_USER_PROFILE.into(),
            execution_role_arn: ROLE.into(),
        });
        let d = spec.descriptor("us-east-1");
        assert_eq!(d.kind, ResourceKind::UserProfile);
        assert_eq!(d.parent.as_deref(), Some("d-abc123"));
    }

    #[test]
    fn test_missing_domain_id_mentions_env_var() {
        let spec = ProvisionSpec::UserProfile(UserProfileSpec {
            domain_id: " ".into(),
            name: DEFAULT_USER_PROFILE.into(),
            execution_role_arn: ROLE.into(),
        });
        let err = spec.validate().unwrap_err().to_string();
        assert!(err.contains("AWS_SAGEMAKER_DOMAIN_ID"));
    }

    fn session(id: &str) -> ProvisionSpec {
        ProvisionSpec::CodeInterpreterSession(CodeInterpreterSessionSpec {
            name: DEFAULT_SESSION_NAME.into(),
            code_interpreter_id: DEFAULT_CODE_INTERPRETER.into(),
            session_id: id.into(),
            timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        })
    }

    #[test]
    fn test_session_id_needs_33_characters() {
        let short = "a".repeat(32);
        let err = session(&short).validate().unwrap_err();
        assert!(err.to_string().contains("at least 33"));
        assert!(session(&"a".repeat(33)).validate().is_ok());
        assert!(session("0f9c1f4e-8d6a-4c61-9f0e-3b1e2d7a5c44").validate().is_ok());
    }

    #[test]
    fn test_session_id_rejects_unsafe_characters() {
        let id = format!("{};rm -rf /", "a".repeat(33));
        assert!(session(&id).validate().is_err());
    }

    #[test]
    fn test_session_descriptor_has_interpreter_parent() {
        let d = session(&"a".repeat(33)).descriptor("us-east-1");
        assert_eq!(d.kind, ResourceKind::CodeInterpreterSession);
        assert_eq!(d.parent.as_deref(), Some(DEFAULT_CODE_INTERPRETER));
    }

    #[test]
    fn test_malformed_role_rejected() {
        let spec = ProvisionSpec::Agent(AgentSpec {
            name: DEFAULT_AGENT_NAME.into(),
            foundation_model: DEFAULT_FOUNDATION_MODEL.into(),
            execution_role_arn: "BedrockRole".into(),
            instruction: DEFAULT_AGENT_INSTRUCTION.into(),
        });
        assert!(spec.validate().is_err());
    }
}
