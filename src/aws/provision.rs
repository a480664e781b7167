//! Argument builders for create / update calls
//!
//! Nested request structures (container definitions, production variants,
//! user settings) are passed to the CLI as JSON strings.

use crate::lifecycle::spec::{
    AgentSpec, CodeInterpreterSessionSpec, DomainSpec, EndpointConfigSpec, EndpointSpec, ModelSpec,
    UserProfileSpec,
};
use serde_json::json;

/// Account hosting the Hugging Face deep learning containers
const HF_IMAGE_ACCOUNT: &str = "763104351884";
const HF_IMAGE_REPOSITORY: &str = "huggingface-pytorch-inference";
const HF_PYTORCH_VERSION: &str = "2.1.0";
const HF_TRANSFORMERS_VERSION: &str = "4.37.0";

pub const CODE_INTERPRETER_ACTION_GROUP: &str = "CodeInterpreterAction";
pub const DRAFT_VERSION: &str = "DRAFT";

/// One CLI invocation: `aws <service> <operation> <args...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCall {
    pub service: &'static str,
    pub operation: &'static str,
    pub args: Vec<String>,
}

impl CliCall {
    fn new(service: &'static str, operation: &'static str) -> Self {
        Self {
            service,
            operation,
            args: Vec::new(),
        }
    }

    fn arg(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.into());
        self
    }
}

/// Whether the instance type needs the GPU inference image
fn is_gpu_instance(instance_type: &str) -> bool {
    ["ml.g", "ml.p", "ml.inf", "ml.trn"]
        .iter()
        .any(|prefix| instance_type.starts_with(prefix))
}

/// Hugging Face inference image for `region` and `instance_type`
pub fn huggingface_image(region: &str, instance_type: &str) -> String {
    let device = if is_gpu_instance(instance_type) {
        "gpu-py310-cu118-ubuntu20.04"
    } else {
        "cpu-py310-ubuntu22.04"
    };
    format!(
        "{}.dkr.ecr.{}.amazonaws.com/{}:{}-transformers{}-{}",
        HF_IMAGE_ACCOUNT, region, HF_IMAGE_REPOSITORY, HF_PYTORCH_VERSION, HF_TRANSFORMERS_VERSION, device
    )
}

pub fn create_domain(spec: &DomainSpec, vpc_id: &str, subnet_ids: &[String]) -> CliCall {
    let settings = json!({ "ExecutionRole": spec.execution_role_arn });
    let mut call = CliCall::new("sagemaker", "create-domain")
        .arg("--domain-name", spec.name.as_str())
        .arg("--auth-mode", "IAM")
        .arg("--default-user-settings", settings.to_string())
        .arg("--vpc-id", vpc_id);
    call.args.push("--subnet-ids".to_string());
    call.args.extend(subnet_ids.iter().cloned());
    call
}

pub fn create_user_profile(spec: &UserProfileSpec) -> CliCall {
    let settings = json!({ "ExecutionRole": spec.execution_role_arn });
    CliCall::new("sagemaker", "create-user-profile")
        .arg("--domain-id", spec.domain_id.as_str())
        .arg("--user-profile-name", spec.name.as_str())
        .arg("--user-settings", settings.to_string())
}

pub fn create_model(spec: &ModelSpec, region: &str) -> CliCall {
    let container = json!({
        "Image": huggingface_image(region, &spec.instance_type),
        "Environment": {
            "HF_MODEL_ID": spec.hf_model_id,
            "HF_TASK": spec.hf_task,
        }
    });
    CliCall::new("sagemaker", "create-model")
        .arg("--model-name", spec.name.as_str())
        .arg("--execution-role-arn", spec.execution_role_arn.as_str())
        .arg("--primary-container", container.to_string())
}

pub fn create_endpoint_config(spec: &EndpointConfigSpec) -> CliCall {
    let variants = json!([{
        "VariantName": "AllTraffic",
        "ModelName": spec.model_name,
        "InitialInstanceCount": spec.instance_count,
        "InstanceType": spec.instance_type,
        "InitialVariantWeight": 1.0,
    }]);
    CliCall::new("sagemaker", "create-endpoint-config")
        .arg("--endpoint-config-name", spec.name.as_str())
        .arg("--production-variants", variants.to_string())
}

pub fn create_endpoint(spec: &EndpointSpec) -> CliCall {
    CliCall::new("sagemaker", "create-endpoint")
        .arg("--endpoint-name", spec.name.as_str())
        .arg("--endpoint-config-name", spec.config_name.as_str())
}

/// Live swap of an endpoint onto another config
pub fn update_endpoint(spec: &EndpointSpec) -> CliCall {
    CliCall::new("sagemaker", "update-endpoint")
        .arg("--endpoint-name", spec.name.as_str())
        .arg("--endpoint-config-name", spec.config_name.as_str())
}

pub fn create_agent(spec: &AgentSpec) -> CliCall {
    CliCall::new("bedrock-agent", "create-agent")
        .arg("--agent-name", spec.name.as_str())
        .arg("--foundation-model", spec.foundation_model.as_str())
        .arg("--agent-resource-role-arn", spec.execution_role_arn.as_str())
        .arg("--instruction", spec.instruction.as_str())
}

/// Attach the built-in code interpreter to the agent's draft version
pub fn create_code_interpreter_group(agent_id: &str) -> CliCall {
    CliCall::new("bedrock-agent", "create-agent-action-group")
        .arg("--agent-id", agent_id)
        .arg("--agent-version", DRAFT_VERSION)
        .arg("--action-group-name", CODE_INTERPRETER_ACTION_GROUP)
        .arg("--parent-action-group-signature", "AMAZON.CodeInterpreter")
        .arg("--action-group-state", "ENABLED")
}

pub fn prepare_agent(agent_id: &str) -> CliCall {
    CliCall::new("bedrock-agent", "prepare-agent").arg("--agent-id", agent_id)
}

/// Start a session; the session id is the client token
pub fn start_code_interpreter_session(spec: &CodeInterpreterSessionSpec) -> CliCall {
    CliCall::new("bedrock-agentcore", "start-code-interpreter-session")
        .arg("--code-interpreter-identifier", spec.code_interpreter_id.as_str())
        .arg("--name", spec.name.as_str())
        .arg("--session-timeout-seconds", spec.timeout_secs.to_string())
        .arg("--client-token", spec.session_id.as_str())
}

pub fn default_vpc() -> CliCall {
    CliCall::new("ec2", "describe-vpcs").arg("--filters", "Name=isDefault,Values=true")
}

pub fn subnets_of(vpc_id: &str) -> CliCall {
    CliCall::new("ec2", "describe-subnets").arg("--filters", format!("Name=vpc-id,Values={}", vpc_id))
}
