//! setup-* commands: idempotent provisioning of the databy stack

use super::print_timeout;
use crate::lifecycle::spec::{
    AgentSpec, CodeInterpreterSessionSpec, DomainSpec, EndpointConfigSpec, EndpointSpec, ModelSpec, UserProfileSpec,
};
use crate::lifecycle::{ControlPlane, EnsureOutcome, PollConfig, ProvisionSpec, Provisioner};
use colored::Colorize;

/// Inputs of `setup-endpoint`
#[derive(Debug, Clone)]
pub struct EndpointStack {
    pub model: ModelSpec,
    pub config: EndpointConfigSpec,
    pub endpoint: EndpointSpec,
}

impl EndpointStack {
    fn specs(&self) -> [ProvisionSpec; 3] {
        [
            ProvisionSpec::Model(self.model.clone()),
            ProvisionSpec::EndpointConfig(self.config.clone()),
            ProvisionSpec::Endpoint(self.endpoint.clone()),
        ]
    }
}

/// Print one ensure result
pub fn print_outcome(outcome: &EnsureOutcome) {
    let mut line = format!("✓ {} {}", outcome.descriptor, outcome.action);
    if let Some(id) = &outcome.id {
        if id != &outcome.descriptor.name {
            line.push_str(&format!(" (id {})", id));
        }
    }

    if outcome.timed_out() {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }

    if let Some(wait) = &outcome.wait {
        print_timeout(&outcome.descriptor, wait);
    }
}

async fn ensure(
    provisioner: &Provisioner<'_>,
    spec: &ProvisionSpec,
    region: &str,
) -> anyhow::Result<EnsureOutcome> {
    let descriptor = spec.descriptor(region);
    println!("{}", format!("Ensuring {}...", descriptor).yellow());
    let outcome = provisioner.ensure(&descriptor, spec).await?;
    print_outcome(&outcome);
    Ok(outcome)
}

pub async fn domain(
    plane: &dyn ControlPlane,
    region: &str,
    poll: PollConfig,
    spec: DomainSpec,
) -> anyhow::Result<EnsureOutcome> {
    let provisioner = Provisioner::new(plane, poll);
    ensure(&provisioner, &ProvisionSpec::Domain(spec), region).await
}

pub async fn user_profile(
    plane: &dyn ControlPlane,
    region: &str,
    poll: PollConfig,
    spec: UserProfileSpec,
) -> anyhow::Result<EnsureOutcome> {
    let provisioner = Provisioner::new(plane, poll);
    ensure(&provisioner, &ProvisionSpec::UserProfile(spec), region).await
}

/// Model, then endpoint config, then endpoint.
///
/// Every input is validated before the first cloud call.
pub async fn endpoint(
    plane: &dyn ControlPlane,
    region: &str,
    poll: PollConfig,
    stack: EndpointStack,
) -> anyhow::Result<Vec<EnsureOutcome>> {
    let specs = stack.specs();
    for spec in &specs {
        spec.validate()?;
    }

    let provisioner = Provisioner::new(plane, poll);
    let mut outcomes = Vec::with_capacity(specs.len());
    for spec in &specs {
        outcomes.push(ensure(&provisioner, spec, region).await?);
    }

    Ok(outcomes)
}

/// Create the agent if needed, then attach the code interpreter and prepare it
pub async fn agent(
    plane: &dyn ControlPlane,
    region: &str,
    poll: PollConfig,
    spec: AgentSpec,
) -> anyhow::Result<Vec<EnsureOutcome>> {
    let provisioner = Provisioner::new(plane, poll);
    let created = ensure(&provisioner, &ProvisionSpec::Agent(spec), region).await?;
    if created.timed_out() {
        return Ok(vec![created]);
    }

    let prepared = provisioner.prepare(&created.descriptor).await?;
    print_outcome(&prepared);
    Ok(vec![created, prepared])
}

/// Start the AgentCore code interpreter session, or reuse the running one
pub async fn agentcore(
    plane: &dyn ControlPlane,
    region: &str,
    poll: PollConfig,
    spec: CodeInterpreterSessionSpec,
) -> anyhow::Result<EnsureOutcome> {
    let provisioner = Provisioner::new(plane, poll);
    ensure(&provisioner, &ProvisionSpec::CodeInterpreterSession(spec), region).await
}
