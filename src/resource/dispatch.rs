//! CLI Dispatch
//!
//! Maps registry operations onto concrete aws CLI invocations against a
//! single resource.

use super::fetcher::{fetch_resources, lookup_path, resource_def, to_summary};
use super::filter::ResourceFilter;
use super::kind::{ResourceDescriptor, ResourceSummary};
use super::registry::{OperationDef, SweepAction};
use crate::aws::cli::AwsCli;
use crate::aws::error::{CloudError, Result};
use serde_json::Value;

/// Build the argument list of a single-resource operation
pub fn operation_args(op: &OperationDef, target: &ResourceSummary) -> Result<Vec<String>> {
    let key = if op.use_id {
        target.id.as_deref().ok_or_else(|| CloudError::UnexpectedResponse {
            operation: op.operation.clone(),
            detail: format!("no provider id known for {}", target.descriptor),
        })?
    } else {
        target.descriptor.name.as_str()
    };

    let mut args = vec![op.id_param.clone(), key.to_string()];

    if let Some(param) = &op.parent_param {
        let parent = target.descriptor.parent.as_deref().ok_or_else(|| {
            CloudError::Unsupported(format!("{} needs {} but has no parent", op.operation, param))
        })?;
        args.push(param.clone());
        args.push(parent.to_string());
    }

    args.extend(op.args.iter().cloned());
    Ok(args)
}

/// Execute a delete or stop on a resource
pub async fn execute_action(cli: &AwsCli, action: SweepAction, target: &ResourceSummary) -> Result<Value> {
    let kind = target.descriptor.kind;
    let def = resource_def(kind)?;

    let op = match action {
        SweepAction::Delete => def.delete.as_ref(),
        SweepAction::Stop => def.stop.as_ref(),
    }
    .ok_or_else(|| CloudError::Unsupported(format!("{} of {}", action.verb(), kind)))?;

    tracing::info!(
        "execute_action: service={}, operation={}, resource={}",
        def.service,
        op.operation,
        target.descriptor
    );

    let args = operation_args(op, target)?;
    cli.run(&def.service, &op.operation, &target.descriptor.region, &args).await
}

/// Describe a single resource; `None` when the provider reports it absent.
///
/// Kinds addressed by a provider id, kinds without a describe operation and
/// children whose parent is unknown are resolved through listing instead.
pub async fn describe_resource(
    cli: &AwsCli,
    descriptor: &ResourceDescriptor,
    extra_filters: &[String],
) -> Result<Option<ResourceSummary>> {
    let kind = descriptor.kind;
    let def = resource_def(kind)?;

    let direct = def
        .describe
        .as_ref()
        .filter(|op| !op.use_id && (op.parent_param.is_none() || descriptor.parent.is_some()));
    let Some(op) = direct else {
        let filter = ResourceFilter::exact(descriptor.name.clone()).under(descriptor.parent.clone());
        let found = fetch_resources(cli, kind, &descriptor.region, &filter, extra_filters).await?;
        return Ok(found.into_iter().next());
    };

    let target = ResourceSummary::new(descriptor.clone(), "-", def.state_for(None));
    let args = operation_args(op, &target)?;

    let response = match cli.run(&def.service, &op.operation, &descriptor.region, &args).await {
        Ok(v) => v,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    Ok(lookup_path(&response, &op.response_path).and_then(|item| {
        to_summary(def, kind, &descriptor.region, item, descriptor.parent.as_deref(), Some(descriptor))
    }))
}
