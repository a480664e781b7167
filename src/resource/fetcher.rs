//! Resource Fetcher
//!
//! Handles listing resources through the aws CLI based on resource definitions.

use super::filter::ResourceFilter;
use super::kind::{ResourceDescriptor, ResourceKind, ResourceSummary};
use super::registry::{get_resource, ResourceDef};
use crate::aws::cli::AwsCli;
use crate::aws::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Page size requested from the CLI
const PAGE_SIZE: &str = "100";

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Look up a registry definition, failing for unregistered kinds
pub fn resource_def(kind: ResourceKind) -> Result<&'static ResourceDef> {
    get_resource(kind).ok_or_else(|| CloudError::Unsupported(format!("{} is not registered", kind)))
}

/// Fetch all resources of `kind` matching `filter` (auto-paginate)
///
/// `extra_filters` are appended to the kind's `--filters` values, for kinds
/// that declare any.
pub async fn fetch_resources(
    cli: &AwsCli,
    kind: ResourceKind,
    region: &str,
    filter: &ResourceFilter,
    extra_filters: &[String],
) -> Result<Vec<ResourceSummary>> {
    let def = resource_def(kind)?;

    let parents: Vec<Option<String>> = match (&def.fan_out, &filter.parent) {
        (Some(fan_out), None) => {
            let items = fetch_all_pages(
                cli,
                &def.service,
                &fan_out.operation,
                region,
                &[],
                &fan_out.response_path,
                true,
            )
            .await?;
            items
                .iter()
                .filter_map(|item| item.get(&fan_out.name_field).and_then(|v| v.as_str()))
                .map(|s| Some(s.to_string()))
                .collect()
        }
        (_, parent) => vec![parent.clone()],
    };

    let mut summaries = Vec::new();
    for parent in parents {
        let args = list_args(def, filter, parent.as_deref(), extra_filters);
        let items = fetch_all_pages(
            cli,
            &def.service,
            &def.list_operation,
            region,
            &args,
            &def.response_path,
            def.paginated,
        )
        .await?;

        summaries.extend(
            items
                .iter()
                .filter_map(|item| to_summary(def, kind, region, item, parent.as_deref(), None))
                .filter(|s| filter.matches(s)),
        );
    }

    tracing::debug!("Fetched {} {} in {}", summaries.len(), kind, region);
    Ok(summaries)
}

/// Build the argument list of one list call
pub fn list_args(
    def: &ResourceDef,
    filter: &ResourceFilter,
    parent: Option<&str>,
    extra_filters: &[String],
) -> Vec<String> {
    let mut args = def.list_args.clone();

    if let (Some(param), Some(hint)) = (&def.name_filter_param, filter.pattern.server_hint()) {
        args.push(param.clone());
        args.push(hint.to_string());
    }

    if let (Some(param), Some(parent)) = (&def.parent_filter_param, parent) {
        args.push(param.clone());
        args.push(parent.to_string());
    }

    if !def.filters.is_empty() {
        args.push("--filters".to_string());
        args.extend(def.filters.iter().cloned());
        args.extend(extra_filters.iter().cloned());
    }

    args
}

async fn fetch_all_pages(
    cli: &AwsCli,
    service: &str,
    operation: &str,
    region: &str,
    args: &[String],
    response_path: &str,
    paginated: bool,
) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let result = fetch_page(
            cli,
            service,
            operation,
            region,
            args,
            response_path,
            paginated,
            page_token.as_deref(),
        )
        .await?;
        all_items.extend(result.items);

        match result.next_token {
            Some(token) if page_token.as_deref() != Some(token.as_str()) => page_token = Some(token),
            _ => break,
        }
    }

    Ok(all_items)
}

/// Fetch one page of a list operation
#[allow(clippy::too_many_arguments)]
async fn fetch_page(
    cli: &AwsCli,
    service: &str,
    operation: &str,
    region: &str,
    args: &[String],
    response_path: &str,
    paginated: bool,
    page_token: Option<&str>,
) -> Result<PaginatedResult> {
    let mut args = args.to_vec();
    if paginated {
        args.push("--max-items".to_string());
        args.push(PAGE_SIZE.to_string());
        if let Some(token) = page_token {
            args.push("--starting-token".to_string());
            args.push(token.to_string());
        }
    }

    let response = cli.run(service, operation, region, &args).await?;
    let items = extract_items(&response, response_path);

    let next_token = if paginated {
        response
            .get("NextToken")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    } else {
        None
    };

    Ok(PaginatedResult { items, next_token })
}

/// Extract items from response using the response_path
pub fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    lookup_path(response, path)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Follow a dot-notation path ("State.Name", "Instances.0"); "" is the value itself
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match part.parse::<usize>() {
            Ok(idx) => current.get(idx)?,
            Err(_) => current.get(part)?,
        };
    }
    Some(current)
}

/// Extract a value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    match lookup_path(item, path) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(arr)) => format!("[{} items]", arr.len()),
        Some(Value::Object(_)) => "[object]".to_string(),
        Some(Value::Null) | None => "-".to_string(),
    }
}

/// Convert one response item into a summary.
///
/// `fallback` supplies the name (and parent) when the response omits them,
/// as single-resource describe calls sometimes do.
pub fn to_summary(
    def: &ResourceDef,
    kind: ResourceKind,
    region: &str,
    item: &Value,
    parent: Option<&str>,
    fallback: Option<&ResourceDescriptor>,
) -> Option<ResourceSummary> {
    let name = match item.get(&def.name_field).and_then(|v| v.as_str()) {
        Some(raw) if def.name_from_arn => name_from_arn(raw).to_string(),
        Some(raw) => raw.to_string(),
        None => fallback?.name.clone(),
    };

    let mut descriptor = ResourceDescriptor::new(kind, name, region);
    descriptor.parent = def
        .parent_field
        .as_ref()
        .and_then(|field| item.get(field))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| parent.map(str::to_string))
        .or_else(|| fallback.and_then(|d| d.parent.clone()));

    let status = def
        .status_field
        .as_ref()
        .map(|field| extract_json_value(item, field))
        .filter(|s| s != "-");
    let state = def.state_for(status.as_deref());

    let mut summary = ResourceSummary::new(descriptor, status.unwrap_or_else(|| "-".to_string()), state);
    summary.id = def
        .id_field
        .as_ref()
        .and_then(|field| item.get(field))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    summary.created_at = def
        .created_field
        .as_ref()
        .and_then(|field| item.get(field))
        .and_then(parse_timestamp);

    Some(summary)
}

/// Last segment of an ARN ("...:function:my-fn:live" -> "live")
fn name_from_arn(arn: &str) -> &str {
    arn.rsplit(':').next().unwrap_or(arn)
}

/// Parse the timestamp shapes the CLI emits
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
        _ => None,
    }
}
