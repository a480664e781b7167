use super::Status;
use crate::aws::error::CloudError;
use crate::aws::{auth, AwsClient};
use colored::Colorize;

/// Verify that the aws CLI runs and the credentials resolve to an identity
pub async fn handle(client: &AwsClient) -> anyhow::Result<Status> {
    println!("{}", "Checking AWS access...".yellow());
    println!("Region: {}", client.region.cyan());
    if let Some(profile) = client.cli.profile() {
        println!("Profile: {}", profile.cyan());
    }

    if !auth::validate_region(&client.region) {
        println!("{}", format!("✗ '{}' is not a valid region name", client.region).red());
        return Ok(Status::Failure);
    }

    match client.caller_identity().await {
        Ok(identity) => {
            println!();
            println!("{}", "✓ Credentials are valid".green().bold());
            println!("  Account: {}", identity.account.cyan());
            println!("  Arn:     {}", identity.arn);
            Ok(Status::Success)
        }
        Err(CloudError::CliNotFound) => {
            println!("{}", CloudError::CliNotFound.to_string().red());
            Ok(Status::Failure)
        }
        Err(e) => {
            println!("{}", format!("✗ {}", crate::aws::cli::format_aws_error(&e)).red());
            Ok(Status::Failure)
        }
    }
}
