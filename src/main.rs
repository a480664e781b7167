use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use databy_cloud::aws::cli::{format_aws_error, AwsCli};
use databy_cloud::aws::error::CloudError;
use databy_cloud::aws::AwsClient;
use databy_cloud::commands::setup::EndpointStack;
use databy_cloud::commands::{self, Status};
use databy_cloud::config::Config;
use databy_cloud::lifecycle::spec::*;
use databy_cloud::lifecycle::{AssumeYes, Confirm, LifecycleError, PollConfig, StdinConfirm, SweepScope};
use databy_cloud::resource::{ResourceDescriptor, ResourceKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Provision, inspect and decommission SageMaker and Bedrock resources
#[derive(Parser, Debug)]
#[command(name = "databy-cloud", version = databy_cloud::VERSION, about, long_about = None)]
struct Args {
    /// AWS region to operate in
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Named profile from the shared AWS config
    #[arg(long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Log level for debugging (RUST_LOG overrides it)
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Seconds between status checks while waiting
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Status checks before giving up on a wait
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify the aws CLI and the caller identity
    Check,

    /// List resources (domains, profiles, models, configs, endpoints, agents by default)
    List {
        #[arg(value_enum)]
        kind: Option<ResourceKind>,
    },

    /// Create the Studio domain if it does not exist
    SetupDomain {
        #[arg(env = "DATABY_DOMAIN_NAME", default_value = DEFAULT_DOMAIN_NAME)]
        domain_name: String,
        /// VPC to place the domain in (default VPC when omitted)
        #[arg(long)]
        vpc_id: Option<String>,
        #[arg(long, value_delimiter = ',')]
        subnet_ids: Vec<String>,
        #[arg(long, env = "SAGEMAKER_EXECUTION_ROLE_ARN")]
        execution_role_arn: Option<String>,
    },

    /// Create a user profile inside the domain
    SetupUserProfile {
        #[arg(env = "AWS_SAGEMAKER_DOMAIN_ID")]
        domain_id: Option<String>,
        #[arg(default_value = DEFAULT_USER_PROFILE)]
        user_profile_name: String,
        #[arg(long, env = "SAGEMAKER_EXECUTION_ROLE_ARN")]
        execution_role_arn: Option<String>,
    },

    /// Deploy a Hugging Face model behind an inference endpoint
    SetupEndpoint {
        #[arg(default_value = DEFAULT_MODEL_NAME)]
        model_name: String,
        #[arg(default_value = DEFAULT_ENDPOINT_CONFIG_NAME)]
        endpoint_config_name: String,
        #[arg(default_value = DEFAULT_ENDPOINT_NAME)]
        endpoint_name: String,
        #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
        instance_type: String,
        #[arg(long, default_value_t = 1)]
        instance_count: u32,
        #[arg(long, env = "SAGEMAKER_EXECUTION_ROLE_ARN")]
        execution_role_arn: Option<String>,
        #[arg(long, default_value = DEFAULT_HF_MODEL_ID)]
        model_id: String,
        #[arg(long, default_value = DEFAULT_HF_TASK)]
        task: String,
    },

    /// Create and prepare the Bedrock code agent
    SetupAgent {
        #[arg(default_value = DEFAULT_AGENT_NAME)]
        agent_name: String,
        #[arg(long, default_value = DEFAULT_FOUNDATION_MODEL)]
        foundation_model: String,
        #[arg(long, env = "AWS_BEDROCK_SERVICE_ROLE")]
        execution_role_arn: Option<String>,
        #[arg(long, default_value = DEFAULT_AGENT_INSTRUCTION)]
        instruction: String,
    },

    /// Start (or reuse) an AgentCore code interpreter session
    SetupAgentcore {
        /// Caller-chosen session id, at least 33 characters
        #[arg(env = "DATABY_AGENTCORE_SESSION_ID")]
        session_id: Option<String>,
        #[arg(long, default_value = DEFAULT_SESSION_NAME)]
        name: String,
        #[arg(long, default_value = DEFAULT_CODE_INTERPRETER)]
        code_interpreter: String,
        #[arg(long, default_value_t = DEFAULT_SESSION_TIMEOUT_SECS)]
        timeout_seconds: u32,
    },

    /// Wait until a resource is ready
    Wait {
        #[arg(value_enum)]
        kind: ResourceKind,
        name: String,
        /// Enclosing resource (domain id of a user profile)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete endpoints, endpoint configs and models named PREFIX*
    Cleanup {
        #[arg(env = "DATABY_RESOURCE_PREFIX")]
        prefix: Option<String>,
        #[arg(long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Emergency stop: delete or stop every billable resource
    StopAll {
        #[arg(long, value_enum, default_value = "full")]
        scope: SweepScope,
        #[arg(long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let default_directive = match level.to_tracing_level() {
        Some(l) => format!("databy_cloud={}", l.to_string().to_lowercase()),
        None => "off".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("databy-cloud {} started with log level: {:?}", databy_cloud::VERSION, level);
    tracing::info!("Log file: {:?}", path);

    Ok(Some(guard))
}

fn required(value: Option<String>, what: &str, env: &str) -> Result<String> {
    value.ok_or_else(|| {
        LifecycleError::Precondition(format!("{} is required (pass it or set {})", what, env)).into()
    })
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

async fn run(args: Args) -> Result<Status> {
    let mut config = Config::load();
    let profile = config.effective_profile(args.profile.as_deref());
    let cli_region = args
        .region
        .clone()
        .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok());
    let region = config
        .effective_region(cli_region.as_deref(), profile.as_deref())
        .await;
    let poll: PollConfig = config.effective_poll(args.poll_interval, args.max_attempts);
    let (tag_key, tag_value) = config.effective_instance_tag();

    tracing::info!("Using region {} (profile {:?})", region, profile);

    let client = AwsClient::new(AwsCli::new(profile), &region).with_instance_tag(&tag_key, &tag_value);

    match args.command {
        Command::Check => commands::check::handle(&client).await,

        Command::List { kind } => commands::list::handle(&client, &region, kind).await,

        Command::SetupDomain {
            domain_name,
            vpc_id,
            subnet_ids,
            execution_role_arn,
        } => {
            let spec = DomainSpec {
                name: domain_name,
                vpc_id,
                subnet_ids,
                execution_role_arn: required(
                    config.effective_execution_role(execution_role_arn.as_deref()),
                    "execution role ARN",
                    "SAGEMAKER_EXECUTION_ROLE_ARN",
                )?,
            };
            let outcome = commands::setup::domain(&client, &region, poll, spec).await?;
            if let Some(id) = &outcome.id {
                if let Err(e) = config.set_domain_id(id) {
                    tracing::warn!("Failed to remember domain id {}: {:#}", id, e);
                }
            }
            Ok(Status::Success)
        }

        Command::SetupUserProfile {
            domain_id,
            user_profile_name,
            execution_role_arn,
        } => {
            let spec = UserProfileSpec {
                domain_id: required(
                    config.effective_domain_id(domain_id.as_deref()),
                    "domain id",
                    "AWS_SAGEMAKER_DOMAIN_ID",
                )?,
                name: user_profile_name,
                execution_role_arn: required(
                    config.effective_execution_role(execution_role_arn.as_deref()),
                    "execution role ARN",
                    "SAGEMAKER_EXECUTION_ROLE_ARN",
                )?,
            };
            commands::setup::user_profile(&client, &region, poll, spec).await?;
            Ok(Status::Success)
        }

        Command::SetupEndpoint {
            model_name,
            endpoint_config_name,
            endpoint_name,
            instance_type,
            instance_count,
            execution_role_arn,
            model_id,
            task,
        } => {
            let role = required(
                config.effective_execution_role(execution_role_arn.as_deref()),
                "execution role ARN",
                "SAGEMAKER_EXECUTION_ROLE_ARN",
            )?;
            let stack = EndpointStack {
                model: ModelSpec {
                    name: model_name.clone(),
                    execution_role_arn: role,
                    hf_model_id: model_id,
                    hf_task: task,
                    instance_type: instance_type.clone(),
                },
                config: EndpointConfigSpec {
                    name: endpoint_config_name.clone(),
                    model_name,
                    instance_type,
                    instance_count,
                },
                endpoint: EndpointSpec {
                    name: endpoint_name,
                    config_name: endpoint_config_name,
                },
            };
            commands::setup::endpoint(&client, &region, poll, stack).await?;
            Ok(Status::Success)
        }

        Command::SetupAgent {
            agent_name,
            foundation_model,
            execution_role_arn,
            instruction,
        } => {
            let spec = AgentSpec {
                name: agent_name,
                foundation_model,
                execution_role_arn: required(
                    config.effective_agent_role(execution_role_arn.as_deref()),
                    "agent role ARN",
                    "AWS_BEDROCK_SERVICE_ROLE",
                )?,
                instruction,
            };
            commands::setup::agent(&client, &region, poll, spec).await?;
            Ok(Status::Success)
        }

        Command::SetupAgentcore {
            session_id,
            name,
            code_interpreter,
            timeout_seconds,
        } => {
            let spec = CodeInterpreterSessionSpec {
                name,
                code_interpreter_id: code_interpreter,
                session_id: required(session_id, "session id", "DATABY_AGENTCORE_SESSION_ID")?,
                timeout_secs: timeout_seconds,
            };
            commands::setup::agentcore(&client, &region, poll, spec).await?;
            Ok(Status::Success)
        }

        Command::Wait { kind, name, parent } => {
            let mut descriptor = ResourceDescriptor::new(kind, name, &region);
            descriptor.parent = parent;
            commands::wait::handle(&client, &descriptor, poll).await
        }

        Command::Cleanup { prefix, dry_run, yes } => {
            let prefix = config.effective_prefix(prefix.as_deref());
            let confirm = confirmer(yes);
            commands::sweep::cleanup(&client, confirm.as_ref(), &region, &prefix, dry_run).await
        }

        Command::StopAll { scope, dry_run, yes } => {
            let confirm = confirmer(yes);
            commands::sweep::stop_all(&client, confirm.as_ref(), &region, scope, dry_run).await
        }
    }
}

/// One-line user-facing rendering of a fatal error
fn describe_error(err: &anyhow::Error) -> String {
    if let Some(cloud) = err.downcast_ref::<CloudError>() {
        return format_aws_error(cloud);
    }
    if let Some(LifecycleError::Cloud(cloud)) = err.downcast_ref::<LifecycleError>() {
        return format_aws_error(cloud);
    }
    format!("{:#}", err)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_file.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{} {}", "Error:".red().bold(), describe_error(&e));
            ExitCode::FAILURE
        }
    }
}
