//! databy-cloud: lifecycle management of the SageMaker and Bedrock
//! resources behind the DataBy agent backend.

pub mod aws;
pub mod commands;
pub mod config;
pub mod lifecycle;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Version injected at compile time via DATABY_CLOUD_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("DATABY_CLOUD_VERSION") {
    Some(v) => v,
    None => "dev",
};
