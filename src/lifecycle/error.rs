//! Lifecycle error types

use crate::aws::error::CloudError;
use crate::resource::ResourceDescriptor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Required input missing or malformed; raised before any cloud call
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Provider reported a failure state for the resource
    #[error("{descriptor} entered a failure state: {status}")]
    TerminalFailure {
        descriptor: ResourceDescriptor,
        status: String,
    },

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
