//! AWS control plane access through the aws CLI

pub mod auth;
pub mod cli;
pub mod client;
pub mod error;
pub mod provision;

pub use client::AwsClient;
