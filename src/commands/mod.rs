//! Command handlers behind the `databy-cloud` subcommands
//!
//! Handlers print a coloured report to stdout and return the process exit
//! code. Anything they cannot report on is returned as an error.

pub mod check;
pub mod list;
pub mod setup;
pub mod sweep;
pub mod wait;

use crate::lifecycle::PollOutcome;
use crate::resource::ResourceDescriptor;
use colored::Colorize;
use std::process::ExitCode;

/// How a command ended, as far as the exit code is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The command ran but something it reported on failed
    Failure,
}

impl Status {
    pub fn from_success(ok: bool) -> Self {
        if ok {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
        }
    }
}

/// The `wait` invocation that picks up where a timed-out wait left off
pub(crate) fn wait_hint(descriptor: &ResourceDescriptor) -> String {
    let mut hint = format!("databy-cloud wait {} {}", descriptor.kind, descriptor.name);
    if let Some(parent) = &descriptor.parent {
        hint.push_str(&format!(" --parent {}", parent));
    }
    hint
}

/// Print the warning for a wait that ran out of attempts
pub(crate) fn print_timeout(descriptor: &ResourceDescriptor, wait: &PollOutcome) {
    if let PollOutcome::TimedOut { last, attempts } = wait {
        println!(
            "{}",
            format!(
                "⚠ {} is still {} after {} attempt(s); check again later with `{}`",
                descriptor,
                last,
                attempts,
                wait_hint(descriptor)
            )
            .yellow()
        );
    }
}
