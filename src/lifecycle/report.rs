//! Sweep results and their textual rendering

use crate::resource::ResourceDescriptor;
use colored::Colorize;
use std::fmt;

/// What happened to one resource during a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deleted,
    Stopped,
    WouldDelete,
    WouldStop,
    /// Disappeared between listing and acting; nothing left to do
    AlreadyGone,
    Error(String),
}

impl Outcome {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Outcome::WouldDelete | Outcome::WouldStop)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Deleted => f.write_str("deleted"),
            Outcome::Stopped => f.write_str("stopped"),
            Outcome::WouldDelete => f.write_str("would delete"),
            Outcome::WouldStop => f.write_str("would stop"),
            Outcome::AlreadyGone => f.write_str("already gone"),
            Outcome::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Aggregate of a sweep or cleanup, built per kind and merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    pub deleted: usize,
    pub stopped: usize,
    pub errors: usize,
    pub details: Vec<(ResourceDescriptor, Outcome)>,
}

impl OperationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome and bump the matching counter
    pub fn record(&mut self, descriptor: ResourceDescriptor, outcome: Outcome) {
        match outcome {
            Outcome::Deleted => self.deleted += 1,
            Outcome::Stopped => self.stopped += 1,
            Outcome::Error(_) => self.errors += 1,
            Outcome::WouldDelete | Outcome::WouldStop | Outcome::AlreadyGone => {}
        }
        self.details.push((descriptor, outcome));
    }

    /// Append another result after this one
    pub fn merge(mut self, other: OperationResult) -> Self {
        self.deleted += other.deleted;
        self.stopped += other.stopped;
        self.errors += other.errors;
        self.details.extend(other.details);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Entries that a real run would have acted on
    pub fn would_act(&self) -> usize {
        self.details.iter().filter(|(_, o)| o.is_dry_run()).count()
    }

    pub fn summary_line(&self) -> String {
        let pending = self.would_act();
        if pending > 0 {
            format!(
                "{} resource(s) would be acted on, {} error(s)",
                pending, self.errors
            )
        } else {
            format!(
                "{} deleted, {} stopped, {} error(s)",
                self.deleted, self.stopped, self.errors
            )
        }
    }

    /// Print the report to stdout
    pub fn print(&self) {
        if self.is_empty() {
            println!("{}", "Nothing to do: no billable resources found.".green());
            return;
        }

        for (d, outcome) in &self.details {
            let label = match outcome {
                Outcome::Deleted | Outcome::Stopped => outcome.to_string().green(),
                Outcome::WouldDelete | Outcome::WouldStop => outcome.to_string().yellow(),
                Outcome::AlreadyGone => outcome.to_string().dimmed(),
                Outcome::Error(_) => outcome.to_string().red(),
            };
            println!("  • {} {}", d.to_string().cyan(), label);
        }

        println!();
        let summary = self.summary_line();
        if self.has_errors() {
            println!("{}", summary.red().bold());
        } else {
            println!("{}", summary.bold());
        }
    }
}
