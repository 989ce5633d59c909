//! synapse-scenarios library
//!
//! Scenario tests for the `az synapse` command-line interface: a harness that
//! renders and runs CLI commands, checks their JSON output, polls for
//! eventual consistency and records interactions for offline playback.

pub mod checks;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod invoker;
pub mod output;
pub mod poll;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod scenarios;

// Re-export commonly used types
pub use checks::{Check, Query};
pub use config::{RunMode, RunnerConfig};
pub use error::{ScenarioError, ScenarioResult};
pub use runner::{ScenarioOutcome, ScenarioRunner, Status};
pub use scenario::{ExecutionResult, Scenario, ScenarioContext};
