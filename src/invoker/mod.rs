use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod az_cli;
pub mod cassette;

pub use az_cli::{AzCliConfig, AzCliInvoker};
pub use cassette::{Cassette, Interaction, PlaybackInvoker, RecordingInvoker, Scrubber};

use crate::error::{ScenarioError, ScenarioResult};
use crate::harness::CommandLine;

/// Captured result of one command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Decode stdout as JSON; empty output decodes as `null`
    pub fn json(&self, command: &CommandLine) -> ScenarioResult<Value> {
        let trimmed = self.stdout.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|source| ScenarioError::InvalidJson {
            command: command.to_string(),
            source,
        })
    }
}

/// Executes command lines against the control plane (or a stand-in for it)
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput>;
    fn name(&self) -> &str;
}
