use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{CommandInvoker, CommandOutput};
use crate::error::{ScenarioError, ScenarioResult};
use crate::harness::CommandLine;

/// Settings for spawning the `az` executable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzCliConfig {
    /// Executable used for commands whose program is `az`
    pub executable: PathBuf,
    /// Appended unless the command already selects an output format
    pub output_args: Vec<String>,
    /// Extra environment for every invocation
    pub env: HashMap<String, String>,
}

impl Default for AzCliConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("az"),
            output_args: vec!["--output".to_string(), "json".to_string()],
            env: HashMap::new(),
        }
    }
}

/// Runs commands with the real `az` CLI
pub struct AzCliInvoker {
    config: AzCliConfig,
}

impl AzCliInvoker {
    pub fn new(config: AzCliConfig) -> Self {
        Self { config }
    }

    fn build(&self, command: &CommandLine) -> Command {
        let mut cmd = if command.program() == "az" {
            Command::new(&self.config.executable)
        } else {
            Command::new(command.program())
        };

        cmd.args(command.args());

        if command.program() == "az" && !command.has_flag(&["--output", "-o"]) {
            cmd.args(&self.config.output_args);
        }

        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandInvoker for AzCliInvoker {
    async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
        debug!("Running: {}", command);

        let output = self
            .build(command)
            .output()
            .await
            .map_err(|source| ScenarioError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn name(&self) -> &str {
        "az_cli"
    }
}
