//! Ephemeral resources provisioned around a scenario

use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tracing::info;

use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::harness::CommandLine;
use crate::scenario::ScenarioContext;

/// A resource created before a scenario runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preparer {
    ResourceGroup {
        name_prefix: String,
        random_name_length: usize,
        key: String,
        location: Option<String>,
    },
    StorageAccount {
        name_prefix: String,
        length: usize,
        location: String,
        hns: bool,
        key: String,
        sku: String,
        kind: String,
    },
}

/// Command that removes what a preparer created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teardown {
    pub resource: String,
    pub command: CommandLine,
}

impl Preparer {
    /// Resource group `synapse-cli*` stored under `rg`
    pub fn resource_group() -> Self {
        Preparer::ResourceGroup {
            name_prefix: "synapse-cli".to_string(),
            random_name_length: 16,
            key: "rg".to_string(),
            location: None,
        }
    }

    /// Hierarchical-namespace storage account `adlsgen2*` stored under `storage-account`
    pub fn storage_account(location: &str) -> Self {
        Preparer::StorageAccount {
            name_prefix: "adlsgen2".to_string(),
            length: 16,
            location: location.to_string(),
            hns: true,
            key: "storage-account".to_string(),
            sku: "Standard_LRS".to_string(),
            kind: "StorageV2".to_string(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Preparer::ResourceGroup { key, .. } | Preparer::StorageAccount { key, .. } => key,
        }
    }

    /// Create the resource, store its name in the context and return how to remove it
    pub async fn create(
        &self,
        ctx: &mut ScenarioContext,
        default_location: &str,
    ) -> ScenarioResult<Teardown> {
        match self {
            Preparer::ResourceGroup {
                name_prefix,
                random_name_length,
                key,
                location,
            } => {
                let name = ctx.random_name(name_prefix, *random_name_length)?;
                let location = location.as_deref().unwrap_or(default_location);
                let date = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
                ctx.scrub(date.clone(), "$DATE");

                info!("Creating resource group {}", name);
                let command = CommandLine::new(argv(&[
                    "az", "group", "create", "--location", location, "--name", &name,
                    "--tag", "product=azurecli", "cause=automation", &format!("date={date}"),
                ]));
                ctx.run_command(&command).await?;
                ctx.set(key.as_str(), name.as_str());

                Ok(Teardown {
                    resource: format!("resource group {name}"),
                    command: CommandLine::new(argv(&[
                        "az", "group", "delete", "--name", &name, "--yes", "--no-wait",
                    ])),
                })
            }
            Preparer::StorageAccount {
                name_prefix,
                length,
                location,
                hns,
                key,
                sku,
                kind,
            } => {
                let name = ctx.random_name(name_prefix, *length)?;
                let group = ctx.text("rg")?;

                info!("Creating storage account {}", name);
                let mut args = argv(&[
                    "az", "storage", "account", "create", "-n", &name, "-g", &group, "-l", location,
                    "--sku", sku, "--kind", kind, "--https-only",
                ]);
                if *hns {
                    args.push("--hns".to_string());
                }
                ctx.run_command(&CommandLine::new(args)).await?;
                ctx.set(key.as_str(), name.as_str());

                Ok(Teardown {
                    resource: format!("storage account {name}"),
                    command: CommandLine::new(argv(&[
                        "az", "storage", "account", "delete", "-n", &name, "-g", &group, "--yes",
                    ])),
                })
            }
        }
    }
}

impl fmt::Display for Preparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preparer::ResourceGroup { name_prefix, .. } => {
                write!(f, "resource group ({name_prefix}*)")
            }
            Preparer::StorageAccount {
                name_prefix, hns, ..
            } => {
                let hns = if *hns { ", hns" } else { "" };
                write!(f, "storage account ({name_prefix}*{hns})")
            }
        }
    }
}

/// Wait for the fixture storage account to finish provisioning
pub async fn wait_for_storage_account(ctx: &ScenarioContext) -> ScenarioResult<()> {
    ctx.wait_for(
        "az storage account show --name {storage-account}",
        &[Check::equals("provisioningState", "Succeeded")],
        Duration::from_secs(60),
    )
    .await
    .map(|_| ())
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScenarioError;
    use crate::invoker::{CommandInvoker, CommandOutput};
    use crate::scenario::ContextOptions;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CommandLine>>,
    }

    #[async_trait]
    impl CommandInvoker for Recorder {
        async fn invoke(&self, command: &CommandLine) -> ScenarioResult<CommandOutput> {
            self.seen.lock().await.push(command.clone());
            Ok(CommandOutput::success("{}"))
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_resource_group_then_storage_account() {
        let invoker = Arc::new(Recorder::default());
        let mut ctx = ScenarioContext::new(invoker.clone(), ContextOptions::default());

        let rg = Preparer::resource_group().create(&mut ctx, "westus").await.unwrap();
        let sa = Preparer::storage_account("eastus2euap")
            .create(&mut ctx, "westus")
            .await
            .unwrap();

        let group = ctx.text("rg").unwrap();
        let account = ctx.text("storage-account").unwrap();
        assert!(group.starts_with("synapse-cli") && group.len() == 16);
        assert!(account.starts_with("adlsgen2") && account.len() == 16);

        let seen = invoker.seen.lock().await;
        assert_eq!(&seen[0].args()[..6], &["group", "create", "--location", "westus", "--name", group.as_str()]);
        assert!(seen[1].has_flag(&["--hns"]));
        assert!(seen[1].args().contains(&"eastus2euap".to_string()));

        assert_eq!(rg.command.to_string(), format!("az group delete --name {group} --yes --no-wait"));
        assert_eq!(
            sa.command.to_string(),
            format!("az storage account delete -n {account} -g {group} --yes")
        );
    }

    #[tokio::test]
    async fn test_storage_account_needs_resource_group() {
        let mut ctx = ScenarioContext::new(Arc::new(Recorder::default()), ContextOptions::default());
        let err = Preparer::storage_account("westus")
            .create(&mut ctx, "westus")
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::MissingKeyword { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(Preparer::resource_group().to_string(), "resource group (synapse-cli*)");
        assert_eq!(
            Preparer::storage_account("westus").to_string(),
            "storage account (adlsgen2*, hns)"
        );
    }
}
