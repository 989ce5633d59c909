//! Scenarios for `az synapse`

use std::time::Duration;

use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::fixtures::{self, Preparer};
use crate::scenario::{Scenario, ScenarioContext};

mod access_control;
mod artifacts;
mod audit;
mod firewall;
mod integration_runtime;
mod private_endpoint;
mod spark;
mod sql_pool;
mod sql_security;
mod workspace;

/// Default location for workspaces and storage accounts
pub const LOCATION: &str = "eastus2euap";

/// Every Synapse scenario, in suite order
pub fn catalogue() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(workspace::Workspaces),
        Box::new(workspace::ManagedVirtualNetworkWorkspace),
        Box::new(spark::SparkPool),
        Box::new(workspace::WorkspaceWithCmk),
        Box::new(sql_pool::SqlPool),
        Box::new(sql_pool::SqlPoolRestoreAndListDeleted),
        Box::new(sql_security::ClassificationAndRecommendation),
        Box::new(sql_security::TransparentDataEncryption),
        Box::new(sql_security::ThreatPolicy),
        Box::new(audit::WorkspaceAuditPolicy),
        Box::new(audit::SqlPoolAuditPolicy),
        Box::new(sql_security::AadAdmin),
        Box::new(firewall::IpFirewallRules),
        Box::new(spark::SparkJob),
        Box::new(spark::SparkSessionAndStatements),
        Box::new(access_control::AccessControl),
        Box::new(artifacts::LinkedService),
        Box::new(artifacts::Dataset),
        Box::new(artifacts::Pipeline),
        Box::new(artifacts::Trigger),
        Box::new(artifacts::DataFlow),
        Box::new(artifacts::Notebook),
        Box::new(integration_runtime::IntegrationRuntime),
        Box::new(private_endpoint::ManagedPrivateEndpoints),
    ]
}

/// Resource group plus hierarchical-namespace storage account
fn workspace_fixtures() -> Vec<Preparer> {
    vec![Preparer::resource_group(), Preparer::storage_account(LOCATION)]
}

/// Create a workspace with a random name on the fixture storage account
async fn create_workspace(
    ctx: &mut ScenarioContext,
    location: &str,
    extra_args: &str,
) -> ScenarioResult<()> {
    let workspace = ctx.random_name("clitest", 16)?;
    let password = ctx.random_name("Pswd1", 16)?;
    ctx.set("workspace", workspace);
    ctx.set("location", location);
    ctx.set("file-system", "testfilesystem");
    ctx.set("login-user", "cliuser1");
    ctx.set("login-password", password);

    fixtures::wait_for_storage_account(ctx).await?;

    let template = format!(
        "az synapse workspace create --name {{workspace}} --resource-group {{rg}} \
         --storage-account {{storage-account}} --file-system {{file-system}} \
         --sql-admin-login-user {{login-user}} --sql-admin-login-password {{login-password}} \
         --location {{location}} {extra_args}"
    );
    ctx.cmd(&template, &provisioned("Microsoft.Synapse/workspaces", "{workspace}"))
        .await?;
    Ok(())
}

/// Create a storage account in the scenario resource group
async fn create_storage_account(ctx: &mut ScenarioContext, location: &str) -> ScenarioResult<()> {
    let account = ctx.random_name("adlsgen2", 16)?;
    ctx.set("location", location);
    ctx.set("storage-account", account);

    ctx.cmd(
        "az storage account create --name {storage-account} --resource-group {rg} \
         --enable-hierarchical-namespace true --location {location}",
        &provisioned("Microsoft.Storage/storageAccounts", "{storage-account}"),
    )
    .await?;
    Ok(())
}

/// `name`, `type` and `provisioningState == Succeeded`
fn provisioned(resource_type: &str, name: &str) -> Vec<Check> {
    vec![
        Check::equals("name", name),
        Check::equals("type", resource_type),
        Check::equals("provisioningState", "Succeeded"),
    ]
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

fn seconds(n: u64) -> Duration {
    Duration::from_secs(n)
}
