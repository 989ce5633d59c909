use async_trait::async_trait;

use super::{create_workspace, minutes, provisioned, workspace_fixtures, LOCATION};
use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::fixtures::Preparer;
use crate::scenario::{Scenario, ScenarioContext};

const SQL_POOL_TYPE: &str = "Microsoft.Synapse/workspaces/sqlPools";

/// Checks for a pool that finished provisioning and is online
fn online() -> Vec<Check> {
    let mut checks = provisioned(SQL_POOL_TYPE, "{sql-pool}");
    checks.push(Check::equals("status", "Online"));
    checks
}

pub struct SqlPool;

#[async_trait]
impl Scenario for SqlPool {
    fn name(&self) -> &'static str {
        "sql_pool"
    }

    fn description(&self) -> &'static str {
        "Dedicated SQL pool create, show, list, update, pause, resume and delete"
    }

    fn preparers(&self) -> Vec<Preparer> {
        workspace_fixtures()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let pool = ctx.random_name("testsqlpool", 15)?;
        ctx.defaults([
            ("location", LOCATION),
            ("workspace", "testsynapseworkspace"),
            ("rg", "rg"),
            ("performance-level", "DW400c"),
        ]);
        ctx.defaults([("sql-pool", pool)]);

        create_workspace(ctx, LOCATION, "").await?;

        ctx.cmd(
            "az synapse workspace check-name --name {workspace}",
            &[Check::equals("available", false)],
        )
        .await?;

        let created = ctx
            .cmd(
                "az synapse sql pool create --name {sql-pool} --performance-level {performance-level} \
                 --workspace {workspace} --resource-group {rg}",
                &online(),
            )
            .await?;
        let id = created.text("id")?;
        ctx.set("pool-id", id);

        let show = "az synapse sql pool show --name {sql-pool} --workspace {workspace} --resource-group {rg}";
        ctx.cmd(show, &online()).await?;

        ctx.cmd(
            "az synapse sql pool list --workspace {workspace} --resource-group {rg}",
            &[Check::equals("[0].type", SQL_POOL_TYPE)],
        )
        .await?;

        ctx.cmd("az synapse sql pool update --ids {pool-id} --tags key1=value1", &[])
            .await?;

        let mut checks = online();
        checks.push(Check::equals("tags.key1", "value1"));
        ctx.cmd("az synapse sql pool show --ids {pool-id}", &checks)
            .await?;

        ctx.cmd(
            "az synapse sql pool pause --name {sql-pool} --workspace {workspace} --resource-group {rg}",
            &[],
        )
        .await?;
        ctx.cmd(
            show,
            &[
                Check::equals("name", "{sql-pool}"),
                Check::equals("type", SQL_POOL_TYPE),
                Check::equals("status", "Paused"),
            ],
        )
        .await?;

        ctx.cmd(
            "az synapse sql pool resume --name {sql-pool} --workspace {workspace} --resource-group {rg}",
            &[],
        )
        .await?;
        ctx.cmd(
            show,
            &[
                Check::equals("name", "{sql-pool}"),
                Check::equals("type", SQL_POOL_TYPE),
                Check::equals("status", "Online"),
            ],
        )
        .await?;

        ctx.cmd(
            "az synapse sql pool delete --name {sql-pool} --workspace {workspace} --resource-group {rg} --yes",
            &[],
        )
        .await?;
        ctx.cmd_expect_failure(show).await?;
        Ok(())
    }
}

/// Point-in-time restore into a new pool, then the deleted-pool listing
pub struct SqlPoolRestoreAndListDeleted;

#[async_trait]
impl Scenario for SqlPoolRestoreAndListDeleted {
    fn name(&self) -> &'static str {
        "sql_pool_restore_and_list_deleted"
    }

    fn description(&self) -> &'static str {
        "Restore a SQL pool to a point in time, delete it and find it in list-deleted"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let dest = ctx.random_name("destsqlpool", 15)?;
        ctx.defaults([
            ("location", "eastus2euap"),
            ("workspace", "zes0219test"),
            ("rg", "chayang-test-rg"),
            ("sql-pool", "rivertiger0220"),
            ("performance-level", "DW1000c"),
            ("restore-point-time", "2021-05-24T08:09:15"),
        ]);
        ctx.defaults([("dest-sql-pool", dest)]);

        ctx.cmd(
            "az synapse sql pool restore --name {sql-pool} --workspace-name {workspace} --resource-group {rg} \
             --dest-name {dest-sql-pool} --time {restore-point-time}",
            &[Check::equals("name", "{dest-sql-pool}")],
        )
        .await?;

        let mut checks = provisioned(SQL_POOL_TYPE, "{dest-sql-pool}");
        checks.push(Check::equals("status", "Online"));
        ctx.cmd(
            "az synapse sql pool show --name {dest-sql-pool} --workspace-name {workspace} --resource-group {rg}",
            &checks,
        )
        .await?;

        ctx.cmd(
            "az synapse sql pool delete --name {dest-sql-pool} --workspace-name {workspace} --resource-group {rg} --yes",
            &[],
        )
        .await?;

        // the deleted pool takes minutes to be listed
        ctx.wait_for(
            "az synapse sql pool list-deleted --workspace-name {workspace} --resource-group {rg}",
            &[Check::greater_than("length([])", 0)],
            minutes(10),
        )
        .await?;
        Ok(())
    }
}
