//! Blob, Log Analytics and Event Hub audit targets, at workspace and SQL pool scope

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{create_storage_account, create_workspace, provisioned};
use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::fixtures::Preparer;
use crate::scenario::{Scenario, ScenarioContext};

const AUDIT_LOCATION: &str = "eastus";

/// Where an audit policy lives
struct AuditScope {
    group: &'static str,
    target: &'static str,
    /// `--blob-auditing-policy-name` passed to each successive `show`
    show_policy_names: [Option<&'static str>; 6],
}

const WORKSPACE_SCOPE: AuditScope = AuditScope {
    group: "az synapse sql audit-policy",
    target: "--workspace-name {workspace} --resource-group {rg}",
    show_policy_names: [
        Some("bapname"),
        Some("bapname"),
        Some("bapn"),
        Some("bapname"),
        Some("bapn"),
        Some("bapn"),
    ],
};

const POOL_SCOPE: AuditScope = AuditScope {
    group: "az synapse sql pool audit-policy",
    target: "--workspace-name {workspace} --resource-group {rg} --name {sql-pool}",
    show_policy_names: [None, Some("bapname"), None, None, None, None],
};

impl AuditScope {
    fn show(&self, step: usize) -> String {
        match self.show_policy_names.get(step).copied().flatten() {
            Some(policy) => format!(
                "{} show {} --blob-auditing-policy-name {}",
                self.group, self.target, policy
            ),
            None => format!("{} show {}", self.group, self.target),
        }
    }

    fn update(&self, args: &str) -> String {
        format!(
            "{} update {} {} --blob-auditing-policy-name bapn",
            self.group, self.target, args
        )
    }
}

/// Expected state of each audit target as reported by `show`
fn targets(log_analytics: bool, event_hub: bool) -> Vec<Check> {
    let state = |enabled: bool| if enabled { "Enabled" } else { "Disabled" };
    vec![
        Check::equals("state", "Enabled"),
        Check::equals("blobStorageTargetState", "Enabled"),
        Check::equals("logAnalyticsTargetState", state(log_analytics)),
        Check::equals("eventHubTargetState", state(event_hub)),
        Check::equals("isAzureMonitorTargetEnabled", log_analytics || event_hub),
    ]
}

fn updated(state: &str, actions: &Value) -> Vec<Check> {
    vec![
        Check::equals("state", state),
        Check::equals("retentionDays", "{retention-days}"),
        Check::equals("auditActionsAndGroups", actions.clone()),
    ]
}

async fn exercise_audit_policy(
    ctx: &mut ScenarioContext,
    scope: &AuditScope,
    actions: &Value,
) -> ScenarioResult<()> {
    let account = ctx
        .cmd("az storage account show -g {rg} -n {storage-account}", &[])
        .await?;
    let endpoint = account.text("primaryEndpoints.blob")?;
    ctx.set("storage-endpoint", endpoint);

    let keys = ctx
        .cmd("az storage account keys list -g {rg} -n {storage-account}", &[])
        .await?;
    let key = keys.text("[0].value")?;
    ctx.scrub(key.clone(), "$STORAGE_KEY");
    ctx.set("storage-key", key);

    ctx.cmd(&scope.show(0), &[Check::equals("state", "Disabled")])
        .await?;

    let mut blob = updated("Enabled", actions);
    blob.push(Check::equals("storageEndpoint", "{storage-endpoint}"));
    ctx.cmd(
        &format!(
            "{} update {} --state Enabled --bsts Enabled --storage-key {{storage-key}} \
             --storage-endpoint={{storage-endpoint}} --retention-days={{retention-days}} \
             --actions {{audit-actions}} --blob-auditing-policy-name bapname",
            scope.group, scope.target
        ),
        &blob,
    )
    .await?;
    ctx.cmd(&scope.show(1), &targets(false, false)).await?;

    ctx.cmd(
        &scope.update(
            "--state Enabled --bsts Enabled --storage-account {storage-account} \
             --retention-days={retention-days} --actions {audit-actions}",
        ),
        &blob,
    )
    .await?;

    ctx.cmd(&scope.update("--state Disabled"), &updated("Disabled", actions))
        .await?;

    let log_analytics = ctx
        .cmd(
            "az monitor log-analytics workspace create --resource-group {rg} \
             --workspace-name {log-analytics-workspace}",
            &[
                Check::equals("name", "{log-analytics-workspace}"),
                Check::equals("provisioningState", "Succeeded"),
            ],
        )
        .await?;
    let id = log_analytics.text("id")?;
    ctx.set("log-analytics-workspace-id", id);

    ctx.cmd(
        &scope.update("--state Enabled --lats Enabled --lawri {log-analytics-workspace-id}"),
        &updated("Enabled", actions),
    )
    .await?;
    ctx.cmd(&scope.show(2), &targets(true, false)).await?;

    ctx.cmd(&scope.update("--state Enabled --lats Disabled"), &updated("Enabled", actions))
        .await?;
    ctx.cmd(&scope.show(3), &targets(false, false)).await?;

    ctx.cmd(
        "az eventhubs namespace create --resource-group {rg} -n {eventhub-namespace} --location eastus",
        &[Check::equals("provisioningState", "Succeeded")],
    )
    .await?;
    ctx.cmd(
        "az eventhubs eventhub create --resource-group {rg} -n {eventhub} \
         --namespace-name {eventhub-namespace}",
        &[Check::equals("status", "Active")],
    )
    .await?;
    let rule = ctx
        .cmd(
            "az eventhubs namespace authorization-rule create --resource-group {rg} \
             -n {eventhub-auth-rule} --namespace-name {eventhub-namespace} --rights Listen Manage Send",
            &[],
        )
        .await?;
    let id = rule.text("id")?;
    ctx.set("eventhub-auth-rule-id", id);

    ctx.cmd(
        &scope.update(
            "--state Enabled --event-hub-target-state Enabled \
             --ehari {eventhub-auth-rule-id} --event-hub {eventhub}",
        ),
        &updated("Enabled", actions),
    )
    .await?;
    ctx.cmd(&scope.show(4), &targets(false, true)).await?;

    ctx.cmd(
        &scope.update("--state Enabled --event-hub-target-state Disabled"),
        &updated("Enabled", actions),
    )
    .await?;
    ctx.cmd(&scope.show(5), &targets(false, false)).await?;
    Ok(())
}

/// Random names for the Log Analytics workspace and Event Hub resources
fn audit_resources(ctx: &mut ScenarioContext) -> ScenarioResult<()> {
    let log_analytics = ctx.random_name("laws", 20)?;
    let eventhub = ctx.random_name("ehsrv", 20)?;
    let namespace = ctx.random_name("ehnamespace", 20)?;
    let rule = ctx.random_name("ehauthruledb", 20)?;
    ctx.defaults([
        ("log-analytics-workspace", log_analytics),
        ("eventhub", eventhub),
        ("eventhub-namespace", namespace),
        ("eventhub-auth-rule", rule),
    ]);
    Ok(())
}

pub struct WorkspaceAuditPolicy;

#[async_trait]
impl Scenario for WorkspaceAuditPolicy {
    fn name(&self) -> &'static str {
        "sql_ws_audit_policy_logentry_eventhub"
    }

    fn description(&self) -> &'static str {
        "Workspace SQL audit policy with blob, Log Analytics and Event Hub targets"
    }

    fn preparers(&self) -> Vec<Preparer> {
        vec![Preparer::resource_group()]
    }

    fn record_only(&self) -> bool {
        false
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql", "audit"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        audit_resources(ctx)?;
        ctx.defaults([
            ("retention-days", "30"),
            ("audit-actions", "DATABASE_LOGOUT_GROUP"),
        ]);
        let actions = json!([ctx.text("audit-actions")?]);

        create_storage_account(ctx, AUDIT_LOCATION).await?;
        create_workspace(ctx, AUDIT_LOCATION, "").await?;

        exercise_audit_policy(ctx, &WORKSPACE_SCOPE, &actions).await
    }
}

pub struct SqlPoolAuditPolicy;

#[async_trait]
impl Scenario for SqlPoolAuditPolicy {
    fn name(&self) -> &'static str {
        "sql_pool_audit_policy_logentry_eventhub"
    }

    fn description(&self) -> &'static str {
        "SQL pool audit policy with blob, Log Analytics and Event Hub targets"
    }

    fn preparers(&self) -> Vec<Preparer> {
        vec![Preparer::resource_group()]
    }

    fn record_only(&self) -> bool {
        false
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql", "audit"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        audit_resources(ctx)?;
        let pool = ctx.random_name("testsqlpool", 15)?;
        ctx.defaults([
            ("sql-pool", pool.as_str()),
            ("performance-level", "DW400c"),
            ("retention-days", "30"),
            ("audit-actions", "SUCCESSFUL_DATABASE_AUTHENTICATION_GROUP"),
        ]);
        let actions = json!([ctx.text("audit-actions")?]);

        create_storage_account(ctx, AUDIT_LOCATION).await?;
        create_workspace(ctx, AUDIT_LOCATION, "").await?;

        let mut online = provisioned("Microsoft.Synapse/workspaces/sqlPools", "{sql-pool}");
        online.push(Check::equals("status", "Online"));
        ctx.cmd(
            "az synapse sql pool create --name {sql-pool} --performance-level {performance-level} \
             --workspace {workspace} --resource-group {rg}",
            &online,
        )
        .await?;

        exercise_audit_policy(ctx, &POOL_SCOPE, &actions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_name(command: &str) -> Option<&str> {
        command
            .split_once("--blob-auditing-policy-name ")
            .map(|(_, name)| name)
    }

    #[test]
    fn test_workspace_shows_name_the_policy_every_time() {
        let names: Vec<_> = (0..6)
            .map(|step| WORKSPACE_SCOPE.show(step))
            .map(|command| policy_name(&command).map(str::to_string))
            .collect();
        assert_eq!(
            names,
            ["bapname", "bapname", "bapn", "bapname", "bapn", "bapn"].map(|n| Some(n.to_string()))
        );
    }

    #[test]
    fn test_pool_shows_name_the_policy_once() {
        assert_eq!(
            POOL_SCOPE.show(0),
            "az synapse sql pool audit-policy show --workspace-name {workspace} \
             --resource-group {rg} --name {sql-pool}"
        );
        assert_eq!(policy_name(&POOL_SCOPE.show(1)), Some("bapname"));
        for step in 2..6 {
            assert_eq!(policy_name(&POOL_SCOPE.show(step)), None);
        }
    }

    #[test]
    fn test_updates_name_the_short_policy() {
        assert!(WORKSPACE_SCOPE
            .update("--state Disabled")
            .ends_with("--state Disabled --blob-auditing-policy-name bapn"));
    }
}
