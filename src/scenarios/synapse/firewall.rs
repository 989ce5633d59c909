use async_trait::async_trait;

use super::{create_workspace, minutes, provisioned, workspace_fixtures, LOCATION};
use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::fixtures::Preparer;
use crate::scenario::{Scenario, ScenarioContext};

const RULE_TYPE: &str = "Microsoft.Synapse/workspaces/firewallRules";

pub struct IpFirewallRules;

#[async_trait]
impl Scenario for IpFirewallRules {
    fn name(&self) -> &'static str {
        "ip_firewall_rules"
    }

    fn description(&self) -> &'static str {
        "Workspace IP firewall rule create, show, update, list and delete"
    }

    fn preparers(&self) -> Vec<Preparer> {
        workspace_fixtures()
    }

    fn tags(&self) -> &'static [&'static str] {
        &["workspace", "network"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let rule = ctx.random_name("rule", 8)?;
        ctx.defaults([
            ("workspace", "testsynapseworkspace"),
            ("rg", "rg"),
            ("start-ip-address", "0.0.0.0"),
            ("end-ip-address", "255.255.255.255"),
            ("second-ip-address", "192.0.0.1"),
        ]);
        ctx.defaults([("rule-name", rule)]);

        create_workspace(ctx, LOCATION, "").await?;

        ctx.cmd(
            "az synapse workspace check-name --name {workspace}",
            &[Check::equals("available", false)],
        )
        .await?;

        ctx.cmd(
            "az synapse workspace firewall-rule create --name {rule-name} --workspace-name {workspace} \
             --resource-group {rg} --start-ip-address {start-ip-address} --end-ip-address {end-ip-address}",
            &provisioned(RULE_TYPE, "{rule-name}"),
        )
        .await?;

        let show = "az synapse workspace firewall-rule show --name {rule-name} --workspace-name {workspace} \
                    --resource-group {rg}";
        ctx.cmd(show, &provisioned(RULE_TYPE, "{rule-name}")).await?;

        let mut checks = provisioned(RULE_TYPE, "{rule-name}");
        checks.push(Check::equals("startIpAddress", "{second-ip-address}"));
        ctx.cmd(
            "az synapse workspace firewall-rule update --name {rule-name} --workspace-name {workspace} \
             --resource-group {rg} --start-ip-address {second-ip-address}",
            &checks,
        )
        .await?;

        ctx.cmd(
            "az synapse workspace firewall-rule list --workspace-name {workspace} --resource-group {rg}",
            &[Check::equals("[0].type", RULE_TYPE)],
        )
        .await?;

        ctx.cmd(
            "az synapse workspace firewall-rule delete --name {rule-name} --workspace-name {workspace} \
             --resource-group {rg} --yes",
            &[],
        )
        .await?;
        ctx.wait_until_fails(show, minutes(2)).await
    }
}
