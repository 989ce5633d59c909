use async_trait::async_trait;

use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::scenario::{Scenario, ScenarioContext};

/// Synapse RBAC: scopes, role definitions and assignments
pub struct AccessControl;

#[async_trait]
impl Scenario for AccessControl {
    fn name(&self) -> &'static str {
        "access_control"
    }

    fn description(&self) -> &'static str {
        "Role scopes, role definitions and role assignments at workspace and item scope"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["security"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("workspace", "clitestsynapseworkspace"),
            ("role", "Synapse Contributor"),
            ("user-principal", "username@contoso.com"),
            ("service-principal", "testsynapsecli"),
            ("scope-name", "workspaces/{workspaceName}/bigDataPools/{bigDataPoolName}"),
            ("item-type", "bigDataPools"),
            ("item", "testitem"),
        ]);

        ctx.cmd(
            "az synapse role scope list --workspace-name {workspace}",
            &[Check::equals("contains([], '{scope-name}')", true)],
        )
        .await?;

        ctx.cmd(
            "az synapse role definition list --workspace-name {workspace}",
            &[Check::equals("[0].name", "Synapse Administrator")],
        )
        .await?;

        let definition = ctx
            .cmd(
                r#"az synapse role definition show --workspace-name {workspace} --role "{role}""#,
                &[Check::equals("name", "{role}")],
            )
            .await?;
        let role_id = definition.text("id")?;
        ctx.set("role-id", role_id);

        let assignment = ctx
            .cmd(
                r#"az synapse role assignment create --workspace-name {workspace} --role "{role}"
                   --assignee {service-principal} --assignment-id 0550e787-7841-4669-9ac8-a8176e900002"#,
                &[Check::equals("roleDefinitionId", "{role-id}")],
            )
            .await?;
        let assignment_id = assignment.text("id")?;
        let role_id = assignment.text("roleDefinitionId")?;
        let principal_id = assignment.text("principalId")?;
        ctx.set("role-assignment-id", assignment_id);
        ctx.set("role-id", role_id);
        ctx.set("principal-id", principal_id);

        ctx.cmd(
            r#"az synapse role assignment create --workspace-name {workspace} --role "{role}"
               --assignee {service-principal} --item-type {item-type} --item {item}
               --assignment-id 0333e787-7841-4669-9ac8-a8176e900002"#,
            &[
                Check::equals("roleDefinitionId", "{role-id}"),
                Check::equals("scope", "workspaces/{workspace}/{item-type}/{item}"),
            ],
        )
        .await?;

        let show = "az synapse role assignment show --workspace-name {workspace} --id {role-assignment-id}";
        ctx.cmd(
            show,
            &[
                Check::equals("roleDefinitionId", "{role-id}"),
                Check::equals("principalId", "{principal-id}"),
            ],
        )
        .await?;

        for filter in [
            r#"--role "{role}" --item-type {item-type} --item {item}"#,
            "--assignee {service-principal}",
            "--assignee-object-id {principal-id}",
        ] {
            ctx.cmd(
                &format!("az synapse role assignment list --workspace-name {{workspace}} {filter}"),
                &[Check::equals("length([])", 2)],
            )
            .await?;
        }

        ctx.cmd(
            "az synapse role assignment delete --workspace-name {workspace} --ids {role-assignment-id} -y",
            &[],
        )
        .await?;
        ctx.cmd_expect_failure(show).await?;
        Ok(())
    }
}
