//! SQL pool security features on long-lived resources

use async_trait::async_trait;

use crate::checks::Check;
use crate::error::ScenarioResult;
use crate::scenario::{Scenario, ScenarioContext};

pub struct ClassificationAndRecommendation;

#[async_trait]
impl Scenario for ClassificationAndRecommendation {
    fn name(&self) -> &'static str {
        "sql_pool_classification_and_recommendation"
    }

    fn description(&self) -> &'static str {
        "Sensitivity classification CRUD and classification recommendations on a column"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql", "security"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("location", "eastus2euap"),
            ("workspace", "zes0514test"),
            ("rg", "chayang-test-rg"),
            ("sql-pool", "sqlzes0514test"),
            ("schema", "dbo"),
            ("table", "Persons"),
            ("column", "City"),
            ("label", "Confidential"),
            ("information-type", "\"Contact Info\""),
        ]);

        let pool = "--name {sql-pool} --workspace-name {workspace} --resource-group {rg}";
        let column = "--schema {schema} --table {table} --column {column}";
        let classification = "az synapse sql pool classification";
        let recommendation = "az synapse sql pool classification recommendation";

        ctx.cmd(
            &format!("{classification} create {pool} {column} --label {{label}} --information-type {{information-type}}"),
            &[Check::equals("labelName", "{label}")],
        )
        .await?;
        ctx.cmd(
            &format!("{classification} show {pool} {column}"),
            &[Check::equals("labelName", "{label}")],
        )
        .await?;
        ctx.cmd(
            &format!("{classification} list {pool}"),
            &[Check::equals("[0].labelName", "{label}")],
        )
        .await?;
        ctx.cmd(
            &format!("{classification} update {pool} {column} --label {{label}} --information-type {{information-type}}"),
            &[],
        )
        .await?;
        ctx.cmd(&format!("{classification} delete {pool} {column}"), &[])
            .await?;

        ctx.cmd(&format!("{recommendation} enable {pool} {column}"), &[])
            .await?;
        ctx.cmd(
            &format!("{recommendation} list {pool}"),
            &[Check::greater_than("length([])", 0)],
        )
        .await?;
        ctx.cmd(&format!("{recommendation} disable {pool} {column}"), &[])
            .await?;
        ctx.cmd(
            &format!("{recommendation} list {pool}"),
            &[Check::equals("length([])", 0)],
        )
        .await?;
        Ok(())
    }
}

pub struct TransparentDataEncryption;

#[async_trait]
impl Scenario for TransparentDataEncryption {
    fn name(&self) -> &'static str {
        "sql_pool_tde"
    }

    fn description(&self) -> &'static str {
        "Enable transparent data encryption and read it back"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql", "security"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("location", "eastus2euap"),
            ("workspace", "zes0508test"),
            ("rg", "chayang-test-rg"),
            ("sql-pool", "zes0508test1pool"),
        ]);

        ctx.cmd(
            "az synapse sql pool tde set --status Enabled --name {sql-pool} --workspace-name {workspace} \
             --resource-group {rg} --transparent-data-encryption-name current",
            &[],
        )
        .await?;
        ctx.cmd(
            "az synapse sql pool tde show --name {sql-pool} --workspace-name {workspace} --resource-group {rg} \
             --transparent-data-encryption-name current",
            &[Check::equals("name", "current"), Check::equals("status", "Enabled")],
        )
        .await?;
        Ok(())
    }
}

pub struct ThreatPolicy;

#[async_trait]
impl Scenario for ThreatPolicy {
    fn name(&self) -> &'static str {
        "sql_pool_threat_policy"
    }

    fn description(&self) -> &'static str {
        "Enable the threat detection policy of a SQL pool"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql", "security"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("location", "eastus2euap"),
            ("workspace", "zes0508test"),
            ("rg", "chayang-test-rg"),
            ("sql-pool", "zes0508test1pool"),
            ("storage-account", "chayangstoragewestus2"),
            ("threat-policy", "threatpolicy"),
        ]);

        ctx.cmd(
            "az synapse sql pool threat-policy update --state Enabled --storage-account {storage-account} \
             --name {sql-pool} --workspace-name {workspace} --resource-group {rg} \
             --security-alert-policy-name {threat-policy}",
            &[],
        )
        .await?;
        ctx.cmd(
            "az synapse sql pool threat-policy show --name {sql-pool} --workspace-name {workspace} \
             --resource-group {rg} --security-alert-policy-name {threat-policy}",
            &[Check::equals("state", "Enabled")],
        )
        .await?;
        Ok(())
    }
}

/// Azure AD administrator of the workspace SQL endpoint
pub struct AadAdmin;

#[async_trait]
impl Scenario for AadAdmin {
    fn name(&self) -> &'static str {
        "sql_aad_admin"
    }

    fn description(&self) -> &'static str {
        "SQL Active Directory admin create, show, update and delete"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sql", "security"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        ctx.defaults([
            ("location", "eastus2euap"),
            ("workspace", "zes0508test"),
            ("rg", "chayang-test-rg"),
            ("user-name", "fakeuser"),
            ("object-id", "00000000-0000-4002-becf-488f3e6ab703"),
            ("user-email", "fakeuser@fakedomain.com"),
        ]);

        ctx.cmd(
            "az synapse sql ad-admin create --workspace-name {workspace} --resource-group {rg} \
             --display-name {user-name} --object-id {object-id}",
            &[Check::equals("login", "{user-name}")],
        )
        .await?;
        ctx.cmd(
            "az synapse sql ad-admin show --workspace-name {workspace} --resource-group {rg}",
            &[
                Check::equals("login", "{user-name}"),
                Check::equals("name", "activeDirectory"),
            ],
        )
        .await?;
        ctx.cmd(
            "az synapse sql ad-admin update --workspace-name {workspace} --resource-group {rg} \
             --display-name {user-email}",
            &[Check::equals("login", "{user-email}")],
        )
        .await?;
        ctx.cmd(
            "az synapse sql ad-admin delete --workspace-name {workspace} --resource-group {rg} -y",
            &[],
        )
        .await?;
        ctx.cmd_expect_failure(
            "az synapse sql ad-admin show --workspace-name {workspace} --resource-group {rg}",
        )
        .await?;
        Ok(())
    }
}
