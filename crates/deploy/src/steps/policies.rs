use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use super::{
    ADAPTER_BLACKLIST, FUND_DEPLOYER, GUARANTEED_REDEMPTION, POLICY_MANAGER, RELEASE_TAG,
    SYNTHETIX_ADAPTER, address_arg, address_list,
};
use crate::{
    artifact::{ArtifactKind, ArtifactTags},
    config::CONFIG_NAME,
    step::{DeployRequest, DeployStep, StepContext},
};

/// Guarantees a daily redemption window by blocking redemption-blocking
/// adapters for `redemption_window_buffer` seconds before it opens.
pub struct GuaranteedRedemption;

impl DeployStep for GuaranteedRedemption {
    fn name(&self) -> &str {
        GUARANTEED_REDEMPTION
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, POLICY_MANAGER, FUND_DEPLOYER, SYNTHETIX_ADAPTER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let config = ctx.config()?;
            let blocking_adapters = ctx
                .get_or_null(SYNTHETIX_ADAPTER)?
                .map(|adapter| adapter.address);

            let args = vec![
                address_arg(ctx.address_of(POLICY_MANAGER)?),
                address_arg(ctx.address_of(FUND_DEPLOYER)?),
                Value::from(config.policies.guaranteed_redemption.redemption_window_buffer),
                address_list(blocking_adapters),
            ];
            ctx.deploy(
                DeployRequest::new(GUARANTEED_REDEMPTION)
                    .args(args)
                    .tags(ArtifactTags::kind(ArtifactKind::Policy)),
            )
            .await?;
            Ok(())
        })
    }
}

pub struct AdapterBlacklist;

impl DeployStep for AdapterBlacklist {
    fn name(&self) -> &str {
        ADAPTER_BLACKLIST
    }

    fn dependencies(&self) -> &[&str] {
        &[POLICY_MANAGER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let policy_manager = ctx.address_of(POLICY_MANAGER)?;
            ctx.deploy(
                DeployRequest::new(ADAPTER_BLACKLIST)
                    .args(vec![address_arg(policy_manager)])
                    .tags(ArtifactTags::kind(ArtifactKind::Policy)),
            )
            .await?;
            Ok(())
        })
    }
}
