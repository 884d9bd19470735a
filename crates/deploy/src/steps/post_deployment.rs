//! Final wiring once every contract of the release is in place.
//!
//! Runs after all other steps. It registers the configured vault call
//! allow-list on the fund deployer, then registers every deployed adapter on
//! the integration manager and every deployed policy on the policy manager.
//! Each of these is a single transaction, sent only if something changed
//! since the last run.

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use anyhow::Result;
use futures::future::BoxFuture;

use super::{FUND_DEPLOYER, INTEGRATION_MANAGER, POLICY_MANAGER, POST_DEPLOYMENT, RELEASE_TAG};
use crate::{
    artifact::ArtifactKind,
    chain::Call,
    config::{self, encode_call, flatten_vault_calls},
    step::{DeployStep, StepContext},
};

pub const REGISTER_VAULT_CALLS: &str = "registerVaultCalls(address[],bytes4[],bytes32[])";
pub const REGISTER_ADAPTERS: &str = "registerAdapters(address[])";
pub const REGISTER_POLICIES: &str = "registerPolicies(address[])";

pub struct PostDeployment;

impl DeployStep for PostDeployment {
    fn name(&self) -> &str {
        POST_DEPLOYMENT
    }

    fn dependencies(&self) -> &[&str] {
        &[FUND_DEPLOYER, INTEGRATION_MANAGER, POLICY_MANAGER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run_at_the_end(&self) -> bool {
        true
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !config::has_config(ctx) {
                tracing::warn!(
                    network = %ctx.network().store_key(),
                    "No deployment config for this network, nothing to wire"
                );
                return Ok(());
            }

            register_vault_calls(ctx).await?;
            register_all(ctx, INTEGRATION_MANAGER, ArtifactKind::Adapter, REGISTER_ADAPTERS).await?;
            register_all(ctx, POLICY_MANAGER, ArtifactKind::Policy, REGISTER_POLICIES).await?;
            Ok(())
        })
    }
}

/// Register the configured vault calls on the fund deployer in one call.
async fn register_vault_calls(ctx: &mut StepContext<'_>) -> Result<()> {
    let config = ctx.config()?;
    if config.vault_calls.is_empty() {
        tracing::info!("No vault calls configured");
        return Ok(());
    }

    let Some(fund_deployer) = ctx.get_or_null(FUND_DEPLOYER)? else {
        tracing::warn!("FundDeployer was not deployed, vault calls not registered");
        return Ok(());
    };

    let arrays = flatten_vault_calls(&config.vault_calls);
    let count = arrays.len();
    let data = encode_call(REGISTER_VAULT_CALLS, arrays.into_params());

    ctx.execute(Call::new(
        fund_deployer.address,
        data,
        "FundDeployer.registerVaultCalls",
    ))
    .await?;

    tracing::info!(
        fund_deployer = %fund_deployer.address,
        vault_calls = count,
        "Vault calls registered"
    );
    Ok(())
}

/// Register every artifact of `kind` on the `registry` contract in one call.
async fn register_all(
    ctx: &mut StepContext<'_>,
    registry: &str,
    kind: ArtifactKind,
    signature: &str,
) -> Result<()> {
    let Some(target) = ctx.get_or_null(registry)? else {
        tracing::warn!(registry, kind = %kind, "Registry was not deployed, skipping registration");
        return Ok(());
    };

    let providers = ctx.providers(kind);
    if providers.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = providers.iter().map(|(name, _)| name.clone()).collect();
    let addresses: Vec<Address> = providers.iter().map(|(_, artifact)| artifact.address).collect();
    let data = encode_call(
        signature,
        vec![DynSolValue::Array(
            addresses.into_iter().map(DynSolValue::Address).collect(),
        )],
    );

    ctx.execute(Call::new(target.address, data, format!("{registry}.{signature}")))
        .await?;

    tracing::info!(registry, kind = %kind, registered = ?names, "Registered on {registry}");
    Ok(())
}
