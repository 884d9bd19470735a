//! Integration adapters. Each one is registered on the integration manager
//! by the post-deployment step.

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use super::{
    COMPOUND_ADAPTER, COMPOUND_PRICE_FEED, INTEGRATION_MANAGER, KYBER_ADAPTER, RELEASE_TAG,
    SYNTHETIX_ADAPTER, SYNTHETIX_PRICE_FEED, UNISWAP_V2_ADAPTER, address_arg,
};
use crate::{
    artifact::{ArtifactKind, ArtifactTags},
    config::CONFIG_NAME,
    network::{Network, NetworkPredicate},
    step::{DeployRequest, DeployStep, StepContext},
};

fn adapter_tags() -> ArtifactTags {
    ArtifactTags::kind(ArtifactKind::Adapter)
}

pub struct UniswapV2Adapter;

impl DeployStep for UniswapV2Adapter {
    fn name(&self) -> &str {
        UNISWAP_V2_ADAPTER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, INTEGRATION_MANAGER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let Some(uniswap) = ctx.config()?.uniswap_v2 else {
                tracing::info!(step = UNISWAP_V2_ADAPTER, "Uniswap v2 is not configured, nothing to deploy");
                return Ok(());
            };

            let args = vec![
                address_arg(ctx.address_of(INTEGRATION_MANAGER)?),
                address_arg(uniswap.router),
                address_arg(uniswap.factory),
            ];
            ctx.deploy(
                DeployRequest::new(UNISWAP_V2_ADAPTER)
                    .args(args)
                    .tags(adapter_tags()),
            )
            .await?;
            Ok(())
        })
    }
}

/// Lends to and redeems from Compound. Mainnet only.
pub struct CompoundAdapter;

impl DeployStep for CompoundAdapter {
    fn name(&self) -> &str {
        COMPOUND_ADAPTER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, INTEGRATION_MANAGER, COMPOUND_PRICE_FEED]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn skip(&self) -> NetworkPredicate {
        NetworkPredicate::skip_unless(&[Network::Mainnet, Network::Hardhat])
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let config = ctx.config()?;
            let Some(price_feed) = ctx.get_or_null(COMPOUND_PRICE_FEED)? else {
                tracing::info!(step = COMPOUND_ADAPTER, "No Compound price feed, nothing to deploy");
                return Ok(());
            };

            let args = vec![
                address_arg(ctx.address_of(INTEGRATION_MANAGER)?),
                address_arg(price_feed.address),
                address_arg(config.weth),
            ];
            ctx.deploy(
                DeployRequest::new(COMPOUND_ADAPTER)
                    .args(args)
                    .tags(adapter_tags()),
            )
            .await?;
            Ok(())
        })
    }
}

/// Exchanges synths. Synthetix trades settle at the oracle price.
pub struct SynthetixAdapter;

impl DeployStep for SynthetixAdapter {
    fn name(&self) -> &str {
        SYNTHETIX_ADAPTER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, INTEGRATION_MANAGER, SYNTHETIX_PRICE_FEED]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let Some(synthetix) = ctx.config()?.synthetix else {
                tracing::info!(step = SYNTHETIX_ADAPTER, "Synthetix is not configured, nothing to deploy");
                return Ok(());
            };
            let price_feed = ctx.address_of(SYNTHETIX_PRICE_FEED)?;

            let args = vec![
                address_arg(ctx.address_of(INTEGRATION_MANAGER)?),
                address_arg(price_feed),
                address_arg(synthetix.originator),
                address_arg(synthetix.address_resolver),
                Value::String(synthetix.tracking_code.to_string()),
            ];
            ctx.deploy(
                DeployRequest::new(SYNTHETIX_ADAPTER)
                    .args(args)
                    .tags(adapter_tags().non_slippage()),
            )
            .await?;
            Ok(())
        })
    }
}

/// Trades through Kyber, on networks that configure a network proxy.
pub struct KyberAdapter;

impl DeployStep for KyberAdapter {
    fn name(&self) -> &str {
        KYBER_ADAPTER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, INTEGRATION_MANAGER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let config = ctx.config()?;
            let Some(kyber) = config.kyber else {
                tracing::debug!(step = KYBER_ADAPTER, "Kyber is not configured, nothing to deploy");
                return Ok(());
            };

            let args = vec![
                address_arg(ctx.address_of(INTEGRATION_MANAGER)?),
                address_arg(kyber.network_proxy),
                address_arg(config.weth),
            ];
            ctx.deploy(
                DeployRequest::new(KYBER_ADAPTER)
                    .args(args)
                    .tags(adapter_tags()),
            )
            .await?;
            Ok(())
        })
    }
}
