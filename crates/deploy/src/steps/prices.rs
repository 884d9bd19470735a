//! Price feeds and the value interpreter on top of them.

use std::str::FromStr;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;

use super::{
    AGGREGATED_DERIVATIVE_PRICE_FEED, CHAINLINK_PRICE_FEED, COMPOUND_PRICE_FEED, FUND_DEPLOYER,
    RELEASE_TAG, SYNTHETIX_PRICE_FEED, VALUE_INTERPRETER, address_arg, address_list,
};
use crate::{
    artifact::{ArtifactKind, ArtifactTags},
    config::CONFIG_NAME,
    network::{Network, NetworkPredicate},
    step::{DeployRequest, DeployStep, StepContext},
};

/// Chainlink-backed oracle for every primitive in the config.
///
/// Validates the config before deploying, so a primitive without an aggregator
/// fails the run before any transaction is sent.
pub struct ChainlinkPriceFeed;

impl DeployStep for ChainlinkPriceFeed {
    fn name(&self) -> &str {
        CHAINLINK_PRICE_FEED
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, FUND_DEPLOYER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let config = ctx.config()?;
            config.validate()?;
            let flat = config.primitive_aggregators()?;
            let fund_deployer = ctx.address_of(FUND_DEPLOYER)?;

            let args = vec![
                address_arg(fund_deployer),
                address_arg(config.weth),
                address_arg(config.chainlink.eth_usd_aggregator),
                Value::from(config.chainlink.stale_rate_threshold),
                address_list(flat.primitives),
                address_list(flat.aggregators),
                Value::Array(
                    flat.rate_assets
                        .iter()
                        .map(|rate_asset| Value::from(rate_asset.index()))
                        .collect(),
                ),
            ];

            ctx.deploy(
                DeployRequest::new(CHAINLINK_PRICE_FEED)
                    .args(args)
                    .tags(ArtifactTags::kind(ArtifactKind::PriceFeed).covering(flat.symbols)),
            )
            .await?;
            Ok(())
        })
    }
}

/// Prices cTokens. Compound only exists on mainnet.
pub struct CompoundPriceFeed;

impl DeployStep for CompoundPriceFeed {
    fn name(&self) -> &str {
        COMPOUND_PRICE_FEED
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, FUND_DEPLOYER]
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
            let Some(compound) = config.compound else {
                tracing::info!(step = COMPOUND_PRICE_FEED, "Compound is not configured, nothing to deploy");
                return Ok(());
            };

            let ctokens: Vec<Address> = compound.ctokens.values().copied().collect();
            let args = vec![
                address_arg(ctx.address_of(FUND_DEPLOYER)?),
                address_arg(config.weth),
                address_arg(compound.ceth),
                address_list(ctokens.iter().copied()),
            ];

            let mut covered = vec![compound.ceth];
            covered.extend(ctokens);
            ctx.deploy(
                DeployRequest::new(COMPOUND_PRICE_FEED)
                    .args(args)
                    .tags(derivative_feed_tags(covered)),
            )
            .await?;
            Ok(())
        })
    }
}

/// Prices Synthetix synths.
pub struct SynthetixPriceFeed;

impl DeployStep for SynthetixPriceFeed {
    fn name(&self) -> &str {
        SYNTHETIX_PRICE_FEED
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, FUND_DEPLOYER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let config = ctx.config()?;
            let Some(synthetix) = config.synthetix else {
                tracing::info!(step = SYNTHETIX_PRICE_FEED, "Synthetix is not configured, nothing to deploy");
                return Ok(());
            };

            let synths: Vec<Address> = synthetix.synths.values().copied().collect();
            let args = vec![
                address_arg(ctx.address_of(FUND_DEPLOYER)?),
                address_arg(synthetix.address_resolver),
                address_arg(synthetix.susd),
                address_list(synths.iter().copied()),
            ];

            ctx.deploy(
                DeployRequest::new(SYNTHETIX_PRICE_FEED)
                    .args(args)
                    .tags(derivative_feed_tags(synths)),
            )
            .await?;
            Ok(())
        })
    }
}

fn derivative_feed_tags(derivatives: Vec<Address>) -> ArtifactTags {
    ArtifactTags::kind(ArtifactKind::DerivativePriceFeed)
        .covering(derivatives.into_iter().map(|derivative| derivative.to_string()))
}

/// Routes every derivative to the feed that prices it.
///
/// Collects whichever derivative price feeds are present on the network; a
/// network without any still gets an (empty) aggregated feed.
pub struct AggregatedDerivativePriceFeed;

impl DeployStep for AggregatedDerivativePriceFeed {
    fn name(&self) -> &str {
        AGGREGATED_DERIVATIVE_PRICE_FEED
    }

    fn dependencies(&self) -> &[&str] {
        &[
            CONFIG_NAME,
            FUND_DEPLOYER,
            COMPOUND_PRICE_FEED,
            SYNTHETIX_PRICE_FEED,
        ]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut derivatives = Vec::new();
            let mut feeds = Vec::new();

            for (name, feed) in ctx.providers(ArtifactKind::DerivativePriceFeed) {
                let covered = feed.tags().map(|tags| tags.covers).unwrap_or_default();
                tracing::debug!(feed = %name, derivatives = covered.len(), "Aggregating derivative price feed");

                for derivative in covered {
                    let derivative = Address::from_str(&derivative)
                        .context(format!("{name} covers an invalid derivative {derivative}"))?;
                    derivatives.push(derivative);
                    feeds.push(feed.address);
                }
            }

            let args = vec![
                address_arg(ctx.address_of(FUND_DEPLOYER)?),
                address_list(derivatives),
                address_list(feeds),
            ];
            ctx.deploy(DeployRequest::new(AGGREGATED_DERIVATIVE_PRICE_FEED).args(args))
                .await?;
            Ok(())
        })
    }
}

/// Values holdings through the primitive and derivative feeds.
pub struct ValueInterpreter;

impl DeployStep for ValueInterpreter {
    fn name(&self) -> &str {
        VALUE_INTERPRETER
    }

    fn dependencies(&self) -> &[&str] {
        &[
            CONFIG_NAME,
            CHAINLINK_PRICE_FEED,
            AGGREGATED_DERIVATIVE_PRICE_FEED,
        ]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let args = vec![
                address_arg(ctx.address_of(CHAINLINK_PRICE_FEED)?),
                address_arg(ctx.address_of(AGGREGATED_DERIVATIVE_PRICE_FEED)?),
            ];
            ctx.deploy(DeployRequest::new(VALUE_INTERPRETER).args(args))
                .await?;
            Ok(())
        })
    }
}
