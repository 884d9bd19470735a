//! Core protocol contracts.

use anyhow::Result;
use futures::future::BoxFuture;

use super::{
    AGGREGATED_DERIVATIVE_PRICE_FEED, CHAINLINK_PRICE_FEED, DISPATCHER, FUND_DEPLOYER,
    INTEGRATION_MANAGER, POLICY_MANAGER, RELEASE_TAG, address_arg,
};
use crate::{
    config::CONFIG_NAME,
    step::{DeployRequest, DeployStep, StepContext},
};

/// Entry point of the protocol; owns the current fund deployer.
pub struct Dispatcher;

impl DeployStep for Dispatcher {
    fn name(&self) -> &str {
        DISPATCHER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ctx.deploy(DeployRequest::new(DISPATCHER)).await?;
            Ok(())
        })
    }
}

/// Creates funds and holds the vault call allow-list.
pub struct FundDeployer;

impl DeployStep for FundDeployer {
    fn name(&self) -> &str {
        FUND_DEPLOYER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, DISPATCHER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let dispatcher = ctx.address_of(DISPATCHER)?;
            ctx.deploy(DeployRequest::new(FUND_DEPLOYER).args(vec![address_arg(dispatcher)]))
                .await?;
            Ok(())
        })
    }
}

pub struct PolicyManager;

impl DeployStep for PolicyManager {
    fn name(&self) -> &str {
        POLICY_MANAGER
    }

    fn dependencies(&self) -> &[&str] {
        &[CONFIG_NAME, FUND_DEPLOYER]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let fund_deployer = ctx.address_of(FUND_DEPLOYER)?;
            ctx.deploy(DeployRequest::new(POLICY_MANAGER).args(vec![address_arg(fund_deployer)]))
                .await?;
            Ok(())
        })
    }
}

/// Routes trades and lending actions through registered adapters.
pub struct IntegrationManager;

impl DeployStep for IntegrationManager {
    fn name(&self) -> &str {
        INTEGRATION_MANAGER
    }

    fn dependencies(&self) -> &[&str] {
        &[
            CONFIG_NAME,
            FUND_DEPLOYER,
            POLICY_MANAGER,
            AGGREGATED_DERIVATIVE_PRICE_FEED,
            CHAINLINK_PRICE_FEED,
        ]
    }

    fn tags(&self) -> &[&str] {
        &[RELEASE_TAG]
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let args = vec![
                address_arg(ctx.address_of(FUND_DEPLOYER)?),
                address_arg(ctx.address_of(POLICY_MANAGER)?),
                address_arg(ctx.address_of(AGGREGATED_DERIVATIVE_PRICE_FEED)?),
                address_arg(ctx.address_of(CHAINLINK_PRICE_FEED)?),
            ];
            ctx.deploy(DeployRequest::new(INTEGRATION_MANAGER).args(args))
                .await?;
            Ok(())
        })
    }
}
