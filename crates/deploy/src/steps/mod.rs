//! The fund protocol release: every step needed to deploy it from scratch.
//!
//! Step names double as artifact names. Every release step carries the
//! [`RELEASE_TAG`], and the per-network config steps carry
//! [`CONFIG_NAME`](crate::config::CONFIG_NAME) so dependents can declare
//! `"Config"` without knowing which network they run on.

use alloy_core::primitives::Address;
use serde_json::Value;

use crate::{error::GraphError, step::StepRegistry};

mod adapters;
mod config;
mod protocol;
mod policies;
pub mod post_deployment;
mod prices;

pub use adapters::{CompoundAdapter, KyberAdapter, SynthetixAdapter, UniswapV2Adapter};
pub use config::NetworkConfigStep;
pub use protocol::{Dispatcher, FundDeployer, IntegrationManager, PolicyManager};
pub use policies::{AdapterBlacklist, GuaranteedRedemption};
pub use post_deployment::PostDeployment;
pub use prices::{
    AggregatedDerivativePriceFeed, ChainlinkPriceFeed, CompoundPriceFeed, SynthetixPriceFeed,
    ValueInterpreter,
};

/// Tag carried by every release step.
pub const RELEASE_TAG: &str = "Release";

pub const DISPATCHER: &str = "Dispatcher";
pub const FUND_DEPLOYER: &str = "FundDeployer";
pub const INTEGRATION_MANAGER: &str = "IntegrationManager";
pub const POLICY_MANAGER: &str = "PolicyManager";
pub const CHAINLINK_PRICE_FEED: &str = "ChainlinkPriceFeed";
pub const COMPOUND_PRICE_FEED: &str = "CompoundPriceFeed";
pub const SYNTHETIX_PRICE_FEED: &str = "SynthetixPriceFeed";
pub const AGGREGATED_DERIVATIVE_PRICE_FEED: &str = "AggregatedDerivativePriceFeed";
pub const VALUE_INTERPRETER: &str = "ValueInterpreter";
pub const UNISWAP_V2_ADAPTER: &str = "UniswapV2Adapter";
pub const COMPOUND_ADAPTER: &str = "CompoundAdapter";
pub const SYNTHETIX_ADAPTER: &str = "SynthetixAdapter";
pub const KYBER_ADAPTER: &str = "KyberAdapter";
pub const GUARANTEED_REDEMPTION: &str = "GuaranteedRedemption";
pub const ADAPTER_BLACKLIST: &str = "AdapterBlacklist";
pub const POST_DEPLOYMENT: &str = "PostDeployment";

/// The full release with the built-in mainnet and kovan config tables.
pub fn release() -> Result<StepRegistry, GraphError> {
    release_with([NetworkConfigStep::mainnet(), NetworkConfigStep::kovan()])
}

/// The full release with custom config steps.
pub fn release_with(
    configs: impl IntoIterator<Item = NetworkConfigStep>,
) -> Result<StepRegistry, GraphError> {
    let mut registry = StepRegistry::new();
    for config in configs {
        registry.register(config)?;
    }

    registry
        .register(Dispatcher)?
        .register(FundDeployer)?
        .register(ChainlinkPriceFeed)?
        .register(CompoundPriceFeed)?
        .register(SynthetixPriceFeed)?
        .register(AggregatedDerivativePriceFeed)?
        .register(ValueInterpreter)?
        .register(PolicyManager)?
        .register(IntegrationManager)?
        .register(UniswapV2Adapter)?
        .register(CompoundAdapter)?
        .register(SynthetixAdapter)?
        .register(KyberAdapter)?
        .register(GuaranteedRedemption)?
        .register(AdapterBlacklist)?
        .register(PostDeployment)?;

    Ok(registry)
}

fn address_arg(address: Address) -> Value {
    Value::String(address.to_string())
}

fn address_list(addresses: impl IntoIterator<Item = Address>) -> Value {
    Value::Array(addresses.into_iter().map(address_arg).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::ResolvedGraph,
        network::Network,
        runner::plan,
        step::StepState,
    };

    #[test]
    fn test_release_resolves() {
        let registry = release().unwrap();
        let graph = ResolvedGraph::resolve(&registry).unwrap();

        assert_eq!(graph.order().len(), registry.len());
        let last = graph.order().last().copied().unwrap();
        assert_eq!(registry[last].name(), POST_DEPLOYMENT);
    }

    #[test]
    fn test_every_release_step_is_tagged() {
        let registry = release().unwrap();

        for step in registry.iter() {
            assert!(
                step.tags().contains(&RELEASE_TAG),
                "{} is not tagged {RELEASE_TAG}",
                step.name()
            );
        }
    }

    #[test]
    fn test_kovan_plan_skips_mainnet_only_steps() {
        let registry = release().unwrap();
        let planned = plan(&registry, Network::Kovan.chain_id(), &[]).unwrap();

        let skipped: Vec<&str> = planned
            .iter()
            .filter(|(_, state)| *state == StepState::Skipped)
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(skipped, vec!["MainnetConfig", COMPOUND_PRICE_FEED, COMPOUND_ADAPTER]);
    }

    #[test]
    fn test_mainnet_plan_skips_kovan_config_only() {
        let registry = release().unwrap();
        let planned = plan(&registry, Network::Mainnet.chain_id(), &[]).unwrap();

        let skipped: Vec<&str> = planned
            .iter()
            .filter(|(_, state)| *state == StepState::Skipped)
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(skipped, vec!["KovanConfig"]);
    }

    #[test]
    fn test_address_list() {
        let list = address_list([Address::repeat_byte(1), Address::repeat_byte(2)]);

        assert_eq!(list.as_array().map(Vec::len), Some(2));
        assert!(list[0].as_str().unwrap().starts_with("0x"));
    }
}
