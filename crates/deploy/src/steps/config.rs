use anyhow::Result;
use futures::future::BoxFuture;

use super::RELEASE_TAG;
use crate::{
    config::{CONFIG_NAME, DeploymentConfig, kovan, mainnet},
    network::{Network, NetworkPredicate},
    step::{DeployStep, StepContext},
};

/// Persists the deployment config of the networks it applies to.
///
/// Several of these can be registered; they all carry the `Config` tag and
/// their network sets must not overlap, so exactly one runs per network.
#[derive(Debug, Clone)]
pub struct NetworkConfigStep {
    name: &'static str,
    networks: Vec<Network>,
    config: DeploymentConfig,
}

impl NetworkConfigStep {
    pub fn new(name: &'static str, networks: &[Network], config: DeploymentConfig) -> Self {
        Self {
            name,
            networks: networks.to_vec(),
            config,
        }
    }

    /// Mainnet addresses, also used on local mainnet forks.
    pub fn mainnet() -> Self {
        Self::new(
            "MainnetConfig",
            &[Network::Mainnet, Network::Hardhat],
            mainnet::config(),
        )
    }

    pub fn kovan() -> Self {
        Self::new("KovanConfig", &[Network::Kovan], kovan::config())
    }
}

impl DeployStep for NetworkConfigStep {
    fn name(&self) -> &str {
        self.name
    }

    fn tags(&self) -> &[&str] {
        &[CONFIG_NAME, RELEASE_TAG]
    }

    fn skip(&self) -> NetworkPredicate {
        NetworkPredicate::skip_unless(&self.networks)
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // Nothing downstream may deploy against an incomplete table.
            self.config.validate()?;
            ctx.save_config(&self.config)
        })
    }
}
