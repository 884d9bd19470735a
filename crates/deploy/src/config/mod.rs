//! Per-network deployment configuration.
//!
//! A single [`DeploymentConfig`] is produced once per run by the config step of
//! the live network and persisted as the pseudo artifact [`CONFIG_NAME`]. The
//! persisted record is only rewritten when the config changes. Every other step
//! reads it back through [`load_config`]; nothing writes it afterwards.

use std::collections::BTreeMap;

use alloy_core::primitives::{Address, B256};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    StepContext,
    artifact::DeploymentArtifact,
    error::ConfigError,
};

pub mod kovan;
pub mod mainnet;
mod vault_calls;

pub use vault_calls::{
    Selector, VaultCallArrays, VaultCallEntry, encode_call, flatten as flatten_vault_calls,
    selector,
};

/// Reserved artifact name the config is persisted under.
pub const CONFIG_NAME: &str = "Config";

/// Denomination a price aggregator reports in. Matches the on-chain enum index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RateAsset {
    Eth = 0,
    Usd = 1,
}

impl RateAsset {
    pub fn index(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorConfig {
    pub aggregator: Address,
    pub rate_asset: RateAsset,
}

impl AggregatorConfig {
    pub const fn eth(aggregator: Address) -> Self {
        Self {
            aggregator,
            rate_asset: RateAsset::Eth,
        }
    }

    pub const fn usd(aggregator: Address) -> Self {
        Self {
            aggregator,
            rate_asset: RateAsset::Usd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainlinkConfig {
    pub eth_usd_aggregator: Address,
    /// Seconds after which an aggregator answer counts as stale.
    pub stale_rate_threshold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundConfig {
    pub ceth: Address,
    /// cToken symbol (without the `c` prefix) to cToken address.
    pub ctokens: BTreeMap<String, Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthetixConfig {
    pub address_resolver: Address,
    pub delegate_approvals: Address,
    pub originator: Address,
    pub tracking_code: B256,
    pub susd: Address,
    pub synths: BTreeMap<String, Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapV2Config {
    pub router: Address,
    pub factory: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KyberConfig {
    pub network_proxy: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuaranteedRedemptionConfig {
    /// Seconds before a redemption window opens during which trading is blocked.
    pub redemption_window_buffer: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    pub guaranteed_redemption: GuaranteedRedemptionConfig,
}

/// Addresses and parameters for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub weth: Address,
    pub primitives: BTreeMap<String, Address>,
    pub aggregators: BTreeMap<String, AggregatorConfig>,
    pub chainlink: ChainlinkConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<CompoundConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetix: Option<SynthetixConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniswap_v2: Option<UniswapV2Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyber: Option<KyberConfig>,
    #[serde(default)]
    pub vault_calls: Vec<VaultCallEntry>,
    pub policies: PolicyConfig,
}

/// Primitives paired with their aggregators, as parallel lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveAggregators {
    pub symbols: Vec<String>,
    pub primitives: Vec<Address>,
    pub aggregators: Vec<Address>,
    pub rate_assets: Vec<RateAsset>,
}

impl DeploymentConfig {
    /// Flatten primitives against aggregators, in symbol order.
    ///
    /// Fails on the first primitive that has no aggregator.
    pub fn primitive_aggregators(&self) -> Result<PrimitiveAggregators, ConfigError> {
        let mut flat = PrimitiveAggregators::default();
        for (symbol, primitive) in &self.primitives {
            let aggregator =
                self.aggregators
                    .get(symbol)
                    .ok_or_else(|| ConfigError::MissingAggregator {
                        symbol: symbol.clone(),
                    })?;
            flat.symbols.push(symbol.clone());
            flat.primitives.push(*primitive);
            flat.aggregators.push(aggregator.aggregator);
            flat.rate_assets.push(aggregator.rate_asset);
        }
        Ok(flat)
    }

    /// Check the invariants the release relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weth.is_zero() {
            return Err(zero("weth"));
        }
        for (symbol, address) in &self.primitives {
            if address.is_zero() {
                return Err(zero(format!("primitives.{symbol}")));
            }
        }
        self.primitive_aggregators()?;

        if let Some(compound) = &self.compound {
            for (symbol, ctoken) in &compound.ctokens {
                if ctoken.is_zero() {
                    return Err(zero(format!("compound.ctokens.{symbol}")));
                }
            }
        }
        if let Some(synthetix) = &self.synthetix {
            for (symbol, synth) in &synthetix.synths {
                if synth.is_zero() {
                    return Err(zero(format!("synthetix.synths.{symbol}")));
                }
            }
        }
        for (index, call) in self.vault_calls.iter().enumerate() {
            if call.contract.is_zero() {
                return Err(zero(format!("vaultCalls[{index}]")));
            }
        }
        Ok(())
    }
}

fn zero(field: impl Into<String>) -> ConfigError {
    ConfigError::ZeroAddress {
        field: field.into(),
    }
}

/// Persist `data` as the run's config. Only one config may be written per run.
pub fn save_config(ctx: &mut StepContext<'_>, data: &DeploymentConfig) -> Result<()> {
    if ctx.is_materialized(CONFIG_NAME) {
        return Err(ConfigError::AlreadyPersisted {
            network: ctx.network().store_key(),
        }
        .into());
    }

    let linked_data = serde_json::to_value(data)
        .map_err(|e| ConfigError::Malformed(e.to_string()))?;

    // An identical persisted config keeps its original record.
    match ctx.persisted(CONFIG_NAME)? {
        Some(prior) if prior.linked_data == linked_data => {
            ctx.materialize(CONFIG_NAME, prior)?;
            tracing::info!(network = %ctx.network().store_key(), "Deployment config unchanged");
            return Ok(());
        }
        _ => {}
    }

    ctx.persist(CONFIG_NAME, DeploymentArtifact::pseudo(CONFIG_NAME, linked_data))?;

    tracing::info!(
        network = %ctx.network().store_key(),
        primitives = data.primitives.len(),
        vault_calls = data.vault_calls.len(),
        "Deployment config saved"
    );
    Ok(())
}

/// Read the run's config. Fails if no config step has persisted one.
pub fn load_config(ctx: &StepContext<'_>) -> Result<DeploymentConfig> {
    let artifact = ctx
        .get_or_null(CONFIG_NAME)?
        .ok_or_else(|| ConfigError::NotPersisted {
            network: ctx.network().store_key(),
        })?;

    serde_json::from_value(artifact.linked_data)
        .map_err(|e| ConfigError::Malformed(e.to_string()).into())
}

/// Whether a config has been persisted in this run.
pub fn has_config(ctx: &StepContext<'_>) -> bool {
    ctx.is_materialized(CONFIG_NAME)
}
