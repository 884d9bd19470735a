//! Kovan testnet addresses.
//!
//! Kovan has no Compound or Kyber deployment the release integrates with, so
//! the steps depending on them are skipped there.

use std::collections::BTreeMap;

use alloy_core::primitives::{Address, address, b256};

use super::{
    AggregatorConfig, ChainlinkConfig, DeploymentConfig, GuaranteedRedemptionConfig, PolicyConfig,
    SynthetixConfig, UniswapV2Config, VaultCallEntry,
};

const DELEGATE_APPROVALS: Address = address!("d1f4e8f0a95f1b7d5e3e78c2ed3e71f15da4b2a9");

pub fn config() -> DeploymentConfig {
    let primitives = BTreeMap::from([
        ("dai".to_string(), address!("4f96fe3b7a6cf9725f59d353f723c1bdb64ca6aa")),
        ("link".to_string(), address!("a36085f69e2889c224210f603d836748e7dc0088")),
        ("usdc".to_string(), address!("e22da380ee6b445bb8273c81944adeb6e8450422")),
    ]);

    let aggregators = BTreeMap::from([
        (
            "dai".to_string(),
            AggregatorConfig::eth(address!("22b58f1ebedfca50fef632bd73368b2fda96d541")),
        ),
        (
            "link".to_string(),
            AggregatorConfig::eth(address!("3af8c569ab77af5230596acf0e8c2f9351d24c38")),
        ),
        (
            "usdc".to_string(),
            AggregatorConfig::eth(address!("64eac61a2dfda2c3fa04eed49aa33d021aec8838")),
        ),
    ]);

    DeploymentConfig {
        weth: address!("d0a1e359811322d97991e03f863a0c30c2cf029c"),
        primitives,
        aggregators,
        chainlink: ChainlinkConfig {
            eth_usd_aggregator: address!("9326bfa02add2366b30bacb125260af641031331"),
            stale_rate_threshold: 259200,
        },
        compound: None,
        synthetix: Some(SynthetixConfig {
            address_resolver: address!("242a3df52c375bee81b1c668741d7c63af68fdd2"),
            delegate_approvals: DELEGATE_APPROVALS,
            originator: address!("1ad1fc9964c551f456238dd88d6a38344b5319d7"),
            tracking_code: b256!(
                "454e5a594d450000000000000000000000000000000000000000000000000000"
            ),
            susd: address!("b2f6a4b6f2d7a5c8c1e6a3a2bd0b9f0b6c0ed2f4"),
            synths: BTreeMap::from([(
                "seth".to_string(),
                address!("54dbd8b6a1f2a8c6e1a0a0b7bc19f0c7b0c7c11e"),
            )]),
        }),
        uniswap_v2: Some(UniswapV2Config {
            router: address!("7a250d5630b4cf539739df2c5dacb4c659f2488d"),
            factory: address!("5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f"),
        }),
        kyber: None,
        vault_calls: vec![VaultCallEntry::new(
            DELEGATE_APPROVALS,
            "approveExchangeOnBehalf(address)",
        )],
        policies: PolicyConfig {
            guaranteed_redemption: GuaranteedRedemptionConfig {
                redemption_window_buffer: 60,
            },
        },
    }
}
