//! Ethereum mainnet addresses. Also used by local mainnet forks.

use std::collections::BTreeMap;

use alloy_core::primitives::{Address, address, b256};

use super::{
    AggregatorConfig, ChainlinkConfig, CompoundConfig, DeploymentConfig,
    GuaranteedRedemptionConfig, KyberConfig, PolicyConfig, SynthetixConfig, UniswapV2Config,
    VaultCallEntry,
};

const DELEGATE_APPROVALS: Address = address!("15fd6e554874b9e70f832ed37f231ac5e142362f");
const CURVE_MINTER: Address = address!("d061d61a4d941c39e5453435b6345dc261c2fce0");

fn table<V: Copy>(entries: &[(&str, V)]) -> BTreeMap<String, V> {
    entries
        .iter()
        .map(|(symbol, value)| (symbol.to_string(), *value))
        .collect()
}

pub fn config() -> DeploymentConfig {
    let primitives = table(&[
        ("bat", address!("0d8775f648430679a709e98d2b0cb6250d2887ef")),
        ("dai", address!("6b175474e89094c44da98b954eedeac495271d0f")),
        ("knc", address!("dd974d5c2e2928dea5f71b9825b8b646686bd200")),
        ("link", address!("514910771af9ca656af840dff83e8264ecf986ca")),
        ("mkr", address!("9f8f72aa9304c8b593d555f12ef6589cc3a579a2")),
        ("rep", address!("221657776846890989a759ba2973e427dff5c9bb")),
        ("uni", address!("1f9840a85d5af5bf1d1762f925bdaddc4201f984")),
        ("usdc", address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")),
        ("usdt", address!("dac17f958d2ee523a2206206994597c13d831ec7")),
        ("wbtc", address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599")),
        ("zrx", address!("e41d2489571d322189246dafa5ebde1f4699f498")),
    ]);

    let aggregators = table(&[
        ("bat", AggregatorConfig::eth(address!("0d16d4528239e9ee52fa531af613acdb23d88c94"))),
        ("dai", AggregatorConfig::eth(address!("773616e4d11a78f511299002da57a0a94577f1f4"))),
        ("knc", AggregatorConfig::eth(address!("656c0544ef4c98a6a98491833a89204abb045d6b"))),
        ("link", AggregatorConfig::eth(address!("dc530d9457755926550b59e8eccdae7624181557"))),
        ("mkr", AggregatorConfig::eth(address!("24551a8fb2a7211a25a17b1481f043a8a8adc7f2"))),
        ("rep", AggregatorConfig::eth(address!("d4ce430c3b67b3e2f7026d86e7128588629e2455"))),
        ("uni", AggregatorConfig::eth(address!("d6aa3d25116d8da79ea0246c4826eb951872e02e"))),
        ("usdc", AggregatorConfig::eth(address!("986b5e1e1755e3c2440e960477f25201b0a8bbd4"))),
        ("usdt", AggregatorConfig::eth(address!("ee9f2375b4bdf6387aa8265dd4fb8f16512a1d46"))),
        ("wbtc", AggregatorConfig::eth(address!("deb288f737066589598e9214e782fa5a8ed689e8"))),
        ("zrx", AggregatorConfig::eth(address!("2da4983a622a8498bb1a21fae9d8f6c664939962"))),
    ]);

    DeploymentConfig {
        weth: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        primitives,
        aggregators,
        chainlink: ChainlinkConfig {
            eth_usd_aggregator: address!("5f4ec3df9cbd43714fe2740f5e3616155c5b8419"),
            stale_rate_threshold: 259200,
        },
        compound: Some(CompoundConfig {
            ceth: address!("4ddc2d193948926d02f9b1fe9e1daa0718270ed5"),
            ctokens: table(&[
                ("bat", address!("6c8c6b02e7b2be14d4fa6022dfd6d75921d90e4e")),
                ("dai", address!("5d3a536e4d6dbd6114cc1ead35777bab948e3643")),
                ("rep", address!("158079ee67fce2f58472a96584a73c7ab9ac95c1")),
                ("uni", address!("35a18000230da775cac24873d00ff85bccded550")),
                ("usdc", address!("39aa39c021dfbae8fac545936693ac917d5e7563")),
                ("zrx", address!("b3319f5d18bc0d84dd1b4825dcde5d5f7266d407")),
            ]),
        }),
        synthetix: Some(SynthetixConfig {
            address_resolver: address!("4e3b31eb0e5cb73641ee1e65e7dcefe520ba3ef2"),
            delegate_approvals: DELEGATE_APPROVALS,
            originator: address!("1ad1fc9964c551f456238dd88d6a38344b5319d7"),
            // "ENZYME"
            tracking_code: b256!(
                "454e5a594d450000000000000000000000000000000000000000000000000000"
            ),
            susd: address!("57ab1ec28d129707052df4df418d58a2d46d5f51"),
            synths: table(&[
                ("sbtc", address!("fe18be6b3bd88a2d2a7f928d00292e7a9963cfc6")),
                ("seth", address!("5e74c9036fb86bd7ecdcb084a0673efc32ea31cb")),
                ("slink", address!("bbc455cb4f1b9e4bfc4b73970d360c8f032efee6")),
            ]),
        }),
        uniswap_v2: Some(UniswapV2Config {
            router: address!("7a250d5630b4cf539739df2c5dacb4c659f2488d"),
            factory: address!("5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f"),
        }),
        kyber: Some(KyberConfig {
            network_proxy: address!("9aab3f75489902f3a48495025729a0af77d4b11e"),
        }),
        vault_calls: vec![
            VaultCallEntry::new(DELEGATE_APPROVALS, "approveExchangeOnBehalf(address)"),
            VaultCallEntry::new(CURVE_MINTER, "mint(address)"),
        ],
        policies: PolicyConfig {
            guaranteed_redemption: GuaranteedRedemptionConfig {
                redemption_window_buffer: 300,
            },
        },
    }
}
