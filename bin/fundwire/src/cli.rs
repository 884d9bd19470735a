use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use fundwire_deploy::{NetworkContext, SETTINGS_FILENAME};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "fundwire")]
#[command(
    author,
    version,
    about = "Deploy and wire the fund protocol release, one idempotent step at a time"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "FUNDWIRE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the settings file.
    ///
    /// Missing files are ignored; settings then come from the defaults and the
    /// FUNDWIRE_* environment variables.
    #[arg(long, alias = "conf", global = true, env = "FUNDWIRE_CONFIG", default_value = SETTINGS_FILENAME)]
    pub config: PathBuf,

    /// Root directory of the persisted deployment artifacts.
    #[arg(long, global = true, env = "FUNDWIRE_DEPLOYMENTS")]
    pub deployments: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the release against a node.
    Deploy(DeployArgs),
    /// Print the resolved step order and skip decisions without sending anything.
    Plan(PlanArgs),
    /// Print persisted artifacts.
    Show(ShowArgs),
}

/// Connection to the target node.
#[derive(Debug, Clone, Args)]
pub struct NodeArgs {
    /// The URL of the JSON-RPC endpoint.
    #[arg(long, alias = "rpc", env = "FUNDWIRE_RPC_URL")]
    pub rpc_url: Option<Url>,
}

/// Step selection.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Only run steps with these names or tags, plus their dependencies.
    #[arg(long, value_delimiter = ',', env = "FUNDWIRE_TAGS")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// The sender account. It must be unlocked on the node.
    #[arg(long, env = "FUNDWIRE_FROM")]
    pub from: Option<Address>,

    /// Redeploy all contracts.
    /// If not provided, contracts already deployed with the same arguments are reused.
    #[arg(long, env = "FUNDWIRE_REDEPLOY", default_value_t = false)]
    pub redeploy: bool,

    /// Directory of compiled contract artifacts (`<Name>.json`).
    #[arg(long, env = "FUNDWIRE_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Plan for this network (name or chain id) instead of asking the node.
    #[arg(long)]
    pub network: Option<NetworkContext>,
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// The network (name or chain id) the artifacts were deployed on.
    #[arg(long, default_value = "mainnet")]
    pub network: NetworkContext,

    /// The artifact to print. Lists every artifact when omitted.
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "fundwire",
            "deploy",
            "--tags",
            "Config,Dispatcher",
            "--redeploy",
            "--from",
            "0x1111111111111111111111111111111111111111",
        ])
        .unwrap();

        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.selection.tags, vec!["Config", "Dispatcher"]);
        assert!(args.redeploy);
        assert_eq!(args.from, Some(Address::repeat_byte(0x11)));
        assert_eq!(cli.config, PathBuf::from(SETTINGS_FILENAME));
    }

    #[test]
    fn test_parse_plan_and_show() {
        let cli = Cli::try_parse_from(["fundwire", "plan", "--network", "kovan"]).unwrap();
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.network.map(|network| network.chain_id), Some(42));

        let cli = Cli::try_parse_from(["fundwire", "show", "FundDeployer", "--network", "31337"])
            .unwrap();
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.name.as_deref(), Some("FundDeployer"));
        assert_eq!(args.network.store_key(), "hardhat");
    }
}
