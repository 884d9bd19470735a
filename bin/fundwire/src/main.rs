//! fundwire deploys the fund protocol release and wires it together.

mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;

use cli::{Cli, Command, DeployArgs, PlanArgs, ShowArgs};
use fundwire_deploy::{
    ArtifactStore, ChainClient, ContractArtifacts, DeploymentRunner, FileStore, NetworkContext,
    RpcChain, RpcChainConfig, RunReport, Settings, plan, steps,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut settings = Settings::load(&cli.config)?;
    if let Some(deployments) = cli.deployments {
        settings.deployments = deployments;
    }

    match cli.command {
        Command::Deploy(args) => deploy(settings, args).await,
        Command::Plan(args) => plan_release(settings, args).await,
        Command::Show(args) => show(settings, args),
    }
}

async fn deploy(mut settings: Settings, args: DeployArgs) -> Result<()> {
    if let Some(rpc_url) = args.node.rpc_url {
        settings.rpc_url = rpc_url;
    }
    if args.from.is_some() {
        settings.from = args.from;
    }
    if let Some(artifacts) = args.artifacts {
        settings.artifacts = artifacts;
    }
    if !args.selection.tags.is_empty() {
        settings.tags = args.selection.tags;
    }
    settings.redeploy |= args.redeploy;

    tracing::info!(
        rpc_url = %settings.rpc_url,
        artifacts = %settings.artifacts.display(),
        deployments = %settings.deployments.display(),
        "Starting deployment..."
    );

    let chain = RpcChain::new(
        settings.rpc_chain_config()?,
        ContractArtifacts::new(&settings.artifacts),
    )?;
    let mut store = FileStore::open(&settings.deployments)?;
    let registry = steps::release()?;

    let report = DeploymentRunner::new(&registry, &chain, &mut store, settings.run_options())
        .run()
        .await?;

    println!("{}", report_table(&report));

    let settings_path = settings.save_to_deployments()?;
    tracing::info!(path = %settings_path.display(), "Settings used for this run saved");
    Ok(())
}

async fn plan_release(settings: Settings, args: PlanArgs) -> Result<()> {
    let network = match args.network {
        Some(network) => network,
        None => {
            let rpc_url = args.node.rpc_url.unwrap_or(settings.rpc_url.clone());
            let chain = RpcChain::new(
                RpcChainConfig {
                    url: rpc_url,
                    from: settings.from.unwrap_or_default(),
                    confirmation_timeout: Duration::from_secs(settings.confirmation_timeout_secs),
                },
                ContractArtifacts::new(&settings.artifacts),
            )?;
            NetworkContext::new(chain.chain_id().await?)
        }
    };

    let tags = if args.selection.tags.is_empty() {
        settings.tags
    } else {
        args.selection.tags
    };

    let registry = steps::release()?;
    let planned = plan(&registry, network.chain_id, &tags)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Step", "Decision"]);
    for (position, (name, state)) in planned.iter().enumerate() {
        table.add_row(vec![
            (position + 1).to_string(),
            name.clone(),
            state.to_string(),
        ]);
    }

    println!("Plan for {} (chain id {})", network.store_key(), network.chain_id);
    println!("{table}");
    Ok(())
}

fn show(settings: Settings, args: ShowArgs) -> Result<()> {
    let store = FileStore::open_read_only(&settings.deployments);
    let network = args.network.store_key();

    if let Some(name) = args.name {
        let artifact = store
            .load(&network, &name)?
            .context(format!("No artifact named {name} on {network}"))?;
        println!("{}", serde_json::to_string_pretty(&artifact)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Contract", "Address", "Deployed at"]);
    for name in store.names(&network)? {
        let Some(artifact) = store.load(&network, &name)? else {
            continue;
        };
        let deployed_at = chrono::DateTime::from_timestamp(artifact.deployed_at as i64, 0)
            .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            name,
            artifact.contract,
            artifact.address.to_string(),
            deployed_at,
        ]);
    }

    println!("{table}");
    Ok(())
}

fn report_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Step", "State", "Deployed", "Reused", "Transactions"]);
    for step in &report.steps {
        table.add_row(vec![
            step.name.clone(),
            step.state.to_string(),
            step.deployed.join(", "),
            step.reused.join(", "),
            step.transactions.to_string(),
        ]);
    }
    table
}
