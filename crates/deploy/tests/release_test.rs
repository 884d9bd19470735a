//! End-to-end tests for fundwire-deploy.
//!
//! Every test runs the runner against a [`RecordingChain`] and an in-memory
//! (or temp-dir) store, so nothing here needs a node.

use std::sync::{Arc, Mutex};

use alloy_core::{dyn_abi::DynSolType, primitives::Address};
use anyhow::Result;
use futures::future::BoxFuture;
use fundwire_deploy::{
    AccessError, ArtifactStore, CONFIG_NAME, ConfigError, DeployRequest, DeployStep, DeploymentRunner,
    FileStore, GraphError, MemoryStore, Network, RecordingChain, ResolvedGraph, RunError,
    RunOptions, RunReport, StepContext, StepRegistry, StepState,
    config::{mainnet, selector},
    steps::{self, NetworkConfigStep, post_deployment::REGISTER_VAULT_CALLS},
};
use tempdir::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn run(
    registry: &StepRegistry,
    chain: &RecordingChain,
    store: &mut dyn ArtifactStore,
    options: RunOptions,
) -> Result<RunReport> {
    DeploymentRunner::new(registry, chain, store, options)
        .run()
        .await
}

type Journal = Arc<Mutex<Vec<String>>>;

enum Action {
    Deploy,
    Read(&'static str),
    ReadOrNull(&'static str),
}

/// A step that journals its execution, then performs `action`.
struct JournalStep {
    name: &'static str,
    dependencies: Vec<&'static str>,
    at_end: bool,
    action: Action,
    journal: Journal,
}

impl JournalStep {
    fn new(name: &'static str, dependencies: &[&'static str], action: Action, journal: &Journal) -> Self {
        Self {
            name,
            dependencies: dependencies.to_vec(),
            at_end: false,
            action,
            journal: journal.clone(),
        }
    }

    fn at_end(mut self) -> Self {
        self.at_end = true;
        self
    }
}

impl DeployStep for JournalStep {
    fn name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> &[&str] {
        &self.dependencies
    }

    fn run_at_the_end(&self) -> bool {
        self.at_end
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.journal.lock().unwrap().push(self.name.to_string());
            match self.action {
                Action::Deploy => {
                    ctx.deploy(DeployRequest::new(self.name)).await?;
                }
                Action::Read(name) => {
                    ctx.get(name)?;
                }
                Action::ReadOrNull(name) => {
                    let presence = match ctx.get_or_null(name)? {
                        Some(_) => "present",
                        None => "absent",
                    };
                    self.journal
                        .lock()
                        .unwrap()
                        .push(format!("{name}:{presence}"));
                }
            }
            Ok(())
        })
    }
}

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[tokio::test]
async fn test_mainnet_release_deploys_everything() {
    init_tracing();
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.network, "mainnet");
    assert_eq!(report.steps_in(StepState::Skipped), vec!["KovanConfig"]);
    assert_eq!(chain.deployments().len(), 15);
    assert_eq!(report.transactions(), 18, "15 deployments and 3 registrations");
    assert_eq!(store.execution_count("mainnet"), 3);
    assert!(store.load("mainnet", "Config").unwrap().is_some());
    assert!(store.load("kovan", "Config").unwrap().is_none());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    init_tracing();
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();
    let sent = chain.transactions().len();
    let fund_deployer = store.load("mainnet", "FundDeployer").unwrap().unwrap();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(chain.transactions().len(), sent, "no transaction on the second run");
    assert_eq!(report.transactions(), 0);
    assert_eq!(
        store.load("mainnet", "FundDeployer").unwrap().unwrap().address,
        fund_deployer.address
    );
    let fund_deployer_report = report
        .steps
        .iter()
        .find(|step| step.name == "FundDeployer")
        .unwrap();
    assert_eq!(fund_deployer_report.reused, vec!["FundDeployer"]);
    assert!(fund_deployer_report.deployed.is_empty());
}

#[tokio::test]
async fn test_unchanged_config_is_not_rewritten() {
    init_tracing();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    run(&steps::release().unwrap(), &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    let mut persisted = store.load("mainnet", CONFIG_NAME).unwrap().unwrap();
    persisted.deployed_at = 1;
    store.save("mainnet", CONFIG_NAME, &persisted).unwrap();

    run(&steps::release().unwrap(), &chain, &mut store, RunOptions::default())
        .await
        .unwrap();
    assert_eq!(store.load("mainnet", CONFIG_NAME).unwrap().unwrap(), persisted);

    let mut config = mainnet::config();
    config.policies.guaranteed_redemption.redemption_window_buffer = 600;
    let registry = steps::release_with([NetworkConfigStep::new(
        "MainnetConfig",
        &[Network::Mainnet, Network::Hardhat],
        config,
    )])
    .unwrap();
    run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    let rewritten = store.load("mainnet", CONFIG_NAME).unwrap().unwrap();
    assert_ne!(rewritten.deployed_at, 1);
    assert_eq!(
        rewritten.linked_data["policies"]["guaranteedRedemption"]["redemptionWindowBuffer"],
        600
    );
}

#[tokio::test]
async fn test_changed_arguments_redeploy_only_the_affected_step() {
    init_tracing();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    run(&steps::release().unwrap(), &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    let mut config = mainnet::config();
    config.policies.guaranteed_redemption.redemption_window_buffer = 600;
    let registry = steps::release_with([NetworkConfigStep::new(
        "MainnetConfig",
        &[Network::Mainnet, Network::Hardhat],
        config,
    )])
    .unwrap();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    let deployed: Vec<&str> = report
        .steps
        .iter()
        .filter(|step| !step.deployed.is_empty())
        .map(|step| step.name.as_str())
        .collect();
    assert_eq!(deployed, vec!["GuaranteedRedemption"]);
}

#[tokio::test]
async fn test_redeploy_option_forces_fresh_deployments() {
    init_tracing();
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();
    let before = store.load("mainnet", "Dispatcher").unwrap().unwrap();

    let options = RunOptions {
        redeploy: true,
        ..Default::default()
    };
    run(&registry, &chain, &mut store, options).await.unwrap();

    assert_eq!(chain.deployments().len(), 30);
    assert_ne!(
        store.load("mainnet", "Dispatcher").unwrap().unwrap().address,
        before.address
    );
}

#[tokio::test]
async fn test_steps_run_after_their_dependencies() {
    init_tracing();
    let registry = steps::release().unwrap();
    let graph = ResolvedGraph::resolve(&registry).unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    let position = |name: &str| report.steps.iter().position(|step| step.name == name);
    for (index, step) in registry.iter().enumerate() {
        let Some(at) = position(step.name()) else {
            continue;
        };
        for &dependency in graph.dependencies(index) {
            let dependency = registry[dependency].name();
            let dependency_at = position(dependency).unwrap();
            assert!(dependency_at < at, "{dependency} must run before {}", step.name());
        }
    }
}

#[tokio::test]
async fn test_cycle_is_rejected_before_any_step_runs() {
    init_tracing();
    let journal = journal();
    let registry = StepRegistry::new()
        .with(JournalStep::new("A", &["C"], Action::Deploy, &journal))
        .unwrap()
        .with(JournalStep::new("B", &["A"], Action::Deploy, &journal))
        .unwrap()
        .with(JournalStep::new("C", &["B"], Action::Deploy, &journal))
        .unwrap()
        .with(JournalStep::new("Free", &[], Action::Deploy, &journal))
        .unwrap();
    let chain = RecordingChain::new(31337);
    let mut store = MemoryStore::new();

    let err = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap_err();

    let Some(GraphError::Cycle { path }) = err.downcast_ref::<GraphError>() else {
        panic!("expected a cycle, got {err:#}");
    };
    for name in ["A", "B", "C"] {
        assert!(path.iter().any(|step| step == name));
    }
    assert!(entries(&journal).is_empty());
    assert!(chain.transactions().is_empty());
}

#[tokio::test]
async fn test_missing_aggregator_fails_before_any_deployment() {
    init_tracing();
    let mut config = mainnet::config();
    config.aggregators.remove("usdc");
    let registry = steps::release_with([NetworkConfigStep::new(
        "MainnetConfig",
        &[Network::Mainnet, Network::Hardhat],
        config,
    )])
    .unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    let err = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::MissingAggregator {
            symbol: "usdc".to_string()
        })
    );
    assert_eq!(
        err.downcast_ref::<RunError>(),
        Some(&RunError::StepFailed("MainnetConfig".to_string()))
    );
    assert!(format!("{err:#}").contains("missing aggregator for usdc"));
    assert!(chain.deployments().is_empty(), "sent {:?}", chain.deployments());
    assert!(chain.transactions().is_empty());
    assert!(store.load("mainnet", CONFIG_NAME).unwrap().is_none());
}

#[tokio::test]
async fn test_kovan_skips_compound_and_dependents_see_absence() {
    init_tracing();
    let journal = journal();
    let mut registry = steps::release().unwrap();
    registry
        .register(JournalStep::new(
            "CompoundReader",
            &["CompoundPriceFeed"],
            Action::ReadOrNull("CompoundPriceFeed"),
            &journal,
        ))
        .unwrap();
    let chain = RecordingChain::new(Network::Kovan.chain_id());
    let mut store = MemoryStore::new();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state_of("CompoundPriceFeed"), Some(StepState::Skipped));
    assert_eq!(report.state_of("CompoundAdapter"), Some(StepState::Skipped));
    assert_eq!(report.state_of("MainnetConfig"), Some(StepState::Skipped));
    assert_eq!(report.state_of("KovanConfig"), Some(StepState::Completed));
    assert_eq!(
        report.state_of("AggregatedDerivativePriceFeed"),
        Some(StepState::Completed)
    );
    assert!(store.load("kovan", "CompoundPriceFeed").unwrap().is_none());
    assert_eq!(
        entries(&journal),
        vec!["CompoundReader", "CompoundPriceFeed:absent"]
    );
    assert_eq!(chain.deployments().len(), 12);
}

#[tokio::test]
async fn test_reading_a_skipped_dependency_fails() {
    init_tracing();
    let journal = journal();
    let mut registry = steps::release().unwrap();
    registry
        .register(JournalStep::new(
            "CompoundReader",
            &["CompoundPriceFeed"],
            Action::Read("CompoundPriceFeed"),
            &journal,
        ))
        .unwrap();
    let chain = RecordingChain::new(Network::Kovan.chain_id());
    let mut store = MemoryStore::new();

    let err = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AccessError>(),
        Some(AccessError::SkippedDependency { .. })
    ));
}

#[tokio::test]
async fn test_undeclared_read_fails() {
    init_tracing();
    let journal = journal();
    let registry = StepRegistry::new()
        .with(JournalStep::new("A", &[], Action::Deploy, &journal))
        .unwrap()
        .with(JournalStep::new("B", &[], Action::Read("A"), &journal))
        .unwrap();
    let chain = RecordingChain::new(31337);
    let mut store = MemoryStore::new();

    let err = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<AccessError>(),
        Some(&AccessError::UndeclaredDependency {
            step: "B".to_string(),
            name: "A".to_string(),
        })
    );
}

#[tokio::test]
async fn test_vault_calls_are_registered_once_in_order() {
    init_tracing();
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    let calls = chain.calls_with_selector(selector(REGISTER_VAULT_CALLS));
    assert_eq!(calls.len(), 1);

    let (to, data) = &calls[0];
    let fund_deployer = store.load("mainnet", "FundDeployer").unwrap().unwrap();
    assert_eq!(*to, fund_deployer.address);

    let decoded = DynSolType::parse("(address[],bytes4[],bytes32[])")
        .unwrap()
        .abi_decode_params(&data[4..])
        .unwrap();
    let decoded = decoded.as_tuple().unwrap();
    let contracts: Vec<Address> = decoded[0]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_address().unwrap())
        .collect();
    let configured: Vec<Address> = mainnet::config()
        .vault_calls
        .iter()
        .map(|entry| entry.contract)
        .collect();
    assert_eq!(contracts, configured);

    let selectors: Vec<Vec<u8>> = decoded[1]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| {
            let (word, size) = value.as_fixed_bytes().unwrap();
            word[..size].to_vec()
        })
        .collect();
    assert_eq!(
        selectors,
        vec![
            selector("approveExchangeOnBehalf(address)").to_vec(),
            selector("mint(address)").to_vec(),
        ]
    );
    assert_eq!(decoded[2].as_array().unwrap().len(), 2);

    run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();
    assert_eq!(chain.calls_with_selector(selector(REGISTER_VAULT_CALLS)).len(), 1);
}

#[tokio::test]
async fn test_empty_vault_calls_send_nothing() {
    init_tracing();
    let mut config = mainnet::config();
    config.vault_calls.clear();
    let registry = steps::release_with([NetworkConfigStep::new(
        "MainnetConfig",
        &[Network::Mainnet, Network::Hardhat],
        config,
    )])
    .unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.state_of("PostDeployment"), Some(StepState::Completed));
    assert!(chain.calls_with_selector(selector(REGISTER_VAULT_CALLS)).is_empty());
}

#[tokio::test]
async fn test_end_steps_run_last_and_read_anything() {
    init_tracing();
    let journal = journal();
    let registry = StepRegistry::new()
        .with(JournalStep::new("Wiring", &[], Action::Read("B"), &journal).at_end())
        .unwrap()
        .with(JournalStep::new("A", &[], Action::Deploy, &journal))
        .unwrap()
        .with(JournalStep::new("B", &["A"], Action::Deploy, &journal))
        .unwrap();
    let chain = RecordingChain::new(31337);
    let mut store = MemoryStore::new();

    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(entries(&journal), vec!["A", "B", "Wiring"]);
    assert_eq!(report.state_of("Wiring"), Some(StepState::Completed));
}

#[tokio::test]
async fn test_failure_aborts_and_keeps_completed_artifacts() {
    init_tracing();
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id()).failing("ValueInterpreter");
    let mut store = MemoryStore::new();

    let err = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<RunError>(),
        Some(&RunError::StepFailed("ValueInterpreter".to_string()))
    );
    assert!(store.load("mainnet", "Dispatcher").unwrap().is_some());
    assert!(store.load("mainnet", "ValueInterpreter").unwrap().is_none());
    assert_eq!(store.execution_count("mainnet"), 0, "post deployment never ran");
}

#[tokio::test]
async fn test_tag_selection_runs_dependencies_only() {
    init_tracing();
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Mainnet.chain_id());
    let mut store = MemoryStore::new();
    let options = RunOptions {
        tags: vec!["FundDeployer".to_string()],
        ..Default::default()
    };

    let report = run(&registry, &chain, &mut store, options).await.unwrap();

    let names: Vec<&str> = report.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["MainnetConfig", "KovanConfig", "Dispatcher", "FundDeployer"]
    );
    assert_eq!(chain.deployments(), vec!["Dispatcher", "FundDeployer"]);
}

#[tokio::test]
async fn test_file_store_survives_restarts() {
    init_tracing();
    let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
    let registry = steps::release().unwrap();
    let chain = RecordingChain::new(Network::Hardhat.chain_id());

    {
        let mut store = FileStore::open(temp_dir.path()).unwrap();
        run(&registry, &chain, &mut store, RunOptions::default())
            .await
            .unwrap();
    }
    let sent = chain.transactions().len();

    let mut store = FileStore::open(temp_dir.path()).unwrap();
    let report = run(&registry, &chain, &mut store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.network, "hardhat");
    assert_eq!(report.transactions(), 0);
    assert_eq!(chain.transactions().len(), sent);
    assert!(temp_dir.path().join("hardhat").join("FundDeployer.json").exists());
}
