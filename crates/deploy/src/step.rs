//! Deploy steps and the context they run in.
//!
//! A step declares its name, the steps or tags it depends on, the tags it
//! belongs to and the networks it skips, and implements [`DeployStep::run`].
//! During `run` the step only sees the world through its [`StepContext`]:
//! artifacts of its declared dependencies, the run's config, and idempotent
//! deploy / execute helpers.

use std::collections::{BTreeSet, HashMap};

use alloy_core::primitives::{Address, B256, keccak256};
use anyhow::Result;
use derive_more::Deref;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    artifact::{ArtifactKind, ArtifactTags, DeploymentArtifact, compute_args_hash, now},
    chain::{Call, ChainClient, DeployTransaction, GasSettings},
    config::{self, DeploymentConfig},
    error::{AccessError, GraphError, RunError},
    network::{NetworkContext, NetworkPredicate},
    store::ArtifactStore,
};

/// A named unit of deployment work.
pub trait DeployStep: Send + Sync {
    /// Unique name; also the name the step's artifact is persisted under.
    fn name(&self) -> &str;

    /// Steps or tags that must reach a terminal state before this one runs.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    fn tags(&self) -> &[&str] {
        &[]
    }

    /// Networks on which this step does not apply.
    fn skip(&self) -> NetworkPredicate {
        NetworkPredicate::Never
    }

    /// Run after every other step, regardless of declared dependencies.
    fn run_at_the_end(&self) -> bool {
        false
    }

    fn run<'a>(&'a self, ctx: &'a mut StepContext<'_>) -> BoxFuture<'a, Result<()>>;
}

/// Lifecycle of a step within a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum StepState {
    Pending,
    Skipped,
    Running,
    Completed,
    Failed,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Skipped | StepState::Completed | StepState::Failed
        )
    }
}

/// All steps known to a release, in registration order.
#[derive(Default, Deref)]
pub struct StepRegistry {
    steps: Vec<Box<dyn DeployStep>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step. Names are unique.
    pub fn register(&mut self, step: impl DeployStep + 'static) -> Result<&mut Self, GraphError> {
        if self.position(step.name()).is_some() {
            return Err(GraphError::DuplicateStep(step.name().to_string()));
        }
        self.steps.push(Box::new(step));
        Ok(self)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, step: impl DeployStep + 'static) -> Result<Self, GraphError> {
        self.register(step)?;
        Ok(self)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn DeployStep> {
        self.position(name).map(|index| self.steps[index].as_ref())
    }
}

/// A contract deployment requested by a step.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    pub contract: String,
    pub args: Vec<Value>,
    pub linked_data: Value,
    /// Reuse a prior deployment with identical arguments instead of redeploying.
    pub skip_if_already_deployed: bool,
}

impl DeployRequest {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            args: Vec::new(),
            linked_data: Value::Null,
            skip_if_already_deployed: true,
        }
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn tags(mut self, tags: ArtifactTags) -> Self {
        self.linked_data = serde_json::to_value(tags).unwrap_or(Value::Null);
        self
    }

    /// Deploy on every run, even when a matching deployment exists.
    pub fn always_deploy(mut self) -> Self {
        self.skip_if_already_deployed = false;
        self
    }
}

/// Options shared by every step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Only run steps matching these names or tags (plus their dependencies).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ignore prior deployments and executions.
    #[serde(default)]
    pub redeploy: bool,
    #[serde(default)]
    pub gas: GasSettings,
}

#[derive(Debug, Clone)]
struct Materialized {
    owner: String,
    artifact: DeploymentArtifact,
}

/// Mutable state of a run, shared by the runner and every step context.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) states: HashMap<String, StepState>,
    materialized: HashMap<String, Materialized>,
    /// Artifact names in the order they were materialized.
    order: Vec<String>,
}

/// What a step did during its run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Artifacts written by a new deployment.
    pub deployed: Vec<(String, Address)>,
    /// Artifacts reused from a prior run.
    pub reused: Vec<(String, Address)>,
    /// Transactions sent, deployments included.
    pub transactions: usize,
    /// Calls skipped because an identical one was already executed.
    pub skipped_calls: usize,
}

/// Which artifacts a step may read.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Access<'a> {
    /// Names reachable through the declared dependency list, plus the
    /// producing steps in declaration order.
    Declared {
        allowed: &'a BTreeSet<String>,
        producers: &'a [String],
    },
    /// Everything materialized so far (steps that run at the end).
    Unrestricted,
}

/// The execution context handed to a running step.
pub struct StepContext<'a> {
    step: &'a str,
    network: NetworkContext,
    network_key: String,
    access: Access<'a>,
    run: &'a mut RunState,
    store: &'a mut dyn ArtifactStore,
    chain: &'a dyn ChainClient,
    options: &'a RunOptions,
    outcome: StepOutcome,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        step: &'a str,
        network: NetworkContext,
        access: Access<'a>,
        run: &'a mut RunState,
        store: &'a mut dyn ArtifactStore,
        chain: &'a dyn ChainClient,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            step,
            network_key: network.store_key(),
            network,
            access,
            run,
            store,
            chain,
            options,
            outcome: StepOutcome::default(),
        }
    }

    pub(crate) fn finish(self) -> StepOutcome {
        self.outcome
    }

    /// Name of the running step.
    pub fn step_name(&self) -> &str {
        self.step
    }

    pub fn network(&self) -> NetworkContext {
        self.network
    }

    pub fn gas(&self) -> GasSettings {
        self.options.gas
    }

    fn check_access(&self, name: &str) -> Result<(), AccessError> {
        match self.access {
            Access::Declared { allowed, .. } if !allowed.contains(name) => {
                Err(AccessError::UndeclaredDependency {
                    step: self.step.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn is_materialized(&self, name: &str) -> bool {
        self.run.materialized.contains_key(name)
    }

    /// The artifact of a declared dependency. Fails if it was skipped or never produced.
    pub fn get(&self, name: &str) -> Result<DeploymentArtifact> {
        self.check_access(name)?;

        if let Some(materialized) = self.run.materialized.get(name) {
            return Ok(materialized.artifact.clone());
        }

        let step = self.step.to_string();
        let name = name.to_string();
        match self.run.states.get(&name) {
            Some(StepState::Skipped) => Err(AccessError::SkippedDependency { step, name }.into()),
            _ => Err(AccessError::MissingArtifact { step, name }.into()),
        }
    }

    /// The artifact of a declared dependency, or `None` if it is absent on this network.
    pub fn get_or_null(&self, name: &str) -> Result<Option<DeploymentArtifact>> {
        self.check_access(name)?;

        Ok(self
            .run
            .materialized
            .get(name)
            .map(|materialized| materialized.artifact.clone()))
    }

    /// Every present dependency artifact of `kind`, in declaration order.
    pub fn providers(&self, kind: ArtifactKind) -> Vec<(String, DeploymentArtifact)> {
        let candidates: Vec<&String> = match self.access {
            Access::Declared { producers, .. } => producers.iter().collect(),
            Access::Unrestricted => self.run.order.iter().collect(),
        };

        candidates
            .into_iter()
            .filter_map(|name| {
                self.run
                    .materialized
                    .get(name)
                    .filter(|materialized| materialized.artifact.kind() == Some(kind))
                    .map(|materialized| (name.clone(), materialized.artifact.clone()))
            })
            .collect()
    }

    /// Address of a declared dependency.
    pub fn address_of(&self, name: &str) -> Result<Address> {
        Ok(self.get(name)?.address)
    }

    /// The run's deployment config.
    pub fn config(&self) -> Result<DeploymentConfig> {
        config::load_config(self)
    }

    pub fn save_config(&mut self, data: &DeploymentConfig) -> Result<()> {
        config::save_config(self, data)
    }

    /// Record `artifact` as materialized under `name` for this run, enforcing
    /// one writer per name, without touching the store.
    pub(crate) fn materialize(&mut self, name: &str, artifact: DeploymentArtifact) -> Result<()> {
        if let Some(existing) = self.run.materialized.get(name) {
            return Err(RunError::DuplicateWrite {
                step: self.step.to_string(),
                name: name.to_string(),
                owner: existing.owner.clone(),
            }
            .into());
        }

        self.run.order.push(name.to_string());
        self.run.materialized.insert(
            name.to_string(),
            Materialized {
                owner: self.step.to_string(),
                artifact,
            },
        );
        Ok(())
    }

    /// The artifact a previous run persisted under `name`, bypassing access scoping.
    pub(crate) fn persisted(&self, name: &str) -> Result<Option<DeploymentArtifact>> {
        self.store.load(&self.network_key, name)
    }

    /// Persist `artifact` under `name` and make it visible to later steps.
    pub(crate) fn persist(&mut self, name: &str, artifact: DeploymentArtifact) -> Result<()> {
        self.materialize(name, artifact.clone())?;
        self.store.save(&self.network_key, name, &artifact)
    }

    /// Deploy a contract as this step's artifact.
    ///
    /// A prior deployment with the same contract and arguments is reused
    /// without sending a transaction, unless the request opts out or the run
    /// forces redeployment.
    pub async fn deploy(&mut self, request: DeployRequest) -> Result<DeploymentArtifact> {
        let name = self.step.to_string();

        let prior = if request.skip_if_already_deployed && !self.options.redeploy {
            self.store.load(&self.network_key, &name)?
        } else {
            None
        };

        match prior {
            Some(prior) if prior.matches(&request.contract, &request.args) => {
                tracing::info!(
                    step = %name,
                    contract = %request.contract,
                    address = %prior.address,
                    "Reusing existing deployment"
                );
                self.materialize(&name, prior.clone())?;
                self.outcome.reused.push((name, prior.address));
                return Ok(prior);
            }
            Some(prior) => {
                tracing::info!(
                    step = %name,
                    contract = %request.contract,
                    previous = %prior.address,
                    "Constructor arguments changed, redeploying"
                );
            }
            None => {}
        }

        let tx = DeployTransaction {
            contract: request.contract.clone(),
            args: request.args.clone(),
            gas: self.options.gas,
        };
        let receipt = self.chain.deploy(&tx).await?;

        let artifact = DeploymentArtifact {
            args_hash: compute_args_hash(&request.contract, &request.args),
            contract: request.contract,
            address: receipt.address,
            abi: receipt.abi,
            args: request.args,
            linked_data: request.linked_data,
            transaction_hash: Some(receipt.transaction_hash),
            deployed_at: now(),
        };
        self.persist(&name, artifact.clone())?;

        tracing::info!(
            step = %name,
            contract = %artifact.contract,
            address = %artifact.address,
            tx_hash = %receipt.transaction_hash,
            "Deployed contract"
        );

        self.outcome.transactions += 1;
        self.outcome.deployed.push((name, artifact.address));
        Ok(artifact)
    }

    /// Send `call` unless an identical call was already executed on this network.
    ///
    /// Returns the transaction hash, or `None` if the call was skipped.
    pub async fn execute(&mut self, call: Call) -> Result<Option<B256>> {
        let key = execution_key(&call);

        if !self.options.redeploy && self.store.has_execution(&self.network_key, &key)? {
            tracing::info!(
                step = %self.step,
                call = %call.description,
                "Call already executed, skipping"
            );
            self.outcome.skipped_calls += 1;
            return Ok(None);
        }

        let tx_hash = self.chain.send(&call, self.options.gas).await?;
        self.store
            .record_execution(&self.network_key, self.step, &key)?;

        tracing::info!(
            step = %self.step,
            call = %call.description,
            to = %call.to,
            tx_hash = %tx_hash,
            "Executed call"
        );

        self.outcome.transactions += 1;
        Ok(Some(tx_hash))
    }
}

/// Identity of a call for idempotency: its target and calldata.
fn execution_key(call: &Call) -> String {
    let mut preimage = call.to.to_vec();
    preimage.extend_from_slice(&call.data);
    hex::encode(keccak256(preimage))
}
