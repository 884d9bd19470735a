//! Deployment execution engine.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    chain::ChainClient,
    error::RunError,
    graph::ResolvedGraph,
    network::NetworkContext,
    step::{Access, RunOptions, RunState, StepContext, StepOutcome, StepRegistry, StepState},
    store::ArtifactStore,
};

/// Final state of one step in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub state: StepState,
    /// Artifact names with new deployments.
    pub deployed: Vec<String>,
    /// Artifact names reused from a prior run.
    pub reused: Vec<String>,
    pub transactions: usize,
    pub skipped_calls: usize,
}

impl StepReport {
    fn new(name: &str, state: StepState, outcome: StepOutcome) -> Self {
        Self {
            name: name.to_string(),
            state,
            deployed: outcome.deployed.into_iter().map(|(name, _)| name).collect(),
            reused: outcome.reused.into_iter().map(|(name, _)| name).collect(),
            transactions: outcome.transactions,
            skipped_calls: outcome.skipped_calls,
        }
    }
}

/// Summary of a completed run, one entry per selected step in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub chain_id: u64,
    pub network: String,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn state_of(&self, name: &str) -> Option<StepState> {
        self.steps
            .iter()
            .find(|step| step.name == name)
            .map(|step| step.state)
    }

    /// Names of the steps that reached `state`, in execution order.
    pub fn steps_in(&self, state: StepState) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| step.state == state)
            .map(|step| step.name.as_str())
            .collect()
    }

    /// Total transactions sent during the run.
    pub fn transactions(&self) -> usize {
        self.steps.iter().map(|step| step.transactions).sum()
    }
}

/// Runs the steps of a registry against a chain, persisting into a store.
pub struct DeploymentRunner<'a> {
    registry: &'a StepRegistry,
    chain: &'a dyn ChainClient,
    store: &'a mut dyn ArtifactStore,
    options: RunOptions,
}

impl<'a> DeploymentRunner<'a> {
    pub fn new(
        registry: &'a StepRegistry,
        chain: &'a dyn ChainClient,
        store: &'a mut dyn ArtifactStore,
        options: RunOptions,
    ) -> Self {
        Self {
            registry,
            chain,
            store,
            options,
        }
    }

    /// Resolve the graph, then run every selected step in order.
    ///
    /// The graph is validated before any step runs. The run stops at the first
    /// failing step; artifacts of steps that completed before it stay persisted.
    pub async fn run(&mut self) -> Result<RunReport> {
        let registry = self.registry;
        let graph = ResolvedGraph::resolve(registry)?;

        let chain_id = self
            .chain
            .chain_id()
            .await
            .context("Failed to fetch chain id")?;
        let network = NetworkContext::new(chain_id);
        let selected = graph.select(registry, &self.options.tags);

        tracing::info!(
            chain_id,
            network = %network.store_key(),
            steps = selected.len(),
            redeploy = self.options.redeploy,
            "Starting deployment run"
        );

        let mut run = RunState::default();
        for &index in &selected {
            run.states
                .insert(registry[index].name().to_string(), StepState::Pending);
        }

        let mut report = RunReport {
            chain_id,
            network: network.store_key(),
            steps: Vec::with_capacity(selected.len()),
        };

        for &index in &selected {
            let step = &registry[index];
            let name = step.name();

            if step.skip().matches(chain_id) {
                tracing::info!(step = %name, chain_id, "Skipping step on this network");
                run.states.insert(name.to_string(), StepState::Skipped);
                report
                    .steps
                    .push(StepReport::new(name, StepState::Skipped, StepOutcome::default()));
                continue;
            }

            debug_assert!(graph.dependencies(index).iter().all(|&dep| {
                run.states
                    .get(registry[dep].name())
                    .is_none_or(StepState::is_terminal)
            }));

            tracing::info!(step = %name, "Running step");
            run.states.insert(name.to_string(), StepState::Running);

            let access = if step.run_at_the_end() {
                Access::Unrestricted
            } else {
                Access::Declared {
                    allowed: graph.allowed(index),
                    producers: graph.producers(index),
                }
            };

            let mut ctx = StepContext::new(
                name,
                network,
                access,
                &mut run,
                &mut *self.store,
                self.chain,
                &self.options,
            );
            let result = step.run(&mut ctx).await;
            let outcome = ctx.finish();

            match result {
                Ok(()) => {
                    tracing::info!(
                        step = %name,
                        transactions = outcome.transactions,
                        "Step completed"
                    );
                    run.states.insert(name.to_string(), StepState::Completed);
                    report
                        .steps
                        .push(StepReport::new(name, StepState::Completed, outcome));
                }
                Err(e) => {
                    tracing::error!(step = %name, error = %e, "Step failed");
                    run.states.insert(name.to_string(), StepState::Failed);
                    return Err(e.context(RunError::StepFailed(name.to_string())));
                }
            }
        }

        tracing::info!(
            completed = report.steps_in(StepState::Completed).len(),
            skipped = report.steps_in(StepState::Skipped).len(),
            transactions = report.transactions(),
            "Deployment run finished"
        );

        Ok(report)
    }
}

/// The execution order a run would use on `chain_id`, without running anything.
pub fn plan(
    registry: &StepRegistry,
    chain_id: u64,
    tags: &[String],
) -> Result<Vec<(String, StepState)>> {
    let graph = ResolvedGraph::resolve(registry)?;

    Ok(graph
        .select(registry, tags)
        .into_iter()
        .map(|index| {
            let step = &registry[index];
            let state = if step.skip().matches(chain_id) {
                StepState::Skipped
            } else {
                StepState::Pending
            };
            (step.name().to_string(), state)
        })
        .collect())
}
