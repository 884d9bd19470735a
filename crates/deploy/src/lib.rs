//! fundwire-deploy - Deployment orchestration for the fund protocol.
//!
//! This crate resolves the release's deploy steps into a dependency order,
//! runs them against a chain while skipping the ones that do not apply to the
//! target network, reuses prior deployments, and finishes with the
//! post-deployment wiring.

pub mod artifact;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod graph;
pub mod network;
pub mod runner;
pub mod settings;
pub mod step;
pub mod steps;
pub mod store;

pub use artifact::{ArtifactKind, ArtifactTags, DeploymentArtifact, compute_args_hash};
pub use chain::{
    Call, ChainClient, DeployReceipt, DeployTransaction, GasSettings, RecordedTransaction,
    RecordingChain, RpcChain, RpcChainConfig,
};
pub use config::{CONFIG_NAME, DeploymentConfig, has_config, load_config, save_config};
pub use contracts::{CompiledContract, ContractArtifacts};
pub use error::{AccessError, ConfigError, GraphError, RunError};
pub use graph::ResolvedGraph;
pub use network::{
    Network, NetworkContext, NetworkPredicate, is_network, is_one_of_networks,
    resolve_network_identity,
};
pub use runner::{DeploymentRunner, RunReport, StepReport, plan};
pub use settings::{SETTINGS_FILENAME, Settings};
pub use step::{
    DeployRequest, DeployStep, RunOptions, StepContext, StepOutcome, StepRegistry, StepState,
};
pub use store::{ArtifactStore, FileStore, MemoryStore};
