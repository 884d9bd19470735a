//! Persisted artifact store, keyed by `(network, name)`.
//!
//! The runner is the only writer. Steps see the store through
//! [`StepContext`](crate::StepContext), which scopes reads to their declared
//! dependencies and writes to their own name.

use anyhow::Result;

use crate::artifact::DeploymentArtifact;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Repository of deployment artifacts and executed transactions.
pub trait ArtifactStore: Send + Sync {
    /// Load the artifact persisted under `name`, if any.
    fn load(&self, network: &str, name: &str) -> Result<Option<DeploymentArtifact>>;

    /// Persist `artifact` under `name`, replacing any previous one.
    fn save(&mut self, network: &str, name: &str, artifact: &DeploymentArtifact) -> Result<()>;

    /// Names of all artifacts persisted for `network`, sorted.
    fn names(&self, network: &str) -> Result<Vec<String>>;

    /// Whether the transaction identified by `key` was already executed.
    fn has_execution(&self, network: &str, key: &str) -> Result<bool>;

    /// Record that `step` executed the transaction identified by `key`.
    fn record_execution(&mut self, network: &str, step: &str, key: &str) -> Result<()>;
}
