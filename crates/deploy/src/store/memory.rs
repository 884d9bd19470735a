use std::collections::{BTreeMap, HashMap};

use anyhow::Result;

use super::ArtifactStore;
use crate::artifact::DeploymentArtifact;

/// In-memory store, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    artifacts: HashMap<String, BTreeMap<String, DeploymentArtifact>>,
    executions: HashMap<String, BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of executed transactions recorded for `network`.
    pub fn execution_count(&self, network: &str) -> usize {
        self.executions.get(network).map_or(0, BTreeMap::len)
    }
}

impl ArtifactStore for MemoryStore {
    fn load(&self, network: &str, name: &str) -> Result<Option<DeploymentArtifact>> {
        Ok(self
            .artifacts
            .get(network)
            .and_then(|artifacts| artifacts.get(name))
            .cloned())
    }

    fn save(&mut self, network: &str, name: &str, artifact: &DeploymentArtifact) -> Result<()> {
        self.artifacts
            .entry(network.to_string())
            .or_default()
            .insert(name.to_string(), artifact.clone());
        Ok(())
    }

    fn names(&self, network: &str) -> Result<Vec<String>> {
        Ok(self
            .artifacts
            .get(network)
            .map(|artifacts| artifacts.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn has_execution(&self, network: &str, key: &str) -> Result<bool> {
        Ok(self
            .executions
            .get(network)
            .is_some_and(|executions| executions.contains_key(key)))
    }

    fn record_execution(&mut self, network: &str, step: &str, key: &str) -> Result<()> {
        self.executions
            .entry(network.to_string())
            .or_default()
            .insert(key.to_string(), step.to_string());
        Ok(())
    }
}
