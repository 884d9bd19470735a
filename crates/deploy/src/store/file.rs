//! File-backed artifact store.
//!
//! Layout, one directory per network:
//!
//! ```text
//! <root>/.lock
//! <root>/<network>/<Name>.json
//! <root>/<network>/.executions.json
//! ```

use std::{
    collections::BTreeMap,
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::ArtifactStore;
use crate::artifact::{DeploymentArtifact, now};

const LOCK_FILENAME: &str = ".lock";
const EXECUTIONS_FILENAME: &str = ".executions.json";

/// A transaction recorded as executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ExecutionRecord {
    step: String,
    executed_at: u64,
}

/// Store persisting artifacts as pretty JSON files.
///
/// A writable store holds an exclusive lock on the root directory while alive,
/// so two runs cannot write the same deployments at once. Read-only stores take
/// no lock and refuse writes.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: Option<File>,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `root` and lock it.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .context(format!("Failed to create deployments directory {}", root.display()))?;

        let lock_path = root.join(LOCK_FILENAME);
        let lock = File::create(&lock_path)
            .context(format!("Failed to create lock file {}", lock_path.display()))?;
        lock.try_lock_exclusive().context(format!(
            "Deployments directory {} is locked by another run",
            root.display()
        ))?;

        tracing::debug!(root = %root.display(), "Opened deployments directory");

        Ok(Self {
            root,
            lock: Some(lock),
        })
    }

    /// Open the store at `root` for reading only, without locking it.
    ///
    /// A missing root reads as an empty store.
    pub fn open_read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: None,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.lock.is_none()
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            anyhow::bail!(
                "Deployments directory {} was opened read-only",
                self.root.display()
            );
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn network_dir(&self, network: &str) -> PathBuf {
        self.root.join(network)
    }

    fn artifact_path(&self, network: &str, name: &str) -> PathBuf {
        self.network_dir(network).join(format!("{name}.json"))
    }

    fn load_executions(&self, network: &str) -> Result<BTreeMap<String, ExecutionRecord>> {
        let path = self.network_dir(network).join(EXECUTIONS_FILENAME);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)
            .context(format!("Failed to read executions from {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse executions JSON")
    }
}

impl ArtifactStore for FileStore {
    fn load(&self, network: &str, name: &str) -> Result<Option<DeploymentArtifact>> {
        let path = self.artifact_path(network, name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .context(format!("Failed to read artifact from {}", path.display()))?;
        let artifact = serde_json::from_str(&content)
            .context(format!("Failed to parse artifact {}", path.display()))?;

        Ok(Some(artifact))
    }

    fn save(&mut self, network: &str, name: &str, artifact: &DeploymentArtifact) -> Result<()> {
        self.ensure_writable()?;
        let dir = self.network_dir(network);
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create network directory {}", dir.display()))?;

        let path = self.artifact_path(network, name);
        let json =
            serde_json::to_string_pretty(artifact).context("Failed to serialize artifact")?;
        std::fs::write(&path, json)
            .context(format!("Failed to write artifact to {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Artifact saved");
        Ok(())
    }

    fn names(&self, network: &str) -> Result<Vec<String>> {
        let dir = self.network_dir(network);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .context(format!("Failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !stem.starts_with('.') => names.push(stem.to_string()),
                _ => {}
            }
        }
        names.sort();
        Ok(names)
    }

    fn has_execution(&self, network: &str, key: &str) -> Result<bool> {
        Ok(self.load_executions(network)?.contains_key(key))
    }

    fn record_execution(&mut self, network: &str, step: &str, key: &str) -> Result<()> {
        self.ensure_writable()?;
        let mut executions = self.load_executions(network)?;
        executions.insert(
            key.to_string(),
            ExecutionRecord {
                step: step.to_string(),
                executed_at: now(),
            },
        );

        let dir = self.network_dir(network);
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create network directory {}", dir.display()))?;

        let path = dir.join(EXECUTIONS_FILENAME);
        let json = serde_json::to_string_pretty(&executions)
            .context("Failed to serialize executions")?;
        std::fs::write(&path, json)
            .context(format!("Failed to write executions to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempdir::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let mut store = FileStore::open(temp_dir.path()).expect("Failed to open store");

        let artifact = DeploymentArtifact::pseudo("Config", json!({ "weth": "0x01" }));
        store.save("kovan", "Config", &artifact).unwrap();

        let loaded = store.load("kovan", "Config").unwrap();
        assert_eq!(loaded, Some(artifact));
        assert!(temp_dir.path().join("kovan/Config.json").exists());
        assert!(store.load("mainnet", "Config").unwrap().is_none());
    }

    #[test]
    fn test_names_skip_hidden_files() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let mut store = FileStore::open(temp_dir.path()).expect("Failed to open store");

        let artifact = DeploymentArtifact::pseudo("Dispatcher", json!(null));
        store.save("mainnet", "Dispatcher", &artifact).unwrap();
        store.save("mainnet", "Config", &artifact).unwrap();
        store.record_execution("mainnet", "PostDeployment", "key").unwrap();

        assert_eq!(store.names("mainnet").unwrap(), vec!["Config", "Dispatcher"]);
    }

    #[test]
    fn test_executions_persist_across_opens() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        {
            let mut store = FileStore::open(temp_dir.path()).unwrap();
            store.record_execution("mainnet", "PostDeployment", "abc").unwrap();
        }

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.has_execution("mainnet", "abc").unwrap());
        assert!(!store.has_execution("mainnet", "def").unwrap());
    }

    #[test]
    fn test_second_open_is_locked_out() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let _store = FileStore::open(temp_dir.path()).unwrap();

        assert!(FileStore::open(temp_dir.path()).is_err());
    }

    #[test]
    fn test_read_only_open_ignores_the_lock() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let mut writer = FileStore::open(temp_dir.path()).unwrap();
        let artifact = DeploymentArtifact::pseudo("Dispatcher", json!(null));
        writer.save("mainnet", "Dispatcher", &artifact).unwrap();

        let mut reader = FileStore::open_read_only(temp_dir.path());

        assert!(reader.is_read_only());
        assert_eq!(reader.load("mainnet", "Dispatcher").unwrap(), Some(artifact.clone()));
        assert_eq!(reader.names("mainnet").unwrap(), vec!["Dispatcher"]);
        assert!(reader.save("mainnet", "Dispatcher", &artifact).is_err());
        assert!(reader.record_execution("mainnet", "PostDeployment", "key").is_err());
    }

    #[test]
    fn test_read_only_open_of_missing_root() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let root = temp_dir.path().join("missing");

        let reader = FileStore::open_read_only(&root);

        assert!(reader.names("mainnet").unwrap().is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn test_load_corrupted_artifact() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let store = FileStore::open(temp_dir.path()).unwrap();

        std::fs::create_dir_all(temp_dir.path().join("mainnet")).unwrap();
        std::fs::write(temp_dir.path().join("mainnet/Dispatcher.json"), "{ invalid json }")
            .unwrap();

        assert!(store.load("mainnet", "Dispatcher").is_err());
    }
}
