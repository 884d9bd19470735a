//! Deployment settings: built-in defaults, overridden by an optional
//! `Fundwire.toml`, overridden by `FUNDWIRE_*` environment variables.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{chain::GasSettings, chain::RpcChainConfig, step::RunOptions};

/// The default name for the settings file.
pub const SETTINGS_FILENAME: &str = "Fundwire.toml";

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "FUNDWIRE_";

/// Default RPC endpoint: a local hardhat or anvil node.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Default time to wait for a transaction to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON-RPC endpoint of the target network.
    pub rpc_url: Url,
    /// Sender account, unlocked on the node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Directory of compiled contracts.
    pub artifacts: PathBuf,
    /// Root of the deployment artifact store.
    pub deployments: PathBuf,
    pub confirmation_timeout_secs: u64,
    /// Only run steps matching these names or tags.
    pub tags: Vec<String>,
    pub redeploy: bool,
    pub gas: GasSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: Url::parse(DEFAULT_RPC_URL).expect("default RPC URL is valid"),
            from: None,
            artifacts: PathBuf::from("artifacts"),
            deployments: PathBuf::from("deployments"),
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            tags: Vec::new(),
            redeploy: false,
            gas: GasSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings, layering `path` (if it exists) and the environment over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading settings file");
            figment = figment.merge(Toml::file(path));
        }

        let settings: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!("Failed to load settings from {}", path.display()))?;

        tracing::debug!(rpc_url = %settings.rpc_url, deployments = %settings.deployments.display(), "Settings loaded");
        Ok(settings)
    }

    /// Save the settings to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write settings to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Save the settings next to the deployments they produced.
    pub fn save_to_deployments(&self) -> Result<PathBuf> {
        let path = self.deployments.join(SETTINGS_FILENAME);
        self.save_to_file(&path)?;
        Ok(path)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            tags: self.tags.clone(),
            redeploy: self.redeploy,
            gas: self.gas,
        }
    }

    /// Connection settings for an [`RpcChain`](crate::chain::RpcChain). Requires a sender.
    pub fn rpc_chain_config(&self) -> Result<RpcChainConfig> {
        let from = self
            .from
            .context("No sender account configured (set --from or FUNDWIRE_FROM)")?;

        Ok(RpcChainConfig {
            url: self.rpc_url.clone(),
            from,
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");

        let settings = Settings::load(&temp_dir.path().join(SETTINGS_FILENAME)).unwrap();

        assert_eq!(settings.rpc_url.as_str(), "http://localhost:8545/");
        assert_eq!(settings.confirmation_timeout_secs, DEFAULT_CONFIRMATION_TIMEOUT_SECS);
        assert!(settings.rpc_chain_config().is_err(), "no sender configured");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join(SETTINGS_FILENAME);
        std::fs::write(
            &path,
            r#"
rpc_url = "http://node:8545"
from = "0x1111111111111111111111111111111111111111"
tags = ["Release"]
redeploy = true

[gas]
gas_limit = 6000000
"#,
        )
        .expect("Failed to write settings");

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.deployments, PathBuf::from("deployments"));
        let options = settings.run_options();
        assert_eq!(options.tags, vec!["Release"]);
        assert!(options.redeploy);
        assert_eq!(options.gas.gas_limit, Some(6_000_000));

        let chain = settings.rpc_chain_config().unwrap();
        assert_eq!(chain.from, Address::repeat_byte(0x11));
        assert_eq!(chain.confirmation_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join(SETTINGS_FILENAME);
        let settings = Settings {
            from: Some(Address::repeat_byte(2)),
            tags: vec!["Core".to_string()],
            ..Default::default()
        };

        settings.save_to_file(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_save_to_deployments() {
        let temp_dir = TempDir::new("fundwire-test").expect("Failed to create temp dir");
        let settings = Settings {
            deployments: temp_dir.path().to_path_buf(),
            redeploy: true,
            ..Default::default()
        };

        let path = settings.save_to_deployments().unwrap();

        assert_eq!(path, temp_dir.path().join(SETTINGS_FILENAME));
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }
}
