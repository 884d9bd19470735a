//! Deployment artifacts: the persisted output of a completed step.

use alloy_core::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Classification a step may attach to its artifact for later introspection.
///
/// It has no effect on dependency resolution; it is what
/// [`StepContext::providers`](crate::StepContext::providers) filters on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Adapter,
    Policy,
    PriceFeed,
    DerivativePriceFeed,
    Config,
}

/// Linked data attached to regular contract artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ArtifactKind>,
    /// Adapter trades never produce slippage.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub non_slippage: bool,
    /// Symbols or assets this contract covers, e.g. the derivatives a price feed prices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<String>,
}

impl ArtifactTags {
    pub fn kind(kind: ArtifactKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn non_slippage(mut self) -> Self {
        self.non_slippage = true;
        self
    }

    pub fn covering(mut self, covers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.covers = covers.into_iter().map(Into::into).collect();
        self
    }
}

/// The persisted output of a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentArtifact {
    /// Compiled contract name the artifact was deployed from.
    pub contract: String,
    pub address: Address,
    /// JSON ABI, an empty array for pseudo artifacts.
    pub abi: Value,
    /// Constructor arguments, in their JSON form.
    pub args: Vec<Value>,
    /// Hash of `contract` and `args`, used to detect stale deployments.
    pub args_hash: String,
    #[serde(default)]
    pub linked_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// Unix timestamp of the deployment.
    pub deployed_at: u64,
}

impl DeploymentArtifact {
    /// A zero-address artifact that only carries linked data.
    pub fn pseudo(contract: impl Into<String>, linked_data: Value) -> Self {
        let contract = contract.into();
        Self {
            args_hash: compute_args_hash(&contract, &[]),
            contract,
            address: Address::ZERO,
            abi: Value::Array(Vec::new()),
            args: Vec::new(),
            linked_data,
            transaction_hash: None,
            deployed_at: now(),
        }
    }

    /// Linked data interpreted as [`ArtifactTags`]; `None` for pseudo artifacts.
    pub fn tags(&self) -> Option<ArtifactTags> {
        serde_json::from_value(self.linked_data.clone()).ok()
    }

    pub fn kind(&self) -> Option<ArtifactKind> {
        self.tags().and_then(|tags| tags.kind)
    }

    /// Whether deploying `contract` with `args` would produce this artifact again.
    pub fn matches(&self, contract: &str, args: &[Value]) -> bool {
        self.args_hash == compute_args_hash(contract, args)
    }
}

/// Compute a SHA-256 hash over a contract name and its constructor arguments.
///
/// The inputs are serialized to JSON before hashing, so the hash is
/// deterministic for equal arguments.
pub fn compute_args_hash(contract: &str, args: &[Value]) -> String {
    let json = serde_json::to_string(&(contract, args))
        .expect("JSON values always serialize");

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
