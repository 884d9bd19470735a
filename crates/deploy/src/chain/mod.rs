//! The boundary to the blockchain node.
//!
//! Steps never talk to the node directly; they go through
//! [`StepContext`](crate::StepContext), which calls a [`ChainClient`] only after
//! its idempotency checks decided a transaction is needed.

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod recording;
mod rpc;

pub use recording::{RecordedTransaction, RecordingChain};
pub use rpc::{RpcChain, RpcChainConfig};

/// Gas parameters applied to every transaction of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasSettings {
    /// Explicit gas limit; estimated by the node when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Gas price in wei; chosen by the node when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
}

/// A contract creation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployTransaction {
    pub contract: String,
    pub args: Vec<Value>,
    pub gas: GasSettings,
}

/// A call to an already deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub data: Bytes,
    /// Human readable label used in logs, e.g. `FundDeployer.registerVaultCalls`.
    pub description: String,
}

impl Call {
    pub fn new(to: Address, data: Bytes, description: impl Into<String>) -> Self {
        Self {
            to,
            data,
            description: description.into(),
        }
    }
}

/// Outcome of a confirmed contract creation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployReceipt {
    pub address: Address,
    pub transaction_hash: B256,
    /// JSON ABI of the deployed contract, or an empty array if unknown.
    pub abi: Value,
}

/// A live network that deploys contracts and sends transactions.
///
/// Every future resolves once the transaction is confirmed; a reverted
/// transaction is an error.
pub trait ChainClient: Send + Sync {
    /// The chain id of the network.
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>>;

    /// Deploy a contract and wait for its receipt.
    fn deploy<'a>(&'a self, tx: &'a DeployTransaction) -> BoxFuture<'a, Result<DeployReceipt>>;

    /// Send a transaction and wait for its receipt, returning the transaction hash.
    fn send<'a>(&'a self, call: &'a Call, gas: GasSettings) -> BoxFuture<'a, Result<B256>>;
}
