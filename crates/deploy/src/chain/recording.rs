//! A chain that records transactions instead of sending them.

use std::{collections::HashSet, sync::Mutex};

use alloy_core::primitives::{Address, B256, Bytes, keccak256};
use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use super::{Call, ChainClient, DeployReceipt, DeployTransaction, GasSettings};
use crate::config::Selector;

/// A transaction seen by a [`RecordingChain`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedTransaction {
    Deploy {
        contract: String,
        args: Vec<Value>,
        address: Address,
    },
    Call {
        to: Address,
        data: Bytes,
        description: String,
    },
}

#[derive(Debug, Default)]
struct RecordingState {
    nonce: u64,
    transactions: Vec<RecordedTransaction>,
}

/// In-process chain for tests and dry runs.
///
/// Addresses are derived from the contract name and a nonce, so they are
/// deterministic for a given sequence of deployments.
#[derive(Debug, Default)]
pub struct RecordingChain {
    chain_id: u64,
    failing: HashSet<String>,
    state: Mutex<RecordingState>,
}

impl RecordingChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Make deployments of `contract` revert.
    pub fn failing(mut self, contract: impl Into<String>) -> Self {
        self.failing.insert(contract.into());
        self
    }

    pub fn transactions(&self) -> Vec<RecordedTransaction> {
        self.lock().transactions.clone()
    }

    /// Names of the deployed contracts, in order.
    pub fn deployments(&self) -> Vec<String> {
        self.lock()
            .transactions
            .iter()
            .filter_map(|tx| match tx {
                RecordedTransaction::Deploy { contract, .. } => Some(contract.clone()),
                RecordedTransaction::Call { .. } => None,
            })
            .collect()
    }

    /// Calldata of every call whose selector is `selector`, in order.
    pub fn calls_with_selector(&self, selector: Selector) -> Vec<(Address, Bytes)> {
        self.lock()
            .transactions
            .iter()
            .filter_map(|tx| match tx {
                RecordedTransaction::Call { to, data, .. }
                    if data.len() >= 4 && data[..4] == selector[..] =>
                {
                    Some((*to, data.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        // A poisoned lock only means a test panicked mid-record; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_hash(state: &mut RecordingState, payload: &[u8]) -> B256 {
        state.nonce += 1;
        let mut preimage = state.nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(payload);
        keccak256(preimage)
    }
}

impl ChainClient for RecordingChain {
    fn chain_id(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move { Ok(self.chain_id) })
    }

    fn deploy<'a>(&'a self, tx: &'a DeployTransaction) -> BoxFuture<'a, Result<DeployReceipt>> {
        Box::pin(async move {
            if self.failing.contains(&tx.contract) {
                anyhow::bail!("Deployment of {} reverted", tx.contract);
            }

            let mut state = self.lock();
            let transaction_hash = Self::next_hash(&mut state, tx.contract.as_bytes());
            let address = Address::from_word(transaction_hash);
            state.transactions.push(RecordedTransaction::Deploy {
                contract: tx.contract.clone(),
                args: tx.args.clone(),
                address,
            });

            Ok(DeployReceipt {
                address,
                transaction_hash,
                abi: Value::Array(Vec::new()),
            })
        })
    }

    fn send<'a>(&'a self, call: &'a Call, _gas: GasSettings) -> BoxFuture<'a, Result<B256>> {
        Box::pin(async move {
            let mut state = self.lock();
            let transaction_hash = Self::next_hash(&mut state, &call.data);
            state.transactions.push(RecordedTransaction::Call {
                to: call.to,
                data: call.data.clone(),
                description: call.description.clone(),
            });
            Ok(transaction_hash)
        })
    }
}
