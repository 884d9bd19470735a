//! JSON-RPC chain client sending from an account unlocked on the node.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use futures::future::BoxFuture;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use super::{Call, ChainClient, DeployReceipt, DeployTransaction, GasSettings};
use crate::contracts::ContractArtifacts;

/// Default timeout for a single RPC request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Connection settings for [`RpcChain`].
#[derive(Debug, Clone)]
pub struct RpcChainConfig {
    pub url: Url,
    /// Sender account; must be unlocked on the node.
    pub from: Address,
    /// How long to wait for a transaction to be mined.
    pub confirmation_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    status: Option<String>,
}

impl TransactionReceipt {
    fn succeeded(&self) -> bool {
        // Pre-byzantium receipts have no status field.
        self.status.as_deref().is_none_or(|status| status == "0x1")
    }
}

/// Chain client talking JSON-RPC to a node.
#[derive(Debug, Clone)]
pub struct RpcChain {
    client: reqwest::Client,
    config: RpcChainConfig,
    contracts: ContractArtifacts,
}

impl RpcChain {
    pub fn new(config: RpcChainConfig, contracts: ContractArtifacts) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            contracts,
        })
    }

    /// Make a JSON-RPC call and deserialize the result.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, anyhow::Error> {
        let response = self
            .client
            .post(self.config.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let result: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        if let Some(error) = result.get("error") {
            anyhow::bail!(
                "RPC error: {}",
                error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown")
            );
        }

        let result_value = result
            .get("result")
            .context("No result in response")?
            .clone();

        serde_json::from_value(result_value)
            .with_context(|| format!("Failed to deserialize {} result", method))
    }

    fn transaction(&self, to: Option<Address>, data: &Bytes, gas: GasSettings) -> Value {
        let mut tx = serde_json::json!({
            "from": self.config.from,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }
        if let Some(gas_limit) = gas.gas_limit {
            tx["gas"] = Value::String(format!("0x{gas_limit:x}"));
        }
        if let Some(gas_price) = gas.gas_price {
            tx["gasPrice"] = Value::String(format!("0x{gas_price:x}"));
        }
        tx
    }

    /// Send a transaction and wait until it is mined.
    async fn send_and_confirm(&self, tx: Value) -> Result<TransactionReceipt, anyhow::Error> {
        let tx_hash: B256 = self
            .call("eth_sendTransaction", vec![tx])
            .await
            .context("Failed to send transaction")?;

        tracing::debug!(tx_hash = %tx_hash, "Transaction sent, waiting for receipt");

        let start = std::time::Instant::now();
        loop {
            if start.elapsed() > self.config.confirmation_timeout {
                anyhow::bail!(
                    "Timeout waiting for transaction {} to be mined after {:?}",
                    tx_hash,
                    self.config.confirmation_timeout
                );
            }

            match self
                .call::<Option<TransactionReceipt>>(
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(tx_hash)],
                )
                .await
            {
                Ok(Some(receipt)) if receipt.succeeded() => return Ok(receipt),
                Ok(Some(_)) => anyhow::bail!("Transaction {} reverted", tx_hash),
                Ok(None) => {}
                Err(e) => {
                    tracing::trace!(error = %e, tx_hash = %tx_hash, "Receipt poll failed, retrying...");
                }
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// Deserialize a u64 from a hex quantity (with 0x prefix).
fn parse_quantity(quantity: &str) -> anyhow::Result<u64> {
    u64::from_str_radix(quantity.trim_start_matches("0x"), 16)
        .context(format!("Invalid hex quantity {quantity}"))
}

impl ChainClient for RpcChain {
    fn chain_id(&self) -> BoxFuture<'_, anyhow::Result<u64>> {
        Box::pin(async move {
            let chain_id: String = self
                .call("eth_chainId", Vec::new())
                .await
                .context("Failed to fetch chain id")?;
            parse_quantity(&chain_id)
        })
    }

    fn deploy<'a>(
        &'a self,
        tx: &'a DeployTransaction,
    ) -> BoxFuture<'a, anyhow::Result<DeployReceipt>> {
        Box::pin(async move {
            let compiled = self.contracts.load(&tx.contract)?;
            let code = compiled.deploy_code(&tx.args)?;

            let receipt = self
                .send_and_confirm(self.transaction(None, &code, tx.gas))
                .await
                .context(format!("Failed to deploy {}", tx.contract))?;

            let address = receipt
                .contract_address
                .context(format!("Receipt for {} has no contract address", tx.contract))?;

            Ok(DeployReceipt {
                address,
                transaction_hash: receipt.transaction_hash,
                abi: compiled.abi_json()?,
            })
        })
    }

    fn send<'a>(&'a self, call: &'a Call, gas: GasSettings) -> BoxFuture<'a, anyhow::Result<B256>> {
        Box::pin(async move {
            let receipt = self
                .send_and_confirm(self.transaction(Some(call.to), &call.data, gas))
                .await
                .context(format!("Failed to execute {}", call.description))?;
            Ok(receipt.transaction_hash)
        })
    }
}
