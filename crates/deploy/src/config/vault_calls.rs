//! Vault call allow-list entries.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, FixedBytes, keccak256},
};
use serde::{Deserialize, Serialize};

/// 4-byte function selector.
pub type Selector = FixedBytes<4>;

/// Derive the selector of a canonical function signature, e.g. `"mint(address)"`.
pub fn selector(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

/// ABI-encode a call to `signature` with `params`.
pub fn encode_call(signature: &str, params: Vec<DynSolValue>) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend(DynSolValue::Tuple(params).abi_encode_params());
    data.into()
}

/// An external call a fund's vault is allowed to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultCallEntry {
    pub contract: Address,
    /// The canonical signature the selector was derived from.
    pub signature: String,
    pub selector: Selector,
    /// Restricts the allowed payload; zero allows any payload.
    pub data_hash: B256,
}

impl VaultCallEntry {
    pub fn new(contract: Address, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        Self {
            contract,
            selector: selector(&signature),
            signature,
            data_hash: B256::ZERO,
        }
    }

    /// Only allow calls whose payload hashes to `data_hash`.
    pub fn with_data_hash(mut self, data_hash: B256) -> Self {
        self.data_hash = data_hash;
        self
    }

    /// Only allow calls with exactly this payload.
    pub fn with_data(self, data: &[u8]) -> Self {
        self.with_data_hash(keccak256(data))
    }
}

/// Parallel arrays in the shape `registerVaultCalls` takes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultCallArrays {
    pub contracts: Vec<Address>,
    pub selectors: Vec<Selector>,
    pub data_hashes: Vec<B256>,
}

impl VaultCallArrays {
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// The ABI parameters for `registerVaultCalls(address[],bytes4[],bytes32[])`.
    pub fn into_params(self) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Array(self.contracts.into_iter().map(DynSolValue::Address).collect()),
            DynSolValue::Array(
                self.selectors
                    .into_iter()
                    .map(|selector| DynSolValue::FixedBytes(B256::right_padding_from(selector.as_slice()), 4))
                    .collect(),
            ),
            DynSolValue::Array(
                self.data_hashes
                    .into_iter()
                    .map(|hash| DynSolValue::FixedBytes(hash, 32))
                    .collect(),
            ),
        ]
    }
}

/// Flatten entries into parallel arrays, keeping their order.
pub fn flatten(entries: &[VaultCallEntry]) -> VaultCallArrays {
    let mut arrays = VaultCallArrays::default();
    for entry in entries {
        arrays.contracts.push(entry.contract);
        arrays.selectors.push(entry.selector);
        arrays.data_hashes.push(entry.data_hash);
    }
    arrays
}
