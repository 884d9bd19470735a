//! Network identity and the predicates deploy steps use to decide whether they apply.
//!
//! Every skip decision in the release is a [`NetworkPredicate`] built from the
//! closed set of [`Network`]s below, so chain id literals live in one place.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A network the release knows how to configure.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Mainnet,
    Kovan,
    /// Local development node, usually a mainnet fork.
    #[strum(to_string = "hardhat", serialize = "localhost", serialize = "local")]
    Hardhat,
}

impl Network {
    /// The numeric chain id of this network.
    pub const fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Kovan => 42,
            Network::Hardhat => 31337,
        }
    }
}

/// Map a chain id to its network.
///
/// Unknown chain ids resolve to `None` instead of failing, so an unresolved
/// network is simply not a member of any named set.
pub fn resolve_network_identity(chain_id: u64) -> Option<Network> {
    match chain_id {
        1 => Some(Network::Mainnet),
        42 => Some(Network::Kovan),
        31337 => Some(Network::Hardhat),
        _ => None,
    }
}

/// Whether `chain_id` is `candidate`.
pub fn is_network(chain_id: u64, candidate: Network) -> bool {
    resolve_network_identity(chain_id) == Some(candidate)
}

/// Whether `chain_id` is any of `candidates`.
pub fn is_one_of_networks(chain_id: u64, candidates: &[Network]) -> bool {
    resolve_network_identity(chain_id).is_some_and(|network| candidates.contains(&network))
}

/// The live network a run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    pub chain_id: u64,
}

impl NetworkContext {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    /// The resolved network, if the chain id is known.
    pub fn network(&self) -> Option<Network> {
        resolve_network_identity(self.chain_id)
    }

    /// Directory-safe name used to key persisted artifacts.
    ///
    /// Known networks use their canonical name, others `chain-<id>`.
    pub fn store_key(&self) -> String {
        match self.network() {
            Some(network) => network.to_string(),
            None => format!("chain-{}", self.chain_id),
        }
    }
}

/// Parses a network name (`mainnet`, `kovan`, `hardhat`, ...) or a raw chain id.
impl FromStr for NetworkContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(network) = Network::from_str(s) {
            return Ok(Self::new(network.chain_id()));
        }
        s.parse::<u64>()
            .map(Self::new)
            .map_err(|_| format!("{s} is neither a known network nor a chain id"))
    }
}

/// Composable boolean predicate over the network a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkPredicate {
    Always,
    Never,
    Is(Network),
    OneOf(Vec<Network>),
    Not(Box<NetworkPredicate>),
    Any(Vec<NetworkPredicate>),
    All(Vec<NetworkPredicate>),
}

impl NetworkPredicate {
    /// Evaluate the predicate for `chain_id`.
    pub fn matches(&self, chain_id: u64) -> bool {
        match self {
            NetworkPredicate::Always => true,
            NetworkPredicate::Never => false,
            NetworkPredicate::Is(network) => is_network(chain_id, *network),
            NetworkPredicate::OneOf(networks) => is_one_of_networks(chain_id, networks),
            NetworkPredicate::Not(inner) => !inner.matches(chain_id),
            NetworkPredicate::Any(inner) => inner.iter().any(|p| p.matches(chain_id)),
            NetworkPredicate::All(inner) => inner.iter().all(|p| p.matches(chain_id)),
        }
    }

    /// Skip predicate for a step that only applies to `networks`.
    pub fn skip_unless(networks: &[Network]) -> Self {
        NetworkPredicate::OneOf(networks.to_vec()).negate()
    }

    /// Logical negation, unwrapping a double negation.
    pub fn negate(self) -> Self {
        match self {
            NetworkPredicate::Not(inner) => *inner,
            other => NetworkPredicate::Not(Box::new(other)),
        }
    }
}
