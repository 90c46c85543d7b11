use std::collections::HashMap;

use crate::{eips, params, Activations, Hardfork};

/// Sealing algorithm of a chain before the proof-of-stake transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsensusType {
    /// Ethash proof of work.
    #[default]
    ProofOfWork,
    /// Clique proof of authority.
    ProofOfAuthority,
    /// Beacon-chain proof of stake from genesis.
    ProofOfStake,
}

/// Configuration of a chain: its hardfork schedule, consensus algorithm and
/// parameter overrides.
///
/// All hardfork, EIP and parameter queries are pure functions of this value.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Chain name.
    pub name: String,
    /// Chain ID.
    pub chain_id: u64,
    /// Hardfork activations for the chain.
    pub hardfork_activations: Activations,
    /// Sealing algorithm before the proof-of-stake transition.
    #[serde(default)]
    pub consensus: ConsensusType,
    /// Block number of the DAO recovery fork, when the chain supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dao_activation_block: Option<u64>,
    /// Chain-specific parameter overrides, keyed like the built-in
    /// parameter tables.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameter_overrides: HashMap<String, u64>,
}

impl ChainConfig {
    /// Creates a configuration with a single hardfork active from genesis
    /// and no overrides.
    pub fn with_hardfork(name: impl Into<String>, chain_id: u64, hardfork: Hardfork) -> Self {
        Self {
            name: name.into(),
            chain_id,
            hardfork_activations: Activations::with_hardfork(hardfork),
            consensus: if hardfork.is_post_merge() {
                ConsensusType::ProofOfStake
            } else {
                ConsensusType::ProofOfWork
            },
            dao_activation_block: None,
            parameter_overrides: HashMap::new(),
        }
    }

    /// Returns the hardfork active for a block with the provided number and
    /// timestamp. Falls back to the launch rules when the schedule has no
    /// matching entry.
    pub fn hardfork_at_block(&self, block_number: u64, timestamp: u64) -> Hardfork {
        let hardfork = self
            .hardfork_activations
            .hardfork_at_block(block_number, timestamp)
            .unwrap_or(Hardfork::Frontier);
        log::trace!(
            "chain {}: block {block_number} (timestamp {timestamp}) resolves to {hardfork}",
            self.name
        );

        hardfork
    }

    /// Whether the provided EIP applies under the given hardfork.
    pub fn is_eip_active_at_hardfork(&self, eip: u64, hardfork: Hardfork) -> bool {
        eips::is_eip_active_at_hardfork(eip, hardfork)
    }

    /// Whether the provided EIP applies to a block with the given number and
    /// timestamp.
    pub fn is_eip_active_at_block(&self, eip: u64, block_number: u64, timestamp: u64) -> bool {
        self.is_eip_active_at_hardfork(eip, self.hardfork_at_block(block_number, timestamp))
    }

    /// Returns the value of the named parameter under the provided hardfork,
    /// preferring chain-specific overrides.
    pub fn param_at_hardfork(&self, name: &str, hardfork: Hardfork) -> Option<u64> {
        if let Some(value) = self.parameter_overrides.get(name) {
            return Some(*value);
        }

        params::param_at_hardfork(name, hardfork)
    }

    /// The sealing algorithm in effect under the provided hardfork.
    pub fn consensus_at_hardfork(&self, hardfork: Hardfork) -> ConsensusType {
        if hardfork.is_post_merge() {
            ConsensusType::ProofOfStake
        } else {
            self.consensus
        }
    }

    /// Whether the provided block number falls into the extra-data window
    /// of the DAO recovery fork.
    pub fn is_dao_extra_data_block(&self, block_number: u64) -> bool {
        const DAO_FORCE_EXTRA_DATA_RANGE: u64 = 9;

        self.dao_activation_block.is_some_and(|activation| {
            block_number >= activation
                && block_number <= activation + DAO_FORCE_EXTRA_DATA_RANGE
        })
    }
}
