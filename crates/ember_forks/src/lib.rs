#![warn(missing_docs)]

//! Hardfork schedules, EIP activation and protocol parameters.
//!
//! Everything opcode- or validation-related that changes across protocol
//! upgrades is answered here, as a pure function of a [`ChainConfig`]:
//! which hardfork is active for a block, whether an EIP applies, and what a
//! protocol parameter is worth under a given fork.

mod activation;
/// Built-in chain configurations.
pub mod chains;
mod config;
/// The EIP-to-hardfork schedule.
pub mod eips;
mod hardfork;
/// Protocol parameter tables.
pub mod params;

pub use self::{
    activation::{Activation, Activations, ForkCondition},
    config::{ChainConfig, ConsensusType},
    hardfork::{Hardfork, UnknownHardfork},
};
