#![warn(missing_docs)]

//! Ethereum block and header codec.
//!
//! Headers and blocks are parsed from RLP, raw field values, JSON-RPC
//! objects or engine-API payloads, validated against a hardfork-aware chain
//! configuration, and frozen into immutable values with memoized hashes.

/// EIP-2930 access list types
pub mod access_list;
/// Ethereum block types
pub mod block;
/// Clique proof-of-authority seals
pub mod clique;
/// Canonical ethash difficulty
pub mod difficulty;
/// Base fee and blob gas pricing
pub mod fees;
/// Ethereum block header types
pub mod header;
/// Engine-API execution payloads
pub mod payload;
/// JSON-RPC wire forms
pub mod rpc;
/// Ethereum signature types
pub mod signature;
/// Ethereum transaction types
pub mod transaction;
/// Ethereum withdrawal type
pub mod withdrawal;

pub use self::{
    block::{Block, BlockCreationError, BlockData, RawBlockParts},
    header::{
        validate_gas_limit, BlobGas, BlockConfig, FrozenHeader, Header, HeaderBuildOptions,
        HeaderData, HeaderValidationError,
    },
    withdrawal::Withdrawal,
};
