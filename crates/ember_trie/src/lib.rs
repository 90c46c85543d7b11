#![warn(missing_docs)]

//! Merkle-Patricia trie root helpers.
//!
//! The tries themselves live behind an external state manager; the block
//! codec only ever needs root hashes over in-memory key-value pairs.

use ember_primitives::{b256, B256};
use hash256_std_hasher::Hash256StdHasher;
use sha3::{
    digest::generic_array::{typenum::consts::U32, GenericArray},
    Digest, Keccak256,
};

/// Root hash of an empty trie, `keccak256(rlp(""))`.
pub const KECCAK_NULL_RLP: B256 =
    b256!("0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// `keccak256(rlp([]))`, the ommers hash of a block without uncles.
pub const KECCAK_RLP_EMPTY_ARRAY: B256 =
    b256!("0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// Generates a trie root hash for a vector of key-value tuples.
pub fn trie_root<I, K, V>(input: I) -> B256
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]> + Ord,
    V: AsRef<[u8]>,
{
    B256::from_slice(triehash::trie_root::<KeccakHasher, _, _, _>(input).as_ref())
}

/// Generates a key-hashed (secure) trie root hash for a vector of key-value
/// tuples.
pub fn sec_trie_root<I, K, V>(input: I) -> B256
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    B256::from_slice(triehash::sec_trie_root::<KeccakHasher, _, _, _>(input).as_ref())
}

/// Generates a trie root hash for a list of values, keyed by their
/// RLP-encoded index. This is the root used for the transactions and
/// withdrawals tries.
pub fn ordered_trie_root<I, V>(input: I) -> B256
where
    I: IntoIterator<Item = V>,
    V: AsRef<[u8]>,
{
    B256::from_slice(triehash::ordered_trie_root::<KeccakHasher, I>(input).as_ref())
}

/// Generates the ordered trie root over the RLP encodings of the provided
/// values.
pub fn ordered_rlp_trie_root<I, V>(input: I) -> B256
where
    I: IntoIterator<Item = V>,
    V: alloy_rlp::Encodable,
{
    ordered_trie_root(
        input
            .into_iter()
            .map(|value| alloy_rlp::encode(&value))
            .collect::<Vec<_>>(),
    )
}

struct KeccakHasher;

impl hash_db::Hasher for KeccakHasher {
    type Out = GenericArray<u8, U32>;

    type StdHasher = Hash256StdHasher;

    const LENGTH: usize = 32;

    fn hash(x: &[u8]) -> Self::Out {
        Keccak256::digest(x)
    }
}
