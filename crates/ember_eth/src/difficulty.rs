use ember_forks::Hardfork;
use ember_primitives::U256;
use ember_trie::KECCAK_RLP_EMPTY_ARRAY;

use crate::header::{BlockConfig, Header};

/// Calculates the canonical ethash difficulty of a block from its parent.
///
/// Three regimes apply, selected by the configured hardfork: the launch
/// clock rule, the Homestead smooth adjustment, and the Byzantium rule that
/// also weighs the presence of uncles. The ice-age bomb applies on top, with
/// its block number pushed back by the configured delay.
pub fn canonical_difficulty(
    block_number: u64,
    block_timestamp: u64,
    parent: &Header,
    config: &BlockConfig<'_>,
) -> U256 {
    let hardfork = config.hardfork();
    let bound_divisor = U256::from(config.param("difficultyBoundDivisor").unwrap_or(2048));
    let minimum = U256::from(config.param("minimumDifficulty").unwrap_or(131_072));
    let offset = parent.difficulty / bound_divisor;
    let elapsed = block_timestamp.saturating_sub(parent.timestamp);

    let mut difficulty = if hardfork >= Hardfork::Byzantium {
        let uncle_addend = if parent.ommers_hash == KECCAK_RLP_EMPTY_ARRAY {
            1
        } else {
            2
        };
        let a = elapsed / 9;

        if let Some(a) = a.checked_sub(uncle_addend) {
            let a = U256::from(a.min(99));
            parent
                .difficulty
                .checked_sub(a * offset)
                .unwrap_or(minimum)
        } else {
            parent.difficulty + U256::from(uncle_addend - a) * offset
        }
    } else if hardfork >= Hardfork::Homestead {
        let a = elapsed / 10;

        if let Some(a) = a.checked_sub(1) {
            let a = U256::from(a.min(99));
            parent
                .difficulty
                .checked_sub(a * offset)
                .unwrap_or(minimum)
        } else {
            parent.difficulty + offset
        }
    } else {
        let duration_limit = config.param("durationLimit").unwrap_or(13);

        if parent.timestamp + duration_limit > block_timestamp {
            parent.difficulty + offset
        } else {
            parent.difficulty.checked_sub(offset).unwrap_or(minimum)
        }
    };

    let bomb_delay = config.param("difficultyBombDelay").unwrap_or(0);
    if let Some(exp) = block_number
        .checked_sub(bomb_delay)
        .and_then(|num| (num / 100_000).checked_sub(2))
    {
        difficulty += U256::from(2u64).pow(U256::from(exp));
    }

    difficulty.max(minimum)
}

#[cfg(test)]
mod tests {
    use ember_forks::chains::mainnet_config;
    use ember_primitives::B256;

    use super::*;

    fn parent(difficulty: u64, timestamp: u64, has_uncles: bool) -> Header {
        Header {
            difficulty: U256::from(difficulty),
            timestamp,
            ommers_hash: if has_uncles {
                B256::repeat_byte(0xaa)
            } else {
                KECCAK_RLP_EMPTY_ARRAY
            },
            ..Header::default()
        }
    }

    #[test]
    fn frontier_clock_rule() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Frontier);
        let parent = parent(0x20000000, 1000, false);
        let offset = 0x20000000u64 / 2048;

        // Fast block: difficulty rises.
        assert_eq!(
            canonical_difficulty(100, 1005, &parent, &config),
            U256::from(0x20000000u64 + offset)
        );
        // Slow block: difficulty falls.
        assert_eq!(
            canonical_difficulty(100, 1013, &parent, &config),
            U256::from(0x20000000u64 - offset)
        );
    }

    #[test]
    fn homestead_smooth_adjustment() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Homestead);
        let parent = parent(0x20000000, 1000, false);
        let offset = 0x20000000u64 / 2048;

        // Within ten seconds: one offset up. Block number is low enough to
        // keep the ice-age bomb term at zero.
        assert_eq!(
            canonical_difficulty(150_000, 1009, &parent, &config),
            U256::from(0x20000000u64 + offset)
        );
        // 35 seconds: a = 1 - 3 = -2.
        assert_eq!(
            canonical_difficulty(150_000, 1035, &parent, &config),
            U256::from(0x20000000u64 - 2 * offset)
        );
    }

    #[test]
    fn byzantium_uncle_addend() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Byzantium);
        let no_uncles = parent(0x20000000, 1000, false);
        let with_uncles = parent(0x20000000, 1000, true);
        let offset = 0x20000000u64 / 2048;

        // 9..18 seconds, no uncles: a = 1 - 1 = 0. The block number stays
        // below the delayed bomb threshold.
        assert_eq!(
            canonical_difficulty(3_100_000, 1010, &no_uncles, &config),
            U256::from(0x20000000u64)
        );
        // Same timing with uncles: a = 2 - 1 = 1.
        assert_eq!(
            canonical_difficulty(3_100_000, 1010, &with_uncles, &config),
            U256::from(0x20000000u64 + offset)
        );
    }

    #[test]
    fn byzantium_bomb_is_delayed() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Byzantium);
        let parent = parent(0x20000000, 1000, false);

        // 3,000,000 delay puts the bomb exponent at (4,400,000 - 3,000,000)
        // / 100,000 - 2 = 12.
        let base = canonical_difficulty(4_400_000, 1010, &parent, &config);
        assert_eq!(base, U256::from(0x20000000u64) + U256::from(4096u64));
    }

    #[test]
    fn floors_at_minimum_difficulty() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Homestead);
        let parent = parent(131_072, 1000, false);

        // A very slow block cannot push difficulty below the minimum.
        assert_eq!(
            canonical_difficulty(150_000, 2000, &parent, &config),
            U256::from(131_072u64)
        );
    }
}
