//! EIP-1559 base fee and EIP-4844 blob gas pricing.

use ember_forks::Hardfork;

use crate::header::{BlobGas, BlockConfig, Header};

/// Calculates the next base fee for a post-London block, given the parent's
/// header.
///
/// Parents predating the fee market yield the initial base fee.
pub fn calc_next_base_fee(parent: &Header, config: &BlockConfig<'_>) -> u128 {
    let initial_base_fee = config
        .param("initialBaseFee")
        .map_or(1_000_000_000u128, u128::from);

    let Some(base_fee) = parent.base_fee_per_gas else {
        return initial_base_fee;
    };

    let elasticity = config.param("elasticityMultiplier").unwrap_or(2) as u128;
    let denominator = config.param("baseFeeMaxChangeDenominator").unwrap_or(8) as u128;

    let gas_used = u128::from(parent.gas_used);
    let gas_limit = u128::from(parent.gas_limit);

    // Calculate the target gas by dividing the gas limit by the elasticity
    // multiplier.
    let gas_target = gas_limit / elasticity;
    if gas_target == 0 {
        return base_fee;
    }

    match gas_used.cmp(&gas_target) {
        // If the gas used in the parent block matches the gas target, the
        // base fee remains the same.
        core::cmp::Ordering::Equal => base_fee,
        // Above the target the base fee rises, by one at the very least.
        core::cmp::Ordering::Greater => {
            base_fee
                + core::cmp::max(
                    1,
                    base_fee * (gas_used - gas_target) / (gas_target * denominator),
                )
        }
        // Below the target the base fee falls, floored at zero.
        core::cmp::Ordering::Less => base_fee
            .saturating_sub(base_fee * (gas_target - gas_used) / (gas_target * denominator)),
    }
}

/// Calculates the excess blob gas a child block inherits from the provided
/// parent counters, per the EIP-4844 accumulator rule.
pub fn calc_excess_blob_gas(
    parent_excess_gas: u64,
    parent_gas_used: u64,
    target_blob_gas_per_block: u64,
) -> u64 {
    (parent_excess_gas + parent_gas_used).saturating_sub(target_blob_gas_per_block)
}

/// Calculates the excess blob gas of the child block of the provided parent
/// header, under the child's hardfork.
///
/// Pre-fork parents count as zero on both counters.
pub fn calc_next_excess_blob_gas(
    parent: &Header,
    child_hardfork: Hardfork,
    config: &BlockConfig<'_>,
) -> u64 {
    let target = config
        .chain()
        .param_at_hardfork("targetBlobGasPerBlock", child_hardfork)
        .unwrap_or(393_216);

    parent.blob_gas.as_ref().map_or(0, |BlobGas {
         gas_used,
         excess_gas,
     }| calc_excess_blob_gas(*excess_gas, *gas_used, target))
}

/// Approximates `factor * e^(numerator / denominator)` with the Taylor
/// expansion used by the consensus blob-fee rule: terms accumulate until the
/// running numerator reaches zero, then the sum is divided once.
pub fn fake_exponential(factor: u128, numerator: u128, denominator: u128) -> u128 {
    let mut i = 1u128;
    let mut output = 0u128;
    let mut numerator_accum = factor * denominator;

    while numerator_accum > 0 {
        output += numerator_accum;
        numerator_accum = numerator_accum * numerator / (denominator * i);
        i += 1;
    }

    output / denominator
}

/// The blob gas price implied by the provided excess blob gas.
pub fn blob_gas_price(excess_blob_gas: u64, hardfork: Hardfork, config: &BlockConfig<'_>) -> u128 {
    let min_price = config
        .chain()
        .param_at_hardfork("minBlobGasPrice", hardfork)
        .unwrap_or(1);
    let update_fraction = config
        .chain()
        .param_at_hardfork("blobGasPriceUpdateFraction", hardfork)
        .unwrap_or(3_338_477);

    fake_exponential(
        u128::from(min_price),
        u128::from(excess_blob_gas),
        u128::from(update_fraction),
    )
}

#[cfg(test)]
mod tests {
    use ember_forks::chains::mainnet_config;

    use super::*;

    fn london_parent(gas_limit: u64, gas_used: u64, base_fee: u128) -> Header {
        Header {
            gas_limit,
            gas_used,
            base_fee_per_gas: Some(base_fee),
            ..Header::default()
        }
    }

    #[test]
    fn base_fee_constant_at_target() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::London);
        let parent = london_parent(30_000_000, 15_000_000, 1_000_000_000);

        assert_eq!(calc_next_base_fee(&parent, &config), 1_000_000_000);
    }

    #[test]
    fn base_fee_rises_when_above_target() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::London);
        // Full block: delta = target, so the change is baseFee / 8.
        let parent = london_parent(30_000_000, 30_000_000, 1_000_000_000);

        assert_eq!(calc_next_base_fee(&parent, &config), 1_125_000_000);
    }

    #[test]
    fn base_fee_falls_when_below_target() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::London);
        // Empty block: the change is baseFee / 8 downwards.
        let parent = london_parent(30_000_000, 0, 1_000_000_000);

        assert_eq!(calc_next_base_fee(&parent, &config), 875_000_000);
    }

    #[test]
    fn base_fee_increase_is_at_least_one() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::London);
        let parent = london_parent(30_000_000, 15_000_008, 7);

        assert_eq!(calc_next_base_fee(&parent, &config), 8);
    }

    #[test]
    fn pre_fork_parent_yields_initial_base_fee() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::London);
        let parent = Header::default();

        assert_eq!(calc_next_base_fee(&parent, &config), 1_000_000_000);
    }

    #[test]
    fn excess_blob_gas_accumulates() {
        assert_eq!(calc_excess_blob_gas(0, 393_216, 393_216), 0);
        assert_eq!(calc_excess_blob_gas(131_072, 393_216, 393_216), 131_072);
        assert_eq!(calc_excess_blob_gas(0, 131_072, 393_216), 0);
    }

    #[test]
    fn next_excess_blob_gas_uses_child_target() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Cancun);
        let parent = Header {
            blob_gas: Some(BlobGas {
                gas_used: 786_432,
                excess_gas: 0,
            }),
            ..Header::default()
        };

        assert_eq!(
            calc_next_excess_blob_gas(&parent, Hardfork::Cancun, &config),
            393_216
        );
        // The Prague target doubles, absorbing the same usage entirely.
        assert_eq!(
            calc_next_excess_blob_gas(&parent, Hardfork::Prague, &config),
            0
        );
    }

    #[test]
    fn blob_gas_price_at_zero_excess_is_minimum() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Cancun);

        assert_eq!(blob_gas_price(0, Hardfork::Cancun, &config), 1);
    }

    #[test]
    // Test vector from the EIP-4844 reference implementation.
    fn fake_exponential_known_values() {
        assert_eq!(fake_exponential(1, 0, 1), 1);
        assert_eq!(fake_exponential(1, 1, 1), 2);
        assert_eq!(fake_exponential(38493, 0, 1000), 38493);
        assert_eq!(fake_exponential(1, 5, 2), 11);
        assert_eq!(fake_exponential(2, 5, 2), 23);
        assert_eq!(fake_exponential(1, 50000000, 2225652), 5709098764);
    }
}
