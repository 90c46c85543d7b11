//! Dynamic gas arithmetic.

use ember_forks::{ChainConfig, Hardfork};

use crate::{memory::Memory, result::ExceptionalHalt};

/// The dynamic-cost parameters a transaction's handlers draw on, resolved
/// once per transaction from the chain configuration.
#[derive(Clone, Debug)]
pub struct GasSchedule {
    /// Per-word memory cost.
    pub memory: u64,
    /// Divisor of the quadratic memory term.
    pub quad_coeff_divisor: u64,
    /// Per-word cost of the `*COPY` family.
    pub copy: u64,
    /// Per-word cost of `KECCAK256` input.
    pub keccak256_word: u64,
    /// Per-byte cost of the `EXP` exponent.
    pub exp_byte: u64,
    /// Cold storage-slot access cost.
    pub cold_sload: u64,
    /// Cold account access cost.
    pub cold_account_access: u64,
    /// Warm state-read cost.
    pub warm_storage_read: u64,
    /// Stipend forwarded with value-bearing calls.
    pub call_stipend: u64,
    /// Surcharge for value-bearing calls.
    pub call_value_transfer: u64,
    /// Surcharge for calls that create the target account.
    pub call_new_account: u64,
    /// Per-word cost of init code.
    pub initcode_word: u64,
    /// Init-code size cap.
    pub max_init_code_size: u64,
    /// Deployed-code size cap.
    pub max_code_size: u64,
    /// Per-byte cost of deployed code.
    pub code_deposit: u64,
    /// Per-topic cost of `LOG*`.
    pub log_topic: u64,
    /// Per-byte cost of `LOG*` payloads.
    pub log_data: u64,
    /// Refund for clearing a storage slot, pre-net-metering.
    pub sstore_refund: u64,
    /// `SSTORE` set cost.
    pub sstore_set: u64,
    /// `SSTORE` reset cost.
    pub sstore_reset: u64,
    /// Refund for each self-destruct.
    pub selfdestruct_refund: u64,
    /// Minimum gas kept by an `EXT*CALL` caller.
    pub min_retained_gas: u64,
    /// Minimum gas an `EXT*CALL` callee must receive.
    pub min_callee_gas: u64,
}

impl GasSchedule {
    /// Resolves the schedule for the provided hardfork.
    pub fn new(chain: &ChainConfig, hardfork: Hardfork) -> Self {
        let param = |name: &str, fallback: u64| {
            chain.param_at_hardfork(name, hardfork).unwrap_or(fallback)
        };

        Self {
            memory: param("memoryGas", 3),
            quad_coeff_divisor: param("quadCoeffDivisor", 512),
            copy: param("copyGas", 3),
            keccak256_word: param("keccak256WordGas", 6),
            exp_byte: param("expByteGas", 10),
            cold_sload: param("coldsloadGas", 0),
            cold_account_access: param("coldaccountaccessGas", 0),
            warm_storage_read: param("warmstoragereadGas", 0),
            call_stipend: param("callStipendGas", 2300),
            call_value_transfer: param("callValueTransferGas", 9000),
            call_new_account: param("callNewAccountGas", 25000),
            initcode_word: param("initcodeWordGas", 0),
            max_init_code_size: param("maxInitCodeSize", u64::MAX),
            max_code_size: param("maxCodeSize", u64::MAX),
            code_deposit: param("codeDepositGas", 200),
            log_topic: param("logTopicGas", 375),
            log_data: param("logDataGas", 8),
            sstore_refund: param("sstoreRefundGas", 15000),
            sstore_set: param("sstoreSetGas", 20000),
            sstore_reset: param("sstoreResetGas", 5000),
            selfdestruct_refund: param("selfdestructRefundGas", 24000),
            min_retained_gas: param("minRetainedGas", 5000),
            min_callee_gas: param("minCalleeGas", 2300),
        }
    }

    /// Total cost of holding `words` 32-byte words of memory:
    /// `3·words + words²/512` under mainnet parameters.
    pub fn memory_cost(&self, words: u64) -> u64 {
        self.memory * words + words * words / self.quad_coeff_divisor
    }

    /// Grows the frame memory to cover `offset + len` and returns the
    /// expansion cost delta.
    pub fn memory_expansion(
        &self,
        memory: &mut Memory,
        offset: u64,
        len: u64,
    ) -> Result<u64, ExceptionalHalt> {
        if len == 0 {
            return Ok(0);
        }

        // Guard the cost arithmetic against offsets outside any plausible
        // gas budget.
        let end = offset.checked_add(len).ok_or(ExceptionalHalt::OutOfGas)?;
        if end > (1u64 << 40) {
            return Err(ExceptionalHalt::OutOfGas);
        }

        let current_words = memory.word_count();
        let new_words = Memory::words_for(offset, len);
        if new_words <= current_words {
            return Ok(0);
        }

        let cost = self.memory_cost(new_words) - self.memory_cost(current_words);
        memory.grow(new_words);

        Ok(cost)
    }
}

/// The gas retained by a caller under the 63/64 forwarding rule.
pub fn all_but_one_64th(gas: u64) -> u64 {
    gas - gas / 64
}

#[cfg(test)]
mod tests {
    use ember_forks::chains::mainnet_config;

    use super::*;

    #[test]
    fn memory_cost_is_quadratic() {
        let schedule = GasSchedule::new(mainnet_config(), Hardfork::Berlin);

        assert_eq!(schedule.memory_cost(0), 0);
        assert_eq!(schedule.memory_cost(1), 3);
        // 3 * 32 + 32 * 32 / 512 = 98.
        assert_eq!(schedule.memory_cost(32), 98);
    }

    #[test]
    fn expansion_charges_the_delta() {
        let schedule = GasSchedule::new(mainnet_config(), Hardfork::Berlin);
        let mut memory = Memory::new();

        let first = schedule.memory_expansion(&mut memory, 0, 32).unwrap();
        assert_eq!(first, 3);

        // Re-touching paid-for memory is free.
        let second = schedule.memory_expansion(&mut memory, 0, 32).unwrap();
        assert_eq!(second, 0);

        let third = schedule.memory_expansion(&mut memory, 32, 32).unwrap();
        assert_eq!(third, 3);
    }

    #[test]
    fn unpayable_expansion_is_out_of_gas() {
        let schedule = GasSchedule::new(mainnet_config(), Hardfork::Berlin);
        let mut memory = Memory::new();

        assert_eq!(
            schedule.memory_expansion(&mut memory, u64::MAX - 10, 32),
            Err(ExceptionalHalt::OutOfGas)
        );
    }

    #[test]
    fn sixty_three_sixty_fourths() {
        assert_eq!(all_but_one_64th(64_000), 63_000);
        assert_eq!(all_but_one_64th(0), 0);
        assert_eq!(all_but_one_64th(63), 63);
    }
}
