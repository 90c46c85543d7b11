//! Protocol parameters, grouped by the hardfork that introduced or re-priced
//! them.
//!
//! A lookup walks the hardfork sequence backwards from the queried fork and
//! returns the first definition it finds, so a fork only lists what it
//! changed. Gas prices use the `{opcode}Gas` key convention; `PUSH*`, `DUP*`,
//! `SWAP*` and `LOG*` share the suffix-stripped keys `pushGas`, `dupGas`,
//! `swapGas` and `logGas`.

use crate::Hardfork;

/// Parameters defined at launch.
const FRONTIER: &[(&str, u64)] = &[
    // Header validation.
    ("gasLimitBoundDivisor", 1024),
    ("minGasLimit", 5000),
    ("maxExtraDataSize", 32),
    ("difficultyBoundDivisor", 2048),
    ("durationLimit", 13),
    ("minimumDifficulty", 131072),
    ("difficultyBombDelay", 0),
    ("minerReward", 5_000_000_000_000_000_000),
    // Memory and copy costs.
    ("memoryGas", 3),
    ("quadCoeffDivisor", 512),
    ("copyGas", 3),
    ("codeDepositGas", 200),
    // Stop and arithmetic.
    ("stopGas", 0),
    ("addGas", 3),
    ("mulGas", 5),
    ("subGas", 3),
    ("divGas", 5),
    ("sdivGas", 5),
    ("modGas", 5),
    ("smodGas", 5),
    ("addmodGas", 8),
    ("mulmodGas", 8),
    ("expGas", 10),
    ("expByteGas", 10),
    ("signextendGas", 5),
    // Comparison and bitwise.
    ("ltGas", 3),
    ("gtGas", 3),
    ("sltGas", 3),
    ("sgtGas", 3),
    ("eqGas", 3),
    ("iszeroGas", 3),
    ("andGas", 3),
    ("orGas", 3),
    ("xorGas", 3),
    ("notGas", 3),
    ("byteGas", 3),
    // Hashing.
    ("keccak256Gas", 30),
    ("keccak256WordGas", 6),
    // Environment.
    ("addressGas", 2),
    ("balanceGas", 20),
    ("originGas", 2),
    ("callerGas", 2),
    ("callvalueGas", 2),
    ("calldataloadGas", 3),
    ("calldatasizeGas", 2),
    ("calldatacopyGas", 3),
    ("codesizeGas", 2),
    ("codecopyGas", 3),
    ("gaspriceGas", 2),
    ("extcodesizeGas", 20),
    ("extcodecopyGas", 20),
    // Block context.
    ("blockhashGas", 20),
    ("coinbaseGas", 2),
    ("timestampGas", 2),
    ("numberGas", 2),
    ("difficultyGas", 2),
    ("gaslimitGas", 2),
    // Stack, memory, storage and flow.
    ("popGas", 2),
    ("mloadGas", 3),
    ("mstoreGas", 3),
    ("mstore8Gas", 3),
    ("sloadGas", 50),
    ("sstoreGas", 0),
    ("sstoreSetGas", 20000),
    ("sstoreResetGas", 5000),
    ("sstoreRefundGas", 15000),
    ("jumpGas", 8),
    ("jumpiGas", 10),
    ("pcGas", 2),
    ("msizeGas", 2),
    ("gasGas", 2),
    ("jumpdestGas", 1),
    ("pushGas", 3),
    ("dupGas", 3),
    ("swapGas", 3),
    // Logging.
    ("logGas", 375),
    ("logTopicGas", 375),
    ("logDataGas", 8),
    // Calls and creation.
    ("createGas", 32000),
    ("callGas", 40),
    ("callcodeGas", 40),
    ("callStipendGas", 2300),
    ("callValueTransferGas", 9000),
    ("callNewAccountGas", 25000),
    ("returnGas", 0),
    ("invalidGas", 0),
    ("selfdestructGas", 0),
    ("selfdestructRefundGas", 24000),
    // Refund cap: `gasUsed / maxRefundQuotient`.
    ("maxRefundQuotient", 2),
    // Precompiles.
    ("ecrecoverGas", 3000),
    ("sha256Gas", 60),
    ("sha256WordGas", 12),
    ("ripemd160Gas", 600),
    ("ripemd160WordGas", 120),
    ("identityGas", 15),
    ("identityWordGas", 3),
];

const HOMESTEAD: &[(&str, u64)] = &[("delegatecallGas", 40)];

/// EIP-150 repricings of state-reading operations.
const TANGERINE_WHISTLE: &[(&str, u64)] = &[
    ("balanceGas", 400),
    ("extcodesizeGas", 700),
    ("extcodecopyGas", 700),
    ("sloadGas", 200),
    ("callGas", 700),
    ("callcodeGas", 700),
    ("delegatecallGas", 700),
    ("selfdestructGas", 5000),
];

const SPURIOUS_DRAGON: &[(&str, u64)] = &[
    // EIP-160.
    ("expByteGas", 50),
    // EIP-170.
    ("maxCodeSize", 24576),
];

const BYZANTIUM: &[(&str, u64)] = &[
    ("revertGas", 0),
    ("returndatasizeGas", 2),
    ("returndatacopyGas", 3),
    ("staticcallGas", 700),
    ("minerReward", 3_000_000_000_000_000_000),
    // EIP-649.
    ("difficultyBombDelay", 3_000_000),
];

const CONSTANTINOPLE: &[(&str, u64)] = &[
    ("shlGas", 3),
    ("shrGas", 3),
    ("sarGas", 3),
    ("extcodehashGas", 400),
    ("create2Gas", 32000),
    ("minerReward", 2_000_000_000_000_000_000),
    // EIP-1234.
    ("difficultyBombDelay", 5_000_000),
    // EIP-1283 net gas metering.
    ("netSstoreNoopGas", 200),
    ("netSstoreInitGas", 20000),
    ("netSstoreCleanGas", 5000),
    ("netSstoreDirtyGas", 200),
    ("netSstoreClearRefundGas", 15000),
    ("netSstoreResetRefundGas", 4800),
    ("netSstoreResetClearRefundGas", 19800),
];

const ISTANBUL: &[(&str, u64)] = &[
    // EIP-1884.
    ("balanceGas", 700),
    ("extcodehashGas", 700),
    ("sloadGas", 800),
    // EIP-1344.
    ("chainidGas", 2),
    ("selfbalanceGas", 5),
    // EIP-2200 net gas metering, second iteration.
    ("sstoreSentryEIP2200Gas", 2300),
    ("sstoreNoopEIP2200Gas", 800),
    ("sstoreDirtyEIP2200Gas", 800),
    ("sstoreInitEIP2200Gas", 20000),
    ("sstoreInitRefundEIP2200Gas", 19200),
    ("sstoreCleanEIP2200Gas", 5000),
    ("sstoreCleanRefundEIP2200Gas", 4200),
    ("sstoreClearRefundEIP2200Gas", 15000),
];

const MUIR_GLACIER: &[(&str, u64)] = &[
    // EIP-2384.
    ("difficultyBombDelay", 9_000_000),
];

/// EIP-2929: constant costs move to the warm/cold dynamic handlers.
const BERLIN: &[(&str, u64)] = &[
    ("coldsloadGas", 2100),
    ("coldaccountaccessGas", 2600),
    ("warmstoragereadGas", 100),
    ("balanceGas", 0),
    ("extcodesizeGas", 0),
    ("extcodecopyGas", 0),
    ("extcodehashGas", 0),
    ("sloadGas", 0),
    ("callGas", 0),
    ("callcodeGas", 0),
    ("delegatecallGas", 0),
    ("staticcallGas", 0),
    // Warm-scaled EIP-2200 taxonomy.
    ("sstoreNoopEIP2200Gas", 100),
    ("sstoreDirtyEIP2200Gas", 100),
    ("sstoreCleanEIP2200Gas", 2900),
    ("sstoreInitRefundEIP2200Gas", 19900),
    ("sstoreCleanRefundEIP2200Gas", 2800),
];

const LONDON: &[(&str, u64)] = &[
    // EIP-3198.
    ("basefeeGas", 2),
    // EIP-1559.
    ("elasticityMultiplier", 2),
    ("baseFeeMaxChangeDenominator", 8),
    ("initialBaseFee", 1_000_000_000),
    // EIP-3529.
    ("maxRefundQuotient", 5),
    ("selfdestructRefundGas", 0),
    ("sstoreClearRefundEIP2200Gas", 4800),
    // EIP-3554.
    ("difficultyBombDelay", 9_700_000),
];

const ARROW_GLACIER: &[(&str, u64)] = &[
    // EIP-4345.
    ("difficultyBombDelay", 10_700_000),
];

const GRAY_GLACIER: &[(&str, u64)] = &[
    // EIP-5133.
    ("difficultyBombDelay", 11_400_000),
];

const SHANGHAI: &[(&str, u64)] = &[
    // EIP-3855.
    ("push0Gas", 2),
    // EIP-3860.
    ("maxInitCodeSize", 49152),
    ("initcodeWordGas", 2),
];

const CANCUN: &[(&str, u64)] = &[
    // EIP-1153.
    ("tloadGas", 100),
    ("tstoreGas", 100),
    // EIP-5656.
    ("mcopyGas", 3),
    // EIP-4844.
    ("blobhashGas", 3),
    ("blobbasefeeGas", 2),
    ("blobGasPerBlob", 131_072),
    ("targetBlobGasPerBlock", 393_216),
    ("maxBlobGasPerBlock", 786_432),
    ("minBlobGasPrice", 1),
    ("blobGasPriceUpdateFraction", 3_338_477),
];

const PRAGUE: &[(&str, u64)] = &[
    // EIP-7691 blob throughput increase.
    ("targetBlobGasPerBlock", 786_432),
    ("maxBlobGasPerBlock", 1_179_648),
    ("blobGasPriceUpdateFraction", 5_007_716),
];

const OSAKA: &[(&str, u64)] = &[
    // EIP-7939.
    ("clzGas", 5),
    // EIP-7934.
    ("maxRlpBlockSize", 8_388_608),
    // Object-format instructions.
    ("rjumpGas", 2),
    ("rjumpiGas", 4),
    ("rjumpvGas", 4),
    ("callfGas", 5),
    ("retfGas", 3),
    ("jumpfGas", 5),
    ("dupnGas", 3),
    ("swapnGas", 3),
    ("exchangeGas", 3),
    ("dataloadGas", 4),
    ("dataloadnGas", 3),
    ("datasizeGas", 2),
    ("datacopyGas", 3),
    ("returndataloadGas", 3),
    ("extcallGas", 0),
    ("extdelegatecallGas", 0),
    ("extstaticcallGas", 0),
    ("eofcreateGas", 32000),
    ("returncontractGas", 0),
    ("minRetainedGas", 5000),
    ("minCalleeGas", 2300),
];

fn params_introduced_at(hardfork: Hardfork) -> &'static [(&'static str, u64)] {
    match hardfork {
        Hardfork::Frontier => FRONTIER,
        Hardfork::Homestead => HOMESTEAD,
        Hardfork::TangerineWhistle => TANGERINE_WHISTLE,
        Hardfork::SpuriousDragon => SPURIOUS_DRAGON,
        Hardfork::Byzantium => BYZANTIUM,
        Hardfork::Constantinople => CONSTANTINOPLE,
        Hardfork::Istanbul => ISTANBUL,
        Hardfork::MuirGlacier => MUIR_GLACIER,
        Hardfork::Berlin => BERLIN,
        Hardfork::London => LONDON,
        Hardfork::ArrowGlacier => ARROW_GLACIER,
        Hardfork::GrayGlacier => GRAY_GLACIER,
        Hardfork::Shanghai => SHANGHAI,
        Hardfork::Cancun => CANCUN,
        Hardfork::Prague => PRAGUE,
        Hardfork::Osaka => OSAKA,
        Hardfork::FrontierThawing
        | Hardfork::DaoFork
        | Hardfork::Petersburg
        | Hardfork::Merge => &[],
    }
}

/// Returns the value of the named parameter under the provided hardfork:
/// the most recent definition at or before it, or `None` if the parameter is
/// undefined there.
pub fn param_at_hardfork(name: &str, hardfork: Hardfork) -> Option<u64> {
    Hardfork::ALL
        .iter()
        .rev()
        .skip_while(|candidate| **candidate > hardfork)
        .find_map(|candidate| {
            params_introduced_at(*candidate)
                .iter()
                .find(|(param, _)| *param == name)
                .map(|(_, value)| *value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherits_from_earlier_forks() {
        assert_eq!(param_at_hardfork("addGas", Hardfork::Osaka), Some(3));
        assert_eq!(param_at_hardfork("expByteGas", Hardfork::Frontier), Some(10));
        assert_eq!(
            param_at_hardfork("expByteGas", Hardfork::SpuriousDragon),
            Some(50)
        );
        assert_eq!(param_at_hardfork("expByteGas", Hardfork::Cancun), Some(50));
    }

    #[test]
    fn repricings_take_effect_at_their_fork() {
        assert_eq!(param_at_hardfork("sloadGas", Hardfork::Frontier), Some(50));
        assert_eq!(
            param_at_hardfork("sloadGas", Hardfork::TangerineWhistle),
            Some(200)
        );
        assert_eq!(param_at_hardfork("sloadGas", Hardfork::Istanbul), Some(800));
        assert_eq!(param_at_hardfork("sloadGas", Hardfork::Berlin), Some(0));
    }

    #[test]
    fn undefined_parameters_return_none() {
        assert_eq!(param_at_hardfork("push0Gas", Hardfork::London), None);
        assert_eq!(param_at_hardfork("blobGasPerBlob", Hardfork::Shanghai), None);
        assert_eq!(param_at_hardfork("noSuchParam", Hardfork::Osaka), None);
    }

    #[test]
    fn refund_schedule_changes_at_london() {
        assert_eq!(
            param_at_hardfork("sstoreClearRefundEIP2200Gas", Hardfork::Berlin),
            Some(15000)
        );
        assert_eq!(
            param_at_hardfork("sstoreClearRefundEIP2200Gas", Hardfork::London),
            Some(4800)
        );
        assert_eq!(param_at_hardfork("maxRefundQuotient", Hardfork::Berlin), Some(2));
        assert_eq!(param_at_hardfork("maxRefundQuotient", Hardfork::London), Some(5));
    }

    #[test]
    fn blob_schedule_changes_at_prague() {
        assert_eq!(
            param_at_hardfork("targetBlobGasPerBlock", Hardfork::Cancun),
            Some(393_216)
        );
        assert_eq!(
            param_at_hardfork("targetBlobGasPerBlock", Hardfork::Prague),
            Some(786_432)
        );
        assert_eq!(
            param_at_hardfork("blobGasPerBlob", Hardfork::Prague),
            Some(131_072)
        );
    }
}
