use ember_forks::ConsensusType;
use ember_primitives::{Bytes, B256, B64, U256};

use super::{BlockConfig, Header};
use crate::clique::{CLIQUE_EXTRA_SEAL, CLIQUE_EXTRA_VANITY};

/// Extra data mandated inside the DAO fork block window.
pub(crate) const DAO_EXTRA_DATA: &[u8] = b"dao-hard-fork";

/// A structurally invalid header.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HeaderValidationError {
    /// A fixed-size field had the wrong byte length.
    #[error("invalid length for header field {field}: expected {expected} bytes, got {actual}")]
    InvalidFieldLength {
        /// Name of the offending field.
        field: &'static str,
        /// Required byte length.
        expected: usize,
        /// Provided byte length.
        actual: usize,
    },
    /// An integer field exceeded its width.
    #[error("header field {field} overflows {width} bytes")]
    IntegerOverflow {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum byte width.
        width: usize,
    },
    /// A raw header had too few or too many values.
    #[error("invalid header: expected between 15 and 21 values, got {0}")]
    InvalidRawLength(usize),
    /// Malformed header RLP.
    #[error("invalid header RLP: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    /// Gas used exceeds the block's gas limit.
    #[error("invalid header: gasUsed {gas_used} exceeds gasLimit {gas_limit}")]
    GasUsedExceedsLimit {
        /// The header's `gasUsed`.
        gas_used: u64,
        /// The header's `gasLimit`.
        gas_limit: u64,
    },
    /// Extra data is longer than consensus permits.
    #[error("invalid header field extraData: {actual} bytes exceeds the maximum of {max}")]
    ExtraDataTooLong {
        /// Permitted maximum.
        max: usize,
        /// Provided length.
        actual: usize,
    },
    /// Extra data inside the DAO fork window must spell out support.
    #[error("invalid header field extraData: expected 'dao-hard-fork' inside the DAO fork window")]
    DaoExtraData,
    /// Clique extra data must hold the vanity prefix and the seal.
    #[error(
        "invalid header field extraData: clique requires at least {} bytes, got {actual}",
        CLIQUE_EXTRA_VANITY + CLIQUE_EXTRA_SEAL
    )]
    CliqueExtraDataTooShort {
        /// Provided length.
        actual: usize,
    },
    /// A field was provided although its gating EIP is not active.
    #[error("invalid header field {field}: can only be provided when EIP-{eip} is active")]
    UnexpectedField {
        /// Name of the offending field.
        field: &'static str,
        /// The gating EIP.
        eip: u64,
    },
    /// A field was missing although its gating EIP is active.
    #[error("invalid header field {field}: must be provided when EIP-{eip} is active")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// The gating EIP.
        eip: u64,
    },
    /// Post-merge headers must carry a zero difficulty.
    #[error("invalid header field difficulty: must be 0 under proof of stake")]
    NonZeroPosDifficulty,
    /// Post-merge headers must carry a zero nonce.
    #[error("invalid header field nonce: must be 0x0000000000000000 under proof of stake")]
    NonZeroPosNonce,
    /// The gas limit left the permitted band around the parent's.
    #[error(
        "invalid header field gasLimit: {gas_limit} out of bounds for parent gas limit {parent_gas_limit}"
    )]
    GasLimitOutOfBounds {
        /// The header's gas limit.
        gas_limit: u64,
        /// The (possibly elasticity-adjusted) parent gas limit.
        parent_gas_limit: u64,
    },
    /// The gas limit fell below the protocol minimum.
    #[error("invalid header field gasLimit: {gas_limit} is below the minimum of {minimum}")]
    GasLimitBelowMinimum {
        /// The header's gas limit.
        gas_limit: u64,
        /// Protocol minimum.
        minimum: u64,
    },
}

/// Validates the consensus format of a header under the provided
/// configuration.
pub(crate) fn validate_header(
    header: &Header,
    config: &BlockConfig<'_>,
) -> Result<(), HeaderValidationError> {
    if header.gas_used > header.gas_limit {
        return Err(HeaderValidationError::GasUsedExceedsLimit {
            gas_used: header.gas_used,
            gas_limit: header.gas_limit,
        });
    }

    validate_extra_data(header, config)?;
    validate_gated_fields(header, config)?;

    if config.consensus() == ConsensusType::ProofOfStake {
        if header.difficulty != U256::ZERO {
            return Err(HeaderValidationError::NonZeroPosDifficulty);
        }
        if header.nonce != B64::ZERO {
            return Err(HeaderValidationError::NonZeroPosNonce);
        }
    }

    log::trace!("header {} passed format validation", header.number);

    Ok(())
}

fn validate_extra_data(
    header: &Header,
    config: &BlockConfig<'_>,
) -> Result<(), HeaderValidationError> {
    let extra_data = &header.extra_data;

    if config.chain().is_dao_extra_data_block(header.number)
        && extra_data.as_ref() != DAO_EXTRA_DATA
    {
        return Err(HeaderValidationError::DaoExtraData);
    }

    match config.consensus() {
        ConsensusType::ProofOfWork => {
            let max = config.param("maxExtraDataSize").unwrap_or(32) as usize;
            if extra_data.len() > max {
                return Err(HeaderValidationError::ExtraDataTooLong {
                    max,
                    actual: extra_data.len(),
                });
            }
        }
        ConsensusType::ProofOfStake => {
            if extra_data.len() > 32 {
                return Err(HeaderValidationError::ExtraDataTooLong {
                    max: 32,
                    actual: extra_data.len(),
                });
            }
        }
        ConsensusType::ProofOfAuthority => {
            if extra_data.len() < CLIQUE_EXTRA_VANITY + CLIQUE_EXTRA_SEAL {
                return Err(HeaderValidationError::CliqueExtraDataTooShort {
                    actual: extra_data.len(),
                });
            }
        }
    }

    Ok(())
}

fn validate_gated_fields(
    header: &Header,
    config: &BlockConfig<'_>,
) -> Result<(), HeaderValidationError> {
    let gated: [(&'static str, u64, bool); 6] = [
        ("baseFeePerGas", 1559, header.base_fee_per_gas.is_some()),
        ("withdrawalsRoot", 4895, header.withdrawals_root.is_some()),
        ("blobGasUsed", 4844, header.blob_gas.is_some()),
        ("excessBlobGas", 4844, header.blob_gas.is_some()),
        (
            "parentBeaconBlockRoot",
            4788,
            header.parent_beacon_block_root.is_some(),
        ),
        ("requestsHash", 7685, header.requests_hash.is_some()),
    ];

    for (field, eip, present) in gated {
        let active = config.is_eip_active(eip);
        if present && !active {
            return Err(HeaderValidationError::UnexpectedField { field, eip });
        }
        if !present && active {
            return Err(HeaderValidationError::MissingField { field, eip });
        }
    }

    Ok(())
}

/// Validates the header's gas limit against its parent's.
///
/// The limit must stay within `parent / gasLimitBoundDivisor` of the parent
/// value and above the protocol minimum. At the EIP-1559 activation block the
/// parent limit is scaled by the elasticity multiplier before the comparison.
pub fn validate_gas_limit(
    header: &Header,
    parent_gas_limit: u64,
    config: &BlockConfig<'_>,
) -> Result<(), HeaderValidationError> {
    let mut parent_gas_limit = parent_gas_limit;
    if config.is_london_activation_block(header.number) {
        let elasticity = config.param("elasticityMultiplier").unwrap_or(2);
        parent_gas_limit *= elasticity;
    }

    let bound_divisor = config.param("gasLimitBoundDivisor").unwrap_or(1024);
    let max_delta = parent_gas_limit / bound_divisor;

    if header.gas_limit.abs_diff(parent_gas_limit) >= max_delta {
        return Err(HeaderValidationError::GasLimitOutOfBounds {
            gas_limit: header.gas_limit,
            parent_gas_limit,
        });
    }

    let minimum = config.param("minGasLimit").unwrap_or(5000);
    if header.gas_limit < minimum {
        return Err(HeaderValidationError::GasLimitBelowMinimum {
            gas_limit: header.gas_limit,
            minimum,
        });
    }

    Ok(())
}

pub(crate) fn b256_field(
    field: &'static str,
    bytes: &Bytes,
) -> Result<B256, HeaderValidationError> {
    if bytes.len() != 32 {
        return Err(HeaderValidationError::InvalidFieldLength {
            field,
            expected: 32,
            actual: bytes.len(),
        });
    }

    Ok(B256::from_slice(bytes))
}

pub(crate) fn uint_field(
    field: &'static str,
    width: usize,
    bytes: &Bytes,
) -> Result<u64, HeaderValidationError> {
    if bytes.len() > width {
        return Err(HeaderValidationError::IntegerOverflow { field, width });
    }

    let mut value = 0u64;
    for byte in bytes.iter() {
        value = (value << 8) | u64::from(*byte);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use ember_forks::{chains::mainnet_config, Hardfork};

    use super::*;
    use crate::header::HeaderData;

    #[test]
    fn rejects_gas_used_above_limit() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Berlin);
        let header = Header {
            gas_limit: 5000,
            gas_used: 5001,
            ..Header::default()
        };

        assert!(matches!(
            validate_header(&header, &config),
            Err(HeaderValidationError::GasUsedExceedsLimit { .. })
        ));
    }

    #[test]
    fn rejects_base_fee_before_london() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Berlin);
        let header = Header {
            gas_limit: 5000,
            base_fee_per_gas: Some(7),
            ..Header::default()
        };

        assert_eq!(
            validate_header(&header, &config),
            Err(HeaderValidationError::UnexpectedField {
                field: "baseFeePerGas",
                eip: 1559,
            })
        );
    }

    #[test]
    fn dao_window_requires_support_marker() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::DaoFork);
        let header = Header {
            number: 1_920_000,
            gas_limit: 5000,
            ..Header::default()
        };

        assert_eq!(
            validate_header(&header, &config),
            Err(HeaderValidationError::DaoExtraData)
        );

        let header = Header {
            number: 1_920_000,
            gas_limit: 5000,
            extra_data: Bytes::copy_from_slice(DAO_EXTRA_DATA),
            ..header
        };
        assert!(validate_header(&header, &config).is_ok());
    }

    #[test]
    fn gas_limit_band() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::Berlin);
        let parent_gas_limit = 1_024_000;

        // Divisor is 1024, so the permitted delta is anything below 1000.
        let header = HeaderData {
            gas_limit: Some(1_024_999),
            ..HeaderData::default()
        }
        .into_header(&config);
        assert!(validate_gas_limit(&header, parent_gas_limit, &config).is_ok());

        let header = Header {
            gas_limit: 1_025_000,
            ..header
        };
        assert!(matches!(
            validate_gas_limit(&header, parent_gas_limit, &config),
            Err(HeaderValidationError::GasLimitOutOfBounds { .. })
        ));

        let header = Header {
            gas_limit: 4000,
            ..header
        };
        assert!(matches!(
            validate_gas_limit(&header, parent_gas_limit, &config),
            Err(HeaderValidationError::GasLimitOutOfBounds { .. })
        ));
    }

    #[test]
    fn gas_limit_elasticity_at_london_activation() {
        let config = BlockConfig::new(mainnet_config(), Hardfork::London);
        let header = Header {
            number: 12_965_000,
            gas_limit: 29_999_000,
            ..Header::default()
        };

        // Parent carried 15M; doubling puts 30M within bounds.
        assert!(validate_gas_limit(&header, 15_000_000, &config).is_ok());
    }
}
