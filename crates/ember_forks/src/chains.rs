//! Built-in chain configurations.

use once_cell::sync::OnceCell;

use crate::{Activation, ChainConfig, ConsensusType, ForkCondition, Hardfork};

/// Mainnet chain ID.
pub const MAINNET_CHAIN_ID: u64 = 0x1;

const MAINNET_HARDFORKS: &[Activation] = &[
    Activation {
        condition: ForkCondition::Block(0),
        hardfork: Hardfork::Frontier,
    },
    Activation {
        condition: ForkCondition::Block(200_000),
        hardfork: Hardfork::FrontierThawing,
    },
    Activation {
        condition: ForkCondition::Block(1_150_000),
        hardfork: Hardfork::Homestead,
    },
    Activation {
        condition: ForkCondition::Block(1_920_000),
        hardfork: Hardfork::DaoFork,
    },
    Activation {
        condition: ForkCondition::Block(2_463_000),
        hardfork: Hardfork::TangerineWhistle,
    },
    Activation {
        condition: ForkCondition::Block(2_675_000),
        hardfork: Hardfork::SpuriousDragon,
    },
    Activation {
        condition: ForkCondition::Block(4_370_000),
        hardfork: Hardfork::Byzantium,
    },
    Activation {
        condition: ForkCondition::Block(7_280_000),
        hardfork: Hardfork::Constantinople,
    },
    Activation {
        condition: ForkCondition::Block(7_280_000),
        hardfork: Hardfork::Petersburg,
    },
    Activation {
        condition: ForkCondition::Block(9_069_000),
        hardfork: Hardfork::Istanbul,
    },
    Activation {
        condition: ForkCondition::Block(9_200_000),
        hardfork: Hardfork::MuirGlacier,
    },
    Activation {
        condition: ForkCondition::Block(12_244_000),
        hardfork: Hardfork::Berlin,
    },
    Activation {
        condition: ForkCondition::Block(12_965_000),
        hardfork: Hardfork::London,
    },
    Activation {
        condition: ForkCondition::Block(13_773_000),
        hardfork: Hardfork::ArrowGlacier,
    },
    Activation {
        condition: ForkCondition::Block(15_050_000),
        hardfork: Hardfork::GrayGlacier,
    },
    Activation {
        condition: ForkCondition::Block(15_537_394),
        hardfork: Hardfork::Merge,
    },
    Activation {
        condition: ForkCondition::Block(17_034_870),
        hardfork: Hardfork::Shanghai,
    },
    Activation {
        condition: ForkCondition::Block(19_426_589),
        hardfork: Hardfork::Cancun,
    },
    Activation {
        condition: ForkCondition::Timestamp(1_746_612_311),
        hardfork: Hardfork::Prague,
    },
];

/// Returns the mainnet configuration.
pub fn mainnet_config() -> &'static ChainConfig {
    static CONFIG: OnceCell<ChainConfig> = OnceCell::new();

    CONFIG.get_or_init(|| ChainConfig {
        name: "Mainnet".to_owned(),
        chain_id: MAINNET_CHAIN_ID,
        hardfork_activations: MAINNET_HARDFORKS.into(),
        consensus: ConsensusType::ProofOfWork,
        dao_activation_block: Some(1_920_000),
        parameter_overrides: Default::default(),
    })
}

/// Sepolia chain ID.
pub const SEPOLIA_CHAIN_ID: u64 = 0xaa36a7;

const SEPOLIA_HARDFORKS: &[Activation] = &[
    Activation {
        condition: ForkCondition::Block(0),
        hardfork: Hardfork::London,
    },
    Activation {
        condition: ForkCondition::Block(1_450_409),
        hardfork: Hardfork::Merge,
    },
    Activation {
        condition: ForkCondition::Block(2_990_908),
        hardfork: Hardfork::Shanghai,
    },
    Activation {
        condition: ForkCondition::Block(5_187_023),
        hardfork: Hardfork::Cancun,
    },
    Activation {
        condition: ForkCondition::Timestamp(1_741_159_776),
        hardfork: Hardfork::Prague,
    },
];

/// Returns the Sepolia configuration.
pub fn sepolia_config() -> &'static ChainConfig {
    static CONFIG: OnceCell<ChainConfig> = OnceCell::new();

    CONFIG.get_or_init(|| ChainConfig {
        name: "Sepolia".to_owned(),
        chain_id: SEPOLIA_CHAIN_ID,
        hardfork_activations: SEPOLIA_HARDFORKS.into(),
        consensus: ConsensusType::ProofOfWork,
        dao_activation_block: None,
        parameter_overrides: Default::default(),
    })
}

/// Holesky chain ID.
pub const HOLESKY_CHAIN_ID: u64 = 0x4268;

const HOLESKY_HARDFORKS: &[Activation] = &[
    Activation {
        condition: ForkCondition::Block(0),
        hardfork: Hardfork::Merge,
    },
    Activation {
        condition: ForkCondition::Block(6_698),
        hardfork: Hardfork::Shanghai,
    },
    Activation {
        condition: ForkCondition::Block(894_733),
        hardfork: Hardfork::Cancun,
    },
    Activation {
        condition: ForkCondition::Timestamp(1_740_434_112),
        hardfork: Hardfork::Prague,
    },
];

/// Returns the Holesky configuration.
pub fn holesky_config() -> &'static ChainConfig {
    static CONFIG: OnceCell<ChainConfig> = OnceCell::new();

    CONFIG.get_or_init(|| ChainConfig {
        name: "Holesky".to_owned(),
        chain_id: HOLESKY_CHAIN_ID,
        hardfork_activations: HOLESKY_HARDFORKS.into(),
        consensus: ConsensusType::ProofOfStake,
        dao_activation_block: None,
        parameter_overrides: Default::default(),
    })
}

/// Returns the built-in configuration for the provided chain ID, if it is
/// supported.
pub fn chain_config(chain_id: u64) -> Option<&'static ChainConfig> {
    match chain_id {
        MAINNET_CHAIN_ID => Some(mainnet_config()),
        SEPOLIA_CHAIN_ID => Some(sepolia_config()),
        HOLESKY_CHAIN_ID => Some(holesky_config()),
        _ => None,
    }
}
