use core::{fmt, str::FromStr};

/// Named protocol upgrades, in activation order.
///
/// The derived `Ord` follows declaration order, so `a >= b` answers whether
/// hardfork `a` includes everything `b` introduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hardfork {
    /// Launch version of the protocol.
    Frontier,
    /// Difficulty adjustment applied ahead of Homestead.
    FrontierThawing,
    /// First planned upgrade; adds `DELEGATECALL`.
    Homestead,
    /// The DAO recovery fork.
    DaoFork,
    /// Gas repricings of EIP-150.
    TangerineWhistle,
    /// State clearing and replay protection.
    SpuriousDragon,
    /// `REVERT`, return data and `STATICCALL`.
    Byzantium,
    /// Net-metered `SSTORE`, `CREATE2` and bitwise shifts.
    Constantinople,
    /// Constantinople with EIP-1283 withdrawn.
    Petersburg,
    /// EIP-1884 repricings and EIP-2200 `SSTORE`.
    Istanbul,
    /// Difficulty bomb delay only.
    MuirGlacier,
    /// Warm/cold access accounting and typed transactions.
    Berlin,
    /// Fee market of EIP-1559.
    London,
    /// Difficulty bomb delay only.
    ArrowGlacier,
    /// Difficulty bomb delay only.
    GrayGlacier,
    /// The switch to proof of stake, also known as Paris.
    Merge,
    /// Withdrawals and `PUSH0`.
    Shanghai,
    /// Blob transactions and transient storage.
    Cancun,
    /// Execution-layer requests and set-code transactions.
    Prague,
    /// Object-format bytecode and `CLZ`.
    Osaka,
}

impl Hardfork {
    /// Every supported hardfork, in activation order.
    pub const ALL: [Hardfork; 20] = [
        Hardfork::Frontier,
        Hardfork::FrontierThawing,
        Hardfork::Homestead,
        Hardfork::DaoFork,
        Hardfork::TangerineWhistle,
        Hardfork::SpuriousDragon,
        Hardfork::Byzantium,
        Hardfork::Constantinople,
        Hardfork::Petersburg,
        Hardfork::Istanbul,
        Hardfork::MuirGlacier,
        Hardfork::Berlin,
        Hardfork::London,
        Hardfork::ArrowGlacier,
        Hardfork::GrayGlacier,
        Hardfork::Merge,
        Hardfork::Shanghai,
        Hardfork::Cancun,
        Hardfork::Prague,
        Hardfork::Osaka,
    ];

    /// The hardfork's canonical lower-camel-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Hardfork::Frontier => "chainstart",
            Hardfork::FrontierThawing => "frontierThawing",
            Hardfork::Homestead => "homestead",
            Hardfork::DaoFork => "dao",
            Hardfork::TangerineWhistle => "tangerineWhistle",
            Hardfork::SpuriousDragon => "spuriousDragon",
            Hardfork::Byzantium => "byzantium",
            Hardfork::Constantinople => "constantinople",
            Hardfork::Petersburg => "petersburg",
            Hardfork::Istanbul => "istanbul",
            Hardfork::MuirGlacier => "muirGlacier",
            Hardfork::Berlin => "berlin",
            Hardfork::London => "london",
            Hardfork::ArrowGlacier => "arrowGlacier",
            Hardfork::GrayGlacier => "grayGlacier",
            Hardfork::Merge => "paris",
            Hardfork::Shanghai => "shanghai",
            Hardfork::Cancun => "cancun",
            Hardfork::Prague => "prague",
            Hardfork::Osaka => "osaka",
        }
    }

    /// Whether blocks under this hardfork are sealed by proof of stake.
    pub fn is_post_merge(&self) -> bool {
        *self >= Hardfork::Merge
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An unrecognized hardfork name.
#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown hardfork: {0}")]
pub struct UnknownHardfork(pub String);

impl FromStr for Hardfork {
    type Err = UnknownHardfork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Aliases first: both names for the proof-of-stake transition are in
        // circulation, and "chainstart" predates "frontier".
        match s {
            "merge" | "paris" => return Ok(Hardfork::Merge),
            "frontier" | "chainstart" => return Ok(Hardfork::Frontier),
            "daoHardfork" | "dao" => return Ok(Hardfork::DaoFork),
            _ => (),
        }

        Hardfork::ALL
            .iter()
            .find(|hardfork| hardfork.name() == s)
            .copied()
            .ok_or_else(|| UnknownHardfork(s.to_owned()))
    }
}
