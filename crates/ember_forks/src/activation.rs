use crate::Hardfork;

/// Fork condition for a hardfork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ForkCondition {
    /// Activation based on block number.
    Block(u64),
    /// Activation based on UNIX timestamp.
    Timestamp(u64),
}

impl ForkCondition {
    /// Whether a block with the provided number and timestamp satisfies the
    /// condition.
    pub fn is_satisfied_by(&self, block_number: u64, timestamp: u64) -> bool {
        match self {
            ForkCondition::Block(activation) => block_number >= *activation,
            ForkCondition::Timestamp(activation) => timestamp >= *activation,
        }
    }
}

/// A type representing the activation of a hardfork.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    /// The condition for the hardfork activation.
    pub condition: ForkCondition,
    /// The hardfork to be activated.
    pub hardfork: Hardfork,
}

/// The ordered hardfork schedule of a chain.
///
/// Entries must be declared in activation order; lookups scan from the most
/// recent entry backwards, so later declarations win ties.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Activations {
    hardforks: Vec<Activation>,
}

impl Activations {
    /// Constructs a new instance with the provided hardforks.
    pub fn new(hardforks: Vec<Activation>) -> Self {
        Self { hardforks }
    }

    /// Creates a schedule that activates the provided hardfork at genesis.
    pub fn with_hardfork(hardfork: Hardfork) -> Self {
        Self {
            hardforks: vec![Activation {
                condition: ForkCondition::Block(0),
                hardfork,
            }],
        }
    }

    /// Returns the inner activations.
    pub fn as_slice(&self) -> &[Activation] {
        &self.hardforks
    }

    /// Whether no hardfork activations are present.
    pub fn is_empty(&self) -> bool {
        self.hardforks.is_empty()
    }

    /// Returns the hardfork active for a block with the provided number and
    /// timestamp.
    pub fn hardfork_at_block(&self, block_number: u64, timestamp: u64) -> Option<Hardfork> {
        self.hardforks
            .iter()
            .rev()
            .find(|Activation { condition, .. }| condition.is_satisfied_by(block_number, timestamp))
            .map(|activation| activation.hardfork)
    }

    /// Returns the block number or timestamp at which the provided hardfork
    /// activates, if scheduled.
    pub fn activation_of(&self, hardfork: Hardfork) -> Option<ForkCondition> {
        self.hardforks
            .iter()
            .find(|activation| activation.hardfork == hardfork)
            .map(|activation| activation.condition)
    }
}

impl From<&[Activation]> for Activations {
    fn from(hardforks: &[Activation]) -> Self {
        Self {
            hardforks: hardforks.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Activations {
        Activations::new(vec![
            Activation {
                condition: ForkCondition::Block(0),
                hardfork: Hardfork::Frontier,
            },
            Activation {
                condition: ForkCondition::Block(100),
                hardfork: Hardfork::Berlin,
            },
            Activation {
                condition: ForkCondition::Block(100),
                hardfork: Hardfork::London,
            },
            Activation {
                condition: ForkCondition::Timestamp(1_700_000_000),
                hardfork: Hardfork::Shanghai,
            },
        ])
    }

    #[test]
    fn resolves_by_block_number() {
        let activations = schedule();

        assert_eq!(
            activations.hardfork_at_block(0, 0),
            Some(Hardfork::Frontier)
        );
        assert_eq!(
            activations.hardfork_at_block(99, 0),
            Some(Hardfork::Frontier)
        );
    }

    #[test]
    fn later_declaration_wins_ties() {
        let activations = schedule();

        assert_eq!(
            activations.hardfork_at_block(100, 0),
            Some(Hardfork::London)
        );
    }

    #[test]
    fn resolves_by_timestamp() {
        let activations = schedule();

        assert_eq!(
            activations.hardfork_at_block(200, 1_700_000_000),
            Some(Hardfork::Shanghai)
        );
        assert_eq!(
            activations.hardfork_at_block(200, 1_600_000_000),
            Some(Hardfork::London)
        );
    }

    #[test]
    fn serde_round_trip() {
        let activations = schedule();
        let json = serde_json::to_string(&activations).unwrap();
        let decoded: Activations = serde_json::from_str(&json).unwrap();

        assert_eq!(activations, decoded);
    }
}
