use auto_impl::auto_impl;
use ember_primitives::{keccak256, Address, Bytes, HashMap, B256, KECCAK_EMPTY, U256};

/// An error from the injected state manager. Backend failures propagate
/// through the interpreter unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// No checkpoint to commit or revert.
    #[error("no state checkpoint to {0}")]
    NoCheckpoint(&'static str),
    /// A backend failure.
    #[error("{0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Basic account data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account's balance.
    pub balance: U256,
    /// The account's nonce.
    pub nonce: u64,
    /// Hash of the account's code; `KECCAK_EMPTY` for none.
    pub code_hash: B256,
}

impl AccountInfo {
    /// Whether the account is empty per the state-clearing rules: zero
    /// balance, zero nonce and no code.
    pub fn is_empty(&self) -> bool {
        self.balance == U256::ZERO
            && self.nonce == 0
            && (self.code_hash == KECCAK_EMPTY || self.code_hash == B256::ZERO)
    }
}

/// The injected account-state service. A single transaction drives it from
/// one logical task; nested frames bracket their writes between
/// [`StateManager::checkpoint`] and a matching commit or revert.
#[auto_impl(&mut, Box)]
pub trait StateManager {
    /// Returns the account at the address, or `None` if it does not exist.
    fn get_account(&mut self, address: Address) -> Result<Option<AccountInfo>, StateError>;

    /// Reads a storage slot. Missing slots read as zero.
    fn get_storage(&mut self, address: Address, key: U256) -> Result<U256, StateError>;

    /// Writes a storage slot.
    fn set_storage(&mut self, address: Address, key: U256, value: U256)
        -> Result<(), StateError>;

    /// Returns the account's code, empty for none.
    fn get_code(&mut self, address: Address) -> Result<Bytes, StateError>;

    /// Installs code at the address.
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Sets the account's balance, creating the account if needed.
    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), StateError>;

    /// Increments the account's nonce, creating the account if needed.
    fn increment_nonce(&mut self, address: Address) -> Result<(), StateError>;

    /// Removes the account and its storage.
    fn delete_account(&mut self, address: Address) -> Result<(), StateError>;

    /// The hash of the block at the provided number, if known.
    fn block_hash(&mut self, number: u64) -> Result<B256, StateError>;

    /// Starts a nested write scope.
    fn checkpoint(&mut self) -> Result<(), StateError>;

    /// Merges the innermost write scope into its parent.
    fn commit(&mut self) -> Result<(), StateError>;

    /// Discards the innermost write scope.
    fn revert(&mut self) -> Result<(), StateError>;
}

#[derive(Clone, Debug, Default)]
struct MemoryAccount {
    info: AccountInfo,
    code: Bytes,
    storage: HashMap<U256, U256>,
}

/// A `HashMap`-backed state manager for tests and tooling. Checkpoints
/// snapshot the full account map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryState {
    accounts: HashMap<Address, MemoryAccount>,
    block_hashes: HashMap<u64, B256>,
    checkpoints: Vec<HashMap<Address, MemoryAccount>>,
}

impl InMemoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account with the provided balance.
    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.account_mut(address).info.balance = balance;
        self
    }

    /// Inserts an account with the provided code.
    pub fn with_code(mut self, address: Address, code: Bytes) -> Self {
        let account = self.account_mut(address);
        account.info.code_hash = keccak256(&code);
        account.code = code;
        self
    }

    /// Registers a known block hash.
    pub fn insert_block_hash(&mut self, number: u64, hash: B256) {
        self.block_hashes.insert(number, hash);
    }

    fn account_mut(&mut self, address: Address) -> &mut MemoryAccount {
        self.accounts.entry(address).or_insert_with(|| MemoryAccount {
            info: AccountInfo {
                code_hash: KECCAK_EMPTY,
                ..AccountInfo::default()
            },
            ..MemoryAccount::default()
        })
    }
}

impl StateManager for InMemoryState {
    fn get_account(&mut self, address: Address) -> Result<Option<AccountInfo>, StateError> {
        Ok(self.accounts.get(&address).map(|account| account.info.clone()))
    }

    fn get_storage(&mut self, address: Address, key: U256) -> Result<U256, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    fn set_storage(
        &mut self,
        address: Address,
        key: U256,
        value: U256,
    ) -> Result<(), StateError> {
        let account = self.account_mut(address);
        if value == U256::ZERO {
            account.storage.remove(&key);
        } else {
            account.storage.insert(key, value);
        }

        Ok(())
    }

    fn get_code(&mut self, address: Address) -> Result<Bytes, StateError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default())
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        let account = self.account_mut(address);
        account.info.code_hash = keccak256(&code);
        account.code = code;

        Ok(())
    }

    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), StateError> {
        self.account_mut(address).info.balance = balance;

        Ok(())
    }

    fn increment_nonce(&mut self, address: Address) -> Result<(), StateError> {
        self.account_mut(address).info.nonce += 1;

        Ok(())
    }

    fn delete_account(&mut self, address: Address) -> Result<(), StateError> {
        self.accounts.remove(&address);

        Ok(())
    }

    fn block_hash(&mut self, number: u64) -> Result<B256, StateError> {
        Ok(self
            .block_hashes
            .get(&number)
            .copied()
            .unwrap_or(B256::ZERO))
    }

    fn checkpoint(&mut self) -> Result<(), StateError> {
        self.checkpoints.push(self.accounts.clone());

        Ok(())
    }

    fn commit(&mut self) -> Result<(), StateError> {
        self.checkpoints
            .pop()
            .map(|_snapshot| ())
            .ok_or(StateError::NoCheckpoint("commit"))
    }

    fn revert(&mut self) -> Result<(), StateError> {
        let snapshot = self
            .checkpoints
            .pop()
            .ok_or(StateError::NoCheckpoint("revert"))?;
        self.accounts = snapshot;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_defaults_to_zero() {
        let mut state = InMemoryState::new();

        assert_eq!(
            state
                .get_storage(Address::repeat_byte(0x01), U256::ZERO)
                .unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn revert_discards_writes() {
        let address = Address::repeat_byte(0x01);
        let mut state = InMemoryState::new().with_balance(address, U256::from(100u64));

        state.checkpoint().unwrap();
        state.set_balance(address, U256::from(5u64)).unwrap();
        state
            .set_storage(address, U256::ZERO, U256::from(7u64))
            .unwrap();
        state.revert().unwrap();

        assert_eq!(
            state.get_account(address).unwrap().unwrap().balance,
            U256::from(100u64)
        );
        assert_eq!(state.get_storage(address, U256::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn commit_keeps_writes() {
        let address = Address::repeat_byte(0x02);
        let mut state = InMemoryState::new();

        state.checkpoint().unwrap();
        state.set_balance(address, U256::from(42u64)).unwrap();
        state.commit().unwrap();

        assert_eq!(
            state.get_account(address).unwrap().unwrap().balance,
            U256::from(42u64)
        );
    }

    #[test]
    fn empty_account_classification() {
        let account = AccountInfo {
            code_hash: KECCAK_EMPTY,
            ..AccountInfo::default()
        };
        assert!(account.is_empty());

        let funded = AccountInfo {
            balance: U256::from(1u64),
            ..account
        };
        assert!(!funded.is_empty());
    }
}
