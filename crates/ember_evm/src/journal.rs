use ember_primitives::{Address, HashMap, HashSet, B256, U256};

use crate::result::ExceptionalHalt;

#[derive(Clone, Debug, Default)]
struct Snapshot {
    refund: u64,
    transient: HashMap<(Address, U256), U256>,
    log_count: usize,
    selfdestructs: HashSet<Address>,
    created: HashSet<Address>,
}

/// The per-transaction access witness and side-effect journal.
///
/// Warm addresses and storage keys only ever grow: a reverting frame keeps
/// its warming. The refund counter, transient storage, self-destruct set and
/// created-account set are restored to the snapshot taken at frame entry.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    warm_addresses: HashSet<Address>,
    warm_storage: HashSet<(Address, U256)>,
    original_storage: HashMap<(Address, U256), U256>,
    transient: HashMap<(Address, U256), U256>,
    refund: u64,
    log_count: usize,
    selfdestructs: HashSet<Address>,
    created: HashSet<Address>,
    snapshots: Vec<Snapshot>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the warm sets for a new transaction: coinbase, origin, the
    /// target, every active precompile, and any access-list entries.
    pub fn prepare_transaction<AccessListT>(
        &mut self,
        origin: Address,
        target: Option<Address>,
        coinbase: Option<Address>,
        precompiles: impl IntoIterator<Item = Address>,
        access_list: AccessListT,
    ) where
        AccessListT: IntoIterator<Item = (Address, Vec<B256>)>,
    {
        self.warm_addresses.insert(origin);
        if let Some(target) = target {
            self.warm_addresses.insert(target);
        }
        if let Some(coinbase) = coinbase {
            self.warm_addresses.insert(coinbase);
        }
        for precompile in precompiles {
            self.warm_addresses.insert(precompile);
        }
        for (address, keys) in access_list {
            self.warm_addresses.insert(address);
            for key in keys {
                self.warm_storage.insert((address, U256::from_be_bytes(key.0)));
            }
        }
    }

    /// Whether the address has been touched this transaction.
    pub fn is_warm_address(&self, address: Address) -> bool {
        self.warm_addresses.contains(&address)
    }

    /// Marks the address warm, returning whether it was cold before.
    pub fn warm_address(&mut self, address: Address) -> bool {
        self.warm_addresses.insert(address)
    }

    /// Whether the storage slot has been touched this transaction.
    pub fn is_warm_storage(&self, address: Address, key: U256) -> bool {
        self.warm_storage.contains(&(address, key))
    }

    /// Marks the storage slot warm, returning whether it was cold before.
    pub fn warm_storage(&mut self, address: Address, key: U256) -> bool {
        self.warm_storage.insert((address, key))
    }

    /// Number of warm addresses.
    pub fn warm_address_count(&self) -> usize {
        self.warm_addresses.len()
    }

    /// Records the value a slot held when the transaction first touched it,
    /// and returns the original value.
    pub fn original_storage(&mut self, address: Address, key: U256, current: U256) -> U256 {
        *self
            .original_storage
            .entry((address, key))
            .or_insert(current)
    }

    /// Reads transient storage, zero for untouched slots.
    pub fn get_transient(&self, address: Address, key: U256) -> U256 {
        self.transient
            .get(&(address, key))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Writes transient storage.
    pub fn set_transient(&mut self, address: Address, key: U256, value: U256) {
        if value == U256::ZERO {
            self.transient.remove(&(address, key));
        } else {
            self.transient.insert((address, key), value);
        }
    }

    /// The running refund counter.
    pub fn refund(&self) -> u64 {
        self.refund
    }

    /// Adds to the refund counter.
    pub fn add_refund(&mut self, amount: u64) {
        self.refund += amount;
    }

    /// Subtracts from the refund counter. The counter is never allowed below
    /// zero.
    pub fn sub_refund(&mut self, amount: u64) -> Result<(), ExceptionalHalt> {
        self.refund = self
            .refund
            .checked_sub(amount)
            .ok_or(ExceptionalHalt::RefundCounterBelowZero)?;

        Ok(())
    }

    /// Tracks the number of logs emitted, so a revert can truncate them.
    pub fn log_emitted(&mut self) {
        self.log_count += 1;
    }

    /// Number of logs emitted by committed and running frames.
    pub fn log_count(&self) -> usize {
        self.log_count
    }

    /// Records a self-destruct event. Whether the account is reaped is the
    /// state manager's decision.
    pub fn record_selfdestruct(&mut self, address: Address) -> bool {
        self.selfdestructs.insert(address)
    }

    /// The accounts that self-destructed this transaction.
    pub fn selfdestructs(&self) -> &HashSet<Address> {
        &self.selfdestructs
    }

    /// Marks an account as created by this transaction.
    pub fn mark_created(&mut self, address: Address) {
        self.created.insert(address);
    }

    /// Whether the account was created by this transaction.
    pub fn was_created_in_transaction(&self, address: Address) -> bool {
        self.created.contains(&address)
    }

    /// Takes the snapshot restored by a matching [`Journal::revert`].
    pub fn checkpoint(&mut self) {
        self.snapshots.push(Snapshot {
            refund: self.refund,
            transient: self.transient.clone(),
            log_count: self.log_count,
            selfdestructs: self.selfdestructs.clone(),
            created: self.created.clone(),
        });
    }

    /// Drops the innermost snapshot, keeping the journal as is.
    pub fn commit(&mut self) {
        self.snapshots.pop();
    }

    /// Restores the innermost snapshot. Warm sets are deliberately left
    /// intact.
    pub fn revert(&mut self) {
        if let Some(snapshot) = self.snapshots.pop() {
            self.refund = snapshot.refund;
            self.transient = snapshot.transient;
            self.log_count = snapshot.log_count;
            self.selfdestructs = snapshot.selfdestructs;
            self.created = snapshot.created;
        }
    }
}
