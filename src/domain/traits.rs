use crate::domain::{Account, AccountId, Error, LedgerEntry};

/// An exclusively owned session with the transactional store. One connection
/// runs at most one transaction at a time.
pub trait StoreConnection {
    type Tx: StoreTransaction;

    fn begin(&mut self) -> Result<Self::Tx, Error>;
}

/// A single transaction attempt. All reads and writes through one value of
/// this type observe a single consistent transaction; nothing is visible
/// outside until `commit` returns Ok.
pub trait StoreTransaction {
    /// Reads the current row for `id`, recording it in the transaction's
    /// read set. Reads observe this transaction's own earlier writes.
    fn account(&mut self, id: AccountId) -> Result<Option<Account>, Error>;

    /// Buffers an insert-or-update of the given row.
    fn put_account(&mut self, account: Account) -> Result<(), Error>;

    /// Buffers an append to the ledger.
    fn append_entry(&mut self, entry: LedgerEntry) -> Result<(), Error>;

    /// Atomically applies all buffered writes, or fails with
    /// `Error::Conflict` if a concurrent transaction committed first against
    /// any row this one read.
    fn commit(self) -> Result<(), Error>;

    /// Discards all buffered effects.
    fn rollback(self);
}
