use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, Error, LedgerEntry, StoreConnection, StoreTransaction};

/// In-memory transactional store with serializable isolation via optimistic
/// concurrency: every row carries a version counter, transactions record the
/// version of each row they read, and commit re-validates the whole read set
/// under the global write lock. First committer wins; the loser gets
/// `Error::Conflict`.
#[derive(Debug, Clone, Default)]
pub struct Bank {
    inner: Arc<RwLock<Shared>>,
}

#[derive(Debug, Default)]
struct Shared {
    accounts: HashMap<AccountId, VersionedAccount>,
    ledger: Vec<LedgerEntry>,
}

#[derive(Debug)]
struct VersionedAccount {
    row: Account,
    version: u64, // starts at 1; an absent row reads as version 0
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Shared>, Error> {
        self.inner
            .read()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Shared>, Error> {
        self.inner
            .write()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))
    }

    /// Bootstraps accounts 0..count, each with the same starting balance.
    pub fn seed(&self, count: u64, initial_balance: Decimal) -> Result<(), Error> {
        let mut shared = self.write()?;
        for id in 0..count {
            let id = AccountId(id);
            shared.accounts.entry(id).or_insert_with(|| VersionedAccount {
                row: Account::new(id, initial_balance),
                version: 1,
            });
        }
        Ok(())
    }

    pub fn create_account(&self, account: Account) -> Result<(), Error> {
        let mut shared = self.write()?;
        match shared.accounts.entry(account.id) {
            Entry::Vacant(e) => {
                e.insert(VersionedAccount {
                    row: account,
                    version: 1,
                });
                Ok(())
            }
            Entry::Occupied(_) => Err(Error::Store(format!(
                "account {} already exists",
                account.id
            ))),
        }
    }

    pub fn deactivate(&self, id: AccountId) -> Result<(), Error> {
        let mut shared = self.write()?;
        let versioned = shared
            .accounts
            .get_mut(&id)
            .ok_or_else(|| Error::Store(format!("account {id} not found")))?;
        versioned.row.active = false;
        versioned.version += 1;
        Ok(())
    }

    /// Untracked point read, for reports and assertions outside any
    /// transaction.
    pub fn account(&self, id: AccountId) -> Result<Option<Account>, Error> {
        Ok(self.read()?.accounts.get(&id).map(|v| v.row.clone()))
    }

    pub fn total_balance(&self) -> Result<Decimal, Error> {
        Ok(self
            .read()?
            .accounts
            .values()
            .map(|v| v.row.balance)
            .sum())
    }

    pub fn ledger_len(&self) -> Result<usize, Error> {
        Ok(self.read()?.ledger.len())
    }

    pub fn ledger(&self) -> Result<Vec<LedgerEntry>, Error> {
        Ok(self.read()?.ledger.clone())
    }

    pub fn connect(&self) -> MemConnection {
        MemConnection { bank: self.clone() }
    }
}

/// One session against the bank. Each worker owns its connection exclusively
/// for the duration of an attempt.
#[derive(Debug, Clone)]
pub struct MemConnection {
    bank: Bank,
}

impl StoreConnection for MemConnection {
    type Tx = MemTransaction;

    fn begin(&mut self) -> Result<MemTransaction, Error> {
        Ok(MemTransaction {
            bank: self.bank.clone(),
            reads: HashMap::new(),
            writes: HashMap::new(),
            entries: Vec::new(),
        })
    }
}

/// A single attempt: reads are cached with the version they observed, writes
/// are buffered until commit. Dropping the value discards everything.
#[derive(Debug)]
pub struct MemTransaction {
    bank: Bank,
    reads: HashMap<AccountId, (u64, Option<Account>)>,
    writes: HashMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
}

impl MemTransaction {
    fn record_read(&mut self, id: AccountId) -> Result<Option<Account>, Error> {
        let shared = self.bank.read()?;
        let (version, row) = match shared.accounts.get(&id) {
            Some(v) => (v.version, Some(v.row.clone())),
            None => (0, None),
        };
        self.reads.insert(id, (version, row.clone()));
        Ok(row)
    }
}

impl StoreTransaction for MemTransaction {
    fn account(&mut self, id: AccountId) -> Result<Option<Account>, Error> {
        if let Some(row) = self.writes.get(&id) {
            return Ok(Some(row.clone()));
        }
        // Repeatable within the attempt: later reads return the cached row
        // rather than whatever has committed since.
        if let Some((_, cached)) = self.reads.get(&id) {
            return Ok(cached.clone());
        }
        self.record_read(id)
    }

    fn put_account(&mut self, account: Account) -> Result<(), Error> {
        // A blind write still joins the read set, so commit validation
        // catches a concurrent writer of the same row.
        if !self.reads.contains_key(&account.id) && !self.writes.contains_key(&account.id) {
            self.record_read(account.id)?;
        }
        self.writes.insert(account.id, account);
        Ok(())
    }

    fn append_entry(&mut self, entry: LedgerEntry) -> Result<(), Error> {
        self.entries.push(entry);
        Ok(())
    }

    fn commit(self) -> Result<(), Error> {
        let bank = self.bank.clone();
        let mut shared = bank.write()?;
        for (id, (version, _)) in &self.reads {
            let current = shared.accounts.get(id).map(|v| v.version).unwrap_or(0);
            if current != *version {
                return Err(Error::Conflict);
            }
        }
        for (id, row) in self.writes {
            match shared.accounts.entry(id) {
                Entry::Occupied(mut e) => {
                    let versioned = e.get_mut();
                    versioned.version += 1;
                    versioned.row = row;
                }
                Entry::Vacant(e) => {
                    e.insert(VersionedAccount { row, version: 1 });
                }
            }
        }
        shared.ledger.extend(self.entries);
        Ok(())
    }

    fn rollback(self) {
        // Nothing touched shared state yet; dropping the buffers is enough.
    }
}
