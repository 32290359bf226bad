use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rust_decimal::Decimal;

use crate::domain::{AccountId, Error, ExecutorError, LedgerEntry, StoreTransaction};

fn not_found(id: AccountId) -> Error {
    Error::Validation(format!("account {id} not found"))
}

fn inactive(id: AccountId) -> Error {
    Error::Validation(format!("account {id} is inactive"))
}

fn require_positive(amount: Decimal) -> Result<(), Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Work unit moving `amount` from one account to another. Touches both rows
/// in ascending id order so two opposing transfers (A→B and B→A) never lock
/// in opposite orders. Re-reads everything each attempt, so it is safe for
/// the executor to re-run.
pub fn transfer<T: StoreTransaction>(
    from: AccountId,
    to: AccountId,
    amount: Decimal,
) -> impl FnMut(&mut T) -> Result<(), Error> {
    move |tx| {
        if from == to {
            return Err(Error::Validation(format!(
                "cannot transfer from account {from} to itself"
            )));
        }
        require_positive(amount)?;

        let (low, high) = if from < to { (from, to) } else { (to, from) };
        let low_row = tx.account(low)?.ok_or_else(|| not_found(low))?;
        let high_row = tx.account(high)?.ok_or_else(|| not_found(high))?;
        let (mut source, mut dest) = if low == from {
            (low_row, high_row)
        } else {
            (high_row, low_row)
        };

        if !source.active {
            return Err(inactive(source.id));
        }
        if !dest.active {
            return Err(inactive(dest.id));
        }
        if source.balance < amount {
            return Err(Error::Validation(format!(
                "insufficient funds in account {from}: have {}, need {}",
                source.balance, amount
            )));
        }

        source.balance -= amount;
        dest.balance += amount;
        // Writes follow the same ascending order as the reads.
        if source.id == low {
            tx.put_account(source)?;
            tx.put_account(dest)?;
        } else {
            tx.put_account(dest)?;
            tx.put_account(source)?;
        }
        tx.append_entry(LedgerEntry::transfer(from, to, amount))
    }
}

/// Work unit crediting a single account.
pub fn deposit<T: StoreTransaction>(
    to: AccountId,
    amount: Decimal,
) -> impl FnMut(&mut T) -> Result<(), Error> {
    move |tx| {
        require_positive(amount)?;
        let mut account = tx.account(to)?.ok_or_else(|| not_found(to))?;
        if !account.active {
            return Err(inactive(to));
        }
        account.balance += amount;
        tx.put_account(account)?;
        tx.append_entry(LedgerEntry::deposit(to, amount))
    }
}

/// Work unit debiting a single account, rejected on insufficient funds.
pub fn withdraw<T: StoreTransaction>(
    from: AccountId,
    amount: Decimal,
) -> impl FnMut(&mut T) -> Result<(), Error> {
    move |tx| {
        require_positive(amount)?;
        let mut account = tx.account(from)?.ok_or_else(|| not_found(from))?;
        if !account.active {
            return Err(inactive(from));
        }
        if account.balance < amount {
            return Err(Error::Validation(format!(
                "insufficient funds in account {from}: have {}, need {}",
                account.balance, amount
            )));
        }
        account.balance -= amount;
        tx.put_account(account)?;
        tx.append_entry(LedgerEntry::withdrawal(from, amount))
    }
}

/// Work unit crediting several accounts in one transaction. Missing or
/// inactive accounts are skipped rather than failing the batch; one ledger
/// entry is appended per credit actually applied.
pub fn bulk_deposit<T: StoreTransaction>(
    mut deposits: Vec<(AccountId, Decimal)>,
) -> impl FnMut(&mut T) -> Result<(), Error> {
    deposits.sort_by_key(|(id, _)| *id);
    move |tx| {
        for (id, amount) in &deposits {
            require_positive(*amount)?;
            match tx.account(*id)? {
                Some(mut account) if account.active => {
                    account.balance += *amount;
                    tx.put_account(account)?;
                    tx.append_entry(LedgerEntry::deposit(*id, *amount))?;
                }
                _ => continue,
            }
        }
        Ok(())
    }
}

/// Shared outcome counters, the only in-process state shared across workers.
#[derive(Debug)]
pub struct WorkloadStats {
    started: Instant,
    committed: AtomicU64,
    validation_failures: AtomicU64,
    conflicts_exhausted: AtomicU64,
    deadlines_exceeded: AtomicU64,
    store_errors: AtomicU64,
}

impl Default for WorkloadStats {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkloadStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            committed: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            conflicts_exhausted: AtomicU64::new(0),
            deadlines_exceeded: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
        }
    }

    pub fn record(&self, outcome: &Result<(), ExecutorError>) {
        let counter = match outcome {
            Ok(()) => &self.committed,
            Err(ExecutorError::ValidationFailed(_)) => &self.validation_failures,
            Err(ExecutorError::ConflictExhausted { .. }) => &self.conflicts_exhausted,
            Err(ExecutorError::DeadlineExceeded { .. }) => &self.deadlines_exceeded,
            Err(ExecutorError::StoreError(_)) => &self.store_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let committed = self.committed.load(Ordering::Relaxed);
        let rate = if elapsed > 0.0 {
            committed as f64 / elapsed
        } else {
            0.0
        };
        format!(
            "elapsed: {elapsed:.2}s\n\
             committed: {committed} ({rate:.1}/s)\n\
             validation failures: {}\n\
             conflicts exhausted: {}\n\
             deadlines exceeded: {}\n\
             store errors: {}",
            self.validation_failures.load(Ordering::Relaxed),
            self.conflicts_exhausted.load(Ordering::Relaxed),
            self.deadlines_exceeded.load(Ordering::Relaxed),
            self.store_errors.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryKind, StoreConnection};
    use crate::store::Bank;

    fn seeded_bank() -> Bank {
        let bank = Bank::new();
        bank.seed(3, Decimal::from(100)).unwrap();
        bank
    }

    fn apply<F>(bank: &Bank, mut work: F) -> Result<(), Error>
    where
        F: FnMut(&mut crate::store::MemTransaction) -> Result<(), Error>,
    {
        let mut conn = bank.connect();
        let mut tx = conn.begin()?;
        match work(&mut tx) {
            Ok(()) => tx.commit(),
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    #[test]
    fn transfer_rejects_self_and_non_positive_amounts() {
        let bank = seeded_bank();
        let a = AccountId(0);
        let b = AccountId(1);

        let err = apply(&bank, transfer(a, a, Decimal::ONE)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = apply(&bank, transfer(a, b, Decimal::ZERO)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(bank.ledger_len().unwrap(), 0);
    }

    #[test]
    fn withdraw_rejects_insufficient_funds() {
        let bank = seeded_bank();
        let err = apply(&bank, withdraw(AccountId(0), Decimal::from(500))).unwrap_err();
        assert!(matches!(err, Error::Validation(ref reason) if reason.contains("insufficient")));
        assert_eq!(
            bank.account(AccountId(0)).unwrap().unwrap().balance,
            Decimal::from(100)
        );
    }

    #[test]
    fn deposit_to_missing_account_is_a_validation_failure() {
        let bank = seeded_bank();
        let err = apply(&bank, deposit(AccountId(42), Decimal::ONE)).unwrap_err();
        assert!(matches!(err, Error::Validation(ref reason) if reason.contains("not found")));
    }

    #[test]
    fn bulk_deposit_skips_inactive_accounts() {
        let bank = seeded_bank();
        bank.deactivate(AccountId(1)).unwrap();

        apply(
            &bank,
            bulk_deposit(vec![
                (AccountId(0), Decimal::from(10)),
                (AccountId(1), Decimal::from(10)),
                (AccountId(2), Decimal::from(10)),
            ]),
        )
        .unwrap();

        assert_eq!(
            bank.account(AccountId(0)).unwrap().unwrap().balance,
            Decimal::from(110)
        );
        assert_eq!(
            bank.account(AccountId(1)).unwrap().unwrap().balance,
            Decimal::from(100)
        );
        assert_eq!(
            bank.account(AccountId(2)).unwrap().unwrap().balance,
            Decimal::from(110)
        );

        // One entry per credit actually applied.
        let ledger = bank.ledger().unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|e| e.kind == EntryKind::Deposit));
    }

    #[test]
    fn stats_classify_outcomes() {
        let stats = WorkloadStats::new();
        stats.record(&Ok(()));
        stats.record(&Ok(()));
        stats.record(&Err(ExecutorError::ValidationFailed("broke".to_string())));
        stats.record(&Err(ExecutorError::ConflictExhausted { attempts: 3 }));

        assert_eq!(stats.committed(), 2);
        let report = stats.report();
        assert!(report.contains("validation failures: 1"));
        assert!(report.contains("conflicts exhausted: 1"));
    }
}
