use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Transfer,
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

/// Immutable ledger record of a committed balance change. Exactly one entry
/// is appended per successful operation; a rolled-back attempt leaves none.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Decimal,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn transfer(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            amount,
            kind: EntryKind::Transfer,
            status: EntryStatus::Completed,
            created_at: Utc::now(),
        }
    }

    pub fn deposit(to: AccountId, amount: Decimal) -> Self {
        Self {
            from: None,
            to: Some(to),
            amount,
            kind: EntryKind::Deposit,
            status: EntryStatus::Completed,
            created_at: Utc::now(),
        }
    }

    pub fn withdrawal(from: AccountId, amount: Decimal) -> Self {
        Self {
            from: Some(from),
            to: None,
            amount,
            kind: EntryKind::Withdrawal,
            status: EntryStatus::Completed,
            created_at: Utc::now(),
        }
    }
}

impl core::fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(
                f,
                "{:?},from={},to={},amount={}",
                self.kind, from, to, self.amount
            ),
            (Some(from), None) => write!(f, "{:?},from={},amount={}", self.kind, from, self.amount),
            (None, Some(to)) => write!(f, "{:?},to={},amount={}", self.kind, to, self.amount),
            (None, None) => write!(f, "{:?},amount={}", self.kind, self.amount),
        }
    }
}
