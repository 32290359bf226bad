use rust_decimal::Decimal;

/// Unique account key. Orderable so work units can lock in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub u64);

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal, // never negative after a committed transfer/withdrawal
    pub active: bool,     // inactive accounts reject balance-changing operations
}

impl Account {
    pub fn new(id: AccountId, balance: Decimal) -> Self {
        Self {
            id,
            balance,
            active: true,
        }
    }
}
