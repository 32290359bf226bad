pub mod account;
pub mod error;
pub mod traits;
pub mod transaction;

pub use account::{Account, AccountId};
pub use error::{Error, ExecutorError};
pub use traits::{StoreConnection, StoreTransaction};
pub use transaction::{EntryKind, EntryStatus, LedgerEntry};
