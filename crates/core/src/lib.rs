pub mod account;
pub mod money;
pub mod period;
pub mod transaction;

pub use account::{AccountError, AccountOwner, OwnerTable, Source, DEFAULT_OWNERS};
pub use money::Money;
pub use period::{DateRange, Quarter, YearMonth};
pub use transaction::Transaction;
