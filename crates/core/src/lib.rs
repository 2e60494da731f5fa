pub mod account;
pub mod money;
pub mod transaction;

pub use account::{account_type, AccountType, LedgerError};
pub use money::{Amount, Currency};
pub use transaction::{new_metadata, normalize_text, Cost, Flag, Meta, MetaValue, Posting, Transaction};
