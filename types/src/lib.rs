//! Value types for the soldash wallet dashboard.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! addresses, fixed-point amounts, timestamps, transaction signatures, token
//! holdings and transaction records.

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;
pub mod state;
pub mod time;
pub mod token;
pub mod transaction;

pub use address::Address;
pub use amount::{Amount, NATIVE_DECIMALS, NATIVE_SYMBOL};
pub use error::TypesError;
pub use hash::Signature;
pub use state::{TxKind, TxStatus};
pub use time::Timestamp;
pub use token::{TokenHolding, MAX_DECIMALS, MAX_NAME_LEN, MAX_SYMBOL_LEN};
pub use transaction::TransactionRecord;
