//! Nullable infrastructure for deterministic testing.
//!
//! Everything the session container reaches outside the process (wallet
//! connector, ledger, clock) sits behind a trait in `soldash-wallet-core`.
//! This crate provides stand-ins that:
//! - Return deterministic values
//! - Can be controlled programmatically (connect, fail, delay)
//! - Never touch the network
//!
//! `NullLedger` doubles as the in-memory demo backend of the CLI.

pub mod clock;
pub mod connector;
pub mod ledger;

pub use clock::NullClock;
pub use connector::NullConnector;
pub use ledger::NullLedger;
