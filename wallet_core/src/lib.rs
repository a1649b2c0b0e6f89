//! Wallet session core for soldash.
//!
//! Provides everything the dashboard needs to drive a connected wallet:
//! - The session state container (balance, token holdings, transaction log)
//! - Busy-gated async operations: refresh, create, mint, transfer token, transfer SOL
//! - Collaborator traits for the wallet connector and the ledger
//! - A read-only Solana JSON-RPC ledger client
//! - Configuration and transaction display text

pub mod collab;
pub mod config;
pub mod display;
pub mod error;
pub mod rpc;
pub mod session;
pub mod wallet;

pub use collab::{
    Clock, LedgerClient, Submission, SystemClock, TransactionOutcome, WalletConnector,
    WatchOnlyConnector,
};
pub use config::{DashboardConfig, LedgerBackend};
pub use error::{ConfigError, ErrorCategory, LedgerError, SessionError};
pub use rpc::RpcLedgerClient;
pub use session::Session;
pub use wallet::{Operation, SessionEvent, SessionOptions, WalletSession};
