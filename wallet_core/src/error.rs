use soldash_types::{Address, Amount, TypesError};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("not supported by this ledger client: {0}")]
    Unsupported(String),
}

/// Why a session operation did not apply.
///
/// Every variant leaves the session exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("connected wallet cannot sign transactions")]
    CannotSign,

    #[error("another operation is in progress")]
    Busy,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unknown token {0}")]
    UnknownToken(Address),

    #[error("insufficient {symbol} balance: need {needed}, have {available}")]
    InsufficientBalance {
        symbol: String,
        needed: Amount,
        available: Amount,
    },

    #[error("ledger request failed: {0}")]
    External(#[from] LedgerError),
}

/// Coarse failure classes shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotConnected,
    Validation,
    InsufficientBalance,
    External,
    Busy,
}

impl SessionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConnected | Self::CannotSign => ErrorCategory::NotConnected,
            Self::Busy => ErrorCategory::Busy,
            Self::Validation(_) | Self::UnknownToken(_) => ErrorCategory::Validation,
            Self::InsufficientBalance { .. } => ErrorCategory::InsufficientBalance,
            Self::External(_) => ErrorCategory::External,
        }
    }
}

impl From<TypesError> for SessionError {
    fn from(e: TypesError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(String),
}
