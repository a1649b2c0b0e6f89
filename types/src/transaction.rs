//! Transaction log entries.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;
use crate::hash::Signature;
use crate::state::{TxKind, TxStatus};
use crate::time::Timestamp;

/// One balance-affecting action, as shown in the session history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub kind: TxKind,
    /// Absent for `create`.
    pub amount: Option<Amount>,
    /// Token symbol, or `SOL` for native-currency moves.
    pub token_symbol: Option<String>,
    pub timestamp: Timestamp,
    pub status: TxStatus,
    /// Populated by `send` and `mint`.
    pub to: Option<Address>,
    /// Populated by `receive` and locally recorded `send`.
    pub from: Option<Address>,
}

impl TransactionRecord {
    pub fn send(
        signature: Signature,
        amount: Amount,
        token_symbol: impl Into<String>,
        from: Address,
        to: Address,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            signature,
            kind: TxKind::Send,
            amount: Some(amount),
            token_symbol: Some(token_symbol.into()),
            timestamp,
            status: TxStatus::Confirmed,
            to: Some(to),
            from: Some(from),
        }
    }

    pub fn receive(
        signature: Signature,
        amount: Amount,
        token_symbol: impl Into<String>,
        from: Address,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            signature,
            kind: TxKind::Receive,
            amount: Some(amount),
            token_symbol: Some(token_symbol.into()),
            timestamp,
            status: TxStatus::Confirmed,
            to: None,
            from: Some(from),
        }
    }

    pub fn create(signature: Signature, token_symbol: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            signature,
            kind: TxKind::Create,
            amount: None,
            token_symbol: Some(token_symbol.into()),
            timestamp,
            status: TxStatus::Confirmed,
            to: None,
            from: None,
        }
    }

    pub fn mint(
        signature: Signature,
        amount: Amount,
        token_symbol: impl Into<String>,
        to: Address,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            signature,
            kind: TxKind::Mint,
            amount: Some(amount),
            token_symbol: Some(token_symbol.into()),
            timestamp,
            status: TxStatus::Confirmed,
            to: Some(to),
            from: None,
        }
    }

    /// Override the confirmation status (builders default to confirmed).
    pub fn with_status(mut self, status: TxStatus) -> Self {
        self.status = status;
        self
    }
}
