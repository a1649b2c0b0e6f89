//! Kind and status enums for transaction records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a transaction record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    /// Value left the connected wallet.
    Send,
    /// Value arrived at the connected wallet.
    Receive,
    /// A new token mint was created.
    Create,
    /// New token supply was issued.
    Mint,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Create => "create",
            Self::Mint => "mint",
        }
    }

    /// Whether records of this kind carry an amount.
    pub fn has_amount(&self) -> bool {
        !matches!(self, Self::Create)
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Confirmation status reported for a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
    Pending,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
