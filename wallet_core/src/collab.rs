//! Collaborators the session container depends on.
//!
//! The container never talks to a wallet extension or a chain directly. It
//! asks a [`WalletConnector`] who is connected and whether they can sign, and
//! a [`LedgerClient`] for balances and transaction submission. Real
//! implementations live in this crate ([`crate::rpc::RpcLedgerClient`],
//! [`WatchOnlyConnector`]); deterministic stand-ins live in
//! `soldash-nullables`.

use std::future::Future;
use std::sync::Arc;

use soldash_types::{Address, Amount, Signature, Timestamp, TokenHolding, TransactionRecord, TxStatus};

use crate::error::LedgerError;

/// Connection state of the user's wallet.
pub trait WalletConnector: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Address of the connected wallet, if any.
    fn address(&self) -> Option<Address>;

    /// Whether the wallet can sign transactions.
    fn can_sign(&self) -> bool;
}

/// Read and submit access to the ledger.
pub trait LedgerClient: Send + Sync {
    /// Native-currency balance of `owner`.
    fn native_balance(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Amount, LedgerError>> + Send;

    /// Token balances held by `owner`, one entry per mint.
    fn token_holdings(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Vec<TokenHolding>, LedgerError>> + Send;

    /// Up to `limit` most recent transactions touching `owner`, newest first.
    fn recent_transactions(
        &self,
        owner: &Address,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, LedgerError>> + Send;

    /// Submit a transaction and wait for its outcome.
    fn submit(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<TransactionOutcome, LedgerError>> + Send;
}

/// A balance-affecting transaction the container asks the ledger to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    CreateMint {
        authority: Address,
        name: String,
        symbol: String,
        decimals: u8,
    },
    MintTo {
        authority: Address,
        mint: Address,
        amount: Amount,
        recipient: Address,
    },
    TransferToken {
        from: Address,
        mint: Address,
        amount: Amount,
        to: Address,
    },
    TransferNative {
        from: Address,
        amount: Amount,
        to: Address,
    },
}

impl Submission {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateMint { .. } => "create_mint",
            Self::MintTo { .. } => "mint_to",
            Self::TransferToken { .. } => "transfer_token",
            Self::TransferNative { .. } => "transfer_native",
        }
    }

    /// Content digest of this submission. `nonce` separates otherwise
    /// identical submissions.
    pub fn fingerprint(&self, nonce: u64) -> Signature {
        let nonce = nonce.to_le_bytes();
        match self {
            Self::CreateMint {
                authority,
                name,
                symbol,
                decimals,
            } => Signature::digest(&[
                self.kind().as_bytes(),
                authority.as_str().as_bytes(),
                name.as_bytes(),
                symbol.as_bytes(),
                &[*decimals],
                &nonce,
            ]),
            Self::MintTo {
                authority,
                mint,
                amount,
                recipient,
            } => Signature::digest(&[
                self.kind().as_bytes(),
                authority.as_str().as_bytes(),
                mint.as_str().as_bytes(),
                &amount.raw().to_le_bytes(),
                recipient.as_str().as_bytes(),
                &nonce,
            ]),
            Self::TransferToken {
                from,
                mint,
                amount,
                to,
            } => Signature::digest(&[
                self.kind().as_bytes(),
                from.as_str().as_bytes(),
                mint.as_str().as_bytes(),
                &amount.raw().to_le_bytes(),
                to.as_str().as_bytes(),
                &nonce,
            ]),
            Self::TransferNative { from, amount, to } => Signature::digest(&[
                self.kind().as_bytes(),
                from.as_str().as_bytes(),
                &amount.raw().to_le_bytes(),
                to.as_str().as_bytes(),
                &nonce,
            ]),
        }
    }
}

/// What the ledger reports after a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub signature: Signature,
    pub status: TxStatus,
    /// Address of the new mint, for [`Submission::CreateMint`].
    pub mint: Option<Address>,
}

/// Source of record timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A connector for a known address without signing capability.
///
/// Balances and history can be viewed; every mutating operation is refused.
#[derive(Clone, Debug, Default)]
pub struct WatchOnlyConnector {
    address: Option<Address>,
}

impl WatchOnlyConnector {
    pub fn new(address: Option<Address>) -> Self {
        Self { address }
    }
}

impl WalletConnector for WatchOnlyConnector {
    fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    fn address(&self) -> Option<Address> {
        self.address.clone()
    }

    fn can_sign(&self) -> bool {
        false
    }
}

impl<T: WalletConnector + ?Sized> WalletConnector for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn address(&self) -> Option<Address> {
        (**self).address()
    }

    fn can_sign(&self) -> bool {
        (**self).can_sign()
    }
}

impl<T: LedgerClient> LedgerClient for Arc<T> {
    fn native_balance(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Amount, LedgerError>> + Send {
        (**self).native_balance(owner)
    }

    fn token_holdings(
        &self,
        owner: &Address,
    ) -> impl Future<Output = Result<Vec<TokenHolding>, LedgerError>> + Send {
        (**self).token_holdings(owner)
    }

    fn recent_transactions(
        &self,
        owner: &Address,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, LedgerError>> + Send {
        (**self).recent_transactions(owner, limit)
    }

    fn submit(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<TransactionOutcome, LedgerError>> + Send {
        (**self).submit(submission)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
