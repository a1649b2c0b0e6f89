//! The wallet session container.
//!
//! [`WalletSession`] owns a [`Session`] and runs the five user actions against
//! it: refresh, create token, mint, transfer token and transfer SOL. Every
//! action follows the same shape:
//!
//! 1. take the busy flag (a second concurrent action gets [`SessionError::Busy`]),
//! 2. check the connector and validate inputs against the current session,
//! 3. await the ledger, bounded by the configured request timeout,
//! 4. apply the balance change and prepend one transaction record,
//! 5. release the busy flag, on every exit path,
//! 6. apply any connection change that arrived in the meantime.
//!
//! Once the ledger has accepted a submission the action succeeds: the record
//! is always written, and a balance change the local state cannot follow is
//! logged and corrected by a reload.
//!
//! The session lock is a plain `std::sync::Mutex` and is never held across
//! an await point.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use soldash_types::token::{normalize_symbol, validate_decimals, validate_name};
use soldash_types::{
    Address, Amount, Signature, TokenHolding, TransactionRecord, TxStatus, NATIVE_DECIMALS,
    NATIVE_SYMBOL,
};
use soldash_utils::abbreviate_address;
use tokio::sync::broadcast;

use crate::collab::{Clock, LedgerClient, Submission, SystemClock, TransactionOutcome, WalletConnector};
use crate::error::{LedgerError, SessionError};
use crate::session::{normalize_positive, Session};

/// Default bound on a single ledger call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of history entries requested on refresh.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

const EVENT_CAPACITY: usize = 64;

/// The user action an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Refresh,
    CreateToken,
    MintToken,
    TransferToken,
    TransferSol,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::CreateToken => "create_token",
            Self::MintToken => "mint_token",
            Self::TransferToken => "transfer_token",
            Self::TransferSol => "transfer_sol",
        }
    }
}

/// User-facing notifications published by the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Connected(Address),
    Disconnected,
    Completed { operation: Operation, message: String },
    Failed { operation: Operation, message: String },
}

/// Tunables for a [`WalletSession`].
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub request_timeout: Duration,
    pub history_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Releases the busy flag when dropped.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Session state container for one wallet connection.
pub struct WalletSession<W, L, C = SystemClock> {
    connector: W,
    ledger: L,
    clock: C,
    options: SessionOptions,
    state: Mutex<Session>,
    busy: AtomicBool,
    /// Set when the connection changed (or local state drifted from the
    /// ledger) while an operation held the busy flag.
    resync: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl<W, L> WalletSession<W, L, SystemClock>
where
    W: WalletConnector,
    L: LedgerClient,
{
    pub fn new(connector: W, ledger: L, options: SessionOptions) -> Self {
        Self::with_clock(connector, ledger, SystemClock, options)
    }
}

impl<W, L, C> WalletSession<W, L, C>
where
    W: WalletConnector,
    L: LedgerClient,
    C: Clock,
{
    pub fn with_clock(connector: W, ledger: L, clock: C, options: SessionOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connector,
            ledger,
            clock,
            options,
            state: Mutex::new(Session::default()),
            busy: AtomicBool::new(false),
            resync: AtomicBool::new(false),
            events,
        }
    }

    pub fn connector(&self) -> &W {
        &self.connector
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// A copy of the current session state.
    pub fn snapshot(&self) -> Session {
        let mut snapshot = self.lock().clone();
        snapshot.busy = self.is_busy();
        snapshot
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Receive notifications for subsequent operations.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // bookkeeping never panics mid-update, so a poisoned lock still holds a consistent session
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Publish the outcome of an operation and log it.
    fn report<T>(
        &self,
        operation: Operation,
        result: &Result<T, SessionError>,
        success: impl FnOnce(&T) -> String,
    ) {
        match result {
            Ok(value) => {
                let message = success(value);
                tracing::info!(operation = operation.as_str(), "{message}");
                self.emit(SessionEvent::Completed { operation, message });
            }
            Err(err) => {
                match err {
                    SessionError::External(_) => {
                        tracing::error!(operation = operation.as_str(), error = %err, "operation failed")
                    }
                    _ => tracing::warn!(operation = operation.as_str(), error = %err, "operation rejected"),
                }
                self.emit(SessionEvent::Failed {
                    operation,
                    message: err.to_string(),
                });
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        let limit = self.options.request_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| LedgerError::Timeout(limit))?
    }

    /// Connected wallet that may sign, or the precondition that fails.
    fn signer(&self) -> Result<Address, SessionError> {
        let address = self
            .connector
            .address()
            .filter(|_| self.connector.is_connected())
            .ok_or(SessionError::NotConnected)?;
        if !self.connector.can_sign() {
            return Err(SessionError::CannotSign);
        }
        Ok(address)
    }

    async fn submit(&self, submission: Submission) -> Result<TransactionOutcome, SessionError> {
        tracing::debug!(kind = submission.kind(), "submitting transaction");
        let outcome = self.bounded(self.ledger.submit(&submission)).await?;
        if outcome.status == TxStatus::Failed {
            return Err(LedgerError::Rejected(format!(
                "transaction {} failed",
                outcome.signature
            ))
            .into());
        }
        Ok(outcome)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Align the session with the connector.
    ///
    /// Call whenever the wallet may have connected, disconnected or switched
    /// accounts. A new connection is refreshed; a disconnect resets balances
    /// and holdings but keeps the transaction log. While an operation is in
    /// flight the change is deferred, then applied together with a reload
    /// as soon as that operation finishes.
    pub async fn sync_connection(&self) -> Result<(), SessionError> {
        let result = self.sync_once(false).await;
        self.settle().await;
        result
    }

    async fn sync_once(&self, reload: bool) -> Result<(), SessionError> {
        let current = self
            .connector
            .address()
            .filter(|_| self.connector.is_connected());

        let changed = {
            let Ok(_busy) = BusyGuard::acquire(&self.busy) else {
                tracing::debug!("operation in flight, deferring connection change");
                self.resync.store(true, Ordering::Release);
                return Ok(());
            };
            let mut state = self.lock();
            if state.address == current {
                false
            } else {
                state.reset();
                state.address = current.clone();
                true
            }
        };

        let Some(address) = current else {
            if changed {
                tracing::info!("wallet disconnected");
                self.emit(SessionEvent::Disconnected);
            }
            return Ok(());
        };
        if changed {
            tracing::info!(wallet = %address, "wallet connected");
            self.emit(SessionEvent::Connected(address));
        } else if !reload {
            return Ok(());
        }

        if self.is_busy() {
            self.resync.store(true, Ordering::Release);
            return Ok(());
        }
        match self.reload().await {
            Err(SessionError::Busy) => {
                self.resync.store(true, Ordering::Release);
                Ok(())
            }
            other => other,
        }
    }

    /// Apply connection changes deferred while an operation was in flight.
    async fn settle(&self) {
        while !self.is_busy() && self.resync.swap(false, Ordering::AcqRel) {
            if let Err(err) = self.sync_once(true).await {
                tracing::warn!(error = %err, "deferred resync failed");
            }
        }
    }

    /// Local bookkeeping after the ledger already applied an effect. A
    /// failure here cannot undo the effect, so it is logged and the session
    /// is reloaded once the operation finishes.
    fn follow<T>(&self, operation: Operation, result: Result<T, SessionError>) {
        if let Err(err) = result {
            tracing::warn!(
                operation = operation.as_str(),
                error = %err,
                "ledger applied the transaction but the local state could not follow"
            );
            self.resync.store(true, Ordering::Release);
        }
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Reload the native balance, token holdings and history from the ledger.
    ///
    /// Does nothing while no wallet is connected. On failure the previous
    /// state is kept.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let result = self.reload().await;
        self.settle().await;
        result
    }

    async fn reload(&self) -> Result<(), SessionError> {
        let Some(owner) = self
            .connector
            .address()
            .filter(|_| self.connector.is_connected())
        else {
            tracing::debug!("refresh skipped, no wallet connected");
            return Ok(());
        };

        let result = match BusyGuard::acquire(&self.busy) {
            Ok(_busy) => self.refresh_inner(owner).await,
            Err(err) => Err(err),
        };
        self.report(Operation::Refresh, &result, |_| "balances refreshed".to_string());
        result
    }

    async fn refresh_inner(&self, owner: Address) -> Result<(), SessionError> {
        let (balance, holdings, history) = tokio::try_join!(
            self.bounded(self.ledger.native_balance(&owner)),
            self.bounded(self.ledger.token_holdings(&owner)),
            self.bounded(self.ledger.recent_transactions(&owner, self.options.history_limit)),
        )?;
        let balance = balance.rescale(NATIVE_DECIMALS)?;

        if self.connector.address().filter(|_| self.connector.is_connected()) != Some(owner.clone()) {
            tracing::debug!(wallet = %owner, "wallet changed during refresh, discarding result");
            self.resync.store(true, Ordering::Release);
            return Ok(());
        }

        let mut state = self.lock();
        if state.address.as_ref() != Some(&owner) {
            state.reset();
            state.address = Some(owner);
        }
        state.native_balance = balance;
        state.replace_holdings(holdings);
        state.merge_history(history);
        Ok(())
    }

    /// Create a new token with zero supply. Returns its mint address.
    pub async fn create_token(
        &self,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<Address, SessionError> {
        let result = match BusyGuard::acquire(&self.busy) {
            Ok(_busy) => self.create_token_inner(name, symbol, decimals).await,
            Err(err) => Err(err),
        };
        self.report(Operation::CreateToken, &result, |(_, holding)| {
            format!("Created token: {} ({})", holding.name, holding.symbol)
        });
        self.settle().await;
        result.map(|(address, _)| address)
    }

    async fn create_token_inner(
        &self,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<(Address, TokenHolding), SessionError> {
        let authority = self.signer()?;
        let name = validate_name(name)?;
        let symbol = normalize_symbol(symbol)?;
        let decimals = validate_decimals(decimals)?;

        let outcome = self
            .submit(Submission::CreateMint {
                authority: authority.clone(),
                name: name.clone(),
                symbol: symbol.clone(),
                decimals,
            })
            .await?;
        let mint = outcome
            .mint
            .ok_or_else(|| LedgerError::Decode("ledger did not return a mint address".into()))?;
        let holding = TokenHolding::empty(mint.clone(), &name, &symbol, decimals)?;

        let mut state = self.lock();
        if state.address.as_ref() == Some(&authority) {
            self.follow(Operation::CreateToken, state.add_token(holding.clone()));
        }
        state.record(
            TransactionRecord::create(outcome.signature, symbol, self.clock.now())
                .with_status(outcome.status),
        );
        Ok((mint, holding))
    }

    /// Issue `amount` new units of `mint`.
    ///
    /// The holding is credited only when the tokens go to the connected
    /// wallet (no `recipient`, or `recipient` equal to it). The record's `to`
    /// always names the actual recipient.
    pub async fn mint_token(
        &self,
        mint: &Address,
        amount: Amount,
        recipient: Option<&str>,
    ) -> Result<Signature, SessionError> {
        let result = match BusyGuard::acquire(&self.busy) {
            Ok(_busy) => self.mint_token_inner(mint, amount, recipient).await,
            Err(err) => Err(err),
        };
        self.report(Operation::MintToken, &result, |(_, record)| {
            format!(
                "Minted {} {}",
                record.amount.map(|a| a.to_string()).unwrap_or_default(),
                record.token_symbol.as_deref().unwrap_or("tokens")
            )
        });
        self.settle().await;
        result.map(|(signature, _)| signature)
    }

    async fn mint_token_inner(
        &self,
        mint: &Address,
        amount: Amount,
        recipient: Option<&str>,
    ) -> Result<(Signature, TransactionRecord), SessionError> {
        let authority = self.signer()?;
        let recipient = match recipient.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => Address::parse(r)?,
            None => authority.clone(),
        };
        let credits_self = recipient == authority;

        let (amount, symbol) = {
            let state = self.lock();
            let amount = state.token_amount(mint, amount)?;
            if credits_self {
                state.check_token_credit(mint, amount)?;
            }
            let symbol = state.token(mint).map(|t| t.symbol.clone()).unwrap_or_default();
            (amount, symbol)
        };

        let outcome = self
            .submit(Submission::MintTo {
                authority: authority.clone(),
                mint: mint.clone(),
                amount,
                recipient: recipient.clone(),
            })
            .await?;

        let record = TransactionRecord::mint(
            outcome.signature.clone(),
            amount,
            symbol,
            recipient,
            self.clock.now(),
        )
        .with_status(outcome.status);

        let mut state = self.lock();
        if credits_self && state.address.as_ref() == Some(&authority) {
            self.follow(Operation::MintToken, state.credit_token(mint, amount));
        }
        state.record(record.clone());
        Ok((outcome.signature, record))
    }

    /// Send `amount` of `mint` from the connected wallet to `recipient`.
    pub async fn transfer_token(
        &self,
        mint: &Address,
        amount: Amount,
        recipient: &str,
    ) -> Result<Signature, SessionError> {
        let result = match BusyGuard::acquire(&self.busy) {
            Ok(_busy) => self.transfer_token_inner(mint, amount, recipient).await,
            Err(err) => Err(err),
        };
        self.report(Operation::TransferToken, &result, sent_message);
        self.settle().await;
        result.map(|(signature, _)| signature)
    }

    async fn transfer_token_inner(
        &self,
        mint: &Address,
        amount: Amount,
        recipient: &str,
    ) -> Result<(Signature, TransactionRecord), SessionError> {
        let from = self.signer()?;
        let to = parse_recipient(recipient)?;
        reject_self_transfer(&from, &to)?;

        let (amount, symbol) = {
            let state = self.lock();
            let amount = state.token_amount(mint, amount)?;
            state.check_token_debit(mint, amount)?;
            let symbol = state.token(mint).map(|t| t.symbol.clone()).unwrap_or_default();
            (amount, symbol)
        };

        let outcome = self
            .submit(Submission::TransferToken {
                from: from.clone(),
                mint: mint.clone(),
                amount,
                to: to.clone(),
            })
            .await?;

        let record = TransactionRecord::send(
            outcome.signature.clone(),
            amount,
            symbol,
            from.clone(),
            to,
            self.clock.now(),
        )
        .with_status(outcome.status);

        let mut state = self.lock();
        if state.address.as_ref() == Some(&from) {
            self.follow(Operation::TransferToken, state.debit_token(mint, amount));
        }
        state.record(record.clone());
        Ok((outcome.signature, record))
    }

    /// Send `amount` of the native currency to `recipient`.
    pub async fn transfer_sol(
        &self,
        amount: Amount,
        recipient: &str,
    ) -> Result<Signature, SessionError> {
        let result = match BusyGuard::acquire(&self.busy) {
            Ok(_busy) => self.transfer_sol_inner(amount, recipient).await,
            Err(err) => Err(err),
        };
        self.report(Operation::TransferSol, &result, sent_message);
        self.settle().await;
        result.map(|(signature, _)| signature)
    }

    async fn transfer_sol_inner(
        &self,
        amount: Amount,
        recipient: &str,
    ) -> Result<(Signature, TransactionRecord), SessionError> {
        let from = self.signer()?;
        let to = parse_recipient(recipient)?;
        reject_self_transfer(&from, &to)?;
        let amount = normalize_positive(amount, NATIVE_DECIMALS)?;
        self.lock().check_native_debit(amount)?;

        let outcome = self
            .submit(Submission::TransferNative {
                from: from.clone(),
                amount,
                to: to.clone(),
            })
            .await?;

        let record = TransactionRecord::send(
            outcome.signature.clone(),
            amount,
            NATIVE_SYMBOL,
            from.clone(),
            to,
            self.clock.now(),
        )
        .with_status(outcome.status);

        let mut state = self.lock();
        if state.address.as_ref() == Some(&from) {
            self.follow(Operation::TransferSol, state.debit_native(amount));
        }
        state.record(record.clone());
        Ok((outcome.signature, record))
    }
}

fn parse_recipient(recipient: &str) -> Result<Address, SessionError> {
    if recipient.trim().is_empty() {
        return Err(SessionError::Validation("recipient is required".into()));
    }
    Ok(Address::parse(recipient)?)
}

fn reject_self_transfer(from: &Address, to: &Address) -> Result<(), SessionError> {
    if from == to {
        return Err(SessionError::Validation(
            "recipient is the sending wallet".into(),
        ));
    }
    Ok(())
}

fn sent_message((_, record): &(Signature, TransactionRecord)) -> String {
    format!(
        "Sent {} {} to {}",
        record.amount.map(|a| a.to_string()).unwrap_or_default(),
        record.token_symbol.as_deref().unwrap_or("tokens"),
        record
            .to
            .as_ref()
            .map(abbreviate_address)
            .unwrap_or_default()
    )
}
