//! Nullable ledger: an in-memory chain with scriptable failures.
//!
//! Balances, mints and per-owner history live in a single `Mutex`, so every
//! submission applies completely or not at all. Submissions wait for the
//! configured latency before touching state; queries answer immediately.

use soldash_types::hash::digest_parts;
use soldash_types::{
    Address, Amount, Signature, Timestamp, TokenHolding, TransactionRecord, TxStatus, TypesError,
    NATIVE_DECIMALS, NATIVE_SYMBOL,
};
use soldash_wallet_core::{
    Clock, LedgerClient, LedgerError, Submission, SystemClock, TransactionOutcome,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DEMO_SAMO_MINT: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const DEMO_USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const DEMO_SENDER: &str = "8ezpz1s1YmrCuCxzLUdKpEDeWs4tH5xAMbZc6bL4hYEb";
const DEMO_RECIPIENT: &str = "7iAZfkr5gWTa9xJqNsXQXnbZmgPZRfny3ABF6TJ5Xjef";
const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Debug)]
struct MintInfo {
    /// `None` for mints nobody here may issue.
    authority: Option<Address>,
    name: String,
    symbol: String,
    decimals: u8,
}

#[derive(Default)]
struct LedgerState {
    native: HashMap<Address, Amount>,
    /// Per owner, in the order the owner first received each mint.
    balances: HashMap<Address, Vec<(Address, Amount)>>,
    mints: HashMap<Address, MintInfo>,
    /// Per owner, newest first.
    history: HashMap<Address, Vec<TransactionRecord>>,
    submissions: Vec<Submission>,
    nonce: u64,
    query_failure: Option<LedgerError>,
    submit_failures: VecDeque<LedgerError>,
    next_status: Option<TxStatus>,
}

impl LedgerState {
    fn native(&self, owner: &Address) -> Amount {
        self.native
            .get(owner)
            .copied()
            .unwrap_or(Amount::zero(NATIVE_DECIMALS))
    }

    fn balance(&self, owner: &Address, mint: &Address, decimals: u8) -> Amount {
        self.balances
            .get(owner)
            .and_then(|held| held.iter().find(|(m, _)| m == mint))
            .map(|(_, amount)| *amount)
            .unwrap_or(Amount::zero(decimals))
    }

    fn set_balance(&mut self, owner: &Address, mint: &Address, amount: Amount) {
        let held = self.balances.entry(owner.clone()).or_default();
        match held.iter_mut().find(|(m, _)| m == mint) {
            Some((_, balance)) => *balance = amount,
            None => held.push((mint.clone(), amount)),
        }
    }

    fn log(&mut self, owner: &Address, record: TransactionRecord) {
        self.history.entry(owner.clone()).or_default().insert(0, record);
    }

    fn mint_info(&self, mint: &Address) -> Result<MintInfo, LedgerError> {
        self.mints
            .get(mint)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("unknown mint {mint}")))
    }

    fn apply(
        &mut self,
        submission: &Submission,
        signature: &Signature,
        status: TxStatus,
        now: Timestamp,
    ) -> Result<Option<Address>, LedgerError> {
        match submission {
            Submission::CreateMint {
                authority,
                name,
                symbol,
                decimals,
            } => {
                let mint = Address::from_digest(&digest_parts(&[
                    b"mint",
                    signature.as_str().as_bytes(),
                ]));
                self.mints.insert(
                    mint.clone(),
                    MintInfo {
                        authority: Some(authority.clone()),
                        name: name.clone(),
                        symbol: symbol.clone(),
                        decimals: *decimals,
                    },
                );
                self.set_balance(authority, &mint, Amount::zero(*decimals));
                self.log(
                    authority,
                    TransactionRecord::create(signature.clone(), symbol.clone(), now)
                        .with_status(status),
                );
                Ok(Some(mint))
            }
            Submission::MintTo {
                authority,
                mint,
                amount,
                recipient,
            } => {
                let info = self.mint_info(mint)?;
                if info.authority.as_ref() != Some(authority) {
                    return Err(LedgerError::Rejected(format!(
                        "{authority} is not the mint authority of {mint}"
                    )));
                }
                let amount = scaled(*amount, info.decimals)?;
                let credited = self
                    .balance(recipient, mint, info.decimals)
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::Rejected("supply overflow".into()))?;
                self.set_balance(recipient, mint, credited);
                self.log(
                    authority,
                    TransactionRecord::mint(
                        signature.clone(),
                        amount,
                        info.symbol.clone(),
                        recipient.clone(),
                        now,
                    )
                    .with_status(status),
                );
                if recipient != authority {
                    self.log(
                        recipient,
                        TransactionRecord::receive(
                            signature.clone(),
                            amount,
                            info.symbol,
                            authority.clone(),
                            now,
                        )
                        .with_status(status),
                    );
                }
                Ok(None)
            }
            Submission::TransferToken {
                from,
                mint,
                amount,
                to,
            } => {
                let info = self.mint_info(mint)?;
                let amount = scaled(*amount, info.decimals)?;
                let debited = self
                    .balance(from, mint, info.decimals)
                    .checked_sub(amount)
                    .ok_or_else(|| LedgerError::Rejected("insufficient token balance".into()))?;
                if from != to {
                    let credited = self
                        .balance(to, mint, info.decimals)
                        .checked_add(amount)
                        .ok_or_else(|| LedgerError::Rejected("balance overflow".into()))?;
                    self.set_balance(from, mint, debited);
                    self.set_balance(to, mint, credited);
                }
                self.log_transfer(signature, amount, &info.symbol, from, to, status, now);
                Ok(None)
            }
            Submission::TransferNative { from, amount, to } => {
                let amount = scaled(*amount, NATIVE_DECIMALS)?;
                let debited = self
                    .native(from)
                    .checked_sub(amount)
                    .ok_or_else(|| LedgerError::Rejected("insufficient lamports".into()))?;
                if from != to {
                    let credited = self
                        .native(to)
                        .checked_add(amount)
                        .ok_or_else(|| LedgerError::Rejected("balance overflow".into()))?;
                    self.native.insert(from.clone(), debited);
                    self.native.insert(to.clone(), credited);
                }
                self.log_transfer(signature, amount, NATIVE_SYMBOL, from, to, status, now);
                Ok(None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn log_transfer(
        &mut self,
        signature: &Signature,
        amount: Amount,
        symbol: &str,
        from: &Address,
        to: &Address,
        status: TxStatus,
        now: Timestamp,
    ) {
        self.log(
            from,
            TransactionRecord::send(signature.clone(), amount, symbol, from.clone(), to.clone(), now)
                .with_status(status),
        );
        if from != to {
            self.log(
                to,
                TransactionRecord::receive(signature.clone(), amount, symbol, from.clone(), now)
                    .with_status(status),
            );
        }
    }
}

fn scaled(amount: Amount, decimals: u8) -> Result<Amount, LedgerError> {
    amount
        .rescale(decimals)
        .map_err(|e| LedgerError::Rejected(e.to_string()))
}

/// An in-memory ledger for tests and the offline demo.
pub struct NullLedger {
    state: Mutex<LedgerState>,
    latency_ms: AtomicU64,
    clock: Box<dyn Clock>,
}

impl NullLedger {
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// An empty ledger stamping records with wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            latency_ms: AtomicU64::new(0),
            clock: Box::new(clock),
        }
    }

    /// A ledger holding the demo wallet for `owner`: 2 SOL, 1000 SAMO,
    /// 500 USDC and two past native transfers.
    pub fn with_demo_data(owner: &Address) -> Result<Self, TypesError> {
        let ledger = Self::new();
        ledger.seed_demo_data(owner)?;
        Ok(ledger)
    }

    pub fn seed_demo_data(&self, owner: &Address) -> Result<(), TypesError> {
        let issuer = Address::from_digest(&digest_parts(&[b"demo-issuer"]));
        let samo = Address::parse(DEMO_SAMO_MINT)?;
        let usdc = Address::parse(DEMO_USDC_MINT)?;
        let sender = Address::parse(DEMO_SENDER)?;
        let recipient = Address::parse(DEMO_RECIPIENT)?;
        let now = self.clock.now();

        self.set_native_balance(owner, Amount::from_whole(2, NATIVE_DECIMALS));
        self.register_mint(&samo, Some(&issuer), "Samoyed Coin", "SAMO", 9);
        self.register_mint(&usdc, Some(&issuer), "USD Coin", "USDC", 6);
        self.set_token_balance(owner, &samo, Amount::from_whole(1000, 9));
        self.set_token_balance(owner, &usdc, Amount::from_whole(500, 6));

        self.push_history(
            owner,
            TransactionRecord::send(
                Signature::digest(&[b"demo-send", owner.as_str().as_bytes()]),
                Amount::from_raw(500_000_000, NATIVE_DECIMALS),
                NATIVE_SYMBOL,
                owner.clone(),
                recipient,
                now.saturating_sub_millis(2 * DAY_MILLIS),
            ),
        );
        self.push_history(
            owner,
            TransactionRecord::receive(
                Signature::digest(&[b"demo-receive", owner.as_str().as_bytes()]),
                Amount::from_whole(1, NATIVE_DECIMALS),
                NATIVE_SYMBOL,
                sender,
                now.saturating_sub_millis(DAY_MILLIS),
            ),
        );
        Ok(())
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    /// Delay applied to every submission.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_native_balance(&self, owner: &Address, amount: Amount) {
        self.state().native.insert(owner.clone(), amount);
    }

    /// Declare a mint. `authority` may issue new units; `None` means nobody can.
    pub fn register_mint(
        &self,
        mint: &Address,
        authority: Option<&Address>,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) {
        self.state().mints.insert(
            mint.clone(),
            MintInfo {
                authority: authority.cloned(),
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        );
    }

    pub fn set_token_balance(&self, owner: &Address, mint: &Address, amount: Amount) {
        self.state().set_balance(owner, mint, amount);
    }

    /// Give `owner` a holding, registering its mint with `owner` as authority
    /// unless the mint is already known.
    pub fn seed_holding(&self, owner: &Address, holding: &TokenHolding) {
        let mut state = self.state();
        state
            .mints
            .entry(holding.address.clone())
            .or_insert_with(|| MintInfo {
                authority: Some(owner.clone()),
                name: holding.name.clone(),
                symbol: holding.symbol.clone(),
                decimals: holding.decimals,
            });
        state.set_balance(owner, &holding.address, holding.balance);
    }

    /// Add a record to the top of `owner`'s history.
    pub fn push_history(&self, owner: &Address, record: TransactionRecord) {
        self.state().log(owner, record);
    }

    /// Make every query fail with `error` until cleared with `None`.
    pub fn fail_queries(&self, error: Option<LedgerError>) {
        self.state().query_failure = error;
    }

    /// Fail the next submission with `error`, leaving the ledger untouched.
    pub fn fail_next_submit(&self, error: LedgerError) {
        self.state().submit_failures.push_back(error);
    }

    /// Report the next submission with `status`. A `Failed` submission
    /// changes nothing.
    pub fn set_next_status(&self, status: TxStatus) {
        self.state().next_status = Some(status);
    }

    /// Every submission that reached the ledger, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.state().submissions.clone()
    }

    pub fn native_balance_of(&self, owner: &Address) -> Amount {
        self.state().native(owner)
    }

    pub fn token_balance_of(&self, owner: &Address, mint: &Address) -> Option<Amount> {
        let state = self.state();
        state
            .balances
            .get(owner)
            .and_then(|held| held.iter().find(|(m, _)| m == mint))
            .map(|(_, amount)| *amount)
    }

    fn check_queries(&self) -> Result<(), LedgerError> {
        match &self.state().query_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for NullLedger {
    async fn native_balance(&self, owner: &Address) -> Result<Amount, LedgerError> {
        self.check_queries()?;
        Ok(self.native_balance_of(owner))
    }

    async fn token_holdings(&self, owner: &Address) -> Result<Vec<TokenHolding>, LedgerError> {
        self.check_queries()?;
        let state = self.state();
        let Some(held) = state.balances.get(owner) else {
            return Ok(Vec::new());
        };
        held.iter()
            .map(|(mint, balance)| -> Result<TokenHolding, LedgerError> {
                let info = state.mint_info(mint)?;
                Ok(TokenHolding {
                    address: mint.clone(),
                    name: info.name,
                    symbol: info.symbol,
                    decimals: info.decimals,
                    balance: *balance,
                })
            })
            .collect()
    }

    async fn recent_transactions(
        &self,
        owner: &Address,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.check_queries()?;
        let state = self.state();
        Ok(state
            .history
            .get(owner)
            .map(|records| records.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn submit(&self, submission: &Submission) -> Result<TransactionOutcome, LedgerError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let now = self.clock.now();
        let mut state = self.state();
        if let Some(err) = state.submit_failures.pop_front() {
            tracing::debug!(kind = submission.kind(), error = %err, "scripted submit failure");
            return Err(err);
        }
        state.nonce += 1;
        let signature = submission.fingerprint(state.nonce);
        let status = state.next_status.take().unwrap_or(TxStatus::Confirmed);
        state.submissions.push(submission.clone());

        let mint = if status == TxStatus::Failed {
            None
        } else {
            state.apply(submission, &signature, status, now)?
        };
        tracing::debug!(kind = submission.kind(), %signature, ?status, "submission applied");
        Ok(TransactionOutcome {
            signature,
            status,
            mint,
        })
    }
}
