//! Session state: the connected wallet's balances and transaction log.
//!
//! [`Session`] is plain data plus bookkeeping that never fails halfway: each
//! method either applies completely or returns an error and leaves the
//! session untouched. The async container in [`crate::wallet`] decides when
//! these methods run.

use std::collections::HashSet;

use serde::Serialize;
use soldash_types::{Address, Amount, TokenHolding, TransactionRecord, NATIVE_DECIMALS, NATIVE_SYMBOL};

use crate::error::SessionError;

/// Snapshot of the connected wallet's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Connected wallet, `None` while disconnected.
    pub address: Option<Address>,
    pub native_balance: Amount,
    /// Discovery / creation order; unique by mint address.
    pub tokens: Vec<TokenHolding>,
    /// Newest first.
    pub transactions: Vec<TransactionRecord>,
    /// True while a mutating operation is in flight.
    pub busy: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            address: None,
            native_balance: Amount::zero(NATIVE_DECIMALS),
            tokens: Vec::new(),
            transactions: Vec::new(),
            busy: false,
        }
    }
}

impl Session {
    pub fn token(&self, mint: &Address) -> Option<&TokenHolding> {
        self.tokens.iter().find(|t| &t.address == mint)
    }

    fn token_mut(&mut self, mint: &Address) -> Option<&mut TokenHolding> {
        self.tokens.iter_mut().find(|t| &t.address == mint)
    }

    /// Forget the wallet's balances. The transaction log is kept.
    pub fn reset(&mut self) {
        self.address = None;
        self.native_balance = Amount::zero(NATIVE_DECIMALS);
        self.tokens.clear();
    }

    /// Replace holdings with a fresh ledger listing. Later duplicates of a
    /// mint are dropped.
    pub fn replace_holdings(&mut self, holdings: Vec<TokenHolding>) {
        let mut seen = HashSet::new();
        self.tokens = holdings
            .into_iter()
            .filter(|h| {
                let fresh = seen.insert(h.address.clone());
                if !fresh {
                    tracing::warn!(mint = %h.address, "ledger listed a mint twice, keeping the first");
                }
                fresh
            })
            .collect();
    }

    /// Replace the log with ledger history, keeping local records the ledger
    /// did not report (yet). Result is newest first.
    pub fn merge_history(&mut self, ledger: Vec<TransactionRecord>) {
        let known: HashSet<_> = ledger.iter().map(|r| r.signature.clone()).collect();
        let mut merged = ledger;
        merged.extend(
            self.transactions
                .drain(..)
                .filter(|r| !known.contains(&r.signature)),
        );
        // stable: equal timestamps keep ledger order ahead of local records
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.transactions = merged;
    }

    /// Prepend a record.
    pub fn record(&mut self, record: TransactionRecord) {
        self.transactions.insert(0, record);
    }

    /// `amount` expressed in `mint`'s decimals, checked positive.
    pub fn token_amount(&self, mint: &Address, amount: Amount) -> Result<Amount, SessionError> {
        let holding = self
            .token(mint)
            .ok_or_else(|| SessionError::UnknownToken(mint.clone()))?;
        normalize_positive(amount, holding.decimals)
    }

    /// Check that `amount` of `mint` could be debited.
    pub fn check_token_debit(&self, mint: &Address, amount: Amount) -> Result<(), SessionError> {
        let holding = self
            .token(mint)
            .ok_or_else(|| SessionError::UnknownToken(mint.clone()))?;
        match holding.balance.checked_sub(amount) {
            Some(_) => Ok(()),
            None => Err(SessionError::InsufficientBalance {
                symbol: holding.symbol.clone(),
                needed: amount,
                available: holding.balance,
            }),
        }
    }

    /// Check that `amount` could be credited to `mint` without overflow.
    pub fn check_token_credit(&self, mint: &Address, amount: Amount) -> Result<(), SessionError> {
        let holding = self
            .token(mint)
            .ok_or_else(|| SessionError::UnknownToken(mint.clone()))?;
        holding
            .balance
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| SessionError::Validation("amount would overflow the balance".into()))
    }

    /// Check that `amount` of the native currency could be debited.
    pub fn check_native_debit(&self, amount: Amount) -> Result<(), SessionError> {
        match self.native_balance.checked_sub(amount) {
            Some(_) => Ok(()),
            None => Err(SessionError::InsufficientBalance {
                symbol: NATIVE_SYMBOL.to_string(),
                needed: amount,
                available: self.native_balance,
            }),
        }
    }

    /// Append a newly created token. Fails if the mint is already held.
    pub fn add_token(&mut self, holding: TokenHolding) -> Result<(), SessionError> {
        if self.token(&holding.address).is_some() {
            return Err(SessionError::Validation(format!(
                "token {} already exists",
                holding.address
            )));
        }
        self.tokens.push(holding);
        Ok(())
    }

    /// Increase a holding. Returns the new balance.
    pub fn credit_token(&mut self, mint: &Address, amount: Amount) -> Result<Amount, SessionError> {
        self.check_token_credit(mint, amount)?;
        let holding = self
            .token_mut(mint)
            .ok_or_else(|| SessionError::UnknownToken(mint.clone()))?;
        holding.balance = holding
            .balance
            .checked_add(amount)
            .ok_or_else(|| SessionError::Validation("amount would overflow the balance".into()))?;
        Ok(holding.balance)
    }

    /// Decrease a holding. Returns the new balance.
    pub fn debit_token(&mut self, mint: &Address, amount: Amount) -> Result<Amount, SessionError> {
        self.check_token_debit(mint, amount)?;
        let holding = self
            .token_mut(mint)
            .ok_or_else(|| SessionError::UnknownToken(mint.clone()))?;
        let symbol = holding.symbol.clone();
        let available = holding.balance;
        holding.balance = available
            .checked_sub(amount)
            .ok_or(SessionError::InsufficientBalance {
                symbol,
                needed: amount,
                available,
            })?;
        Ok(holding.balance)
    }

    /// Decrease the native balance. Returns the new balance.
    pub fn debit_native(&mut self, amount: Amount) -> Result<Amount, SessionError> {
        self.check_native_debit(amount)?;
        self.native_balance = self
            .native_balance
            .checked_sub(amount)
            .ok_or(SessionError::InsufficientBalance {
                symbol: NATIVE_SYMBOL.to_string(),
                needed: amount,
                available: self.native_balance,
            })?;
        Ok(self.native_balance)
    }
}

/// Rescale `amount` to `decimals` and require it to be non-zero.
pub fn normalize_positive(amount: Amount, decimals: u8) -> Result<Amount, SessionError> {
    let amount = amount.rescale(decimals)?;
    if amount.is_zero() {
        return Err(SessionError::Validation(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(amount)
}
