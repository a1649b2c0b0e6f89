//! End-to-end behavior of the session container against the nullable
//! connector, ledger and clock.

use std::sync::Arc;
use std::time::Duration;

use soldash_nullables::{NullClock, NullConnector, NullLedger};
use soldash_types::hash::digest_parts;
use soldash_types::{Address, Amount, TokenHolding, TransactionRecord, TxKind, TxStatus};
use soldash_wallet_core::{
    ErrorCategory, LedgerClient, LedgerError, Operation, SessionError, SessionEvent,
    SessionOptions, Submission, TransactionOutcome, WalletSession,
};

type TestSession = WalletSession<Arc<NullConnector>, Arc<NullLedger>, Arc<NullClock>>;

const START_MILLIS: u64 = 1_700_000_000_000;

fn owner() -> Address {
    Address::parse("8ezpz1s1YmrCuCxzLUdKpEDeWs4tH5xAMbZc6bL4hYEb").unwrap()
}

fn friend() -> Address {
    Address::parse("7iAZfkr5gWTa9xJqNsXQXnbZmgPZRfny3ABF6TJ5Xjef").unwrap()
}

fn tkn_mint() -> Address {
    Address::from_digest(&digest_parts(&[b"tkn"]))
}

struct Harness {
    session: TestSession,
    connector: Arc<NullConnector>,
    ledger: Arc<NullLedger>,
    clock: Arc<NullClock>,
}

fn harness_with(options: SessionOptions) -> Harness {
    let clock = Arc::new(NullClock::new(START_MILLIS));
    let connector = Arc::new(NullConnector::connected(owner()));
    let ledger = Arc::new(NullLedger::with_clock(clock.clone()));
    ledger.set_native_balance(&owner(), Amount::from_whole(2, 9));
    ledger.seed_holding(
        &owner(),
        &TokenHolding::new(tkn_mint(), "Test Token", "TKN", 0, Amount::from_whole(1000, 0))
            .unwrap(),
    );
    let session =
        WalletSession::with_clock(connector.clone(), ledger.clone(), clock.clone(), options);
    Harness {
        session,
        connector,
        ledger,
        clock,
    }
}

async fn connected_harness() -> Harness {
    let h = harness_with(SessionOptions::default());
    h.session.sync_connection().await.unwrap();
    h
}

fn tkn_balance(h: &Harness) -> Amount {
    h.session.snapshot().token(&tkn_mint()).unwrap().balance
}

#[tokio::test]
async fn connecting_loads_state_from_the_ledger() {
    let h = connected_harness().await;
    let snap = h.session.snapshot();
    assert_eq!(snap.address, Some(owner()));
    assert_eq!(snap.native_balance, Amount::from_whole(2, 9));
    assert_eq!(snap.tokens.len(), 1);
    assert_eq!(snap.tokens[0].symbol, "TKN");
    assert!(!snap.busy);
}

#[tokio::test]
async fn transfer_then_overdraft_is_refused() {
    let h = connected_harness().await;

    h.session
        .transfer_token(&tkn_mint(), Amount::from_whole(400, 0), friend().as_str())
        .await
        .unwrap();
    assert_eq!(tkn_balance(&h), Amount::from_whole(600, 0));
    let snap = h.session.snapshot();
    assert_eq!(snap.transactions[0].kind, TxKind::Send);
    assert_eq!(snap.transactions[0].to, Some(friend()));
    assert_eq!(snap.transactions[0].amount, Some(Amount::from_whole(400, 0)));
    let records = snap.transactions.len();

    let err = h
        .session
        .transfer_token(&tkn_mint(), Amount::from_whole(700, 0), friend().as_str())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InsufficientBalance);
    assert_eq!(tkn_balance(&h), Amount::from_whole(600, 0));
    assert_eq!(h.session.snapshot().transactions.len(), records);
    assert_eq!(h.ledger.submissions().len(), 1);
}

#[tokio::test]
async fn created_token_starts_empty_and_can_be_minted() {
    let h = connected_harness().await;

    let mint = h.session.create_token("My Token", "mtk", 9).await.unwrap();
    let snap = h.session.snapshot();
    let holding = snap.token(&mint).unwrap();
    assert_eq!(holding.name, "My Token");
    assert_eq!(holding.symbol, "MTK");
    assert_eq!(holding.decimals, 9);
    assert!(holding.balance.is_zero());
    assert_eq!(snap.transactions[0].kind, TxKind::Create);
    assert_eq!(snap.transactions[0].token_symbol.as_deref(), Some("MTK"));
    assert_eq!(snap.tokens.len(), 2);

    h.session
        .mint_token(&mint, Amount::from_whole(100, 0), None)
        .await
        .unwrap();
    let snap = h.session.snapshot();
    assert_eq!(snap.token(&mint).unwrap().balance, Amount::from_whole(100, 9));
    assert_eq!(snap.transactions[0].kind, TxKind::Mint);
    assert_eq!(snap.transactions[0].to, Some(owner()));
    assert_eq!(
        h.ledger.token_balance_of(&owner(), &mint),
        Some(Amount::from_whole(100, 9))
    );
}

#[tokio::test]
async fn minting_to_someone_else_does_not_credit_the_wallet() {
    let h = connected_harness().await;
    let mint = h.session.create_token("Gift", "GFT", 2).await.unwrap();

    h.session
        .mint_token(&mint, Amount::from_whole(5, 2), Some(friend().as_str()))
        .await
        .unwrap();

    let snap = h.session.snapshot();
    assert!(snap.token(&mint).unwrap().balance.is_zero());
    assert_eq!(snap.transactions[0].to, Some(friend()));
    assert_eq!(
        h.ledger.token_balance_of(&friend(), &mint),
        Some(Amount::from_whole(5, 2))
    );
}

#[tokio::test]
async fn sol_transfer_debits_the_native_balance() {
    let h = connected_harness().await;
    h.session
        .transfer_sol(Amount::parse("0.25", 9).unwrap(), friend().as_str())
        .await
        .unwrap();
    let snap = h.session.snapshot();
    assert_eq!(snap.native_balance, Amount::parse("1.75", 9).unwrap());
    assert_eq!(snap.transactions[0].token_symbol.as_deref(), Some("SOL"));
    assert_eq!(h.ledger.native_balance_of(&friend()), Amount::parse("0.25", 9).unwrap());

    let err = h
        .session
        .transfer_sol(Amount::from_whole(5, 9), friend().as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn operations_require_a_signing_wallet() {
    let h = harness_with(SessionOptions::default());
    h.connector.disconnect();
    h.session.sync_connection().await.unwrap();

    let err = h.session.create_token("Name", "SYM", 0).await.unwrap_err();
    assert_eq!(err, SessionError::NotConnected);
    assert_eq!(err.category(), ErrorCategory::NotConnected);

    h.connector.connect(owner());
    h.session.sync_connection().await.unwrap();
    h.connector.set_can_sign(false);
    let err = h
        .session
        .transfer_sol(Amount::lamports(1), friend().as_str())
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::CannotSign);
    assert_eq!(err.category(), ErrorCategory::NotConnected);
    assert!(h.ledger.submissions().is_empty());
}

#[tokio::test]
async fn invalid_input_never_reaches_the_ledger() {
    let h = connected_harness().await;

    let cases = [
        h.session.create_token("   ", "SYM", 0).await,
        h.session.create_token("Name", "TOOLONG", 0).await,
        h.session.create_token("Name", "SYM", 10).await,
    ];
    for result in cases {
        assert_eq!(result.unwrap_err().category(), ErrorCategory::Validation);
    }

    let zero = h
        .session
        .transfer_token(&tkn_mint(), Amount::zero(0), friend().as_str())
        .await
        .unwrap_err();
    assert_eq!(zero.category(), ErrorCategory::Validation);

    let bad_recipient = h
        .session
        .transfer_token(&tkn_mint(), Amount::from_whole(1, 0), "not-an-address")
        .await
        .unwrap_err();
    assert_eq!(bad_recipient.category(), ErrorCategory::Validation);

    let empty_recipient = h
        .session
        .transfer_sol(Amount::lamports(1), "  ")
        .await
        .unwrap_err();
    assert_eq!(empty_recipient.category(), ErrorCategory::Validation);

    let unknown = h
        .session
        .mint_token(&friend(), Amount::from_whole(1, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(unknown, SessionError::UnknownToken(_)));

    assert!(h.ledger.submissions().is_empty());
}

#[tokio::test]
async fn ledger_failure_leaves_state_untouched() {
    let h = connected_harness().await;
    let before = h.session.snapshot();

    h.ledger
        .fail_next_submit(LedgerError::Transport("connection reset".into()));
    let err = h
        .session
        .transfer_token(&tkn_mint(), Amount::from_whole(10, 0), friend().as_str())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::External);
    assert_eq!(h.session.snapshot(), before);

    h.ledger.set_next_status(TxStatus::Failed);
    let err = h
        .session
        .transfer_sol(Amount::lamports(10), friend().as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::External(LedgerError::Rejected(_))));
    assert_eq!(h.session.snapshot(), before);
}

#[tokio::test]
async fn pending_outcome_is_applied_and_marked() {
    let h = connected_harness().await;
    h.ledger.set_next_status(TxStatus::Pending);
    h.session
        .transfer_token(&tkn_mint(), Amount::from_whole(1, 0), friend().as_str())
        .await
        .unwrap();
    let snap = h.session.snapshot();
    assert_eq!(snap.transactions[0].status, TxStatus::Pending);
    assert_eq!(tkn_balance(&h), Amount::from_whole(999, 0));
}

#[tokio::test]
async fn overlapping_operation_is_rejected_as_busy() {
    let h = connected_harness().await;
    h.ledger.set_latency(Duration::from_millis(200));

    let mint = tkn_mint();
    let to = friend();
    let (first, second) = tokio::join!(
        h.session
            .transfer_token(&mint, Amount::from_whole(1, 0), to.as_str()),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(h.session.is_busy());
            assert!(h.session.snapshot().busy);
            h.session.create_token("Other", "OTH", 0).await
        }
    );

    first.unwrap();
    assert_eq!(second.unwrap_err(), SessionError::Busy);
    assert!(!h.session.is_busy());
    assert_eq!(h.ledger.submissions().len(), 1);
    assert_eq!(h.session.snapshot().tokens.len(), 1);
}

#[tokio::test]
async fn slow_ledger_times_out_and_releases_busy() {
    let h = harness_with(SessionOptions {
        request_timeout: Duration::from_millis(20),
        ..SessionOptions::default()
    });
    h.session.sync_connection().await.unwrap();
    h.ledger.set_latency(Duration::from_millis(500));

    let err = h
        .session
        .transfer_sol(Amount::lamports(1), friend().as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::External(LedgerError::Timeout(_))));
    assert!(!h.session.is_busy());
    assert_eq!(h.session.snapshot().native_balance, Amount::from_whole(2, 9));
}

#[tokio::test]
async fn disconnect_resets_balances_but_keeps_history() {
    let h = connected_harness().await;
    h.session
        .transfer_token(&tkn_mint(), Amount::from_whole(1, 0), friend().as_str())
        .await
        .unwrap();
    let mut events = h.session.subscribe();

    h.connector.disconnect();
    h.session.sync_connection().await.unwrap();

    let snap = h.session.snapshot();
    assert!(snap.address.is_none());
    assert!(snap.native_balance.is_zero());
    assert!(snap.tokens.is_empty());
    assert_eq!(snap.transactions.len(), 1);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Disconnected);

    // refresh without a wallet is a no-op
    h.session.refresh().await.unwrap();
    assert!(h.session.snapshot().tokens.is_empty());
}

#[tokio::test]
async fn refresh_replaces_state_and_merges_history() {
    let h = connected_harness().await;
    h.session
        .transfer_token(&tkn_mint(), Amount::from_whole(100, 0), friend().as_str())
        .await
        .unwrap();

    h.ledger
        .set_token_balance(&owner(), &tkn_mint(), Amount::from_whole(42, 0));
    h.ledger.set_native_balance(&owner(), Amount::lamports(7));
    h.clock.advance(1_000);
    h.session.refresh().await.unwrap();

    let snap = h.session.snapshot();
    assert_eq!(snap.native_balance, Amount::lamports(7));
    assert_eq!(tkn_balance(&h), Amount::from_whole(42, 0));
    // the ledger reports the same transfer; it must not appear twice
    assert_eq!(snap.transactions.len(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_state() {
    let h = connected_harness().await;
    let before = h.session.snapshot();
    h.ledger
        .fail_queries(Some(LedgerError::Rpc { code: -32005, message: "rate limited".into() }));

    let err = h.session.refresh().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::External);
    assert_eq!(h.session.snapshot(), before);
}

#[tokio::test]
async fn operations_publish_events() {
    let h = connected_harness().await;
    let mut events = h.session.subscribe();

    h.session
        .transfer_token(&tkn_mint(), Amount::from_whole(400, 0), friend().as_str())
        .await
        .unwrap();
    let _ = h
        .session
        .transfer_token(&tkn_mint(), Amount::from_whole(700, 0), friend().as_str())
        .await;

    match events.try_recv().unwrap() {
        SessionEvent::Completed { operation, message } => {
            assert_eq!(operation, Operation::TransferToken);
            assert_eq!(message, "Sent 400 TKN to 7iAZ...Xjef");
        }
        other => panic!("unexpected event {other:?}"),
    }
    match events.try_recv().unwrap() {
        SessionEvent::Failed { operation, .. } => {
            assert_eq!(operation, Operation::TransferToken)
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn switching_wallets_reloads_for_the_new_address() {
    let h = connected_harness().await;
    h.ledger.set_native_balance(&friend(), Amount::lamports(123));

    h.connector.connect(friend());
    h.session.sync_connection().await.unwrap();

    let snap = h.session.snapshot();
    assert_eq!(snap.address, Some(friend()));
    assert_eq!(snap.native_balance, Amount::lamports(123));
    assert!(snap.tokens.is_empty());
}

#[tokio::test]
async fn reconnect_during_transfer_keeps_the_record_and_reloads() {
    let h = connected_harness().await;
    h.ledger.set_latency(Duration::from_millis(200));
    let mint = tkn_mint();
    let to = friend();

    let (sent, reconnected) = tokio::join!(
        h.session
            .transfer_token(&mint, Amount::from_whole(400, 0), to.as_str()),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.connector.disconnect();
            h.session.sync_connection().await?;
            h.ledger.set_native_balance(&owner(), Amount::from_whole(5, 9));
            h.connector.connect(owner());
            h.session.sync_connection().await
        }
    );

    let signature = sent.unwrap();
    reconnected.unwrap();
    let snap = h.session.snapshot();
    assert!(!snap.busy);
    assert_eq!(snap.address, Some(owner()));
    assert_eq!(tkn_balance(&h), Amount::from_whole(600, 0));
    // reloaded from the ledger once the transfer finished
    assert_eq!(snap.native_balance, Amount::from_whole(5, 9));
    let sends: Vec<_> = snap
        .transactions
        .iter()
        .filter(|record| record.signature == signature)
        .collect();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].kind, TxKind::Send);
}

#[tokio::test]
async fn switching_wallets_during_transfer_lands_on_the_new_wallet() {
    let h = connected_harness().await;
    h.ledger.set_latency(Duration::from_millis(200));
    h.ledger.set_native_balance(&friend(), Amount::lamports(123));
    let mint = tkn_mint();
    let to = friend();

    let (sent, switched) = tokio::join!(
        h.session
            .transfer_token(&mint, Amount::from_whole(400, 0), to.as_str()),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.connector.connect(friend());
            h.session.sync_connection().await
        }
    );

    let signature = sent.unwrap();
    switched.unwrap();
    assert_eq!(
        h.ledger.token_balance_of(&owner(), &tkn_mint()),
        Some(Amount::from_whole(600, 0))
    );
    let snap = h.session.snapshot();
    assert_eq!(snap.address, Some(friend()));
    assert_eq!(snap.native_balance, Amount::lamports(123));
    assert_eq!(
        snap.token(&tkn_mint()).map(|t| t.balance),
        Some(Amount::from_whole(400, 0))
    );
    assert!(snap.transactions.iter().any(|r| r.signature == signature));
}

#[tokio::test]
async fn transfers_to_the_own_wallet_are_rejected() {
    let h = connected_harness().await;

    let err = h
        .session
        .transfer_token(&tkn_mint(), Amount::from_whole(1, 0), owner().as_str())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    let err = h
        .session
        .transfer_sol(Amount::lamports(1), owner().as_str())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    assert!(h.ledger.submissions().is_empty());
    assert_eq!(tkn_balance(&h), Amount::from_whole(1000, 0));
    assert_eq!(h.session.snapshot().native_balance, Amount::from_whole(2, 9));
}

/// Answers every mint creation with an address the wallet already holds.
struct ReusedMint {
    inner: Arc<NullLedger>,
    mint: Address,
}

impl LedgerClient for ReusedMint {
    async fn native_balance(&self, owner: &Address) -> Result<Amount, LedgerError> {
        self.inner.native_balance(owner).await
    }

    async fn token_holdings(&self, owner: &Address) -> Result<Vec<TokenHolding>, LedgerError> {
        self.inner.token_holdings(owner).await
    }

    async fn recent_transactions(
        &self,
        owner: &Address,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.inner.recent_transactions(owner, limit).await
    }

    async fn submit(&self, submission: &Submission) -> Result<TransactionOutcome, LedgerError> {
        let outcome = self.inner.submit(submission).await?;
        Ok(TransactionOutcome {
            mint: outcome.mint.map(|_| self.mint.clone()),
            ..outcome
        })
    }
}

#[tokio::test]
async fn duplicate_mint_from_the_ledger_is_still_recorded() {
    let h = harness_with(SessionOptions::default());
    let ledger = ReusedMint {
        inner: h.ledger.clone(),
        mint: tkn_mint(),
    };
    let session =
        WalletSession::with_clock(h.connector.clone(), ledger, h.clock.clone(), SessionOptions::default());
    session.sync_connection().await.unwrap();

    let mint = session.create_token("Again", "AGN", 0).await.unwrap();
    assert_eq!(mint, tkn_mint());

    let snap = session.snapshot();
    assert!(!snap.busy);
    assert_eq!(snap.transactions[0].kind, TxKind::Create);
    assert_eq!(snap.transactions[0].token_symbol.as_deref(), Some("AGN"));
    // the existing holding is kept, not duplicated
    let held: Vec<_> = snap.tokens.iter().filter(|t| t.address == tkn_mint()).collect();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].balance, Amount::from_whole(1000, 0));
}
