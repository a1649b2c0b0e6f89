//! Ledger client over Solana JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use soldash_types::{
    Address, Amount, Signature, Timestamp, TokenHolding, TransactionRecord, TxKind, TxStatus,
    MAX_DECIMALS,
};

use crate::collab::{LedgerClient, Submission, TransactionOutcome};
use crate::error::LedgerError;

/// Program id of the SPL token program.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Public devnet endpoint.
pub const DEVNET_URL: &str = "https://api.devnet.solana.com";

/// Name given to holdings whose mint has no metadata.
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown Token";

/// HTTP client for a Solana JSON-RPC endpoint.
///
/// Supports the read side of [`LedgerClient`]. Submission needs a signer and
/// always fails with [`LedgerError::Unsupported`].
#[derive(Debug)]
pub struct RpcLedgerClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    /// Create a client targeting `url` (e.g. [`DEVNET_URL`]).
    pub fn new(url: impl Into<String>) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a JSON-RPC 2.0 request and decode its `result`.
    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "endpoint returned HTTP {}",
                response.status()
            )));
        }

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))?;
        envelope.into_result(method)
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl<T> RpcEnvelope<T> {
    fn into_result(self, method: &str) -> Result<T, LedgerError> {
        if let Some(err) = self.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| LedgerError::Decode(format!("{method}: missing result")))
    }
}

/// `{ context, value }` wrapper used by most account queries.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedTokenAccount {
    account: TokenAccount,
}

#[derive(Debug, Deserialize)]
struct TokenAccount {
    data: TokenAccountData,
}

#[derive(Debug, Deserialize)]
struct TokenAccountData {
    parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureInfo {
    signature: String,
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    block_time: Option<i64>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

/// Collapse token accounts into one holding per mint, in first-seen order.
///
/// Mints with more decimals than a holding supports are skipped.
fn holdings_from_accounts(accounts: Vec<KeyedTokenAccount>) -> Result<Vec<TokenHolding>, LedgerError> {
    let mut totals: Vec<(Address, Amount)> = Vec::new();

    for keyed in accounts {
        let info = keyed.account.data.parsed.info;
        let mint = Address::parse(&info.mint)
            .map_err(|e| LedgerError::Decode(format!("token account mint: {e}")))?;
        if info.token_amount.decimals > MAX_DECIMALS {
            tracing::warn!(%mint, decimals = info.token_amount.decimals, "skipping token with unsupported decimals");
            continue;
        }
        let raw: u128 = info.token_amount.amount.parse().map_err(|e| {
            LedgerError::Decode(format!("token amount {:?}: {e}", info.token_amount.amount))
        })?;
        let amount = Amount::from_raw(raw, info.token_amount.decimals);

        match totals.iter_mut().find(|(m, _)| *m == mint) {
            Some((_, total)) => {
                *total = total.checked_add(amount).ok_or_else(|| {
                    LedgerError::Decode(format!("inconsistent token accounts for mint {mint}"))
                })?;
            }
            None => totals.push((mint, amount)),
        }
    }

    totals
        .into_iter()
        .map(|(mint, balance)| {
            let symbol: String = mint.as_str().chars().take(4).collect();
            TokenHolding::new(mint, UNKNOWN_TOKEN_NAME, &symbol, balance.decimals(), balance)
                .map_err(|e| LedgerError::Decode(e.to_string()))
        })
        .collect()
}

/// History entry for a bare signature listing.
///
/// Signature listings carry no amounts or direction, so entries are recorded
/// as sends without an amount.
fn record_from_signature(info: SignatureInfo) -> TransactionRecord {
    let status = if info.err.is_some_and(|e| !e.is_null()) {
        TxStatus::Failed
    } else {
        match info.confirmation_status.as_deref() {
            Some("processed") => TxStatus::Pending,
            _ => TxStatus::Confirmed,
        }
    };
    TransactionRecord {
        signature: Signature::new(info.signature),
        kind: TxKind::Send,
        amount: None,
        token_symbol: None,
        timestamp: info
            .block_time
            .map(|secs| Timestamp::from_secs(secs.max(0) as u64))
            .unwrap_or(Timestamp::EPOCH),
        status,
        to: None,
        from: None,
    }
}

impl LedgerClient for RpcLedgerClient {
    async fn native_balance(&self, owner: &Address) -> Result<Amount, LedgerError> {
        let lamports: WithContext<u64> = self
            .rpc_call("getBalance", serde_json::json!([owner.as_str()]))
            .await?;
        Ok(Amount::lamports(lamports.value))
    }

    async fn token_holdings(&self, owner: &Address) -> Result<Vec<TokenHolding>, LedgerError> {
        let accounts: WithContext<Vec<KeyedTokenAccount>> = self
            .rpc_call(
                "getTokenAccountsByOwner",
                serde_json::json!([
                    owner.as_str(),
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed" }
                ]),
            )
            .await?;
        holdings_from_accounts(accounts.value)
    }

    async fn recent_transactions(
        &self,
        owner: &Address,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let infos: Vec<SignatureInfo> = self
            .rpc_call(
                "getSignaturesForAddress",
                serde_json::json!([owner.as_str(), { "limit": limit }]),
            )
            .await?;
        Ok(infos.into_iter().map(record_from_signature).collect())
    }

    async fn submit(&self, submission: &Submission) -> Result<TransactionOutcome, LedgerError> {
        Err(LedgerError::Unsupported(format!(
            "{} needs a transaction signer",
            submission.kind()
        )))
    }
}
