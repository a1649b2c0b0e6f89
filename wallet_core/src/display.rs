//! Text shown for transaction records in the history view, plus the
//! history tabs and summary counts.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use soldash_types::{Timestamp, TransactionRecord, TxKind, NATIVE_SYMBOL};
use soldash_utils::abbreviate_address;

/// Headline for a record, e.g. `Sent 1 SOL` or `Created MTK Token`.
pub fn title(record: &TransactionRecord) -> String {
    let symbol = record.token_symbol.as_deref().unwrap_or("tokens");
    let Some(amount) = record.amount else {
        return match record.kind {
            TxKind::Create => format!("Created {symbol} Token"),
            _ => "Transaction".to_string(),
        };
    };
    match record.kind {
        TxKind::Send => format!("Sent {amount} {symbol}"),
        TxKind::Receive => format!("Received {amount} {symbol}"),
        TxKind::Mint => format!("Minted {amount} {symbol}"),
        TxKind::Create => format!("Created {symbol} Token"),
    }
}

/// Second line: the counterparty when there is one, otherwise the time.
pub fn detail(record: &TransactionRecord) -> String {
    match (record.kind, &record.to, &record.from) {
        (TxKind::Send | TxKind::Mint, Some(to), _) => format!("To: {}", abbreviate_address(to)),
        (TxKind::Receive, _, Some(from)) => format!("From: {}", abbreviate_address(from)),
        _ => format_timestamp(record.timestamp),
    }
}

/// `YYYY-MM-DD HH:MM UTC`.
pub fn format_timestamp(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts.as_millis() as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// One line per record: title, detail, status and short signature.
pub fn history_line(record: &TransactionRecord) -> String {
    format!(
        "{:<28} {:<22} {:<9} {}",
        title(record),
        detail(record),
        record.status,
        record.signature.short()
    )
}

/// Which records a history listing shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryFilter {
    #[default]
    All,
    Sent,
    Received,
    /// Records of any asset other than the native currency.
    Token,
}

impl HistoryFilter {
    pub fn matches(self, record: &TransactionRecord) -> bool {
        match self {
            Self::All => true,
            Self::Sent => record.kind == TxKind::Send,
            Self::Received => record.kind == TxKind::Receive,
            Self::Token => record
                .token_symbol
                .as_deref()
                .is_some_and(|symbol| symbol != NATIVE_SYMBOL),
        }
    }
}

impl FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "send" | "sent" => Ok(Self::Sent),
            "receive" | "received" => Ok(Self::Received),
            "token" | "tokens" => Ok(Self::Token),
            other => Err(format!(
                "unknown history filter {other:?}, expected send, receive or token"
            )),
        }
    }
}

/// Counts shown above the history list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total: usize,
    pub sent: usize,
    pub received: usize,
    /// Distinct asset symbols across all records, the native currency included.
    pub token_types: usize,
}

pub fn history_stats(records: &[TransactionRecord]) -> HistoryStats {
    let symbols: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.token_symbol.as_deref())
        .collect();
    HistoryStats {
        total: records.len(),
        sent: records.iter().filter(|r| r.kind == TxKind::Send).count(),
        received: records.iter().filter(|r| r.kind == TxKind::Receive).count(),
        token_types: symbols.len(),
    }
}
