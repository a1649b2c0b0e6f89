//! Line-oriented command shell over a [`WalletSession`].

use std::sync::Arc;

use soldash_nullables::NullConnector;
use soldash_types::{Address, Amount, TokenHolding, NATIVE_DECIMALS, NATIVE_SYMBOL};
use soldash_utils::abbreviate_address;
use soldash_wallet_core::display::{history_line, history_stats, HistoryFilter};
use soldash_wallet_core::{
    LedgerClient, Session, SessionEvent, WalletConnector, WalletSession,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

const HELP: &str = "\
commands:
  refresh                                  reload balances and history
  balance                                  show the native balance
  tokens                                   list token holdings
  history [send|receive|token]             list recent transactions, optionally filtered
  stats                                    count transactions and token types
  create <name> <symbol> <decimals>        create a new token
  mint <token> <amount> [recipient]        mint tokens (token = symbol or mint address)
  send-token <token> <amount> <recipient>  transfer tokens
  send-sol <amount> <recipient>            transfer SOL
  connect | disconnect                     toggle the demo wallet connection
  help | quit";

/// Lets the shell connect and disconnect the demo wallet.
pub struct Switch {
    connector: Arc<NullConnector>,
    address: Address,
}

impl Switch {
    pub fn new(connector: Arc<NullConnector>, address: Address) -> Self {
        Self { connector, address }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Refresh,
    Balance,
    Tokens,
    History(HistoryFilter),
    Stats,
    Create {
        name: String,
        symbol: String,
        decimals: u8,
    },
    Mint {
        token: String,
        amount: String,
        recipient: Option<String>,
    },
    SendToken {
        token: String,
        amount: String,
        recipient: String,
    },
    SendSol {
        amount: String,
        recipient: String,
    },
    Connect,
    Disconnect,
    Help,
    Quit,
}

impl ShellCommand {
    /// `Ok(None)` for a blank line.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = words.split_first() else {
            return Ok(None);
        };
        let owned = |s: &&str| (*s).to_string();
        let command = match (head, args) {
            ("refresh", []) => Self::Refresh,
            ("balance", []) => Self::Balance,
            ("tokens", []) => Self::Tokens,
            ("history", []) => Self::History(HistoryFilter::All),
            ("history", [filter]) => Self::History(filter.parse()?),
            ("stats", []) => Self::Stats,
            ("connect", []) => Self::Connect,
            ("disconnect", []) => Self::Disconnect,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            // the name may contain spaces; symbol and decimals are the last two words
            ("create", [name @ .., symbol, decimals]) if !name.is_empty() => Self::Create {
                name: name.join(" "),
                symbol: owned(symbol),
                decimals: decimals
                    .parse()
                    .map_err(|_| format!("decimals must be a number, got {decimals:?}"))?,
            },
            ("mint", [token, amount]) => Self::Mint {
                token: owned(token),
                amount: owned(amount),
                recipient: None,
            },
            ("mint", [token, amount, recipient]) => Self::Mint {
                token: owned(token),
                amount: owned(amount),
                recipient: Some(owned(recipient)),
            },
            ("send-token", [token, amount, recipient]) => Self::SendToken {
                token: owned(token),
                amount: owned(amount),
                recipient: owned(recipient),
            },
            ("send-sol", [amount, recipient]) => Self::SendSol {
                amount: owned(amount),
                recipient: owned(recipient),
            },
            (
                "refresh" | "balance" | "tokens" | "history" | "stats" | "connect" | "disconnect"
                | "create" | "mint" | "send-token" | "send-sol",
                _,
            ) => return Err(format!("wrong arguments for {head:?}, try `help`")),
            _ => return Err(format!("unknown command {head:?}, try `help`")),
        };
        Ok(Some(command))
    }
}

/// Find a holding by mint address or (case-insensitive) symbol.
fn resolve_token(session: &Session, token: &str) -> Option<TokenHolding> {
    session
        .tokens
        .iter()
        .find(|t| t.address.as_str() == token || t.symbol.eq_ignore_ascii_case(token))
        .cloned()
}

fn parse_amount(text: &str, decimals: u8) -> Option<Amount> {
    match Amount::parse(text, decimals) {
        Ok(amount) => Some(amount),
        Err(e) => {
            println!("✗ {e}");
            None
        }
    }
}

/// Read commands from stdin until `quit`, end of input or Ctrl-C.
pub async fn run<W, L>(session: &WalletSession<W, L>, switch: Option<&Switch>) -> anyhow::Result<()>
where
    W: WalletConnector,
    L: LedgerClient,
{
    let mut events = session.subscribe();
    if let Err(e) = session.sync_connection().await {
        tracing::warn!(error = %e, "initial load failed");
    }
    drain_events(&mut events);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                None
            }
        };
        let Some(line) = line else { break };

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("✗ {message}");
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }
        execute(session, switch, command).await;
        drain_events(&mut events);
    }
    Ok(())
}

async fn execute<W, L>(session: &WalletSession<W, L>, switch: Option<&Switch>, command: ShellCommand)
where
    W: WalletConnector,
    L: LedgerClient,
{
    // failures are reported through session events
    match command {
        ShellCommand::Refresh => {
            let _ = session.refresh().await;
        }
        ShellCommand::Balance => print_balance(&session.snapshot()),
        ShellCommand::Tokens => print_tokens(&session.snapshot()),
        ShellCommand::History(filter) => print_filtered_history(&session.snapshot(), filter),
        ShellCommand::Stats => print_stats(&session.snapshot()),
        ShellCommand::Create {
            name,
            symbol,
            decimals,
        } => {
            if let Ok(mint) = session.create_token(&name, &symbol, decimals).await {
                println!("  mint address: {mint}");
            }
        }
        ShellCommand::Mint {
            token,
            amount,
            recipient,
        } => {
            let Some(holding) = resolve_token(&session.snapshot(), &token) else {
                println!("✗ unknown token {token:?}");
                return;
            };
            let Some(amount) = parse_amount(&amount, holding.decimals) else {
                return;
            };
            let _ = session
                .mint_token(&holding.address, amount, recipient.as_deref())
                .await;
        }
        ShellCommand::SendToken {
            token,
            amount,
            recipient,
        } => {
            let Some(holding) = resolve_token(&session.snapshot(), &token) else {
                println!("✗ unknown token {token:?}");
                return;
            };
            let Some(amount) = parse_amount(&amount, holding.decimals) else {
                return;
            };
            let _ = session
                .transfer_token(&holding.address, amount, &recipient)
                .await;
        }
        ShellCommand::SendSol { amount, recipient } => {
            let Some(amount) = parse_amount(&amount, NATIVE_DECIMALS) else {
                return;
            };
            let _ = session.transfer_sol(amount, &recipient).await;
        }
        ShellCommand::Connect => toggle(session, switch, true).await,
        ShellCommand::Disconnect => toggle(session, switch, false).await,
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => {}
    }
}

async fn toggle<W, L>(session: &WalletSession<W, L>, switch: Option<&Switch>, connect: bool)
where
    W: WalletConnector,
    L: LedgerClient,
{
    let Some(switch) = switch else {
        println!("✗ this wallet is watch-only and cannot be switched");
        return;
    };
    if connect {
        switch.connector.connect(switch.address.clone());
    } else {
        switch.connector.disconnect();
    }
    let _ = session.sync_connection().await;
}

fn drain_events(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "dropped session events");
            }
            Err(_) => break,
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Connected(address) => {
            println!("● connected {}", abbreviate_address(address))
        }
        SessionEvent::Disconnected => println!("○ disconnected"),
        SessionEvent::Completed { message, .. } => println!("✓ {message}"),
        SessionEvent::Failed { operation, message } => {
            println!("✗ {} failed: {message}", operation.as_str())
        }
    }
}

pub fn print_balance(session: &Session) {
    match &session.address {
        Some(address) => println!("wallet   {address}"),
        None => println!("wallet   not connected"),
    }
    println!("balance  {} {NATIVE_SYMBOL}", session.native_balance);
}

pub fn print_tokens(session: &Session) {
    if session.tokens.is_empty() {
        println!("no tokens");
        return;
    }
    for token in &session.tokens {
        println!(
            "{:<6} {:>24}  {:<20} {}",
            token.symbol,
            token.balance.to_string(),
            token.name,
            abbreviate_address(&token.address)
        );
    }
}

pub fn print_history(session: &Session) {
    print_filtered_history(session, HistoryFilter::All);
}

fn print_filtered_history(session: &Session, filter: HistoryFilter) {
    let mut shown = session
        .transactions
        .iter()
        .filter(|record| filter.matches(record))
        .peekable();
    if shown.peek().is_none() {
        println!("no transactions");
        return;
    }
    for record in shown {
        println!("{}", history_line(record));
    }
}

fn print_stats(session: &Session) {
    let stats = history_stats(&session.transactions);
    println!("total        {}", stats.total);
    println!("sent         {}", stats.sent);
    println!("received     {}", stats.received);
    println!("token types  {}", stats.token_types);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_word_token_names() {
        assert_eq!(
            ShellCommand::parse("create My Token mtk 9").unwrap(),
            Some(ShellCommand::Create {
                name: "My Token".into(),
                symbol: "mtk".into(),
                decimals: 9,
            })
        );
    }

    #[test]
    fn mint_recipient_is_optional() {
        assert_eq!(
            ShellCommand::parse("mint TKN 5").unwrap(),
            Some(ShellCommand::Mint {
                token: "TKN".into(),
                amount: "5".into(),
                recipient: None,
            })
        );
        assert!(matches!(
            ShellCommand::parse("mint TKN 5 someone").unwrap(),
            Some(ShellCommand::Mint { recipient: Some(_), .. })
        ));
    }

    #[test]
    fn history_takes_an_optional_filter() {
        assert_eq!(
            ShellCommand::parse("history").unwrap(),
            Some(ShellCommand::History(HistoryFilter::All))
        );
        assert_eq!(
            ShellCommand::parse("history received").unwrap(),
            Some(ShellCommand::History(HistoryFilter::Received))
        );
        assert_eq!(
            ShellCommand::parse("history token").unwrap(),
            Some(ShellCommand::History(HistoryFilter::Token))
        );
        assert!(ShellCommand::parse("history swaps").is_err());
        assert!(ShellCommand::parse("history send token").is_err());
        assert_eq!(ShellCommand::parse("stats").unwrap(), Some(ShellCommand::Stats));
        assert!(ShellCommand::parse("stats all").is_err());
    }

    #[test]
    fn blank_and_bad_lines() {
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        assert!(ShellCommand::parse("create TKN 9").is_err());
        assert!(ShellCommand::parse("create Name TKN nine").is_err());
        assert!(ShellCommand::parse("send-sol 1").is_err());
        assert!(ShellCommand::parse("launch").is_err());
    }

    #[test]
    fn tokens_resolve_by_symbol_or_address() {
        let mint = Address::parse("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let mut session = Session::default();
        session
            .tokens
            .push(TokenHolding::empty(mint.clone(), "USD Coin", "USDC", 6).unwrap());

        assert_eq!(resolve_token(&session, "usdc").unwrap().address, mint);
        assert_eq!(resolve_token(&session, mint.as_str()).unwrap().symbol, "USDC");
        assert!(resolve_token(&session, "SAMO").is_none());
    }
}
