//! soldash: drive a wallet session from the terminal.

mod shell;

use anyhow::Context;
use clap::Parser;
use soldash_nullables::{NullConnector, NullLedger};
use soldash_types::hash::digest_parts;
use soldash_types::Address;
use soldash_utils::{init_logging, LogFormat};
use soldash_wallet_core::{
    DashboardConfig, LedgerBackend, LedgerClient, RpcLedgerClient, WalletConnector, WalletSession,
    WatchOnlyConnector,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::shell::Switch;

#[derive(Parser)]
#[command(name = "soldash", about = "Wallet dashboard shell")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "SOLDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Ledger backend: "null" (in-memory demo) or "rpc" (read-only).
    #[arg(long, value_enum, env = "SOLDASH_LEDGER")]
    ledger: Option<BackendArg>,

    /// JSON-RPC endpoint for the rpc backend.
    #[arg(long, env = "SOLDASH_RPC_URL")]
    rpc_url: Option<String>,

    /// Wallet address. Watched read-only with the rpc backend.
    #[arg(long, env = "SOLDASH_ADDRESS")]
    address: Option<Address>,

    /// Upper bound on a single ledger call, in seconds.
    #[arg(long, env = "SOLDASH_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SOLDASH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SOLDASH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BackendArg {
    Null,
    Rpc,
}

impl From<BackendArg> for LedgerBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Null => LedgerBackend::Null,
            BackendArg::Rpc => LedgerBackend::Rpc,
        }
    }
}

#[derive(Clone, Copy, clap::Subcommand)]
enum Command {
    /// Load the wallet once and print balance, tokens and history.
    Balance,
    /// Interactive command shell on stdin.
    Shell,
}

impl Cli {
    /// File config (or defaults) with flags and env vars applied on top.
    fn resolve_config(&self) -> anyhow::Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => DashboardConfig::default(),
        };
        if let Some(ledger) = self.ledger {
            config.ledger = ledger.into();
        }
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(address) = &self.address {
            config.watch_address = Some(address.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Wallet used by the null backend when no address is configured.
fn demo_address() -> Address {
    Address::from_digest(&digest_parts(&[b"soldash-demo-wallet"]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level);

    match config.ledger {
        LedgerBackend::Null => {
            let address = config.watch_address.clone().unwrap_or_else(demo_address);
            let connector = Arc::new(NullConnector::connected(address.clone()));
            let ledger = NullLedger::with_demo_data(&address)?.with_latency(config.null_latency());
            tracing::info!(
                wallet = %address,
                latency_ms = config.null_latency_ms,
                "using in-memory demo ledger"
            );
            let session =
                WalletSession::new(connector.clone(), ledger, config.session_options());
            let switch = Switch::new(connector, address);
            run(cli.command, session, Some(switch)).await
        }
        LedgerBackend::Rpc => {
            let ledger = RpcLedgerClient::new(config.rpc_url.clone())?;
            tracing::info!(url = %config.rpc_url, "using JSON-RPC ledger (read-only)");
            if config.watch_address.is_none() {
                tracing::warn!("no --address given, nothing to watch");
            }
            let connector = WatchOnlyConnector::new(config.watch_address.clone());
            let session = WalletSession::new(connector, ledger, config.session_options());
            run(cli.command, session, None).await
        }
    }
}

async fn run<W, L>(
    command: Command,
    session: WalletSession<W, L>,
    switch: Option<Switch>,
) -> anyhow::Result<()>
where
    W: WalletConnector,
    L: LedgerClient,
{
    match command {
        Command::Balance => {
            session.sync_connection().await?;
            let snapshot = session.snapshot();
            shell::print_balance(&snapshot);
            shell::print_tokens(&snapshot);
            shell::print_history(&snapshot);
            Ok(())
        }
        Command::Shell => shell::run(&session, switch.as_ref()).await,
    }
}
