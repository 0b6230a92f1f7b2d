mod repl;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tezsend_core::commands::Command;
use tezsend_core::config::AppConfig;
use tezsend_core::{
    Account, AccountDirectory, PendingOperationStore, SandboxChain, SendSession, SessionCaches,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "tezsend", about = "tezsend: send form REPL with fee estimation", version)]
pub(crate) struct Cli {
    /// Config file (default: <config dir>/tezsend/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Account to send from, by name or address (default: first account)
    #[arg(long)]
    account: Option<String>,

    /// Run commands and exit. Separate several commands with ';',
    /// e.g. "to Bob; amount 1; send"
    #[arg(long)]
    cmd: Option<String>,

    /// Output in JSON format (useful with --cmd)
    #[arg(long)]
    json: bool,

    /// Directory of the pending-operations database (default: <data dir>/tezsend)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep pending operations in memory for this run only
    #[arg(long)]
    ephemeral: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn open_store(&self) -> Result<PendingOperationStore> {
        if self.ephemeral {
            return PendingOperationStore::open_in_memory();
        }
        match &self.data_dir {
            Some(dir) => PendingOperationStore::open(&dir.join("pending.db")),
            None => PendingOperationStore::open_default(),
        }
    }
}

/// Everything a session is built from; shared across account switches.
pub(crate) struct App {
    pub config: AppConfig,
    pub accounts: AccountDirectory,
    pub chain: Arc<SandboxChain>,
    pub store: Arc<PendingOperationStore>,
    pub caches: SessionCaches,
}

impl App {
    fn build(cli: &Cli) -> Result<Self> {
        let config = AppConfig::load(cli.config.as_deref())?;
        let accounts = config.directory().context("Invalid accounts in config")?;
        let chain = Arc::new(SandboxChain::new(config.sandbox.clone()));
        let store = Arc::new(cli.open_store()?);
        let caches = SessionCaches::new(&config.send);
        debug!(accounts = accounts.len(), "configuration loaded");
        Ok(Self {
            config,
            accounts,
            chain,
            store,
            caches,
        })
    }

    /// The account named by `--account`, or the first configured one.
    fn initial_account(&self, cli: &Cli) -> Result<Account> {
        match &cli.account {
            Some(input) => match self.accounts.lookup(input) {
                Some(acc) => Ok(acc.clone()),
                None => bail!("Unknown account '{input}'. Check the accounts in your config."),
            },
            None => self
                .accounts
                .first()
                .cloned()
                .context("No accounts configured."),
        }
    }

    pub fn session(&self, account: &Account) -> SendSession {
        info!(account = %account.pkh, name = %account.name, "opening send session");
        SendSession::new(
            self.chain.clone(),
            self.store.clone(),
            self.caches.clone(),
            account.pkh.clone(),
            &self.config.send,
        )
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    if json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let app = App::build(&cli)?;

    if let Some(cmd_str) = &cli.cmd {
        // One-shot mode
        run_oneshot(&cli, &app, cmd_str).await
    } else {
        // REPL mode
        repl::run_repl(&cli, &app).await
    }
}

async fn run_oneshot(cli: &Cli, app: &App, cmd_str: &str) -> Result<()> {
    let account = app.initial_account(cli)?;
    let session = app.session(&account);

    let commands = cmd_str
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Command::parse)
        .collect::<Result<Vec<_>>>()?;

    for command in commands {
        match command {
            Command::Exit => break,
            Command::Use { .. } => bail!("'use' is not available with --cmd. Pass --account instead."),
            command => {
                let output = command
                    .execute(&session, &app.accounts, &app.store, cli.json)
                    .await?;
                if !output.is_empty() {
                    println!("{output}");
                }
            }
        }
    }

    Ok(())
}
