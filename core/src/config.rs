use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountDirectory, AccountType};
use crate::amount::Mutez;
use crate::balance::BalancePolicy;
use crate::chain::{SandboxAccount, SandboxChain, SandboxSeed};

/// Amounts and timings of the send flow. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Amount used to probe the cost of a transfer.
    pub probe_amount: Mutez,
    /// Added to the base fee when the sender has not revealed its key yet.
    pub reveal_fee: Mutez,
    /// Initial and "recommended" additional fee.
    pub recommended_fee: Mutez,
    /// Delay before an estimation or submission failure is surfaced.
    pub smoothing_delay_ms: u64,
    pub coalesce_window_ms: u64,
    pub focus_throttle_ms: u64,
    pub balance_freshness_ms: u64,
    pub balance_retries: u32,
    pub balance_retry_delay_ms: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            probe_amount: Mutez(1),
            reveal_fee: Mutez(1_420),
            recommended_fee: Mutez(100),
            smoothing_delay_ms: 300,
            coalesce_window_ms: 30_000,
            focus_throttle_ms: 10_000,
            balance_freshness_ms: 20_000,
            balance_retries: 2,
            balance_retry_delay_ms: 500,
        }
    }
}

impl SendConfig {
    pub fn smoothing_delay(&self) -> Duration {
        Duration::from_millis(self.smoothing_delay_ms)
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }

    pub fn focus_throttle(&self) -> Duration {
        Duration::from_millis(self.focus_throttle_ms)
    }

    pub fn balance_policy(&self) -> BalancePolicy {
        BalancePolicy {
            freshness: Duration::from_millis(self.balance_freshness_ms),
            retries: self.balance_retries,
            retry_delay: Duration::from_millis(self.balance_retry_delay_ms),
        }
    }
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub send: SendConfig,
    pub accounts: Vec<Account>,
    /// Initial state of the in-memory ledger the REPL runs against.
    pub sandbox: SandboxSeed,
}

impl Default for AppConfig {
    fn default() -> Self {
        let alice = SandboxChain::derive_address("alice");
        let bob = SandboxChain::derive_address("bob");
        Self {
            send: SendConfig::default(),
            accounts: vec![
                Account::new(alice.clone(), "Alice", AccountType::Generated),
                Account::new(bob.clone(), "Bob", AccountType::Imported),
            ],
            sandbox: SandboxSeed {
                accounts: vec![
                    SandboxAccount {
                        address: alice,
                        balance: Mutez(10_000_000),
                        revealed: true,
                        delegated: false,
                    },
                    SandboxAccount {
                        address: bob,
                        balance: Mutez(500_000),
                        revealed: false,
                        delegated: false,
                    },
                ],
                ..SandboxSeed::default()
            },
        }
    }
}

impl AppConfig {
    /// Linux: `~/.config/tezsend/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(dir.join("tezsend").join("config.json"))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing file at the default location yields the defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn directory(&self) -> Result<AccountDirectory> {
        AccountDirectory::new(self.accounts.clone())
    }
}
