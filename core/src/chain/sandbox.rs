/// In-memory ledger implementing `ChainClient`.
///
/// Backs the REPL when no node is configured and doubles as the test
/// client: failures can be queued per call kind and every estimate and
/// submission is recorded.
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ChainClient, ChainContext, ClientError, Network, TransferEstimate, TransferParams};
use crate::address::{self, AddressKind};
use crate::amount::Mutez;
use crate::operation::{Operation, OperationEffect, OperationKind};

const OPERATION_HASH_PREFIX: [u8; 2] = [5, 116];
const SANDBOX_RPC_URL: &str = "sandbox://local";

/// Cost model of the sandbox node.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SandboxCosts {
    /// Minimal baker fee of a transaction.
    pub transaction_fee: Mutez,
    /// Storage burn for funding an empty implicit destination.
    pub allocation_burn: Mutez,
    /// Fee of the reveal an unrevealed sender has to include.
    pub reveal_fee: Mutez,
    /// Artificial delay applied to every call.
    pub latency_ms: u64,
}

impl Default for SandboxCosts {
    fn default() -> Self {
        Self {
            transaction_fee: Mutez(1_420),
            allocation_burn: Mutez(257_000),
            reveal_fee: Mutez(1_420),
            latency_ms: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SandboxAccount {
    pub address: String,
    pub balance: Mutez,
    #[serde(default = "default_revealed")]
    pub revealed: bool,
    #[serde(default)]
    pub delegated: bool,
}

fn default_revealed() -> bool {
    true
}

/// Initial ledger state, loaded from the application config.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct SandboxSeed {
    pub accounts: Vec<SandboxAccount>,
    pub costs: SandboxCosts,
}

#[derive(Default)]
struct Ledger {
    accounts: HashMap<String, SandboxAccount>,
    counter: u64,
    balance_failures: VecDeque<ClientError>,
    estimate_failures: VecDeque<ClientError>,
    submit_failures: VecDeque<ClientError>,
    balance_calls: usize,
    estimates: Vec<TransferParams>,
    submissions: Vec<TransferParams>,
}

pub struct SandboxChain {
    context: ChainContext,
    costs: SandboxCosts,
    ledger: Mutex<Ledger>,
}

impl SandboxChain {
    pub fn new(seed: SandboxSeed) -> Self {
        let accounts = seed
            .accounts
            .into_iter()
            .map(|a| (a.address.clone(), a))
            .collect();
        Self {
            context: ChainContext::new(Network::Sandbox, SANDBOX_RPC_URL),
            costs: seed.costs,
            ledger: Mutex::new(Ledger {
                accounts,
                ..Ledger::default()
            }),
        }
    }

    /// Deterministic tz1 address for a seed string.
    pub fn derive_address(seed: &str) -> String {
        let digest = Sha256::digest(seed.as_bytes());
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&digest[..20]);
        address::encode_address(AddressKind::Tz1, &hash)
    }

    pub fn costs(&self) -> SandboxCosts {
        self.costs
    }

    pub fn account(&self, address: &str) -> Option<SandboxAccount> {
        self.ledger().accounts.get(address).cloned()
    }

    pub fn set_account(&self, account: SandboxAccount) {
        self.ledger()
            .accounts
            .insert(account.address.clone(), account);
    }

    pub fn fail_next_balance(&self, err: ClientError) {
        self.ledger().balance_failures.push_back(err);
    }

    pub fn fail_next_estimate(&self, err: ClientError) {
        self.ledger().estimate_failures.push_back(err);
    }

    pub fn fail_next_submit(&self, err: ClientError) {
        self.ledger().submit_failures.push_back(err);
    }

    pub fn balance_calls(&self) -> usize {
        self.ledger().balance_calls
    }

    /// Every estimate request seen so far, in order.
    pub fn estimates(&self) -> Vec<TransferParams> {
        self.ledger().estimates.clone()
    }

    /// Every submission attempt seen so far, in order.
    pub fn submissions(&self) -> Vec<TransferParams> {
        self.ledger().submissions.clone()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn delay(&self) {
        if self.costs.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.costs.latency_ms)).await;
        }
    }

    /// Baker fee plus the burn for allocating an empty implicit destination.
    fn transfer_cost(&self, ledger: &Ledger, to: &str) -> Result<TransferEstimate, ClientError> {
        let kind = address::parse_address(to)
            .map_err(|e| ClientError::Rejected(format!("Invalid destination '{to}': {e}")))?;
        let allocated = ledger
            .accounts
            .get(to)
            .is_some_and(|a| !a.balance.is_zero());
        let burn = if kind.is_implicit() && !allocated {
            self.costs.allocation_burn
        } else {
            Mutez::ZERO
        };
        Ok(TransferEstimate {
            total_cost: self.costs.transaction_fee.saturating_add(burn),
            using_base_fee: self.costs.transaction_fee,
        })
    }

    fn reveal_cost(&self, sender: &SandboxAccount) -> Mutez {
        if sender.revealed {
            Mutez::ZERO
        } else {
            self.costs.reveal_fee
        }
    }

    fn operation_hash(source: &str, counter: u64) -> String {
        let digest = Sha256::digest(format!("{source}:{counter}").as_bytes());
        address::encode_base58check(&OPERATION_HASH_PREFIX, &digest)
    }
}

#[async_trait]
impl ChainClient for SandboxChain {
    fn context(&self) -> &ChainContext {
        &self.context
    }

    async fn fetch_balance(&self, address: &str) -> Result<Mutez, ClientError> {
        self.delay().await;
        let mut ledger = self.ledger();
        ledger.balance_calls += 1;
        if let Some(err) = ledger.balance_failures.pop_front() {
            return Err(err);
        }
        Ok(ledger
            .accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default())
    }

    async fn manager_key(&self, address: &str) -> Result<Option<String>, ClientError> {
        self.delay().await;
        let ledger = self.ledger();
        Ok(ledger
            .accounts
            .get(address)
            .filter(|a| a.revealed)
            .map(|a| {
                let digest = Sha256::digest(a.address.as_bytes());
                address::encode_base58check(&[13, 15, 37, 217], &digest)
            }))
    }

    async fn estimate_transfer(
        &self,
        source: &str,
        params: &TransferParams,
    ) -> Result<TransferEstimate, ClientError> {
        self.delay().await;
        let mut ledger = self.ledger();
        ledger.estimates.push(params.clone());
        if let Some(err) = ledger.estimate_failures.pop_front() {
            return Err(err);
        }

        let estimate = self.transfer_cost(&ledger, &params.to)?;
        let sender = ledger
            .accounts
            .get(source)
            .ok_or_else(|| ClientError::Rejected(format!("Unknown source account {source}")))?;
        let needed = params
            .amount
            .saturating_add(estimate.total_cost)
            .saturating_add(self.reveal_cost(sender));
        if needed > sender.balance {
            return Err(ClientError::Rejected(format!(
                "Balance too low: {} needed, {} available",
                needed, sender.balance
            )));
        }
        Ok(estimate)
    }

    async fn submit_transfer(
        &self,
        source: &str,
        params: &TransferParams,
    ) -> Result<Operation, ClientError> {
        self.delay().await;
        let mut ledger = self.ledger();
        ledger.submissions.push(params.clone());
        if let Some(err) = ledger.submit_failures.pop_front() {
            return Err(err);
        }

        let estimate = self.transfer_cost(&ledger, &params.to)?;
        let fee = params
            .fee
            .ok_or_else(|| ClientError::Rejected("Missing fee".into()))?;
        if fee < estimate.using_base_fee {
            return Err(ClientError::Rejected(format!(
                "Fee too low: {} offered, {} required",
                fee, estimate.using_base_fee
            )));
        }

        let sender = ledger
            .accounts
            .get(source)
            .cloned()
            .ok_or_else(|| ClientError::Rejected(format!("Unknown source account {source}")))?;
        let burn = estimate.total_cost.saturating_sub(estimate.using_base_fee);
        let debit = params
            .amount
            .saturating_add(fee)
            .saturating_add(burn)
            .saturating_add(self.reveal_cost(&sender));
        if debit > sender.balance {
            return Err(ClientError::Rejected(format!(
                "Balance too low: {} needed, {} available",
                debit, sender.balance
            )));
        }
        if sender.delegated && debit == sender.balance {
            return Err(ClientError::EmptyImplicitAccount);
        }

        let mut effects = Vec::with_capacity(2);
        if !sender.revealed {
            effects.push(OperationEffect {
                kind: OperationKind::Reveal,
                amount: None,
                destination: None,
            });
        }
        effects.push(OperationEffect {
            kind: OperationKind::Transaction,
            amount: Some(params.amount),
            destination: Some(params.to.clone()),
        });

        if let Some(s) = ledger.accounts.get_mut(source) {
            s.balance = s.balance.saturating_sub(debit);
            s.revealed = true;
        }
        let dest = ledger
            .accounts
            .entry(params.to.clone())
            .or_insert_with(|| SandboxAccount {
                address: params.to.clone(),
                balance: Mutez::ZERO,
                revealed: false,
                delegated: false,
            });
        dest.balance = dest.balance.saturating_add(params.amount);

        ledger.counter += 1;
        Ok(Operation {
            hash: Self::operation_hash(source, ledger.counter),
            effects,
        })
    }
}
