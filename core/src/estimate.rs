/// Base-fee estimation and the bounds derived from it.
///
/// The base fee is what the network takes for sending the *whole* balance to
/// a recipient: the cost of the transfer plus, for an account that has not
/// revealed its key yet, the reveal fee. It is found in two estimates: a
/// probe transfer gives a candidate maximum amount, and the cost of sending
/// that candidate is the base fee.
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::amount::Mutez;
use crate::balance::BalanceCache;
use crate::chain::{has_manager, ChainClient, TransferParams};
use crate::config::SendConfig;
use crate::error::{Result, SendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub base_fee: Mutez,
    /// Sender balance the estimate was computed against.
    pub balance: Mutez,
    /// Whether the sender's key was already revealed.
    pub revealed: bool,
}

/// Limits on amount and additional fee for a given balance and base fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBounds {
    pub max_additional_fee: Mutez,
    /// The entered additional fee, capped at `max_additional_fee`.
    pub safe_fee: Mutez,
    pub max_amount: Mutez,
}

impl FeeBounds {
    pub fn compute(balance: Mutez, base_fee: Mutez, additional_fee: Mutez, probe: Mutez) -> Self {
        let max_additional_fee = balance.saturating_sub(base_fee).saturating_sub(probe);
        let safe_fee = additional_fee.min(max_additional_fee);
        let max_amount = balance.saturating_sub(base_fee).saturating_sub(safe_fee);
        Self {
            max_additional_fee,
            safe_fee,
            max_amount,
        }
    }
}

pub struct FeeEstimator {
    client: Arc<dyn ChainClient>,
    balances: Arc<BalanceCache>,
    probe: Mutez,
    reveal_fee: Mutez,
    smoothing_delay: Duration,
}

impl FeeEstimator {
    pub fn new(client: Arc<dyn ChainClient>, balances: Arc<BalanceCache>, config: &SendConfig) -> Self {
        Self {
            client,
            balances,
            probe: config.probe_amount,
            reveal_fee: config.reveal_fee,
            smoothing_delay: config.smoothing_delay(),
        }
    }

    pub fn probe(&self) -> Mutez {
        self.probe
    }

    /// Estimate the base fee of sending from `account` to `recipient`.
    ///
    /// Failures are returned only after the smoothing delay.
    pub async fn estimate_base_fee(&self, account: &str, recipient: &str) -> Result<FeeEstimate> {
        match self.compute(account, recipient).await {
            Ok(estimate) => Ok(estimate),
            Err(err) => {
                if !err.is_artificial() {
                    debug!(account, recipient, error = %err, "base fee estimation failed");
                }
                tokio::time::sleep(self.smoothing_delay).await;
                Err(err)
            }
        }
    }

    async fn compute(&self, account: &str, recipient: &str) -> Result<FeeEstimate> {
        let balance = self
            .balances
            .refresh(self.client.as_ref(), account)
            .await
            .map_err(SendError::estimation)?;
        if balance.is_zero() {
            return Err(SendError::ZeroBalance);
        }

        let probe = self
            .client
            .estimate_transfer(account, &TransferParams::new(recipient, self.probe))
            .await
            .map_err(SendError::estimation)?;
        let manager = self
            .client
            .manager_key(account)
            .await
            .map_err(SendError::estimation)?;
        let revealed = has_manager(manager.as_deref());

        let mut candidate = balance.saturating_sub(probe.total_cost);
        if !revealed {
            candidate = candidate.saturating_sub(self.reveal_fee);
        }
        debug!(account, recipient, %balance, %candidate, revealed, "probing maximal transfer");

        let max = self
            .client
            .estimate_transfer(account, &TransferParams::new(recipient, candidate))
            .await
            .map_err(SendError::estimation)?;
        let mut base_fee = max.total_cost;
        if !revealed {
            base_fee = base_fee.saturating_add(self.reveal_fee);
        }

        if base_fee >= balance {
            return Err(SendError::NotEnoughFunds);
        }
        debug!(account, recipient, %base_fee, "estimated base fee");
        Ok(FeeEstimate {
            base_fee,
            balance,
            revealed,
        })
    }
}
