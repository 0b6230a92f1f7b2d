use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::address::AddressValidator;
use crate::amount::Mutez;
use crate::chain::{ChainClient, ClientError, TransferParams};
use crate::config::SendConfig;
use crate::error::{Result, SendError};
use crate::estimate::FeeBounds;
use crate::operation::{now_millis, pending_entries, Operation, PendingOperationEntry};

/// A transfer ready to be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: Mutez,
    /// Paid on top of the base fee the node asks for.
    pub additional_fee: Mutez,
}

impl TransferRequest {
    /// Local checks that must pass before anything is sent to the node.
    pub fn validate(&self, bounds: &FeeBounds, validator: &dyn AddressValidator) -> Result<()> {
        if self.recipient.is_empty() {
            return Err(SendError::InvalidRecipient("Required".into()));
        }
        if !validator.is_valid(&self.recipient) {
            return Err(SendError::InvalidRecipient("Invalid address".into()));
        }
        if self.amount.is_zero() {
            return Err(SendError::InvalidAmount("Required".into()));
        }
        if self.amount > bounds.max_amount {
            return Err(SendError::InvalidAmount(format!("Maximal: {}", bounds.max_amount)));
        }
        if self.additional_fee > bounds.max_additional_fee {
            return Err(SendError::InvalidFee(format!(
                "Maximal: {}",
                bounds.max_additional_fee
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Sent {
        operation: Operation,
        entries: Vec<PendingOperationEntry>,
    },
    /// The user declined to sign. Nothing changed.
    Cancelled,
}

pub struct TransferSubmitter {
    client: Arc<dyn ChainClient>,
    probe: Mutez,
    smoothing_delay: Duration,
}

impl TransferSubmitter {
    pub fn new(client: Arc<dyn ChainClient>, config: &SendConfig) -> Self {
        Self {
            client,
            probe: config.probe_amount,
            smoothing_delay: config.smoothing_delay(),
        }
    }

    /// Submit `request` from `account` with fee = additional fee + the
    /// node's base fee for this exact transfer.
    pub async fn submit(&self, account: &str, request: &TransferRequest) -> Result<SubmitOutcome> {
        match self.send(account, request).await {
            Ok(operation) => {
                let entries = pending_entries(&operation, now_millis());
                info!(
                    account,
                    recipient = %request.recipient,
                    amount = %request.amount,
                    hash = %operation.hash,
                    "transfer submitted"
                );
                Ok(SubmitOutcome::Sent { operation, entries })
            }
            Err(ClientError::Declined) => {
                info!(account, "transfer declined");
                Ok(SubmitOutcome::Cancelled)
            }
            Err(err) => {
                warn!(account, recipient = %request.recipient, error = %err, "transfer failed");
                tokio::time::sleep(self.smoothing_delay).await;
                Err(SendError::submission(err))
            }
        }
    }

    async fn send(&self, account: &str, request: &TransferRequest) -> std::result::Result<Operation, ClientError> {
        let params = TransferParams::new(request.recipient.clone(), request.amount);
        let estimate = self.client.estimate_transfer(account, &params).await?;
        let fee = request.additional_fee.saturating_add(estimate.using_base_fee);

        match self
            .client
            .submit_transfer(account, &params.clone().with_fee(fee))
            .await
        {
            Err(ClientError::EmptyImplicitAccount) => {
                // Leave one probe amount behind so the account is not emptied.
                let fee = fee.saturating_sub(self.probe);
                warn!(account, %fee, "account would be emptied, retrying with a lower fee");
                self.client
                    .submit_transfer(account, &params.with_fee(fee))
                    .await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Base58CheckValidator;
    use crate::chain::{SandboxAccount, SandboxChain, SandboxCosts, SandboxSeed};
    use crate::operation::OperationKind;

    fn alice() -> String {
        SandboxChain::derive_address("alice")
    }

    fn bob() -> String {
        SandboxChain::derive_address("bob")
    }

    fn setup(revealed: bool) -> (Arc<SandboxChain>, TransferSubmitter) {
        let chain = Arc::new(SandboxChain::new(SandboxSeed {
            accounts: vec![
                SandboxAccount {
                    address: alice(),
                    balance: Mutez(10_000_000),
                    revealed,
                    delegated: false,
                },
                SandboxAccount {
                    address: bob(),
                    balance: Mutez(1),
                    revealed: true,
                    delegated: false,
                },
            ],
            costs: SandboxCosts {
                transaction_fee: Mutez(500),
                ..SandboxCosts::default()
            },
        }));
        let submitter = TransferSubmitter::new(chain.clone(), &SendConfig::default());
        (chain, submitter)
    }

    fn request(amount: u64, fee: u64) -> TransferRequest {
        TransferRequest {
            recipient: bob(),
            amount: Mutez(amount),
            additional_fee: Mutez(fee),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fee_is_additional_plus_base() {
        let (chain, submitter) = setup(true);
        let outcome = submitter.submit(&alice(), &request(5_000_000, 100)).await.unwrap();

        let submissions = chain.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].fee, Some(Mutez(600)));
        assert_eq!(submissions[0].amount, Mutez(5_000_000));

        let SubmitOutcome::Sent { operation, entries } = outcome else {
            panic!("expected Sent");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash, operation.hash);
        assert_eq!(entries[0].kind, OperationKind::Transaction);
        assert_eq!(entries[0].destination.as_deref(), Some(bob().as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_entry_comes_last() {
        let (_chain, submitter) = setup(false);
        let outcome = submitter.submit(&alice(), &request(1_000_000, 0)).await.unwrap();
        let SubmitOutcome::Sent { entries, .. } = outcome else {
            panic!("expected Sent");
        };
        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![OperationKind::Transaction, OperationKind::Reveal]);
        assert_eq!(entries[0].added_at, entries[1].added_at);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_account_retries_once_with_lower_fee() {
        let (chain, submitter) = setup(true);
        chain.fail_next_submit(ClientError::EmptyImplicitAccount);

        let outcome = submitter.submit(&alice(), &request(1_000, 100)).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Sent { .. }));
        let fees: Vec<_> = chain.submissions().iter().map(|p| p.fee).collect();
        assert_eq!(fees, vec![Some(Mutez(600)), Some(Mutez(599))]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_retry_is_a_submission_failure() {
        let (chain, submitter) = setup(true);
        chain.fail_next_submit(ClientError::EmptyImplicitAccount);
        chain.fail_next_submit(ClientError::EmptyImplicitAccount);

        let err = submitter.submit(&alice(), &request(1_000, 100)).await.unwrap_err();
        assert!(matches!(err, SendError::SubmissionFailed(_)));
        assert_eq!(chain.submissions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_are_not_retried() {
        let (chain, submitter) = setup(true);
        chain.fail_next_submit(ClientError::Network("connection reset".into()));

        let err = submitter.submit(&alice(), &request(1_000, 100)).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(chain.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn decline_is_cancelled() {
        let (chain, submitter) = setup(true);
        chain.fail_next_submit(ClientError::Declined);

        let outcome = submitter.submit(&alice(), &request(1_000, 100)).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Cancelled);
        assert_eq!(chain.account(&alice()).unwrap().balance, Mutez(10_000_000));
    }

    #[tokio::test(start_paused = true)]
    async fn estimate_failure_fails_the_submission() {
        let (chain, submitter) = setup(true);
        chain.fail_next_estimate(ClientError::Rejected("gas_exhausted".into()));

        let err = submitter.submit(&alice(), &request(1_000, 100)).await.unwrap_err();
        assert!(matches!(err, SendError::SubmissionFailed(ref m) if m.contains("gas_exhausted")));
        assert!(chain.submissions().is_empty());
    }

    fn bounds() -> FeeBounds {
        FeeBounds::compute(Mutez(10_000_000), Mutez(1_420), Mutez(100), Mutez(1))
    }

    #[test]
    fn validate_accepts_request_within_bounds() {
        assert!(request(5_000_000, 100).validate(&bounds(), &Base58CheckValidator).is_ok());
    }

    #[test]
    fn validate_rejects_amount_above_max() {
        let max = bounds().max_amount;
        let err = request(max.as_u64() + 1, 100)
            .validate(&bounds(), &Base58CheckValidator)
            .unwrap_err();
        assert_eq!(err, SendError::InvalidAmount(format!("Maximal: {max}")));
    }

    #[test]
    fn validate_rejects_zero_amount_and_bad_recipient() {
        let err = request(0, 100).validate(&bounds(), &Base58CheckValidator).unwrap_err();
        assert!(matches!(err, SendError::InvalidAmount(_)));

        let mut req = request(1, 100);
        req.recipient = "tz1notanaddress".into();
        let err = req.validate(&bounds(), &Base58CheckValidator).unwrap_err();
        assert_eq!(err, SendError::InvalidRecipient("Invalid address".into()));
    }

    #[test]
    fn validate_rejects_fee_above_max() {
        let b = FeeBounds::compute(Mutez(1_000), Mutez(400), Mutez(0), Mutez(1));
        let err = request(1, 600).validate(&b, &Base58CheckValidator).unwrap_err();
        assert!(matches!(err, SendError::InvalidFee(_)));
    }
}
