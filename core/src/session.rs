use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::address::Base58CheckValidator;
use crate::amount::Mutez;
use crate::balance::BalanceCache;
use crate::chain::{ChainClient, ChainContext, ClientError};
use crate::coalesce::{Coalescer, Throttle};
use crate::config::SendConfig;
use crate::error::Result;
use crate::estimate::{FeeEstimate, FeeEstimator};
use crate::form::SendForm;
use crate::operation::TransferEvent;
use crate::pending::PendingOperationsRegistry;
use crate::submit::{SubmitOutcome, TransferSubmitter};

/// (account, recipient, context checksum)
type EstimateKey = (String, String, String);

/// Caches that outlive a single session, e.g. across account switches.
#[derive(Clone)]
pub struct SessionCaches {
    pub balances: Arc<BalanceCache>,
    pub estimates: Arc<Coalescer<EstimateKey, Result<FeeEstimate>>>,
}

impl SessionCaches {
    pub fn new(config: &SendConfig) -> Self {
        Self {
            balances: Arc::new(BalanceCache::new(config.balance_policy())),
            estimates: Arc::new(Coalescer::new(config.coalesce_window())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Sent(TransferEvent),
    /// The user declined to sign.
    Cancelled,
    /// Another submission was already in flight.
    Ignored,
}

/// Resets the in-flight flag however the submission ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The send form of one account on one chain endpoint.
///
/// Recreate the session when the account or endpoint changes; pass the same
/// `SessionCaches` to keep balances and estimates shared.
pub struct SendSession {
    client: Arc<dyn ChainClient>,
    registry: Arc<dyn PendingOperationsRegistry>,
    caches: SessionCaches,
    account: String,
    config: SendConfig,
    estimator: Arc<FeeEstimator>,
    submitter: TransferSubmitter,
    focus: Throttle,
    form: Mutex<SendForm>,
    submitting: AtomicBool,
}

impl SendSession {
    pub fn new(
        client: Arc<dyn ChainClient>,
        registry: Arc<dyn PendingOperationsRegistry>,
        caches: SessionCaches,
        account: impl Into<String>,
        config: &SendConfig,
    ) -> Self {
        let account = account.into();
        let estimator = Arc::new(FeeEstimator::new(
            client.clone(),
            caches.balances.clone(),
            config,
        ));
        let submitter = TransferSubmitter::new(client.clone(), config);
        let form = SendForm::new(
            account.clone(),
            client.context().checksum.clone(),
            config,
            Arc::new(Base58CheckValidator),
        );
        Self {
            client,
            registry,
            caches,
            account,
            config: config.clone(),
            estimator,
            submitter,
            focus: Throttle::new(config.focus_throttle()),
            form: Mutex::new(form),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn context(&self) -> &ChainContext {
        self.client.context()
    }

    pub fn config(&self) -> &SendConfig {
        &self.config
    }

    /// Snapshot of the form state.
    pub fn form(&self) -> SendForm {
        self.lock_form().clone()
    }

    fn lock_form(&self) -> MutexGuard<'_, SendForm> {
        self.form.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sender balance, served from cache while fresh.
    pub async fn balance(&self) -> std::result::Result<Mutez, ClientError> {
        let balance = self
            .caches
            .balances
            .balance(self.client.as_ref(), &self.account)
            .await?;
        self.lock_form().set_balance(balance);
        Ok(balance)
    }

    /// Balance of any address, e.g. one of the user's other accounts.
    pub async fn balance_of(&self, address: &str) -> std::result::Result<Mutez, ClientError> {
        self.caches
            .balances
            .balance(self.client.as_ref(), address)
            .await
    }

    /// Update the recipient and estimate the base fee if it became a new,
    /// valid address. Returns whether an estimation ran.
    pub async fn set_recipient(&self, input: &str) -> bool {
        let changed = self.lock_form().set_recipient(input);
        if changed {
            self.refresh_estimate().await;
        }
        changed
    }

    pub fn clean_recipient(&self) {
        self.lock_form().clean_recipient();
    }

    pub fn set_amount(&self, amount: Option<Mutez>) {
        self.lock_form().set_amount(amount);
    }

    pub fn set_fee(&self, fee: Mutez) -> Mutez {
        self.lock_form().set_fee(fee)
    }

    pub fn set_max_amount(&self) -> Option<Mutez> {
        self.lock_form().set_max_amount()
    }

    pub fn set_recommended_fee(&self) {
        self.lock_form().set_recommended_fee();
    }

    /// Estimate for the current recipient, joining any estimation for the
    /// same key still inside the coalescing window. `None` if the recipient
    /// is not a valid address.
    pub async fn refresh_estimate(&self) -> Option<Result<FeeEstimate>> {
        let ticket = self.lock_form().begin_estimation()?;
        let result = self.fetch_estimate(&ticket.recipient).await;
        if !self.lock_form().finish_estimation(&ticket, result.clone()) {
            debug!(recipient = %ticket.recipient, "dropping stale estimate");
        }
        Some(result)
    }

    /// Coalesced base-fee estimate for `recipient`.
    pub async fn fetch_estimate(&self, recipient: &str) -> Result<FeeEstimate> {
        let estimator = self.estimator.clone();
        let account = self.account.clone();
        let to = recipient.to_string();
        self.caches
            .estimates
            .run(self.estimate_key(recipient), move || async move {
                estimator.estimate_base_fee(&account, &to).await
            })
            .await
    }

    fn estimate_key(&self, recipient: &str) -> EstimateKey {
        (
            self.account.clone(),
            recipient.to_string(),
            self.client.context().checksum.clone(),
        )
    }

    /// The form regained focus. Re-estimates unless the last focus was
    /// within the throttle interval. Returns whether it re-estimated.
    pub async fn on_focus(&self) -> bool {
        let recipient = {
            let form = self.lock_form();
            if !form.recipient_filled() {
                return false;
            }
            form.recipient().to_string()
        };
        if !self.focus.ready() {
            debug!("focus revalidation throttled");
            return false;
        }
        self.caches
            .estimates
            .invalidate(&self.estimate_key(&recipient))
            .await;
        self.refresh_estimate().await;
        true
    }

    /// Submit the transfer described by the form.
    ///
    /// Validation errors are returned without touching the network. A call
    /// made while another submission is in flight returns `Ignored`.
    pub async fn submit(&self) -> Result<SubmitResult> {
        if self.submitting.swap(true, Ordering::AcqRel) {
            return Ok(SubmitResult::Ignored);
        }
        let _in_flight = InFlight(&self.submitting);

        let request = self.lock_form().begin_submit()?;
        let outcome = self.submitter.submit(&self.account, &request).await;
        self.lock_form().finish_submit(&outcome);

        let (operation, entries) = match outcome? {
            SubmitOutcome::Sent { operation, entries } => (operation, entries),
            SubmitOutcome::Cancelled => return Ok(SubmitResult::Cancelled),
        };

        let event = TransferEvent::Succeeded {
            network: self.client.context().network.to_string(),
            account: self.account.clone(),
            entries,
        };
        if let Err(e) = self.registry.record(&event) {
            warn!(hash = %operation.hash, error = %e, "failed to record pending operations");
        }

        self.caches
            .balances
            .invalidate(self.client.as_ref(), &self.account)
            .await;
        let account = self.account.clone();
        self.caches
            .estimates
            .invalidate_where(|k| k.0 == account)
            .await;

        Ok(SubmitResult::Sent(event))
    }
}
