/// State of the send form.
///
/// Every transition is a plain method on `SendForm`; nothing here touches
/// the network. `SendSession` drives the async parts and feeds their
/// results back through `finish_estimation` / `finish_submit`.
use std::fmt;
use std::sync::Arc;

use crate::account::{Account, AccountDirectory};
use crate::address::AddressValidator;
use crate::amount::Mutez;
use crate::config::SendConfig;
use crate::error::{Result, SendError};
use crate::estimate::{FeeBounds, FeeEstimate};
use crate::operation::Operation;
use crate::submit::{SubmitOutcome, TransferRequest};

const BURN_HINT: &str = "Minimal fee for this transaction is greater than your balance. \
A large fee may be due because you are sending funds to an empty Manager account. \
That requires a one-time burn fee;";

#[derive(Debug, Clone, PartialEq)]
pub enum EstimationState {
    Idle,
    Loading,
    Ready(FeeEstimate),
    Failed(SendError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded(Operation),
    Failed(SendError),
}

/// Identifies the estimation a result belongs to. Results whose ticket no
/// longer matches the form are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EstimateTicket {
    pub recipient: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Estimation failed; the form is still usable for a different recipient.
    Warning,
    /// Submission failed.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorAlert {
    pub kind: AlertKind,
    pub title: String,
    pub description: Vec<String>,
    /// Underlying message for unexpected failures.
    pub detail: Option<String>,
}

impl ErrorAlert {
    fn for_error(kind: AlertKind, err: &SendError) -> Self {
        match err {
            SendError::NotEnoughFunds => Self {
                kind,
                title: "Not enough funds".into(),
                description: vec![BURN_HINT.into()],
                detail: None,
            },
            SendError::ZeroBalance => Self {
                kind,
                title: "Failed".into(),
                description: vec!["Your Balance is zero.".into()],
                detail: None,
            },
            other => {
                let action = match kind {
                    AlertKind::Error => "send",
                    AlertKind::Warning => "estimate",
                };
                Self {
                    kind,
                    title: "Failed".into(),
                    description: vec![
                        format!("Unable to {action} transaction to provided Recipient."),
                        "This may happen because:".into(),
                        format!("- {BURN_HINT}"),
                        "- Network or other tech issue.".into(),
                    ],
                    detail: Some(other.to_string()),
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct SendForm {
    account: String,
    context: String,
    balance: Option<Mutez>,
    recipient: String,
    amount: Option<Mutez>,
    fee: Mutez,
    estimation: EstimationState,
    submission: SubmissionState,
    probe: Mutez,
    recommended_fee: Mutez,
    validator: Arc<dyn AddressValidator>,
}

impl fmt::Debug for SendForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendForm")
            .field("account", &self.account)
            .field("context", &self.context)
            .field("balance", &self.balance)
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .field("fee", &self.fee)
            .field("estimation", &self.estimation)
            .field("submission", &self.submission)
            .finish()
    }
}

impl SendForm {
    pub fn new(
        account: impl Into<String>,
        context: impl Into<String>,
        config: &SendConfig,
        validator: Arc<dyn AddressValidator>,
    ) -> Self {
        Self {
            account: account.into(),
            context: context.into(),
            balance: None,
            recipient: String::new(),
            amount: None,
            fee: config.recommended_fee,
            estimation: EstimationState::Idle,
            submission: SubmissionState::Idle,
            probe: config.probe_amount,
            recommended_fee: config.recommended_fee,
            validator,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn balance(&self) -> Option<Mutez> {
        self.balance
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> Option<Mutez> {
        self.amount
    }

    pub fn fee(&self) -> Mutez {
        self.fee
    }

    pub fn recommended_fee(&self) -> Mutez {
        self.recommended_fee
    }

    pub fn estimation(&self) -> &EstimationState {
        &self.estimation
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn estimate(&self) -> Option<&FeeEstimate> {
        match &self.estimation {
            EstimationState::Ready(est) => Some(est),
            _ => None,
        }
    }

    pub fn set_balance(&mut self, balance: Mutez) {
        self.balance = Some(balance);
    }

    /// Set the recipient (whitespace is dropped). Returns `true` when the
    /// value changed and is a valid address, i.e. a new estimation is due.
    pub fn set_recipient(&mut self, input: &str) -> bool {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned == self.recipient {
            return false;
        }
        self.recipient = cleaned;
        self.estimation = EstimationState::Idle;
        if matches!(self.submission, SubmissionState::Failed(_)) {
            self.submission = SubmissionState::Idle;
        }
        self.recipient_filled()
    }

    pub fn clean_recipient(&mut self) {
        self.set_recipient("");
    }

    pub fn set_amount(&mut self, amount: Option<Mutez>) {
        self.amount = amount;
    }

    /// Set the additional fee, capped at the current maximum. Returns the stored value.
    pub fn set_fee(&mut self, fee: Mutez) -> Mutez {
        self.fee = match self.bounds() {
            Some(b) => fee.min(b.max_additional_fee),
            None => fee,
        };
        self.fee
    }

    /// Fill the amount with the maximum. `None` while no estimate is available.
    pub fn set_max_amount(&mut self) -> Option<Mutez> {
        let max = self.bounds()?.max_amount;
        self.amount = Some(max);
        Some(max)
    }

    pub fn set_recommended_fee(&mut self) {
        self.fee = self.recommended_fee;
    }

    /// Mark an estimation as started. A current estimate for the same
    /// recipient stays visible while it is revalidated.
    pub fn begin_estimation(&mut self) -> Option<EstimateTicket> {
        if !self.recipient_filled() {
            return None;
        }
        if !matches!(self.estimation, EstimationState::Ready(_)) {
            self.estimation = EstimationState::Loading;
        }
        Some(self.ticket())
    }

    /// Apply an estimation result. Returns `false` if it was stale.
    pub fn finish_estimation(&mut self, ticket: &EstimateTicket, result: Result<FeeEstimate>) -> bool {
        if *ticket != self.ticket() {
            return false;
        }
        self.estimation = match result {
            Ok(est) => {
                self.balance = Some(est.balance);
                EstimationState::Ready(est)
            }
            Err(err) => EstimationState::Failed(err),
        };
        // A fee typed before the estimate arrived is capped now.
        if let Some(bounds) = self.bounds() {
            self.fee = self.fee.min(bounds.max_additional_fee);
        }
        true
    }

    /// Validate the inputs and mark the form as submitting.
    pub fn begin_submit(&mut self) -> Result<TransferRequest> {
        if matches!(self.submission, SubmissionState::Submitting) {
            return Err(SendError::NotReady("A transfer is already being submitted.".into()));
        }
        let request = self.validate()?;
        self.submission = SubmissionState::Submitting;
        Ok(request)
    }

    pub fn finish_submit(&mut self, result: &Result<SubmitOutcome>) {
        match result {
            Ok(SubmitOutcome::Sent { operation, .. }) => {
                self.reset_after_send();
                self.submission = SubmissionState::Succeeded(operation.clone());
            }
            Ok(SubmitOutcome::Cancelled) => self.submission = SubmissionState::Idle,
            Err(err) => self.submission = SubmissionState::Failed(err.clone()),
        }
    }

    /// Clear recipient and amount, restore the recommended fee.
    pub fn reset_after_send(&mut self) {
        self.recipient.clear();
        self.amount = None;
        self.fee = self.recommended_fee;
        self.estimation = EstimationState::Idle;
    }

    fn ticket(&self) -> EstimateTicket {
        EstimateTicket {
            recipient: self.recipient.clone(),
            context: self.context.clone(),
        }
    }

    pub fn bounds(&self) -> Option<FeeBounds> {
        let est = self.estimate()?;
        let balance = self.balance.unwrap_or(est.balance);
        Some(FeeBounds::compute(balance, est.base_fee, self.fee, self.probe))
    }

    /// Build the transfer request, or the first validation error.
    pub fn validate(&self) -> Result<TransferRequest> {
        if self.recipient.is_empty() {
            return Err(SendError::InvalidRecipient("Required".into()));
        }
        if !self.recipient_filled() {
            return Err(SendError::InvalidRecipient("Invalid address".into()));
        }
        let bounds = match (&self.estimation, self.bounds()) {
            (EstimationState::Failed(err), _) => return Err(err.clone()),
            (EstimationState::Loading, _) => {
                return Err(SendError::NotReady("Fee estimation is still running.".into()))
            }
            (_, Some(bounds)) => bounds,
            _ => return Err(SendError::NotReady("Fee has not been estimated yet.".into())),
        };
        let request = TransferRequest {
            recipient: self.recipient.clone(),
            amount: self.amount.unwrap_or_default(),
            additional_fee: bounds.safe_fee,
        };
        request.validate(&bounds, self.validator.as_ref())?;
        Ok(request)
    }

    /// Error caption for the amount field, if any.
    pub fn amount_error(&self) -> Option<String> {
        let amount = self.amount?;
        if amount.is_zero() {
            return Some("Required".into());
        }
        let bounds = self.bounds()?;
        (amount > bounds.max_amount).then(|| format!("Maximal: {}", bounds.max_amount))
    }

    pub fn recipient_filled(&self) -> bool {
        !self.recipient.is_empty() && self.validator.is_valid(&self.recipient)
    }

    /// The user's own account the recipient points at, if any.
    pub fn filled_account<'a>(&self, accounts: &'a AccountDirectory) -> Option<&'a Account> {
        if !self.recipient_filled() {
            return None;
        }
        accounts.find(&self.recipient)
    }

    /// Accounts offered as quick recipients.
    pub fn other_accounts<'a>(&self, accounts: &'a AccountDirectory) -> Vec<&'a Account> {
        accounts.others(&self.account)
    }

    /// Amount, fee and submit are shown once an estimate (or its error) is in.
    pub fn rest_displayed(&self) -> bool {
        self.recipient_filled()
            && matches!(
                self.estimation,
                EstimationState::Ready(_) | EstimationState::Failed(_)
            )
    }

    pub fn estimating_displayed(&self) -> bool {
        self.recipient_filled() && matches!(self.estimation, EstimationState::Loading)
    }

    pub fn can_submit(&self) -> bool {
        self.recipient_filled()
            && matches!(self.estimation, EstimationState::Ready(_))
            && !matches!(self.submission, SubmissionState::Submitting)
    }

    /// Submission errors take precedence over estimation errors.
    pub fn alert(&self) -> Option<ErrorAlert> {
        if let SubmissionState::Failed(err) = &self.submission {
            return Some(ErrorAlert::for_error(AlertKind::Error, err));
        }
        match &self.estimation {
            EstimationState::Failed(err) => Some(ErrorAlert::for_error(AlertKind::Warning, err)),
            _ => None,
        }
    }
}
