//! Domain error type for the send flow.

use thiserror::Error;

use crate::chain::ClientError;

/// Typed error enum for estimation and submission, allowing the form to
/// render a specific alert instead of inspecting opaque messages.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SendError {
    /// The refreshed sender balance is exactly zero.
    #[error("Your balance is zero.")]
    ZeroBalance,

    /// The minimal fee for this transfer is not below the balance.
    #[error("Not enough funds: minimal fee for this transaction is greater than your balance.")]
    NotEnoughFunds,

    /// An upstream cost estimate failed.
    #[error("Unable to estimate transaction: {0}")]
    EstimationFailed(String),

    /// An upstream transfer submission failed.
    #[error("Unable to send transaction: {0}")]
    SubmissionFailed(String),

    /// Recipient is missing or does not pass address validation.
    #[error("{0}")]
    InvalidRecipient(String),

    /// Amount is missing, zero, malformed or above the maximum.
    #[error("{0}")]
    InvalidAmount(String),

    /// Additional fee is malformed or above the maximum.
    #[error("{0}")]
    InvalidFee(String),

    /// The form is not in a state that allows the requested action.
    #[error("{0}")]
    NotReady(String),
}

impl SendError {
    /// Expected, friendly errors that the form shows without the
    /// generic "this may happen because" hints.
    pub fn is_artificial(&self) -> bool {
        matches!(self, Self::ZeroBalance | Self::NotEnoughFunds)
    }

    /// Errors produced by local validation, before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRecipient(_) | Self::InvalidAmount(_) | Self::InvalidFee(_) | Self::NotReady(_)
        )
    }

    pub(crate) fn estimation(err: ClientError) -> Self {
        Self::EstimationFailed(err.to_string())
    }

    pub(crate) fn submission(err: ClientError) -> Self {
        Self::SubmissionFailed(err.to_string())
    }
}

/// Alias for `std::result::Result<T, SendError>`.
pub type Result<T> = std::result::Result<T, SendError>;
