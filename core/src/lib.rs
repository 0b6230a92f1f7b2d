use std::path::PathBuf;

use anyhow::Context;

pub mod account;
pub mod address;
pub mod amount;
pub mod balance;
pub mod chain;
pub mod coalesce;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod estimate;
pub mod form;
pub mod operation;
pub mod pending;
pub mod session;
pub mod submit;

pub use account::{Account, AccountDirectory, AccountType};
pub use address::{AddressValidator, Base58CheckValidator, is_address_valid};
pub use amount::Mutez;
pub use chain::{ChainClient, ChainContext, ClientError, Network, SandboxChain};
pub use commands::Command;
pub use config::{AppConfig, SendConfig};
pub use error::SendError;
pub use estimate::{FeeBounds, FeeEstimate, FeeEstimator};
pub use form::{ErrorAlert, EstimationState, SendForm, SubmissionState};
pub use operation::{Operation, OperationKind, PendingOperationEntry, TransferEvent};
pub use pending::{PendingOperationStore, PendingOperationsRegistry};
pub use session::{SendSession, SessionCaches, SubmitResult};
pub use submit::{SubmitOutcome, TransferRequest, TransferSubmitter};

/// XDG-compliant data directory for the pending-operations database.
/// Linux: `~/.local/share/tezsend/`, macOS: `~/Library/Application Support/tezsend/`
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Cannot determine data directory")?
        .join("tezsend");
    Ok(dir)
}
