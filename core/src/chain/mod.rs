/// Boundary to the blockchain SDK: balance, manager key, cost estimation
/// and transfer submission.
mod sandbox;

pub use sandbox::{SandboxAccount, SandboxChain, SandboxCosts, SandboxSeed};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::amount::Mutez;
use crate::operation::Operation;

/// Structured failures reported by the chain client.
///
/// The two conditions the send flow reacts to are typed variants so callers
/// never match on message text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// Emptying an implicit account that still has a delegate; the node
    /// refuses to leave it at zero balance.
    #[error("Cannot empty an implicit delegated account")]
    EmptyImplicitAccount,

    /// The user declined to sign.
    #[error("Declined")]
    Declined,

    /// Transport failure; may be retried.
    #[error("Network error: {0}")]
    Network(String),

    /// The node rejected the operation.
    #[error("{0}")]
    Rejected(String),
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Ghostnet,
    #[default]
    Sandbox,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Ghostnet => write!(f, "ghostnet"),
            Network::Sandbox => write!(f, "sandbox"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "ghostnet" | "testnet" => Ok(Self::Ghostnet),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(format!(
                "Unknown network: '{other}'. Use 'mainnet', 'ghostnet' or 'sandbox'."
            )),
        }
    }
}

/// Identifies the chain endpoint a client talks to. The checksum is part of
/// every cache key, so switching endpoint invalidates balances and estimates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainContext {
    pub network: Network,
    pub rpc_url: String,
    pub checksum: String,
}

impl ChainContext {
    pub fn new(network: Network, rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        let digest = Sha256::digest(format!("{network}:{rpc_url}").as_bytes());
        let checksum = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        Self {
            network,
            rpc_url,
            checksum,
        }
    }
}

/// Parameters of a plain tez transfer. `fee` is `None` for estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferParams {
    pub to: String,
    pub amount: Mutez,
    pub fee: Option<Mutez>,
}

impl TransferParams {
    pub fn new(to: impl Into<String>, amount: Mutez) -> Self {
        Self {
            to: to.into(),
            amount,
            fee: None,
        }
    }

    #[must_use]
    pub fn with_fee(mut self, fee: Mutez) -> Self {
        self.fee = Some(fee);
        self
    }
}

/// Cost estimate for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEstimate {
    /// Everything the sender pays besides the amount: baker fee plus burn.
    pub total_cost: Mutez,
    /// Minimal baker fee the node will accept.
    pub using_base_fee: Mutez,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The endpoint this client is bound to.
    fn context(&self) -> &ChainContext;

    /// Current spendable balance of `address`, always from the node.
    async fn fetch_balance(&self, address: &str) -> Result<Mutez, ClientError>;

    /// The manager key of `address`, or `None` if it was never revealed.
    async fn manager_key(&self, address: &str) -> Result<Option<String>, ClientError>;

    /// Estimate the costs of transferring `params.amount` from `source`.
    async fn estimate_transfer(
        &self,
        source: &str,
        params: &TransferParams,
    ) -> Result<TransferEstimate, ClientError>;

    /// Sign and inject a transfer from `source`.
    async fn submit_transfer(
        &self,
        source: &str,
        params: &TransferParams,
    ) -> Result<Operation, ClientError>;
}

/// Whether a manager-key lookup shows the account as revealed.
pub fn has_manager(key: Option<&str>) -> bool {
    key.is_some_and(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_depends_on_network_and_url() {
        let a = ChainContext::new(Network::Mainnet, "https://rpc.example");
        let b = ChainContext::new(Network::Ghostnet, "https://rpc.example");
        let c = ChainContext::new(Network::Mainnet, "https://rpc.example");
        assert_ne!(a.checksum, b.checksum);
        assert_eq!(a.checksum, c.checksum);
        assert_eq!(a.checksum.len(), 16);
    }

    #[test]
    fn parse_network() {
        assert_eq!("Mainnet".parse::<Network>(), Ok(Network::Mainnet));
        assert_eq!("testnet".parse::<Network>(), Ok(Network::Ghostnet));
        assert!("moon".parse::<Network>().is_err());
    }

    #[test]
    fn manager_presence() {
        assert!(has_manager(Some("edpkuBknW28nW72KG6RoHtYW7p12T6GKc7nAbwYX5m8Wd9sDVC9yav")));
        assert!(!has_manager(Some("")));
        assert!(!has_manager(None));
    }

    #[test]
    fn only_network_errors_are_transient() {
        assert!(ClientError::Network("timeout".into()).is_transient());
        assert!(!ClientError::Declined.is_transient());
        assert!(!ClientError::EmptyImplicitAccount.is_transient());
    }
}
