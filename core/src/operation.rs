/// Injected operations and the optimistic pending entries derived from them.
use serde::{Deserialize, Serialize};

use crate::amount::Mutez;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Reveal,
    Transaction,
    Delegation,
    Origination,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reveal => write!(f, "reveal"),
            Self::Transaction => write!(f, "transaction"),
            Self::Delegation => write!(f, "delegation"),
            Self::Origination => write!(f, "origination"),
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reveal" => Ok(Self::Reveal),
            "transaction" => Ok(Self::Transaction),
            "delegation" => Ok(Self::Delegation),
            "origination" => Ok(Self::Origination),
            other => Err(format!("Unknown operation kind: '{other}'")),
        }
    }
}

/// One content of an injected operation group.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OperationEffect {
    pub kind: OperationKind,
    #[serde(default)]
    pub amount: Option<Mutez>,
    #[serde(default)]
    pub destination: Option<String>,
}

/// Result of a submitted transfer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Operation {
    pub hash: String,
    pub effects: Vec<OperationEffect>,
}

/// Client-side record of a submitted but unconfirmed effect.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PendingOperationEntry {
    pub hash: String,
    pub kind: OperationKind,
    pub amount: Option<Mutez>,
    pub destination: Option<String>,
    /// Unix milliseconds.
    pub added_at: i64,
}

/// Emitted after a successful submission. The application hands it to its
/// own pending-operations registry.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferEvent {
    Succeeded {
        network: String,
        account: String,
        entries: Vec<PendingOperationEntry>,
    },
}

impl TransferEvent {
    pub fn entries(&self) -> &[PendingOperationEntry] {
        match self {
            Self::Succeeded { entries, .. } => entries,
        }
    }
}

/// One entry per effect, most recent-looking first, all stamped `added_at`.
pub fn pending_entries(operation: &Operation, added_at: i64) -> Vec<PendingOperationEntry> {
    operation
        .effects
        .iter()
        .rev()
        .map(|effect| PendingOperationEntry {
            hash: operation.hash.clone(),
            kind: effect.kind,
            amount: effect.amount,
            destination: effect.destination.clone(),
            added_at,
        })
        .collect()
}

pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reveal_then_transfer() -> Operation {
        Operation {
            hash: "ooTestHash".into(),
            effects: vec![
                OperationEffect {
                    kind: OperationKind::Reveal,
                    amount: None,
                    destination: None,
                },
                OperationEffect {
                    kind: OperationKind::Transaction,
                    amount: Some(Mutez(5_000_000)),
                    destination: Some("tz1dest".into()),
                },
            ],
        }
    }

    #[test]
    fn entries_are_reversed_and_share_the_timestamp() {
        let entries = pending_entries(&reveal_then_transfer(), 1_700_000_000_000);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, OperationKind::Transaction);
        assert_eq!(entries[0].amount, Some(Mutez(5_000_000)));
        assert_eq!(entries[0].destination.as_deref(), Some("tz1dest"));
        assert_eq!(entries[1].kind, OperationKind::Reveal);
        assert!(entries.iter().all(|e| e.hash == "ooTestHash"));
        assert!(entries.iter().all(|e| e.added_at == 1_700_000_000_000));
    }

    #[test]
    fn no_effects_no_entries() {
        let op = Operation {
            hash: "ooEmpty".into(),
            effects: vec![],
        };
        assert!(pending_entries(&op, 0).is_empty());
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            OperationKind::Reveal,
            OperationKind::Transaction,
            OperationKind::Delegation,
            OperationKind::Origination,
        ] {
            assert_eq!(kind.to_string().parse::<OperationKind>(), Ok(kind));
        }
    }
}
