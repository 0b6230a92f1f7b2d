/// Pending-operations registry: where successful transfers are recorded
/// for optimistic display until the chain confirms them.
///
/// `PendingOperationStore` is the SQLite-backed registry, keyed by
/// (network, account) so several accounts can share one DB.
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::amount::Mutez;
use crate::operation::{PendingOperationEntry, TransferEvent};

pub trait PendingOperationsRegistry: Send + Sync {
    fn record(&self, event: &TransferEvent) -> Result<()>;
}

pub struct PendingOperationStore {
    conn: Mutex<Connection>,
}

/// Default DB location: platform data directory + `tezsend/pending.db`
pub fn default_db_path() -> Result<PathBuf> {
    Ok(crate::data_dir()?.join("pending.db"))
}

impl PendingOperationStore {
    /// Open (or create) the store at the default location.
    pub fn open_default() -> Result<Self> {
        Self::open(&default_db_path()?)
    }

    /// Open (or create) the store at `path`, creating private parent dirs.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let conn = Connection::open(path).context("Failed to open pending operations database")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Self::with_connection(conn)
    }

    /// Open a store that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS pending_operations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                network     TEXT    NOT NULL,
                account     TEXT    NOT NULL,
                hash        TEXT    NOT NULL,
                kind        TEXT    NOT NULL,
                amount      INTEGER,
                destination TEXT,
                added_at    INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pending_account
                ON pending_operations (network, account, added_at DESC);

            CREATE INDEX IF NOT EXISTS idx_pending_hash
                ON pending_operations (hash);",
        )
        .context("Failed to initialize pending operations schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append entries in the given order.
    pub fn insert(&self, network: &str, account: &str, entries: &[PendingOperationEntry]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("Failed to begin transaction")?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO pending_operations (
                    network, account, hash, kind, amount, destination, added_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .context("Failed to prepare insert statement")?;
            for entry in entries {
                stmt.execute(params![
                    network,
                    account,
                    entry.hash,
                    entry.kind.to_string(),
                    entry.amount.map(|a| a.as_u64() as i64),
                    entry.destination,
                    entry.added_at,
                ])
                .context("Failed to insert pending operation")?;
            }
        }
        tx.commit().context("Failed to commit pending operations")?;
        Ok(())
    }

    /// Newest batch first; entries of one batch keep their insertion order.
    pub fn list(&self, network: &str, account: &str) -> Result<Vec<PendingOperationEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT hash, kind, amount, destination, added_at
                 FROM pending_operations
                 WHERE network = ?1 AND account = ?2
                 ORDER BY added_at DESC, id ASC",
            )
            .context("Failed to prepare query")?;

        let rows = stmt
            .query_map(params![network, account], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .context("Failed to query pending operations")?;

        let mut entries = Vec::new();
        for row in rows {
            let (hash, kind, amount, destination, added_at) = row.context("Failed to read row")?;
            entries.push(PendingOperationEntry {
                hash,
                kind: kind.parse().map_err(anyhow::Error::msg)?,
                amount: amount.map(|a| Mutez(a as u64)),
                destination,
                added_at,
            });
        }
        Ok(entries)
    }

    /// Drop every entry of a confirmed operation. Returns the number removed.
    pub fn remove(&self, hash: &str) -> Result<usize> {
        self.conn()
            .execute("DELETE FROM pending_operations WHERE hash = ?1", params![hash])
            .context("Failed to remove pending operation")
    }
}

impl PendingOperationsRegistry for PendingOperationStore {
    fn record(&self, event: &TransferEvent) -> Result<()> {
        match event {
            TransferEvent::Succeeded {
                network,
                account,
                entries,
            } => self.insert(network, account, entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;

    fn entry(hash: &str, kind: OperationKind, added_at: i64) -> PendingOperationEntry {
        PendingOperationEntry {
            hash: hash.into(),
            kind,
            amount: (kind == OperationKind::Transaction).then_some(Mutez(1_500_000)),
            destination: (kind == OperationKind::Transaction).then(|| "tz1dest".to_string()),
            added_at,
        }
    }

    fn event(account: &str, entries: Vec<PendingOperationEntry>) -> TransferEvent {
        TransferEvent::Succeeded {
            network: "sandbox".into(),
            account: account.into(),
            entries,
        }
    }

    #[test]
    fn record_and_list() {
        let store = PendingOperationStore::open_in_memory().unwrap();
        store
            .record(&event(
                "tz1me",
                vec![
                    entry("ooA", OperationKind::Transaction, 1_000),
                    entry("ooA", OperationKind::Reveal, 1_000),
                ],
            ))
            .unwrap();

        let listed = store.list("sandbox", "tz1me").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, OperationKind::Transaction);
        assert_eq!(listed[0].amount, Some(Mutez(1_500_000)));
        assert_eq!(listed[0].destination.as_deref(), Some("tz1dest"));
        assert_eq!(listed[1].kind, OperationKind::Reveal);
        assert_eq!(listed[1].amount, None);
    }

    #[test]
    fn newest_batch_first() {
        let store = PendingOperationStore::open_in_memory().unwrap();
        store.record(&event("tz1me", vec![entry("ooOld", OperationKind::Transaction, 1_000)])).unwrap();
        store.record(&event("tz1me", vec![entry("ooNew", OperationKind::Transaction, 2_000)])).unwrap();

        let hashes: Vec<_> = store
            .list("sandbox", "tz1me")
            .unwrap()
            .into_iter()
            .map(|e| e.hash)
            .collect();
        assert_eq!(hashes, vec!["ooNew", "ooOld"]);
    }

    #[test]
    fn isolation_by_network_and_account() {
        let store = PendingOperationStore::open_in_memory().unwrap();
        store.record(&event("tz1me", vec![entry("ooA", OperationKind::Transaction, 1)])).unwrap();
        assert!(store.list("sandbox", "tz1other").unwrap().is_empty());
        assert!(store.list("mainnet", "tz1me").unwrap().is_empty());
    }

    #[test]
    fn remove_drops_every_entry_of_an_operation() {
        let store = PendingOperationStore::open_in_memory().unwrap();
        store
            .record(&event(
                "tz1me",
                vec![
                    entry("ooA", OperationKind::Transaction, 1_000),
                    entry("ooA", OperationKind::Reveal, 1_000),
                ],
            ))
            .unwrap();
        store.record(&event("tz1me", vec![entry("ooB", OperationKind::Transaction, 5_000)])).unwrap();

        assert_eq!(store.remove("ooA").unwrap(), 2);
        assert_eq!(store.remove("ooA").unwrap(), 0);
        let left = store.list("sandbox", "tz1me").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].hash, "ooB");
    }

    #[test]
    fn persists_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("pending.db");
        {
            let store = PendingOperationStore::open(&path).unwrap();
            store.record(&event("tz1me", vec![entry("ooA", OperationKind::Transaction, 1)])).unwrap();
        }
        let store = PendingOperationStore::open(&path).unwrap();
        assert_eq!(store.list("sandbox", "tz1me").unwrap().len(), 1);
    }
}
