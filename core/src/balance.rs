/// Balance cache keyed by (account, chain context).
///
/// Reads serve a cached value while it is fresh; `refresh` always goes to the
/// node and overwrites the cached value. Transient network failures are
/// retried a bounded number of times.
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::amount::Mutez;
use crate::chain::{ChainClient, ClientError};

const BALANCE_CACHE_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BalanceKey {
    account: String,
    checksum: String,
}

#[derive(Debug, Clone, Copy)]
struct CachedBalance {
    value: Mutez,
    fetched_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancePolicy {
    /// How long a fetched balance is served without asking the node.
    pub freshness: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(20),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

pub struct BalanceCache {
    policy: BalancePolicy,
    entries: Mutex<HashMap<BalanceKey, CachedBalance>>,
}

impl BalanceCache {
    pub fn new(policy: BalancePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(client: &dyn ChainClient, account: &str) -> BalanceKey {
        BalanceKey {
            account: account.to_string(),
            checksum: client.context().checksum.clone(),
        }
    }

    /// Cached balance if still fresh, otherwise a network fetch.
    pub async fn balance(&self, client: &dyn ChainClient, account: &str) -> Result<Mutez, ClientError> {
        let key = Self::key(client, account);
        {
            let entries = self.entries.lock().await;
            if let Some(cached) = entries.get(&key) {
                if cached.fetched_at.elapsed() < self.policy.freshness {
                    return Ok(cached.value);
                }
            }
        }
        self.fetch_and_store(client, key).await
    }

    /// Always fetch from the node, then update the cache.
    pub async fn refresh(&self, client: &dyn ChainClient, account: &str) -> Result<Mutez, ClientError> {
        let key = Self::key(client, account);
        self.fetch_and_store(client, key).await
    }

    pub async fn invalidate(&self, client: &dyn ChainClient, account: &str) {
        let key = Self::key(client, account);
        self.entries.lock().await.remove(&key);
    }

    async fn fetch_and_store(&self, client: &dyn ChainClient, key: BalanceKey) -> Result<Mutez, ClientError> {
        let value = self.fetch_with_retry(client, &key.account).await?;
        let mut entries = self.entries.lock().await;
        if entries.len() >= BALANCE_CACHE_LIMIT && !entries.contains_key(&key) {
            entries.clear();
        }
        entries.insert(
            key,
            CachedBalance {
                value,
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    async fn fetch_with_retry(&self, client: &dyn ChainClient, account: &str) -> Result<Mutez, ClientError> {
        let mut attempt = 0;
        loop {
            match client.fetch_balance(account).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.policy.retries => {
                    attempt += 1;
                    debug!(account, attempt, error = %e, "retrying balance fetch");
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(BalancePolicy::default())
    }
}
