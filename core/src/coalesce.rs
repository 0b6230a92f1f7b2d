/// Request coalescing and focus throttling.
///
/// `Coalescer` keeps the in-flight (or finished) future of every key for a
/// fixed window. Callers asking for the same key inside the window await a
/// clone of that shared future, so the underlying work runs once.
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<V> {
    started_at: Instant,
    future: Shared<BoxFuture<'static, V>>,
}

pub struct Coalescer<K, V> {
    window: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Run `make()` for `key`, or join the execution started for it within the window.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().await;
            let window = self.window;
            entries.retain(|_, e| e.started_at.elapsed() < window);
            match entries.get(&key) {
                Some(entry) => entry.future.clone(),
                None => {
                    let future = make().boxed().shared();
                    entries.insert(
                        key,
                        Entry {
                            started_at: Instant::now(),
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };
        shared.await
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }

    /// Drop every entry matching `pred`.
    pub async fn invalidate_where(&self, pred: impl Fn(&K) -> bool) {
        self.entries.lock().await.retain(|k, _| !pred(k));
    }
}

/// Lets an event through at most once per interval.
pub struct Throttle {
    interval: Duration,
    last: StdMutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: StdMutex::new(None),
        }
    }

    /// Returns `true` and records the event if the interval has passed.
    pub fn ready(&self) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(at) if at.elapsed() < self.interval => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}
