//! Per-resource locks
//!
//! Every mutation of a named resource runs while holding the lock for
//! `(connection, kind, name)`. Each of those locks also holds its
//! connection's gate shared; removing a connection config takes the gate
//! exclusively, so it waits out every in-flight mutation on the connection.
//!
//! Locks and gates are created on first use and dropped from their table once
//! nobody holds or waits for them.

use cloudmux_driver::ResourceKind;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{
    Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub connection: String,
    pub kind: ResourceKind,
    pub name: String,
}

impl LockKey {
    pub fn new(connection: impl Into<String>, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            kind,
            name: name.into(),
        }
    }
}

/// Prefix that keeps SystemId keys apart from NameId keys
pub const SYSTEM_ID_KEY_PREFIX: &str = "#sys:";

impl LockKey {
    /// Key for an unmapped provider resource known only by its SystemId
    pub fn system_id(connection: impl Into<String>, kind: ResourceKind, system_id: &str) -> Self {
        Self::new(connection, kind, format!("{}{}", SYSTEM_ID_KEY_PREFIX, system_id))
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.connection, self.kind, self.name)
    }
}

type Table<K, L> = Arc<Mutex<HashMap<K, Arc<L>>>>;

fn table<K, L>(table: &Mutex<HashMap<K, Arc<L>>>) -> MutexGuard<'_, HashMap<K, Arc<L>>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drops its table entry once only the table references it.
///
/// Runs on release and on a cancelled wait alike.
struct Reclaim<K: Eq + Hash, L> {
    key: K,
    table: Table<K, L>,
}

impl<K: Eq + Hash, L> Drop for Reclaim<K, L> {
    fn drop(&mut self) {
        let mut entries = table(&self.table);
        if entries
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            entries.remove(&self.key);
        }
    }
}

/// Entry for `key`, created on first use, and the reclaimer for it
fn entry<K, L>(tab: &Table<K, L>, key: K, init: impl FnOnce() -> L) -> (Arc<L>, Reclaim<K, L>)
where
    K: Eq + Hash + Clone,
{
    let lock = table(tab)
        .entry(key.clone())
        .or_insert_with(|| Arc::new(init()))
        .clone();
    (
        lock,
        Reclaim {
            key,
            table: Arc::clone(tab),
        },
    )
}

/// Keyed lock table
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Table<LockKey, AsyncMutex<()>>,
    gates: Table<String, RwLock<()>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`
    pub async fn acquire(&self, key: LockKey) -> LockGuard {
        // A cancelled wait drops the pending future before its reclaimer
        let (gate, gate_reclaim) = entry(&self.gates, key.connection.clone(), || RwLock::new(()));
        let gate = gate.read_owned().await;

        let (lock, reclaim) = entry(&self.locks, key.clone(), || AsyncMutex::new(()));
        let guard = lock.lock_owned().await;
        tracing::trace!("Acquired lock {}", key);

        LockGuard {
            key,
            _guard: guard,
            _reclaim: reclaim,
            _gate: gate,
            _gate_reclaim: gate_reclaim,
        }
    }

    /// Waits until no resource lock of `connection` is held, then keeps
    /// new ones out until the guard is dropped
    pub async fn acquire_connection(&self, connection: &str) -> ConnectionGuard {
        let (gate, reclaim) = entry(&self.gates, connection.to_string(), || RwLock::new(()));
        let guard = gate.write_owned().await;
        tracing::trace!("Acquired connection gate {}", connection);

        ConnectionGuard {
            connection: connection.to_string(),
            _guard: guard,
            _reclaim: reclaim,
        }
    }

    /// Runs `fut` while holding `key`. The lock is released however `fut`
    /// ends, including early return through `?`.
    pub async fn with_lock<F, T>(&self, key: LockKey, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        fut.await
    }

    /// Keys currently held
    pub fn held_keys(&self) -> Vec<LockKey> {
        table(&self.locks)
            .iter()
            .filter(|(_, lock)| lock.try_lock().is_err())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of keys in the table (held or awaited)
    pub fn len(&self) -> usize {
        table(&self.locks).len()
    }

    /// No key and no connection gate is held or awaited
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && table(&self.gates).is_empty()
    }
}

/// Releases its key when dropped
pub struct LockGuard {
    key: LockKey,
    // Fields drop in order: the lock, its entry, then the gate
    _guard: OwnedMutexGuard<()>,
    _reclaim: Reclaim<LockKey, AsyncMutex<()>>,
    _gate: OwnedRwLockReadGuard<()>,
    _gate_reclaim: Reclaim<String, RwLock<()>>,
}

impl LockGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::trace!("Released lock {}", self.key);
    }
}

/// Exclusive hold on one connection's gate
pub struct ConnectionGuard {
    connection: String,
    _guard: OwnedRwLockWriteGuard<()>,
    _reclaim: Reclaim<String, RwLock<()>>,
}

impl ConnectionGuard {
    pub fn connection(&self) -> &str {
        &self.connection
    }
}

impl fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("connection", &self.connection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(name: &str) -> LockKey {
        LockKey::new("conn", ResourceKind::Vpc, name)
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key("vpc-01").to_string(), "conn:VPC:vpc-01");
        assert_eq!(
            LockKey::system_id("conn", ResourceKind::Vpc, "vpc-0abc").to_string(),
            "conn:VPC:#sys:vpc-0abc"
        );
        assert_ne!(LockKey::system_id("conn", ResourceKind::Vpc, "x"), key("x"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(LockManager::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(key("vpc-01")).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = LockManager::new();
        let a = locks.acquire(key("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key("b")))
            .await
            .expect("distinct key should not wait");

        let mut held = locks.held_keys();
        held.sort_by(|x, y| x.name.cmp(&y.name));
        assert_eq!(held, vec![key("a"), key("b")]);

        a.release();
        drop(b);
        assert!(locks.held_keys().is_empty());
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_released_on_error_path() {
        let locks = LockManager::new();

        let result: Result<(), &str> = locks
            .with_lock(key("vpc-01"), async { Err("provider failed") })
            .await;
        assert!(result.is_err());

        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key("vpc-01"))).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_released_when_task_aborted() {
        let locks = Arc::new(LockManager::new());

        let holder = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(key("vpc-01")).await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(locks.held_keys(), vec![key("vpc-01")]);

        holder.abort();
        let _ = holder.await;

        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key("vpc-01"))).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_released_on_panic() {
        let locks = Arc::new(LockManager::new());

        let task = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(key("vpc-01")).await;
                panic!("handler blew up");
            })
        };
        assert!(task.await.is_err());

        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key("vpc-01"))).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_entry() {
        let locks = Arc::new(LockManager::new());
        let holder = locks.acquire(key("vpc-01")).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(key("vpc-01")).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The waiter is woken but cancelled before it runs again
        drop(holder);
        waiter.abort();
        let _ = waiter.await;

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_connection_gate_waits_for_held_locks() {
        let locks = LockManager::new();
        let held = locks.acquire(key("vpc-01")).await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire_connection("conn")).await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire_connection("other"))
            .await
            .expect("other connections are not gated");
        drop(other);

        drop(held);
        let gate = tokio::time::timeout(Duration::from_millis(100), locks.acquire_connection("conn"))
            .await
            .expect("gate is free once the lock is released");
        assert_eq!(gate.connection(), "conn");

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(key("vpc-02"))).await;
        assert!(blocked.is_err());

        drop(gate);
        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire(key("vpc-02"))).await;
        assert!(again.is_ok());
        drop(again);
        assert!(locks.is_empty());
    }
}
