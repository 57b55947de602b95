//! Keyed single-flight registry.
//!
//! At most one operation runs per key. Callers arriving while it runs get a
//! handle to the same shared outcome instead of starting a second one. The
//! entry is removed as soon as the operation settles, so the next call for
//! the key starts fresh.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};

/// The spawned operation ended without an output (it panicked or the runtime shut down).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("single-flight operation aborted: {0}")]
pub struct FlightAborted(pub String);

type FlightFuture<T> = Shared<BoxFuture<'static, Result<T, FlightAborted>>>;

/// Handle to a (possibly shared) in-flight operation.
pub struct Flight<T> {
    future: FlightFuture<T>,
    leader: bool,
}

impl<T: Clone> Flight<T> {
    /// `true` for the caller whose factory started the operation.
    pub fn is_leader(&self) -> bool {
        self.leader
    }

    pub async fn wait(self) -> Result<T, FlightAborted> {
        self.future.await
    }
}

struct Entry<T, A> {
    generation: u64,
    attachment: A,
    future: FlightFuture<T>,
}

struct Inner<K, T, A> {
    next_generation: u64,
    entries: HashMap<K, Entry<T, A>>,
}

/// Single-flight map from key to the one in-flight operation for that key.
///
/// Each entry carries an attachment `A` created alongside the operation and
/// visible to every caller that joins it. Cloning the registry yields another
/// handle to the same map.
pub struct SingleFlightRegistry<K, T, A = ()> {
    inner: Arc<Mutex<Inner<K, T, A>>>,
}

impl<K, T, A> Clone for SingleFlightRegistry<K, T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, T, A> Default for SingleFlightRegistry<K, T, A> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_generation: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<K, T, A> SingleFlightRegistry<K, T, A>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
    A: Default + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the in-flight operation for `key`, or starts `factory()` as the new one.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn run_exclusive<F, Fut>(&self, key: K, factory: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.run_exclusive_with(key, |_| {}, |_| factory())
    }

    /// Like [`run_exclusive`](Self::run_exclusive), with access to the entry attachment.
    ///
    /// `join` runs for every caller, leader or not, before this returns. For a
    /// new entry it runs before `factory`, so nothing the operation publishes
    /// through the attachment can be missed. Both closures run under the
    /// registry lock and must not call back into the registry.
    ///
    /// The operation is spawned immediately and runs to completion even if every
    /// handle is dropped. It removes its own entry when it settles, before any
    /// caller observes the outcome.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn run_exclusive_with<J, F, Fut>(&self, key: K, join: J, factory: F) -> Flight<T>
    where
        J: FnOnce(&A),
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get(&key) {
            join(&entry.attachment);
            return Flight {
                future: entry.future.clone(),
                leader: false,
            };
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let attachment = A::default();
        join(&attachment);
        let work = factory(attachment.clone());

        let guard = RemoveOnSettle {
            inner: Arc::clone(&self.inner),
            key: Some(key.clone()),
            generation,
        };
        let handle = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });
        let future = async move {
            handle
                .await
                .map_err(|err| FlightAborted(err.to_string()))
        }
        .boxed()
        .shared();

        inner.entries.insert(
            key,
            Entry {
                generation,
                attachment,
                future: future.clone(),
            },
        );
        Flight {
            future,
            leader: true,
        }
    }

    /// Attachment of the in-flight operation for `key`, if any.
    pub fn attachment(&self, key: &K) -> Option<A> {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.attachment.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Forgets every entry. Running operations still finish for the callers
    /// already holding them, but can no longer be joined.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, T, A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes the entry when the spawned operation finishes, panics or is dropped.
struct RemoveOnSettle<K: Eq + Hash, T, A> {
    inner: Arc<Mutex<Inner<K, T, A>>>,
    key: Option<K>,
    generation: u64,
}

impl<K: Eq + Hash, T, A> Drop for RemoveOnSettle<K, T, A> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // A cleared and re-populated key belongs to a newer operation.
        if inner
            .entries
            .get(&key)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            inner.entries.remove(&key);
        }
    }
}
