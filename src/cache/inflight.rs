//! Registry of pending fetches keyed by symbol

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

type SharedFetch<T> = Shared<BoxFuture<'static, T>>;

/// Deduplicates concurrent requests for the same key
///
/// The first caller for a key starts the fetch; callers arriving while it is
/// still pending await the same future and receive a clone of its output.
/// The entry is dropped once the fetch settles, including when it panics, so
/// a failed fetch never blocks later callers for the same key.
pub struct InFlight<T: Clone> {
    pending: Mutex<HashMap<String, SharedFetch<T>>>,
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, SharedFetch<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `start()` for `key` unless a fetch for it is already pending
    pub async fn run<F>(&self, key: &str, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let fetch = {
            let mut pending = self.pending();
            // A settled future left behind by a cancelled caller is not reused.
            let reusable = pending
                .get(key)
                .filter(|existing| existing.peek().is_none())
                .cloned();
            match reusable {
                Some(existing) => existing,
                None => {
                    let fetch = start().shared();
                    pending.insert(key.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        let output = AssertUnwindSafe(fetch.clone()).catch_unwind().await;
        self.settle(key, &fetch);

        match output {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Drops the entry for `key` if it still refers to `fetch`
    fn settle(&self, key: &str, fetch: &SharedFetch<T>) {
        let mut pending = self.pending();
        if pending
            .get(key)
            .is_some_and(|current| Shared::ptr_eq(current, fetch))
        {
            pending.remove(key);
        }
    }

    /// Number of fetches currently registered
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }
}

impl<T> Default for InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> std::fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self
            .pending
            .lock()
            .map(|pending| pending.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("InFlight").field("pending", &keys).finish()
    }
}
