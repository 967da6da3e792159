use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Duration;

struct Scheduled {
    token: u64,
    handle: JoinHandle<()>,
}

type Slots<K> = Arc<Mutex<HashMap<K, Scheduled>>>;

fn lock<K>(slots: &Slots<K>) -> MutexGuard<'_, HashMap<K, Scheduled>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cancellable deferred actions, at most one per key.
///
/// Rescheduling a key aborts its previous task. A task only runs its action
/// if its slot still carries the token it was issued, so a timer that lost a
/// race with `cancel` or `schedule` never fires against replaced state.
/// Scheduling must happen inside a Tokio runtime.
pub struct Timeouts<K> {
    slots: Slots<K>,
    next_token: Arc<AtomicU64>,
}

impl<K> Clone for Timeouts<K> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            next_token: self.next_token.clone(),
        }
    }
}

impl<K> Default for Timeouts<K> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_token: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<K> Timeouts<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay` unless the key is cancelled or rescheduled first
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let slots = self.slots.clone();
        let task_key = key.clone();

        // Holding the lock across spawn keeps the task from checking its slot
        // before the slot exists.
        let mut guard = lock(&self.slots);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = {
                let mut slots = lock(&slots);
                match slots.get(&task_key) {
                    Some(scheduled) if scheduled.token == token => {
                        slots.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                action();
            }
        });
        if let Some(previous) = guard.insert(key, Scheduled { token, handle }) {
            previous.handle.abort();
        }
    }

    /// Abort the key's pending action. Returns false if none was scheduled.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.slots).remove(key) {
            Some(scheduled) => {
                scheduled.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        lock(&self.slots).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
