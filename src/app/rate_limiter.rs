use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Per-(actor, resource) burst throttle for high-frequency mutations.
///
/// Process-local by design: entries vanish on restart and instances do not
/// coordinate, which at worst resets one throttle window. This is abuse
/// damping, not a security boundary. Callers must treat a rejection as a
/// silent no-op, never an error.
#[derive(Clone)]
pub struct RateLimiter {
    window: Duration,
    retention: Duration,
    entries: Arc<RwLock<HashMap<(Uuid, Uuid), Instant>>>,
}

impl RateLimiter {
    /// `retention` must exceed `window`; swept entries are always older than
    /// any window still in force.
    pub fn new(window: Duration, retention: Duration) -> Self {
        debug_assert!(retention > window);
        Self {
            window,
            retention,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Pass if the key's last pass is at least one window old. A rejection
    /// leaves the stored timestamp untouched; only passes move the window.
    pub fn try_acquire(&self, actor_id: Uuid, resource_id: Uuid) -> bool {
        let now = Instant::now();
        let mut entries = write_lock(&self.entries);

        match entries.get(&(actor_id, resource_id)) {
            Some(&last) if now.duration_since(last) < self.window => false,
            _ => {
                entries.insert((actor_id, resource_id), now);
                true
            }
        }
    }

    /// Drop entries older than the retention horizon; bounds the map under
    /// sustained traffic from many distinct actor/resource pairs. Returns the
    /// number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = write_lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, &mut last| now.duration_since(last) < self.retention);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A panic while holding the lock leaves plain timestamp data behind; keep
// serving it rather than poisoning every later request.
fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}
