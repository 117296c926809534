//! Per-entity FIFO serialization

use crate::cache::EntityRef;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<EntityRef, Slot>;

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holder plus waiters
    users: usize,
}

/// One async lock per entity; waiters are served in arrival order
#[derive(Default)]
pub struct EntityLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `entity`
    ///
    /// Cancelling the wait gives up the place in the queue.
    pub async fn acquire(&self, entity: &EntityRef) -> EntityGuard {
        let lock = {
            let mut locks = lock_map(&self.locks);
            let slot = locks.entry(entity.clone()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };
        let release = Release {
            entity: entity.clone(),
            locks: self.locks.clone(),
        };
        EntityGuard {
            _guard: lock.lock_owned().await,
            _release: release,
        }
    }

    /// Entities with a holder or waiters
    pub fn held(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

fn lock_map(locks: &Mutex<LockMap>) -> std::sync::MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drops one user of an entity's slot, removing the slot with the last one
struct Release {
    entity: EntityRef,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for Release {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        let Some(slot) = locks.get_mut(&self.entity) else {
            return;
        };
        slot.users = slot.users.saturating_sub(1);
        if slot.users == 0 {
            locks.remove(&self.entity);
        }
    }
}

/// Releases the entity on drop
pub struct EntityGuard {
    // Unlocks before the slot is released
    _guard: OwnedMutexGuard<()>,
    _release: Release,
}
