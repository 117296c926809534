//! Keyed entity store with coalesced fetches and versioned writes

use crate::api::gateway::ApiGateway;
use crate::cache::key::{prefixes_for_path, CacheKey, KeyPrefix};
use crate::cache::value::{restore_entity, CacheValue, EntityRef};
use crate::error::{FeedError, FeedResult};
use crate::session::{SessionStore, SubscriptionId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// Loads the server value for a key
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, key: &CacheKey) -> FeedResult<CacheValue>;
}

/// How a read treats a missing or stale entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// A disabled read returns nothing and fetches nothing
    pub enabled: bool,
    /// Schedule a background fetch when the entry is missing or stale
    pub refetch: bool,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            refetch: true,
        }
    }
}

impl ReadPolicy {
    pub fn cached_only() -> Self {
        Self {
            enabled: true,
            refetch: false,
        }
    }
}

/// Result of a non-blocking read
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheRead {
    pub value: Option<CacheValue>,
    pub stale: bool,
    pub fetching: bool,
    pub enabled: bool,
}

impl CacheRead {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Change notification delivered to subscriptions
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Written(CacheKey),
    Patched(CacheKey),
    Invalidated(CacheKey),
    Reset,
    /// The subscriber fell behind and missed events
    Lagged,
}

impl CacheEvent {
    pub fn concerns(&self, key: &CacheKey) -> bool {
        match self {
            Self::Written(k) | Self::Patched(k) | Self::Invalidated(k) => k == key,
            Self::Reset | Self::Lagged => true,
        }
    }
}

/// Prior state of an entry, captured by [`EntityCache::patch`]
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub key: CacheKey,
    pub value: Option<CacheValue>,
    pub stale: bool,
    /// Version the patch wrote; a different version at restore time means
    /// someone else wrote the entry since
    pub applied_version: u64,
}

/// Read-only view of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub value: Option<CacheValue>,
    pub stale: bool,
}

type FetchOutcome = Option<Result<(), FeedError>>;

struct InFlight {
    started: u64,
    done: watch::Receiver<FetchOutcome>,
}

#[derive(Default)]
struct Entry {
    value: Option<CacheValue>,
    stale: bool,
    version: u64,
    invalidated_at: u64,
    watchers: usize,
    in_flight: Option<InFlight>,
}

#[derive(Default)]
struct State {
    entries: HashMap<CacheKey, Entry>,
    clock: u64,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

struct Shared {
    state: Mutex<State>,
    fetcher: Arc<dyn Fetcher>,
    events: broadcast::Sender<CacheEvent>,
}

enum Role {
    Leader(watch::Sender<FetchOutcome>, u64),
    Follower(watch::Receiver<FetchOutcome>),
}

/// Shared cache of fetched resources
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct EntityCache {
    shared: Arc<Shared>,
}

impl EntityCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                fetcher,
                events,
            }),
        }
    }

    /// Read with the default policy
    pub fn read(&self, key: &CacheKey) -> CacheRead {
        self.read_with(key, ReadPolicy::default())
    }

    /// Read whose key depends on a value that may not be known yet
    pub fn read_optional(&self, key: Option<&CacheKey>) -> CacheRead {
        match key {
            Some(key) => self.read(key),
            None => CacheRead::disabled(),
        }
    }

    /// Last known value for `key`; never waits on the network
    pub fn read_with(&self, key: &CacheKey, policy: ReadPolicy) -> CacheRead {
        if !policy.enabled {
            return CacheRead::disabled();
        }

        let (mut read, wants_fetch) = {
            let state = self.lock();
            match state.entries.get(key) {
                Some(entry) => (
                    CacheRead {
                        value: entry.value.clone(),
                        stale: entry.stale,
                        fetching: entry.in_flight.is_some(),
                        enabled: true,
                    },
                    (entry.value.is_none() || entry.stale) && entry.in_flight.is_none(),
                ),
                None => (
                    CacheRead {
                        enabled: true,
                        ..CacheRead::default()
                    },
                    true,
                ),
            }
        };

        if policy.refetch && wants_fetch && self.spawn_refresh(key.clone()) {
            read.fetching = true;
        }
        read
    }

    /// Fetch `key` from the server and store the result
    ///
    /// Concurrent calls for the same key share one request. A result is
    /// dropped if the entry was written after the fetch started.
    pub async fn refresh(&self, key: &CacheKey) -> FeedResult<()> {
        let role = {
            let mut state = self.lock();
            let started = state.tick();
            let entry = state.entries.entry(key.clone()).or_default();
            match entry.in_flight.as_ref().map(|f| f.done.clone()) {
                Some(done) => Role::Follower(done),
                None => {
                    let (tx, rx) = watch::channel(None);
                    entry.in_flight = Some(InFlight { started, done: rx });
                    Role::Leader(tx, started)
                }
            }
        };

        match role {
            Role::Follower(mut done) => {
                debug!("Joining in-flight fetch of {}", key);
                let shared_outcome = match done.wait_for(|outcome| outcome.is_some()).await {
                    Ok(outcome) => match &*outcome {
                        Some(Ok(())) => Ok(()),
                        Some(Err(e)) => Err(e.replicate()),
                        None => Err(FeedError::Internal(format!("fetch of {} lost", key))),
                    },
                    Err(_) => Err(FeedError::Internal(format!(
                        "fetch of {} was abandoned",
                        key
                    ))),
                };
                shared_outcome
            }
            Role::Leader(done, started) => {
                let guard = FlightGuard {
                    cache: self,
                    key,
                    started,
                };
                debug!("Fetching {}", key);

                let (outcome, follow_up) = match self.shared.fetcher.fetch(key).await {
                    Ok(value) => (Ok(()), self.apply_fetch(key, started, value)),
                    Err(e) => {
                        debug!("Fetch of {} failed: {}", key, e);
                        (Err(e), false)
                    }
                };

                drop(guard);
                let _ = done.send(Some(match &outcome {
                    Ok(()) => Ok(()),
                    Err(e) => Err(e.replicate()),
                }));

                if follow_up {
                    self.spawn_refresh(key.clone());
                }
                outcome
            }
        }
    }

    /// Refresh several keys concurrently, returning the first failure
    pub async fn refresh_all(&self, keys: &[CacheKey]) -> FeedResult<()> {
        let results =
            futures_util::future::join_all(keys.iter().map(|key| self.refresh(key))).await;
        results.into_iter().collect()
    }

    /// Replace the entry and mark it fresh
    pub fn write(&self, key: CacheKey, value: CacheValue) {
        {
            let mut state = self.lock();
            let version = state.tick();
            let entry = state.entries.entry(key.clone()).or_default();
            entry.value = Some(value);
            entry.stale = false;
            entry.version = version;
        }
        debug!("Wrote {}", key);
        self.emit(CacheEvent::Written(key));
    }

    /// Apply `updater` to the current value without touching the network
    ///
    /// Entries that hold no value are left alone and yield `None`.
    pub fn patch<F>(&self, key: &CacheKey, updater: F) -> Option<EntrySnapshot>
    where
        F: FnOnce(&CacheValue) -> Option<CacheValue>,
    {
        let snapshot = {
            let mut state = self.lock();
            let version = state.tick();
            let entry = state.entries.get_mut(key)?;
            let next = updater(entry.value.as_ref()?);
            let snapshot = EntrySnapshot {
                key: key.clone(),
                value: entry.value.take(),
                stale: entry.stale,
                applied_version: version,
            };
            entry.value = next;
            entry.version = version;
            snapshot
        };
        debug!("Patched {}", key);
        self.emit(CacheEvent::Patched(key.clone()));
        Some(snapshot)
    }

    /// Like [`patch`](Self::patch) but for server-confirmed data, which
    /// needs no snapshot
    pub fn update<F>(&self, key: &CacheKey, updater: F) -> bool
    where
        F: FnOnce(&CacheValue) -> Option<CacheValue>,
    {
        self.patch(key, updater).is_some()
    }

    /// Undo a patch
    ///
    /// Restores the captured value exactly when nobody wrote the entry since
    /// the patch. Otherwise only `target` is put back inside the current
    /// value. Returns whether the entry changed.
    pub fn restore(&self, snapshot: &EntrySnapshot, target: Option<&EntityRef>) -> bool {
        {
            let mut state = self.lock();
            let version = state.tick();
            let Some(entry) = state.entries.get_mut(&snapshot.key) else {
                return false;
            };

            if entry.version == snapshot.applied_version {
                entry.value = snapshot.value.clone();
                entry.stale = snapshot.stale || entry.invalidated_at > snapshot.applied_version;
            } else if let Some(target) = target {
                entry.value =
                    restore_entity(entry.value.as_ref(), snapshot.value.as_ref(), target);
            } else {
                return false;
            }
            entry.version = version;
        }
        debug!("Restored {}", snapshot.key);
        self.emit(CacheEvent::Written(snapshot.key.clone()));
        true
    }

    /// Mark every entry matching `prefix` stale and refetch the watched ones
    pub fn invalidate(&self, prefix: impl Into<KeyPrefix>) -> usize {
        let prefix = prefix.into();
        let mut marked = Vec::new();
        let mut refetch = Vec::new();
        {
            let mut state = self.lock();
            let now = state.tick();
            for (key, entry) in state.entries.iter_mut() {
                if !prefix.matches(key) {
                    continue;
                }
                entry.stale = true;
                entry.invalidated_at = now;
                marked.push(key.clone());
                if entry.watchers > 0 && entry.in_flight.is_none() {
                    refetch.push(key.clone());
                }
            }
        }

        debug!(
            "Invalidated {:?}: {} entries, {} refetching",
            prefix,
            marked.len(),
            refetch.len()
        );
        let count = marked.len();
        for key in marked {
            self.emit(CacheEvent::Invalidated(key));
        }
        for key in refetch {
            self.spawn_refresh(key);
        }
        count
    }

    /// Register interest in `key`
    pub fn subscribe(&self, key: CacheKey) -> Subscription {
        let events = self.shared.events.subscribe();
        self.lock().entries.entry(key.clone()).or_default().watchers += 1;
        Subscription {
            cache: self.clone(),
            key,
            events,
        }
    }

    /// Drop every entry; subscribed keys keep an empty placeholder
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            let now = state.tick();
            state.entries.retain(|_, entry| entry.watchers > 0);
            for entry in state.entries.values_mut() {
                entry.value = None;
                entry.stale = false;
                entry.version = now;
                entry.in_flight = None;
            }
        }
        debug!("Cache reset");
        self.emit(CacheEvent::Reset);
    }

    /// Current value, without scheduling anything
    pub fn peek(&self, key: &CacheKey) -> Option<CacheValue> {
        self.lock().entries.get(key).and_then(|e| e.value.clone())
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.lock().entries.get(key).is_some_and(|e| e.stale)
    }

    /// Keys currently holding a value
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| e.value.is_some())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Keys whose value embeds `entity`
    pub fn keys_embedding(&self, entity: &EntityRef) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| e.value.as_ref().is_some_and(|v| v.contains(entity)))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Every entry holding a value, ordered by key
    pub fn entries(&self) -> BTreeMap<CacheKey, EntryView> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, e)| e.value.is_some())
            .map(|(k, e)| {
                (
                    k.clone(),
                    EntryView {
                        value: e.value.clone(),
                        stale: e.stale,
                    },
                )
            })
            .collect()
    }

    /// Non-owning handle, for listeners registered on components the
    /// cache itself reaches through its fetcher
    pub fn downgrade(&self) -> WeakEntityCache {
        WeakEntityCache(Arc::downgrade(&self.shared))
    }

    /// Invalidate the keys each successful mutating request may have
    /// touched. Failed requests leave the cache to the caller's rollback.
    pub fn follow_mutations(&self, gateway: &ApiGateway) {
        let cache = self.downgrade();
        gateway.on_mutation(move |signal| {
            if !signal.succeeded {
                return;
            }
            let Some(cache) = cache.upgrade() else {
                return;
            };
            for prefix in prefixes_for_path(&signal.path) {
                cache.invalidate(prefix);
            }
        });
    }

    /// Drop everything whenever the credential changes hands
    pub fn follow_session(&self, session: &SessionStore) -> SubscriptionId {
        let cache = self.downgrade();
        session.subscribe(move |credential| {
            if let Some(cache) = cache.upgrade() {
                debug!(
                    "Credential {}; resetting cache",
                    if credential.is_some() { "replaced" } else { "cleared" }
                );
                cache.reset();
            }
        })
    }

    /// Store a fetch result unless a later write superseded it. Returns
    /// whether the entry needs another fetch.
    fn apply_fetch(&self, key: &CacheKey, started: u64, value: CacheValue) -> bool {
        let follow_up = {
            let mut state = self.lock();
            let Some(entry) = state.entries.get_mut(key) else {
                debug!("Discarding fetch of {}: entry dropped", key);
                return false;
            };
            if entry.version > started {
                debug!("Discarding superseded fetch of {}", key);
                return entry.stale && entry.watchers > 0;
            }
            entry.value = Some(value);
            entry.version = started;
            entry.stale = entry.invalidated_at > started;
            entry.stale && entry.watchers > 0
        };
        self.emit(CacheEvent::Written(key.clone()));
        follow_up
    }

    fn spawn_refresh(&self, key: CacheKey) -> bool {
        let Ok(handle) = Handle::try_current() else {
            debug!("No runtime; not refreshing {}", key);
            return false;
        };
        let cache = self.clone();
        handle.spawn(async move {
            if let Err(e) = cache.refresh(&key).await {
                debug!("Background refresh of {} failed: {}", key, e);
            }
        });
        true
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is fine
        let _ = self.shared.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// See [`EntityCache::downgrade`]
#[derive(Clone)]
pub struct WeakEntityCache(Weak<Shared>);

impl WeakEntityCache {
    pub fn upgrade(&self) -> Option<EntityCache> {
        self.0.upgrade().map(|shared| EntityCache { shared })
    }
}

/// Clears the in-flight marker even if the fetching task is cancelled
struct FlightGuard<'a> {
    cache: &'a EntityCache,
    key: &'a CacheKey,
    started: u64,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        if let Some(entry) = state.entries.get_mut(self.key) {
            if entry
                .in_flight
                .as_ref()
                .is_some_and(|f| f.started == self.started)
            {
                entry.in_flight = None;
            }
        }
    }
}

/// Interest in one key; dropping it unregisters
pub struct Subscription {
    cache: EntityCache,
    key: CacheKey,
    events: broadcast::Receiver<CacheEvent>,
}

impl Subscription {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn read(&self) -> CacheRead {
        self.cache.read(&self.key)
    }

    /// Wait for the next change to this key. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<CacheEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.concerns(&self.key) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(CacheEvent::Lagged),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        let remove = match state.entries.get_mut(&self.key) {
            Some(entry) => {
                entry.watchers = entry.watchers.saturating_sub(1);
                entry.watchers == 0 && entry.value.is_none() && entry.in_flight.is_none()
            }
            None => false,
        };
        if remove {
            state.entries.remove(&self.key);
        }
    }
}
