//! Client-side entity cache
//!
//! Holds the last known server state of posts and comments, keyed by the
//! resource they were fetched from. The same post may live under several
//! keys at once; each copy is independent and mutations must update all of
//! them.
//!
//! # Entry States
//!
//! | State | Value | Description |
//! |-------|-------|-------------|
//! | Missing | none | Never fetched, or dropped by reset |
//! | Fetching | any | One request in flight; concurrent refreshes join it |
//! | Fresh | some | Written by a fetch, write or patch |
//! | Stale | some | Invalidated; watched entries refetch immediately |
//!
//! Every write is stamped with a logical clock. A fetch that started before
//! the latest write to its entry is discarded when it lands.

pub mod key;
pub mod store;
pub mod value;

pub use key::{prefixes_for_path, CacheKey, KeyPrefix};
pub use store::{
    CacheEvent, CacheRead, EntityCache, EntrySnapshot, EntryView, Fetcher, ReadPolicy,
    Subscription, WeakEntityCache,
};
pub use value::{restore_entity, CacheValue, EntityRef};
