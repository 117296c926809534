//! Session management: the persisted auth credential

pub mod store;
pub mod token;

pub use store::{SessionStore, SubscriptionId};
pub use token::decode_user_id;
