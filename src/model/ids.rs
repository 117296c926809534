//! Typed identifiers for server entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix carried by ids the client assigns to optimistic entries
pub const TEMP_ID_PREFIX: &str = "tmp-";

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-assigned id
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// A client-side placeholder, replaced once the server confirms
            pub fn temporary() -> Self {
                Self(format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()))
            }

            /// Whether this id was invented locally
            pub fn is_temporary(&self) -> bool {
                self.0.starts_with(TEMP_ID_PREFIX)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

entity_id!(
    /// Id of a post
    PostId
);
entity_id!(
    /// Id of a comment
    CommentId
);
entity_id!(
    /// Id of a user
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_marked() {
        let id = PostId::temporary();
        assert!(id.is_temporary());
        assert!(id.as_str().starts_with("tmp-"));
        assert!(!PostId::new("6650f1").is_temporary());
    }

    #[test]
    fn temporary_ids_are_unique() {
        assert_ne!(CommentId::temporary(), CommentId::temporary());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("u1")).unwrap();
        assert_eq!(json, "\"u1\"");
    }
}
