//! # Primitives
//!
//! Identifier newtypes and hard limits shared by every layer.
//!
//! Ids are plain `u64` counters assigned by the store. Wrapping them keeps a
//! `UserId` from being passed where a `ConnectionId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum length of a user name, in characters.
pub const MAX_NAME_LEN: usize = 30;

/// Maximum length of a plain-text password accepted for hashing.
///
/// bcrypt only looks at the first 72 bytes.
pub const MAX_PASSWORD_LEN: usize = 72;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Earliest message time a client may supply (2001-09-09, epoch ms).
///
/// Together with [`MAX_MESSAGE_TIME`] this keeps every cursor at 13 digits,
/// so cursors compare the same as strings and as numbers.
pub const MIN_MESSAGE_TIME: i64 = 1_000_000_000_000;

/// Latest message time a client may supply (2286-11-20, epoch ms).
pub const MAX_MESSAGE_TIME: i64 = 9_999_999_999_999;

/// Name of the shared demo account whose conversation can be wiped.
pub const VISITOR_NAME: &str = "Visitor";

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of a registered user.
    UserId
);
id_type!(
    /// Identifier of a connection (friendship), also the chat-room id.
    ConnectionId
);
id_type!(
    /// Identifier of a stored message.
    MessageId
);
id_type!(
    /// Identifier of a stored push subscription.
    SubscriptionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_from_graphql_strings() {
        assert_eq!("42".parse::<UserId>(), Ok(UserId(42)));
        assert_eq!(" 7 ".parse::<ConnectionId>(), Ok(ConnectionId(7)));
        assert!("abc".parse::<MessageId>().is_err());
        assert!("-1".parse::<SubscriptionId>().is_err());
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(UserId(3).to_string(), "3");
        assert_eq!(
            serde_json::to_string(&ConnectionId(9)).ok().as_deref(),
            Some("9")
        );
    }
}
