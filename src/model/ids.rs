//! Typed identifiers
//!
//! Fresh identifiers are a one-letter prefix followed by a sequence number
//! (`B100`, `M101`). Identifiers read from disk may be arbitrary strings.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// First sequence number handed out for each identifier kind.
pub const FIRST_SEQUENCE: u64 = 100;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix of generated identifiers
            pub const PREFIX: char = $prefix;

            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Identifier for the given sequence number
            pub fn from_sequence(sequence: u64) -> Self {
                Self(format!("{}{}", $prefix, sequence))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Sequence number, if this is a generated identifier
            pub fn sequence(&self) -> Option<u64> {
                self.0.strip_prefix($prefix)?.parse().ok()
            }
        }

        // Shorter sorts first so generated ids order numerically (B999 < B1000).
        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0
                    .len()
                    .cmp(&other.0.len())
                    .then_with(|| self.0.cmp(&other.0))
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
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

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a catalog entry
    BookId,
    'B'
);

entity_id!(
    /// Identifier of a registered member
    MemberId,
    'M'
);
