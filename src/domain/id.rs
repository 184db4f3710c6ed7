//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Instrument identifier: one outcome token inside a binary market.
    ///
    /// The inner String is private to ensure all construction goes through
    /// the defined constructors.
    InstrumentId
);

string_id!(
    /// Market condition identifier shared by the outcome tokens of one market.
    ConditionId
);

string_id!(
    /// Exchange-assigned order identifier.
    OrderId
);

string_id!(
    /// Account (or watched wallet) identifier.
    AccountId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_id_round_trips_through_display() {
        let id = InstrumentId::from("12345");
        assert_eq!(id.as_str(), "12345");
        assert_eq!(id.to_string(), "12345");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ConditionId::new("0xabc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0xabc\"");
        let back: ConditionId = serde_json::from_str("\"0xabc\"").unwrap();
        assert_eq!(back, id);
    }
}
