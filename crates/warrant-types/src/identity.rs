//! Identity types for Warrant
//!
//! Addresses, selectors and grant ids are strongly typed wrappers so that an
//! owner can never be passed where a selector or grant id is expected.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Macro to generate fixed-width byte identifiers with hex encoding
macro_rules! define_bytes_type {
    ($name:ident, $len:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width of this identifier in bytes
            pub const LEN: usize = $len;

            /// The all-zero value
            pub const ZERO: Self = Self([0u8; $len]);

            /// Create from raw bytes
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Whether this is the all-zero value
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            /// Parse from hex, with or without a `0x` prefix
            pub fn parse(s: &str) -> Result<Self, IdentityParseError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s).map_err(|e| IdentityParseError::Hex(e.to_string()))?;
                let array: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|v: Vec<u8>| IdentityParseError::Length {
                            expected: $len,
                            actual: v.len(),
                        })?;
                Ok(Self(array))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = IdentityParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

define_bytes_type!(Address, 20, "Identifier of a user, agent, or target endpoint");
define_bytes_type!(Selector, 4, "Identifier of an action exposed by a target endpoint");

/// Error returned when parsing a hex identifier fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl Address {
    /// Derive a deterministic address from a label.
    ///
    /// Takes the last 20 bytes of the Keccak-256 digest of the label, which
    /// is convenient for fixtures and demos.
    pub fn from_label(label: &str) -> Self {
        let digest = Keccak256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }
}

impl Selector {
    /// Derive a selector from a function signature such as
    /// `transfer(address,uint256)`: the first four bytes of its Keccak-256.
    pub fn from_signature(signature: &str) -> Self {
        let digest = Keccak256::digest(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Read the leading selector of a call payload, if it is long enough
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let head: [u8; 4] = payload.get(..Self::LEN)?.try_into().ok()?;
        Some(Self(head))
    }
}

/// Sequential identifier of a permission grant.
///
/// Ids start at 1. [`GrantId::NONE`] marks "absent" or "not yet created".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub u64);

impl GrantId {
    /// The absent marker
    pub const NONE: Self = Self(0);

    /// The first id ever issued
    pub const FIRST: Self = Self(1);

    /// Whether this is the absent marker
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The id issued after this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grant#{}", self.0)
    }
}

impl From<u64> for GrantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_roundtrip() {
        let addr = Address::from_label("alice");
        let s = addr.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 42);
        assert_eq!(Address::parse(&s).unwrap(), addr);
    }

    #[test]
    fn test_address_parse_rejects_wrong_length() {
        let err = Address::parse("0xdeadbeef").unwrap_err();
        assert_eq!(
            err,
            IdentityParseError::Length {
                expected: 20,
                actual: 4
            }
        );
        assert!(matches!(Address::parse("0xzz"), Err(IdentityParseError::Hex(_))));
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_label("bob").is_zero());
    }

    #[test]
    fn test_selector_from_signature() {
        // Well-known ERC-20 selector
        assert_eq!(
            Selector::from_signature("transfer(address,uint256)").to_string(),
            "0xa9059cbb"
        );
    }

    #[test]
    fn test_selector_from_payload() {
        assert_eq!(Selector::from_payload(&[1, 2, 3]), None);
        assert_eq!(
            Selector::from_payload(&[1, 2, 3, 4, 5]),
            Some(Selector([1, 2, 3, 4]))
        );
    }

    #[test]
    fn test_grant_id_sequence() {
        assert!(GrantId::NONE.is_none());
        assert_eq!(GrantId::NONE.next(), GrantId::FIRST);
        assert_eq!(GrantId::FIRST.next(), GrantId(2));
    }

    #[test]
    fn test_address_serde_as_hex_string() {
        let addr = Address::from_label("carol");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
