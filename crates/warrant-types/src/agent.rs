//! Agent classification and capability bitsets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Classification of a registered identity
///
/// `None` is what lookups report for an identifier that was never registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Not registered
    #[default]
    None,
    /// Delegates scoped capabilities to children on behalf of a user
    Master,
    /// Receives scoped capabilities from exactly one master
    Child,
}

impl AgentKind {
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }

    pub fn is_child(&self) -> bool {
        matches!(self, Self::Child)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Master => write!(f, "master"),
            Self::Child => write!(f, "child"),
        }
    }
}

/// Capability bitset attached to an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(pub u64);

impl Capabilities {
    pub const NONE: Self = Self(0);
    /// May move value through mediated execution
    pub const TRANSFER: Self = Self(1 << 0);
    /// May call into trading endpoints
    pub const TRADE: Self = Self(1 << 1);
    /// May stake or lock value
    pub const STAKE: Self = Self(1 << 2);
    /// May call governance endpoints
    pub const GOVERN: Self = Self(1 << 3);
    pub const ALL: Self = Self(u64::MAX);

    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// True when any bit of `mask` is set here (bitwise AND non-zero)
    pub fn contains_any(&self, mask: Capabilities) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for Capabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<u64> for Capabilities {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_any() {
        let caps = Capabilities::TRANSFER | Capabilities::STAKE;
        assert!(caps.contains_any(Capabilities::TRANSFER));
        assert!(caps.contains_any(Capabilities::STAKE | Capabilities::GOVERN));
        assert!(!caps.contains_any(Capabilities::TRADE));
        assert!(!caps.contains_any(Capabilities::NONE));
    }

    #[test]
    fn test_kind_default_is_none() {
        assert_eq!(AgentKind::default(), AgentKind::None);
        assert!(AgentKind::Master.is_master());
        assert!(!AgentKind::Master.is_child());
    }
}
