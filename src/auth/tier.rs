//! Subscription tiers and their ordering.

use std::fmt;
use std::str::FromStr;

/// Tiers in ascending rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Basic,
    Premium,
    Business,
    Enterprise,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Basic, Tier::Premium, Tier::Business, Tier::Enterprise];

    pub fn rank(self) -> u8 {
        match self {
            Tier::Basic => 1,
            Tier::Premium => 2,
            Tier::Business => 3,
            Tier::Enterprise => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Premium => "premium",
            Tier::Business => "business",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Exact, case-sensitive match on the stored tier string.
    pub fn parse(value: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Whether a user holding `user_tier` may access something gated at
    /// `self`. Empty or unknown user tiers never satisfy a minimum.
    pub fn is_satisfied_by(self, user_tier: &str) -> bool {
        Tier::parse(user_tier).is_some_and(|t| t.rank() >= self.rank())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::parse(s).ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// String form of the tier check; unknown values on either side deny.
pub fn tier_satisfies(user_tier: &str, minimum: &str) -> bool {
    Tier::parse(minimum).is_some_and(|min| min.is_satisfied_by(user_tier))
}
