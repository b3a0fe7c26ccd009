//! Enumeration types for mileage ledger entries.

use serde::{Deserialize, Serialize};

/// The kind of a mileage ledger entry.
///
/// The sign of an entry's amount follows its kind: `Earn` entries are
/// positive, `Use` and `Expire` entries are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MileageKind {
    /// Points credited to the account.
    Earn,
    /// Points spent by the account.
    Use,
    /// Points lapsed through expiry. Reserved; the generator never emits it.
    Expire,
}

impl MileageKind {
    /// Return the string stored in the `kind` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Earn => "EARN",
            Self::Use => "USE",
            Self::Expire => "EXPIRE",
        }
    }

    /// Parse the string stored in the `kind` column.
    pub fn from_db_str(raw: &str) -> Option<Self> {
        match raw {
            "EARN" => Some(Self::Earn),
            "USE" => Some(Self::Use),
            "EXPIRE" => Some(Self::Expire),
            _ => None,
        }
    }

    /// Whether entries of this kind carry a positive amount.
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Earn)
    }
}

impl core::fmt::Display for MileageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl core::str::FromStr for MileageKind {
    type Err = UnknownMileageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| UnknownMileageKind(s.to_owned()))
    }
}

/// A string that does not name a [`MileageKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mileage kind: {0:?} (expected EARN, USE or EXPIRE)")]
pub struct UnknownMileageKind(pub String);
