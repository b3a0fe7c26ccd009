//! Type-safe identifiers.
//!
//! Members are identified by a dense integer in `[1, N]` so that per-member
//! state can live in flat arrays indexed by `member_id - 1`. Generation runs
//! are identified by UUID v7 (time-ordered) for log correlation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dense, 1-based identifier of a mileage account.
///
/// The zero value is not a valid member; use [`MemberId::new`] to validate
/// raw values coming from outside the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MemberId(u32);

impl MemberId {
    /// The first member of every population.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw member number, rejecting zero.
    pub const fn new(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Build the member stored at a zero-based array slot.
    pub fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        Some(Self(raw))
    }

    /// Return the raw 1-based member number.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Return the zero-based array slot for this member.
    pub const fn index(self) -> usize {
        // `self.0 >= 1` by construction.
        self.0.saturating_sub(1) as usize
    }

    /// Return the value as stored in `BIGINT` columns.
    pub fn to_db(self) -> i64 {
        i64::from(self.0)
    }

    /// Parse a value read back from a `BIGINT` column.
    pub fn from_db(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().and_then(Self::new)
    }
}

impl core::fmt::Display for MemberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::str::FromStr for MemberId {
    type Err = InvalidMemberId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidMemberId(s.to_owned()))
    }
}

impl TryFrom<u32> for MemberId {
    type Error = InvalidMemberId;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| InvalidMemberId(raw.to_string()))
    }
}

impl From<MemberId> for u32 {
    fn from(member: MemberId) -> Self {
        member.0
    }
}

/// A string that does not name a valid member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid member id: {0:?}")]
pub struct InvalidMemberId(pub String);

/// Unique identifier for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
