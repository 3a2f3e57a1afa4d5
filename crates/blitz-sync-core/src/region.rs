//! Server realm classification from account identifiers
//!
//! Wargaming assigns account ids in ascending, non-overlapping ranges per
//! server realm, so the realm can be recovered from the id alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A game server realm.
///
/// [`Region::Api`] is a virtual wildcard standing for the four realms
/// reachable through the public API ([`API_REGIONS`]); it never matches
/// [`Region::China`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Ru,
    Eu,
    Com,
    Asia,
    China,
    #[serde(rename = "API")]
    Api,
}

/// The realms covered by the [`Region::Api`] wildcard. China is excluded.
pub const API_REGIONS: [Region; 4] = [Region::Eu, Region::Com, Region::Asia, Region::Ru];

impl Region {
    /// Classify an account id into its server realm.
    ///
    /// Thresholds are ascending and partition the non-negative id space:
    /// ids below 5e8 are `ru`, then `eu`, `com`, `asia`, and `china` from
    /// 3.1e9 upward. A negative id is a classification failure, not a
    /// silent default.
    pub fn from_account_id(account_id: i64) -> Result<Region> {
        if account_id < 0 {
            return Err(Error::RegionClassification(account_id));
        }
        Ok(if account_id >= 3_100_000_000 {
            Region::China
        } else if account_id >= 2_000_000_000 {
            Region::Asia
        } else if account_id >= 1_000_000_000 {
            Region::Com
        } else if account_id >= 500_000_000 {
            Region::Eu
        } else {
            Region::Ru
        })
    }

    /// Whether two realms refer to the same server set.
    ///
    /// Reflexive; [`Region::Api`] matches any member of [`API_REGIONS`]
    /// in either argument position.
    pub fn matches(self, other: Region) -> bool {
        if self == other {
            true
        } else if self == Region::Api {
            API_REGIONS.contains(&other)
        } else if other == Region::Api {
            API_REGIONS.contains(&self)
        } else {
            false
        }
    }

    /// Realm name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Ru => "ru",
            Region::Eu => "eu",
            Region::Com => "com",
            Region::Asia => "asia",
            Region::China => "china",
            Region::Api => "API",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
