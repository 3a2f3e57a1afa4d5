//! Composite storage identifier for per-vehicle statistics
//!
//! One row exists per (account, vehicle, upload) triple. Packing the
//! triple into a fixed-width key makes re-submission of the same row
//! idempotent (same triple, same identifier) and byte order gives
//! lexicographic sorting by account, then vehicle, then time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Opaque 96-bit statistics identifier, rendered as 24 hex digits.
///
/// Layout: `account_id` in the first 40 bits, `tank_id` in the next 24,
/// `last_battle_time` in the final 32, each zero-padded on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatId([u8; 12]);

/// Bit width of the account id segment
pub const ACCOUNT_ID_BITS: u32 = 40;
/// Bit width of the tank id segment
pub const TANK_ID_BITS: u32 = 24;
/// Bit width of the last battle time segment
pub const BATTLE_TIME_BITS: u32 = 32;

fn check_width(field: &'static str, value: i64, bits: u32) -> Result<u64> {
    if value < 0 || (value as u64) >> bits != 0 {
        return Err(Error::IdOverflow {
            field,
            value: value as u64,
            bits,
        });
    }
    Ok(value as u64)
}

impl StatId {
    /// Pack an (account, vehicle, upload time) triple into one identifier.
    ///
    /// A value outside its segment's bit width is an error; silent
    /// truncation would alias distinct rows.
    pub fn pack(account_id: i64, tank_id: i64, last_battle_time: i64) -> Result<StatId> {
        let account = check_width("account_id", account_id, ACCOUNT_ID_BITS)?;
        let tank = check_width("tank_id", tank_id, TANK_ID_BITS)?;
        let time = check_width("last_battle_time", last_battle_time, BATTLE_TIME_BITS)?;

        let mut bytes = [0u8; 12];
        bytes[..5].copy_from_slice(&account.to_be_bytes()[3..]);
        bytes[5..8].copy_from_slice(&tank.to_be_bytes()[5..]);
        bytes[8..].copy_from_slice(&(time as u32).to_be_bytes());
        Ok(StatId(bytes))
    }

    /// Exact inverse of [`StatId::pack`]: recover the original triple.
    pub fn unpack(self) -> (i64, i64, i64) {
        let mut account = [0u8; 8];
        account[3..].copy_from_slice(&self.0[..5]);
        let mut tank = [0u8; 8];
        tank[5..].copy_from_slice(&self.0[5..8]);
        let mut time = [0u8; 4];
        time.copy_from_slice(&self.0[8..]);
        (
            u64::from_be_bytes(account) as i64,
            u64::from_be_bytes(tank) as i64,
            u32::from_be_bytes(time) as i64,
        )
    }

    /// Raw key bytes, big-endian segment order
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Display for StatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for StatId {
    type Err = Error;

    fn from_str(s: &str) -> Result<StatId> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidStatId(s.to_string()))?;
        let bytes: [u8; 12] = bytes
            .try_into()
            .map_err(|_| Error::InvalidStatId(s.to_string()))?;
        Ok(StatId(bytes))
    }
}

impl Serialize for StatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_zero_padded_hex_concatenation() {
        let id = StatId::pack(1, 2, 3).unwrap();
        assert_eq!(id.to_string(), "000000000100000200000003");
    }

    #[test]
    fn test_round_trip_at_segment_maxima() {
        let account_max = (1i64 << ACCOUNT_ID_BITS) - 1;
        let tank_max = (1i64 << TANK_ID_BITS) - 1;
        let time_max = (1i64 << BATTLE_TIME_BITS) - 1;
        for (account, tank, time) in [
            (0, 0, 0),
            (1, 2, 3),
            (account_max, tank_max, time_max),
            (1_037_453_781, 5137, 1_666_794_000),
        ] {
            let id = StatId::pack(account, tank, time).unwrap();
            assert_eq!(id.unpack(), (account, tank, time));
        }
    }

    #[test]
    fn test_one_over_a_segment_width_overflows() {
        assert!(matches!(
            StatId::pack(1i64 << ACCOUNT_ID_BITS, 0, 0),
            Err(Error::IdOverflow { field: "account_id", .. })
        ));
        assert!(matches!(
            StatId::pack(0, 1i64 << TANK_ID_BITS, 0),
            Err(Error::IdOverflow { field: "tank_id", .. })
        ));
        assert!(matches!(
            StatId::pack(0, 0, 1i64 << BATTLE_TIME_BITS),
            Err(Error::IdOverflow { field: "last_battle_time", .. })
        ));
        assert!(StatId::pack(-1, 0, 0).is_err());
    }

    #[test]
    fn test_ordering_is_account_then_tank_then_time() {
        let a = StatId::pack(1, 500, 900).unwrap();
        let b = StatId::pack(2, 1, 1).unwrap();
        let c = StatId::pack(2, 1, 2).unwrap();
        let d = StatId::pack(2, 2, 0).unwrap();
        let mut ids = vec![d, c, a, b];
        ids.sort();
        assert_eq!(ids, vec![a, b, c, d]);
        // hex rendering sorts identically
        let mut hexes: Vec<String> = [d, c, a, b].iter().map(StatId::to_string).collect();
        hexes.sort();
        assert_eq!(hexes, ids.iter().map(StatId::to_string).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_str_round_trip_and_rejects_garbage() {
        let id = StatId::pack(42, 7, 99).unwrap();
        let parsed: StatId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("zz".parse::<StatId>().is_err());
        assert!("0102".parse::<StatId>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = StatId::pack(1, 2, 3).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"000000000100000200000003\"");
        let back: StatId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
