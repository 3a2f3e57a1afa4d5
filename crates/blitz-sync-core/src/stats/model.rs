//! Per-vehicle statistics records
//!
//! One [`TankStat`] row aggregates a player's lifetime statistics on one
//! vehicle at one upload instant. Its identifier is never assigned
//! independently: finalization derives it from the
//! (account, vehicle, time) triple via [`StatId::pack`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::error::Result;
use crate::region::Region;
use crate::stats::id::StatId;
use crate::utils::{remap_keys, to_object};

/// Aggregate statistics block of one vehicle ("all" battle modes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankStatAll {
    #[serde(alias = "sp")]
    pub spotted: i64,
    #[serde(alias = "h")]
    pub hits: i64,
    #[serde(alias = "k")]
    pub frags: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_xp: Option<i64>,
    #[serde(alias = "w")]
    pub wins: i64,
    #[serde(alias = "l")]
    pub losses: i64,
    #[serde(alias = "cp")]
    pub capture_points: i64,
    #[serde(alias = "b")]
    pub battles: i64,
    #[serde(alias = "dd")]
    pub damage_dealt: i64,
    #[serde(alias = "dr")]
    pub damage_received: i64,
    #[serde(alias = "mk")]
    pub max_frags: i64,
    #[serde(alias = "sh")]
    pub shots: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frags8p: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<i64>,
    #[serde(alias = "ws")]
    pub win_and_survived: i64,
    #[serde(alias = "sb")]
    pub survived_battles: i64,
    #[serde(alias = "dp")]
    pub dropped_capture_points: i64,
}

const STAT_ALL_ALIASES: &[(&str, &str)] = &[
    ("spotted", "sp"),
    ("hits", "h"),
    ("frags", "k"),
    ("wins", "w"),
    ("losses", "l"),
    ("capture_points", "cp"),
    ("battles", "b"),
    ("damage_dealt", "dd"),
    ("damage_received", "dr"),
    ("max_frags", "mk"),
    ("shots", "sh"),
    ("win_and_survived", "ws"),
    ("survived_battles", "sb"),
    ("dropped_capture_points", "dp"),
];

impl TankStatAll {
    /// Export view of the aggregate block
    pub fn export_db(&self) -> Result<Value> {
        let obj = to_object(self)?;
        Ok(Value::Object(remap_keys(obj, STAT_ALL_ALIASES)))
    }
}

/// One per-vehicle statistics row, keyed by its derived [`StatId`].
///
/// `region`, when not supplied upstream, is classified from the account
/// id during finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankStat {
    /// Derived storage identifier; never assigned independently
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<StatId>,
    #[serde(default, alias = "r", skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(alias = "s")]
    pub all: TankStatAll,
    #[serde(alias = "lb")]
    pub last_battle_time: i64,
    #[serde(alias = "a")]
    pub account_id: i64,
    #[serde(alias = "t")]
    pub tank_id: i64,
    #[serde(alias = "m")]
    pub mark_of_mastery: i64,
    #[serde(alias = "l")]
    pub battle_life_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_xp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_garage_updated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frags: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frags: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_garage: Option<bool>,
}

const TANK_STAT_ALIASES: &[(&str, &str)] = &[
    ("id", "_id"),
    ("region", "r"),
    ("all", "s"),
    ("last_battle_time", "lb"),
    ("account_id", "a"),
    ("tank_id", "t"),
    ("mark_of_mastery", "m"),
    ("battle_life_time", "l"),
];

impl TankStat {
    /// Parse one row and run the finalization pass.
    pub fn parse(text: &str) -> Result<TankStat> {
        let mut stat: TankStat = serde_json::from_str(text)?;
        stat.finalize()?;
        Ok(stat)
    }

    /// Derive the identifier and, when unset, the region.
    ///
    /// Idempotent by construction: the same (account, vehicle, time)
    /// triple always produces the same identifier.
    pub(crate) fn finalize(&mut self) -> Result<()> {
        if self.id.is_none() {
            self.id = Some(StatId::pack(
                self.account_id,
                self.tank_id,
                self.last_battle_time,
            )?);
        }
        if self.region.is_none() {
            self.region = Some(Region::from_account_id(self.account_id)?);
        }
        Ok(())
    }

    /// Wire view: long field names, unset fields omitted
    pub fn to_wire_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Export view for storage ingestion: short aliases, keyed by the
    /// derived identifier under `_id`.
    pub fn export_db(&self) -> Result<Value> {
        let mut obj = to_object(self)?;
        obj.insert("all".to_string(), self.all.export_db()?);
        Ok(Value::Object(remap_keys(obj, TANK_STAT_ALIASES)))
    }
}

/// Error payload of the statistics API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "code: {} {}",
            self.code.unwrap_or_default(),
            self.message.as_deref().unwrap_or_default()
        )
    }
}

/// Envelope of a tank statistics API response: per-account lists of
/// [`TankStat`] rows keyed by the account id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankStatsResponse {
    #[serde(default = "default_status", alias = "s")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(default, alias = "d", skip_serializing_if = "Option::is_none")]
    pub data: Option<std::collections::HashMap<String, Option<Vec<TankStat>>>>,
}

fn default_status() -> String {
    "ok".to_string()
}

impl TankStatsResponse {
    /// Parse a statistics API response, finalizing every row.
    ///
    /// A returned API error is logged at the boundary, matching how the
    /// upstream reports partial failures inside a 200 response.
    pub fn parse(text: &str) -> Result<TankStatsResponse> {
        let mut response: TankStatsResponse = serde_json::from_str(text)?;
        if let Some(err) = &response.error {
            error!("statistics API error: {err}");
        }
        if let Some(data) = &mut response.data {
            for stats in data.values_mut().flatten() {
                for stat in stats {
                    stat.finalize()?;
                }
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_json() -> &'static str {
        r#"{
            "s": {
                "sp": 10, "h": 90, "k": 12, "w": 6, "l": 4,
                "cp": 3, "b": 10, "dd": 15000, "dr": 9000,
                "mk": 4, "sh": 120, "ws": 5, "sb": 6, "dp": 1
            },
            "lb": 1666794000,
            "a": 1037453781,
            "t": 5137,
            "m": 4,
            "l": 180
        }"#
    }

    #[test]
    fn test_finalize_derives_id_and_region() {
        let stat = TankStat::parse(stat_json()).unwrap();
        let id = stat.id.unwrap();
        assert_eq!(id.unpack(), (1037453781, 5137, 1666794000));
        // 1.03e9 lands in the com realm
        assert_eq!(stat.region, Some(Region::Com));
    }

    #[test]
    fn test_same_triple_same_id() {
        let a = TankStat::parse(stat_json()).unwrap();
        let b = TankStat::parse(stat_json()).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_explicit_region_is_kept() {
        let json = stat_json().replace("\"lb\":", "\"r\": \"eu\", \"lb\":");
        let stat = TankStat::parse(&json).unwrap();
        assert_eq!(stat.region, Some(Region::Eu));
    }

    #[test]
    fn test_wire_and_export_views() {
        let stat = TankStat::parse(stat_json()).unwrap();

        let wire = stat.to_wire_json().unwrap();
        let value: Value = serde_json::from_str(&wire).unwrap();
        assert!(value["account_id"].is_number());
        assert!(value["all"]["damage_dealt"].is_number());
        assert!(value["id"].is_string());
        assert!(value.get("max_xp").is_none());

        let export = stat.export_db().unwrap();
        assert_eq!(export["a"], Value::from(1037453781i64));
        assert_eq!(export["s"]["dd"], Value::from(15000));
        assert_eq!(export["r"], Value::String("com".to_string()));
        assert_eq!(export["_id"], Value::String(stat.id.unwrap().to_string()));
    }

    #[test]
    fn test_response_envelope() {
        let json = format!(
            r#"{{"s": "ok", "d": {{"1037453781": [{}], "404": null}}}}"#,
            stat_json()
        );
        let response = TankStatsResponse::parse(&json).unwrap();
        let data = response.data.unwrap();
        let rows = data["1037453781"].as_ref().unwrap();
        assert!(rows[0].id.is_some());
        assert!(data["404"].is_none());
    }
}
