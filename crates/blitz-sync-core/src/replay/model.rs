//! Battle summary and per-player detail models
//!
//! The upstream replay service emits JSON keyed by short aliases (`wt`,
//! `br`, `a`, ...). Parsing accepts both the aliases and the long field
//! names, so locally persisted wire files round-trip through the same
//! structs. Unknown upstream keys are retained verbatim in a per-struct
//! side-map and treated as opaque pass-through.

use std::fmt;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::utils::{remap_keys, to_object};

/// Timestamp format of the derived `battle_start_time` field
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which team won the battle, as recorded by the uploader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum WinnerTeam {
    Draw = 0,
    One = 1,
    Two = 2,
}

impl From<WinnerTeam> for i8 {
    fn from(value: WinnerTeam) -> i8 {
        value as i8
    }
}

impl TryFrom<i8> for WinnerTeam {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(WinnerTeam::Draw),
            1 => Ok(WinnerTeam::One),
            2 => Ok(WinnerTeam::Two),
            other => Err(format!("unknown winner team {other}")),
        }
    }
}

/// Battle outcome, both as recorded by the uploader and as derived for a
/// given perspective by [`ReplayRecord::battle_result`].
///
/// [`ReplayRecord::battle_result`]: crate::replay::ReplayRecord::battle_result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum BattleResult {
    Incomplete = -1,
    NotWin = 0,
    Win = 1,
    Loss = 2,
    Draw = 3,
}

impl From<BattleResult> for i8 {
    fn from(value: BattleResult) -> i8 {
        value as i8
    }
}

impl TryFrom<i8> for BattleResult {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, String> {
        match value {
            -1 => Ok(BattleResult::Incomplete),
            0 => Ok(BattleResult::NotWin),
            1 => Ok(BattleResult::Win),
            2 => Ok(BattleResult::Loss),
            3 => Ok(BattleResult::Draw),
            other => Err(format!("unknown battle result {other}")),
        }
    }
}

impl fmt::Display for BattleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleResult::Incomplete => write!(f, "Incomplete"),
            BattleResult::NotWin => write!(f, "Not win"),
            BattleResult::Win => write!(f, "Win"),
            BattleResult::Loss => write!(f, "Loss"),
            BattleResult::Draw => write!(f, "Draw"),
        }
    }
}

/// Vehicle class of the protagonist's tank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VehicleClass {
    LightTank = 0,
    MediumTank = 1,
    HeavyTank = 2,
    TankDestroyer = 3,
}

impl From<VehicleClass> for i8 {
    fn from(value: VehicleClass) -> i8 {
        value as i8
    }
}

impl TryFrom<i8> for VehicleClass {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(VehicleClass::LightTank),
            1 => Ok(VehicleClass::MediumTank),
            2 => Ok(VehicleClass::HeavyTank),
            3 => Ok(VehicleClass::TankDestroyer),
            other => Err(format!("unknown vehicle class {other}")),
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleClass::LightTank => write!(f, "Light tank"),
            VehicleClass::MediumTank => write!(f, "Medium tank"),
            VehicleClass::HeavyTank => write!(f, "Heavy tank"),
            VehicleClass::TankDestroyer => write!(f, "Tank destroyer"),
        }
    }
}

/// One achievement earned during a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub t: i64,
    pub v: i64,
}

/// Per-player battle detail row, one per participant on either roster.
///
/// Every statistic is individually optional because the upstream service
/// omits zero or irrelevant fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDetail {
    #[serde(default, alias = "a", skip_serializing_if = "Option::is_none")]
    pub achievements: Option<Vec<Achievement>>,
    #[serde(default, alias = "bc", skip_serializing_if = "Option::is_none")]
    pub base_capture_points: Option<i64>,
    #[serde(default, alias = "bd", skip_serializing_if = "Option::is_none")]
    pub base_defend_points: Option<i64>,
    #[serde(default, alias = "ch", skip_serializing_if = "Option::is_none")]
    pub chassis_id: Option<i64>,
    #[serde(default, alias = "ct", skip_serializing_if = "Option::is_none")]
    pub clan_tag: Option<String>,
    #[serde(default, alias = "ci", skip_serializing_if = "Option::is_none")]
    pub clanid: Option<i64>,
    #[serde(default, alias = "cr", skip_serializing_if = "Option::is_none")]
    pub credits: Option<i64>,
    #[serde(default, alias = "da", skip_serializing_if = "Option::is_none")]
    pub damage_assisted: Option<i64>,
    #[serde(default, alias = "dat", skip_serializing_if = "Option::is_none")]
    pub damage_assisted_track: Option<i64>,
    #[serde(default, alias = "db", skip_serializing_if = "Option::is_none")]
    pub damage_blocked: Option<i64>,
    #[serde(default, alias = "dm", skip_serializing_if = "Option::is_none")]
    pub damage_made: Option<i64>,
    #[serde(default, alias = "dr", skip_serializing_if = "Option::is_none")]
    pub damage_received: Option<i64>,
    /// Account id of the player this row belongs to
    #[serde(alias = "ai")]
    pub dbid: i64,
    #[serde(default, alias = "de", skip_serializing_if = "Option::is_none")]
    pub death_reason: Option<i64>,
    #[serde(default, alias = "dt", skip_serializing_if = "Option::is_none")]
    pub distance_travelled: Option<i64>,
    #[serde(default, alias = "ed", skip_serializing_if = "Option::is_none")]
    pub enemies_damaged: Option<i64>,
    #[serde(default, alias = "ek", skip_serializing_if = "Option::is_none")]
    pub enemies_destroyed: Option<i64>,
    #[serde(default, alias = "es", skip_serializing_if = "Option::is_none")]
    pub enemies_spotted: Option<i64>,
    #[serde(default, alias = "ex", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, alias = "exa", skip_serializing_if = "Option::is_none")]
    pub exp_for_assist: Option<i64>,
    #[serde(default, alias = "exd", skip_serializing_if = "Option::is_none")]
    pub exp_for_damage: Option<i64>,
    #[serde(default, alias = "et", skip_serializing_if = "Option::is_none")]
    pub exp_team_bonus: Option<i64>,
    #[serde(default, alias = "gi", skip_serializing_if = "Option::is_none")]
    pub gun_id: Option<i64>,
    #[serde(default, alias = "hc", skip_serializing_if = "Option::is_none")]
    pub hero_bonus_credits: Option<i64>,
    #[serde(default, alias = "he", skip_serializing_if = "Option::is_none")]
    pub hero_bonus_exp: Option<i64>,
    #[serde(default, alias = "hl", skip_serializing_if = "Option::is_none")]
    pub hitpoints_left: Option<i64>,
    #[serde(default, alias = "hb", skip_serializing_if = "Option::is_none")]
    pub hits_bounced: Option<i64>,
    #[serde(default, alias = "hp", skip_serializing_if = "Option::is_none")]
    pub hits_pen: Option<i64>,
    #[serde(default, alias = "hr", skip_serializing_if = "Option::is_none")]
    pub hits_received: Option<i64>,
    #[serde(default, alias = "hs", skip_serializing_if = "Option::is_none")]
    pub hits_splash: Option<i64>,
    #[serde(default, alias = "ki", skip_serializing_if = "Option::is_none")]
    pub killed_by: Option<i64>,
    #[serde(default, alias = "sh", skip_serializing_if = "Option::is_none")]
    pub shots_hit: Option<i64>,
    #[serde(default, alias = "sm", skip_serializing_if = "Option::is_none")]
    pub shots_made: Option<i64>,
    #[serde(default, alias = "sp", skip_serializing_if = "Option::is_none")]
    pub shots_pen: Option<i64>,
    #[serde(default, alias = "ss", skip_serializing_if = "Option::is_none")]
    pub shots_splash: Option<i64>,
    /// Platoon index; 0 or absent means the player queued solo
    #[serde(default, alias = "sq", skip_serializing_if = "Option::is_none")]
    pub squad_index: Option<i32>,
    #[serde(default, alias = "t", skip_serializing_if = "Option::is_none")]
    pub time_alive: Option<i64>,
    #[serde(default, alias = "ti", skip_serializing_if = "Option::is_none")]
    pub turret_id: Option<i64>,
    #[serde(default, alias = "vi", skip_serializing_if = "Option::is_none")]
    pub vehicle_descr: Option<i64>,
    #[serde(default, alias = "we", skip_serializing_if = "Option::is_none")]
    pub wp_points_earned: Option<i64>,
    #[serde(default, alias = "ws", skip_serializing_if = "Option::is_none")]
    pub wp_points_stolen: Option<i64>,
    /// Unrecognized upstream keys, retained verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Long-name -> short-alias table for the export view
const DETAIL_ALIASES: &[(&str, &str)] = &[
    ("achievements", "a"),
    ("base_capture_points", "bc"),
    ("base_defend_points", "bd"),
    ("chassis_id", "ch"),
    ("clan_tag", "ct"),
    ("clanid", "ci"),
    ("credits", "cr"),
    ("damage_assisted", "da"),
    ("damage_assisted_track", "dat"),
    ("damage_blocked", "db"),
    ("damage_made", "dm"),
    ("damage_received", "dr"),
    ("dbid", "ai"),
    ("death_reason", "de"),
    ("distance_travelled", "dt"),
    ("enemies_damaged", "ed"),
    ("enemies_destroyed", "ek"),
    ("enemies_spotted", "es"),
    ("exp", "ex"),
    ("exp_for_assist", "exa"),
    ("exp_for_damage", "exd"),
    ("exp_team_bonus", "et"),
    ("gun_id", "gi"),
    ("hero_bonus_credits", "hc"),
    ("hero_bonus_exp", "he"),
    ("hitpoints_left", "hl"),
    ("hits_bounced", "hb"),
    ("hits_pen", "hp"),
    ("hits_received", "hr"),
    ("hits_splash", "hs"),
    ("killed_by", "ki"),
    ("shots_hit", "sh"),
    ("shots_made", "sm"),
    ("shots_pen", "sp"),
    ("shots_splash", "ss"),
    ("squad_index", "sq"),
    ("time_alive", "t"),
    ("turret_id", "ti"),
    ("vehicle_descr", "vi"),
    ("wp_points_earned", "we"),
    ("wp_points_stolen", "ws"),
];

impl ReplayDetail {
    /// Export view of one detail row: short aliases, unset fields omitted.
    pub fn export_db(&self) -> Result<Value> {
        let obj = to_object(self)?;
        Ok(Value::Object(remap_keys(obj, DETAIL_ALIASES)))
    }
}

/// Canonical record of one battle instance.
///
/// `battle_start_time` is derived: it is recomputed from
/// `battle_start_timestamp` during finalization, overwriting any
/// externally supplied value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySummary {
    #[serde(alias = "wt")]
    pub winner_team: Option<WinnerTeam>,
    #[serde(alias = "br")]
    pub battle_result: Option<BattleResult>,
    #[serde(default, alias = "rt", skip_serializing_if = "Option::is_none")]
    pub room_type: Option<i64>,
    #[serde(default, alias = "bt", skip_serializing_if = "Option::is_none")]
    pub battle_type: Option<i64>,
    #[serde(default, alias = "ul")]
    pub uploaded_by: i64,
    #[serde(alias = "t")]
    pub title: Option<String>,
    #[serde(alias = "pn")]
    pub player_name: String,
    /// Account id of the player who recorded the replay
    #[serde(alias = "p")]
    pub protagonist: i64,
    #[serde(alias = "pt")]
    pub protagonist_team: Option<i32>,
    #[serde(alias = "mn")]
    pub map_name: String,
    #[serde(alias = "v")]
    pub vehicle: String,
    #[serde(alias = "vx")]
    pub vehicle_tier: Option<i32>,
    #[serde(alias = "vt")]
    pub vehicle_type: Option<VehicleClass>,
    #[serde(default, alias = "ct", skip_serializing_if = "Option::is_none")]
    pub credits_total: Option<i64>,
    #[serde(default, alias = "cb", skip_serializing_if = "Option::is_none")]
    pub credits_base: Option<i64>,
    #[serde(default, alias = "eb", skip_serializing_if = "Option::is_none")]
    pub exp_base: Option<i64>,
    #[serde(default, alias = "et", skip_serializing_if = "Option::is_none")]
    pub exp_total: Option<i64>,
    /// Epoch seconds of the battle start
    #[serde(alias = "bts")]
    pub battle_start_timestamp: i64,
    /// Derived from `battle_start_timestamp`, never trusted from input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battle_start_time: Option<String>,
    #[serde(alias = "bd")]
    pub battle_duration: f64,
    #[serde(default, alias = "de", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "aid")]
    pub arena_unique_id: i64,
    /// Roster of the uploader's own team
    #[serde(alias = "a")]
    pub allies: Vec<i64>,
    /// Roster of the opposing team
    #[serde(alias = "e")]
    pub enemies: Vec<i64>,
    #[serde(default, alias = "mb", skip_serializing_if = "Option::is_none")]
    pub mastery_badge: Option<i64>,
    /// One row per participant across both rosters
    #[serde(alias = "d")]
    pub details: Vec<ReplayDetail>,
    /// Unrecognized upstream keys, retained verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const SUMMARY_ALIASES: &[(&str, &str)] = &[
    ("winner_team", "wt"),
    ("battle_result", "br"),
    ("room_type", "rt"),
    ("battle_type", "bt"),
    ("uploaded_by", "ul"),
    ("title", "t"),
    ("player_name", "pn"),
    ("protagonist", "p"),
    ("protagonist_team", "pt"),
    ("map_name", "mn"),
    ("vehicle", "v"),
    ("vehicle_tier", "vx"),
    ("vehicle_type", "vt"),
    ("credits_total", "ct"),
    ("credits_base", "cb"),
    ("exp_base", "eb"),
    ("exp_total", "et"),
    ("battle_start_timestamp", "bts"),
    ("battle_duration", "bd"),
    ("description", "de"),
    ("arena_unique_id", "aid"),
    ("allies", "a"),
    ("enemies", "e"),
    ("mastery_badge", "mb"),
    ("details", "d"),
];

impl ReplaySummary {
    /// Validate bounded fields and recompute the derived timestamp.
    ///
    /// Called once after parsing; the summary is immutable afterwards.
    pub(crate) fn finalize(&mut self) -> Result<()> {
        if let Some(tier) = self.vehicle_tier {
            if !(0..=10).contains(&tier) {
                return Err(Error::validation(
                    "vehicle_tier",
                    format!("tier has to be within [0, 10], got {tier}"),
                ));
            }
        }
        if !matches!(self.protagonist_team, Some(1) | Some(2)) {
            return Err(Error::validation(
                "protagonist_team",
                format!("has to be 1 or 2, got {:?}", self.protagonist_team),
            ));
        }
        self.battle_start_time = Some(format_battle_timestamp(self.battle_start_timestamp)?);
        Ok(())
    }

    /// Export view of the summary: short aliases, unset and default
    /// fields omitted, the derived timestamp dropped as recomputable.
    pub fn export_db(&self) -> Result<Value> {
        let mut obj = to_object(self)?;
        obj.remove("battle_start_time");
        if self.uploaded_by == 0 {
            obj.remove("uploaded_by");
        }
        let details: Vec<Value> = self
            .details
            .iter()
            .map(ReplayDetail::export_db)
            .collect::<Result<_>>()?;
        obj.insert("details".to_string(), Value::Array(details));
        Ok(Value::Object(remap_keys(obj, SUMMARY_ALIASES)))
    }
}

fn format_battle_timestamp(epoch: i64) -> Result<String> {
    let timestamp = Local.timestamp_opt(epoch, 0).single().ok_or_else(|| {
        Error::validation(
            "battle_start_timestamp",
            format!("{epoch} is not a valid epoch timestamp"),
        )
    })?;
    Ok(timestamp.format(TIMESTAMP_FORMAT).to_string())
}
