//! Replay records: identity resolution, serialization views and
//! perspective-relative battle queries
//!
//! A [`ReplayRecord`] wraps one [`ReplaySummary`] together with the
//! service URLs and the replay identifier. The identifier may arrive in
//! three places (explicitly, or as the trailing segment of either URL);
//! finalization resolves it once and canonicalizes all three fields so
//! they always agree.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::replay::model::{BattleResult, ReplaySummary, WinnerTeam};
use crate::utils::last_path_segment;

/// Base URL replay view pages are served from
pub const URL_REPLAY_VIEW_BASE: &str = "https://replays.wotinspector.com/en/view/";
/// Base URL replay files are downloaded from
pub const URL_REPLAY_DOWNLOAD_BASE: &str = "https://replays.wotinspector.com/en/download/";

/// Platoon members keyed by platoon index
pub type PlatoonGroups = BTreeMap<i32, Vec<i64>>;

/// Replay payload: service URLs, identifier and the battle summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayData {
    #[serde(default, alias = "v", skip_serializing_if = "Option::is_none")]
    pub view_url: Option<String>,
    #[serde(default, alias = "d", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Resolved replay identifier; excluded from the wire view
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(alias = "s")]
    pub summary: ReplaySummary,
    /// Unrecognized upstream keys, retained verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReplayData {
    /// Resolve the replay identifier from the first available source and
    /// reconstruct both URLs from the canonical templates.
    ///
    /// A payload carrying none of the three sources keeps its identity
    /// unresolved; the record stays usable.
    fn resolve_identity(&mut self) {
        let id = if let Some(id) = &self.id {
            Some(id.clone())
        } else if let Some(url) = &self.view_url {
            last_path_segment(url).map(str::to_string)
        } else if let Some(url) = &self.download_url {
            last_path_segment(url).map(str::to_string)
        } else {
            None
        };
        let Some(id) = id else {
            debug!("replay carries no id source, identity stays unresolved");
            return;
        };
        self.view_url = Some(format!("{URL_REPLAY_VIEW_BASE}{id}"));
        self.download_url = Some(format!("{URL_REPLAY_DOWNLOAD_BASE}{id}"));
        self.id = Some(id);
    }

    /// Export view: URLs and identifier dropped as recomputable, summary
    /// exported under its short alias.
    pub fn export_db(&self) -> Result<Value> {
        let mut obj = Map::new();
        obj.insert("s".to_string(), self.summary.export_db()?);
        for (key, value) in &self.extra {
            obj.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(obj))
    }
}

/// One canonical replay as served by the replay hosting service.
///
/// Constructed once from an upstream payload (network response or local
/// file) via [`ReplayRecord::parse`]; immutable after finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Top-level identifier; excluded from the wire view
    #[serde(default, alias = "_id", skip_serializing)]
    pub id: Option<String>,
    #[serde(default = "default_status", alias = "s")]
    pub status: String,
    #[serde(alias = "d")]
    pub data: ReplayData,
    #[serde(default, alias = "e")]
    pub error: Map<String, Value>,
    /// Unrecognized upstream keys, retained verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_status() -> String {
    "ok".to_string()
}

impl ReplayRecord {
    /// Parse a replay JSON payload and run the finalization pass.
    pub fn parse(text: &str) -> Result<Self> {
        let mut record: ReplayRecord = serde_json::from_str(text)?;
        record.finalize()?;
        Ok(record)
    }

    /// Boundary variant of [`ReplayRecord::parse`]: logs the cause and
    /// returns `None` instead of propagating, for payloads outside this
    /// system's control.
    pub fn from_json(text: &str) -> Option<Self> {
        match Self::parse(text) {
            Ok(record) => Some(record),
            Err(err) => {
                error!("invalid replay format: {err}");
                None
            }
        }
    }

    /// Read a replay JSON file; logs and returns `None` on any failure.
    pub async fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::from_json(&text),
            Err(err) => {
                error!("error reading replay {}: {err}", path.display());
                None
            }
        }
    }

    /// Write the wire view to a file, returning the number of bytes written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<usize> {
        let text = self.to_wire_json()?;
        tokio::fs::write(path, &text).await?;
        Ok(text.len())
    }

    /// Validate, derive and resolve identity. Identifier back-propagation
    /// between the record and its nested data is the only mutation a
    /// record ever sees; whichever id was supplied first wins.
    fn finalize(&mut self) -> Result<()> {
        self.data.summary.finalize()?;
        self.data.resolve_identity();
        if self.id.is_none() {
            self.id = self.data.id.clone();
        } else {
            self.data.id = self.id.clone();
        }
        Ok(())
    }

    /// The resolved replay identifier, if any source supplied one
    pub fn resolved_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.data.id.as_deref())
    }

    /// Wire view: long field names, identifier fields omitted, unknown
    /// keys retained. Mirrors the upstream shape for byte-stable local
    /// persistence without identity pollution.
    pub fn to_wire_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Export view for storage ingestion: short aliases, default and
    /// unset fields omitted, URLs / nested id / derived timestamp
    /// dropped as redundant. Keyed by the resolved identifier.
    pub fn export_db(&self) -> Result<Value> {
        let mut obj = Map::new();
        if let Some(id) = &self.id {
            obj.insert("_id".to_string(), Value::String(id.clone()));
        }
        if self.status != "ok" {
            obj.insert("s".to_string(), Value::String(self.status.clone()));
        }
        obj.insert("d".to_string(), self.data.export_db()?);
        if !self.error.is_empty() {
            obj.insert("e".to_string(), Value::Object(self.error.clone()));
        }
        for (key, value) in &self.extra {
            obj.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(obj))
    }

    /// Ally roster from `player`'s perspective (`None` = uploader)
    pub fn allies(&self, player: Option<i64>) -> Result<&[i64]> {
        let summary = &self.data.summary;
        match player {
            None => Ok(&summary.allies),
            Some(p) if summary.allies.contains(&p) => Ok(&summary.allies),
            Some(p) if summary.enemies.contains(&p) => Ok(&summary.enemies),
            Some(p) => Err(Error::PlayerNotFound(p)),
        }
    }

    /// Enemy roster from `player`'s perspective (`None` = uploader)
    pub fn enemies(&self, player: Option<i64>) -> Result<&[i64]> {
        let summary = &self.data.summary;
        match player {
            None => Ok(&summary.enemies),
            Some(p) if summary.allies.contains(&p) => Ok(&summary.enemies),
            Some(p) if summary.enemies.contains(&p) => Ok(&summary.allies),
            Some(p) => Err(Error::PlayerNotFound(p)),
        }
    }

    /// All participants: enemies first, then allies, order fixed
    pub fn players(&self) -> Vec<i64> {
        let summary = &self.data.summary;
        let mut players = Vec::with_capacity(summary.enemies.len() + summary.allies.len());
        players.extend_from_slice(&summary.enemies);
        players.extend_from_slice(&summary.allies);
        players
    }

    /// Platoon groupings `(allied, enemy)` keyed by platoon index, from
    /// `player`'s perspective.
    ///
    /// Only rows with a positive platoon index participate. A row whose
    /// player is on neither roster is skipped, not an error.
    pub fn platoons(&self, player: Option<i64>) -> Result<(PlatoonGroups, PlatoonGroups)> {
        let allies = self.allies(player)?;
        let enemies = self.enemies(player)?;
        let mut allied_platoons = PlatoonGroups::new();
        let mut enemy_platoons = PlatoonGroups::new();
        for detail in &self.data.summary.details {
            let Some(squad) = detail.squad_index else {
                continue;
            };
            if squad <= 0 {
                continue;
            }
            if allies.contains(&detail.dbid) {
                allied_platoons.entry(squad).or_default().push(detail.dbid);
            } else if enemies.contains(&detail.dbid) {
                enemy_platoons.entry(squad).or_default().push(detail.dbid);
            } else {
                debug!("player {} on neither roster, skipping platoon row", detail.dbid);
            }
        }
        Ok((allied_platoons, enemy_platoons))
    }

    /// Battle result from `player`'s perspective (`None` = uploader).
    ///
    /// An `Incomplete` raw result short-circuits, and a player on neither
    /// roster yields `Incomplete` rather than an error. Only equality
    /// with `Win` is tested on the uploader-recorded raw value: raw
    /// `NotWin`, `Loss` and `Draw` all resolve through `winner_team`,
    /// because the uploader-recorded distinction between them is
    /// unreliable.
    pub fn battle_result(&self, player: Option<i64>) -> BattleResult {
        let summary = &self.data.summary;
        if summary.battle_result == Some(BattleResult::Incomplete) {
            return BattleResult::Incomplete;
        }
        let on_enemy_roster = player.map_or(false, |p| summary.enemies.contains(&p));
        let on_ally_roster = player.map_or(true, |p| summary.allies.contains(&p));
        if on_enemy_roster {
            if summary.battle_result == Some(BattleResult::Win) {
                BattleResult::Loss
            } else if summary.winner_team == Some(WinnerTeam::Draw) {
                BattleResult::Draw
            } else {
                BattleResult::Win
            }
        } else if on_ally_roster {
            if summary.battle_result == Some(BattleResult::Win) {
                BattleResult::Win
            } else if summary.winner_team == Some(WinnerTeam::Draw) {
                BattleResult::Draw
            } else {
                BattleResult::Loss
            }
        } else {
            debug!("player {player:?} not in the battle");
            BattleResult::Incomplete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(data_header: &str) -> String {
        format!(
            r#"{{
                "s": "ok",
                "d": {{
                    {data_header}
                    "s": {{
                        "wt": 1, "br": 1,
                        "t": "title", "pn": "tester", "p": 1001, "pt": 1,
                        "mn": "Middleburg", "v": "T-34", "vx": 5, "vt": 1,
                        "bts": 1666794000, "bd": 302.5, "aid": 9001,
                        "a": [1001, 1002, 1003],
                        "e": [2001, 2002, 2003],
                        "d": [
                            {{"ai": 1001, "sq": 1}},
                            {{"ai": 1002, "sq": 1}},
                            {{"ai": 2001, "sq": 2}},
                            {{"ai": 2002}},
                            {{"ai": 9999, "sq": 3}}
                        ]
                    }}
                }}
            }}"#
        )
    }

    fn record_with(data_header: &str) -> ReplayRecord {
        ReplayRecord::parse(&record_json(data_header)).unwrap()
    }

    const REPLAY_ID: &str = "48f3d51b2120c23e2e1f5f4f4e1c3a77";

    #[test]
    fn test_identity_from_view_url() {
        let header = format!("\"v\": \"{URL_REPLAY_VIEW_BASE}{REPLAY_ID}\",");
        let record = record_with(&header);
        assert_eq!(record.resolved_id(), Some(REPLAY_ID));
        assert_eq!(record.id.as_deref(), Some(REPLAY_ID));
        assert_eq!(record.data.id.as_deref(), Some(REPLAY_ID));
        assert_eq!(
            record.data.download_url.as_deref(),
            Some(format!("{URL_REPLAY_DOWNLOAD_BASE}{REPLAY_ID}").as_str())
        );
    }

    #[test]
    fn test_identity_from_explicit_id() {
        let header = format!("\"id\": \"{REPLAY_ID}\",");
        let record = record_with(&header);
        assert_eq!(
            record.data.view_url.as_deref(),
            Some(format!("{URL_REPLAY_VIEW_BASE}{REPLAY_ID}").as_str())
        );
        assert_eq!(
            record.data.download_url.as_deref(),
            Some(format!("{URL_REPLAY_DOWNLOAD_BASE}{REPLAY_ID}").as_str())
        );
    }

    #[test]
    fn test_identity_from_download_url() {
        let header = format!("\"d\": \"{URL_REPLAY_DOWNLOAD_BASE}{REPLAY_ID}\",");
        let record = record_with(&header);
        assert_eq!(record.resolved_id(), Some(REPLAY_ID));
        assert_eq!(
            record.data.view_url.as_deref(),
            Some(format!("{URL_REPLAY_VIEW_BASE}{REPLAY_ID}").as_str())
        );
    }

    #[test]
    fn test_missing_identity_is_tolerated() {
        let record = record_with("");
        assert_eq!(record.resolved_id(), None);
        assert_eq!(record.data.view_url, None);
        // still queryable
        assert_eq!(record.battle_result(None), BattleResult::Win);
    }

    #[test]
    fn test_top_level_id_propagates_down() {
        let json = record_json("").replacen(
            "\"s\": \"ok\",",
            &format!("\"s\": \"ok\", \"_id\": \"{REPLAY_ID}\","),
            1,
        );
        let record = ReplayRecord::parse(&json).unwrap();
        assert_eq!(record.data.id.as_deref(), Some(REPLAY_ID));
    }

    #[test]
    fn test_wire_view_omits_ids_and_round_trips() {
        let header = format!("\"id\": \"{REPLAY_ID}\",");
        let record = record_with(&header);
        let wire = record.to_wire_json().unwrap();
        let value: Value = serde_json::from_str(&wire).unwrap();
        assert!(value.get("id").is_none());
        assert!(value["data"].get("id").is_none());
        // long names on the wire
        assert!(value["data"]["summary"]["player_name"].is_string());
        // and the derived timestamp is present
        assert!(value["data"]["summary"]["battle_start_time"].is_string());

        let reparsed = ReplayRecord::parse(&wire).unwrap();
        // identity is re-derived from the canonical URLs
        assert_eq!(reparsed.resolved_id(), Some(REPLAY_ID));
    }

    #[test]
    fn test_export_view_shape() {
        let header = format!("\"id\": \"{REPLAY_ID}\",");
        let record = record_with(&header);
        let export = record.export_db().unwrap();
        assert_eq!(export["_id"], Value::String(REPLAY_ID.to_string()));
        // default status and empty error are omitted
        assert!(export.get("s").is_none());
        assert!(export.get("e").is_none());
        let data = export["d"].as_object().unwrap();
        assert!(data.get("v").is_none());
        assert!(data.get("d").is_none());
        let summary = data["s"].as_object().unwrap();
        assert!(summary.get("battle_start_time").is_none());
        assert_eq!(summary["pn"], Value::String("tester".to_string()));
    }

    #[test]
    fn test_rosters_by_perspective() {
        let record = record_with("");
        assert_eq!(record.allies(None).unwrap(), &[1001, 1002, 1003]);
        assert_eq!(record.allies(Some(1002)).unwrap(), &[1001, 1002, 1003]);
        assert_eq!(record.allies(Some(2002)).unwrap(), &[2001, 2002, 2003]);
        assert_eq!(record.enemies(Some(2002)).unwrap(), &[1001, 1002, 1003]);
        assert!(matches!(
            record.allies(Some(4242)),
            Err(Error::PlayerNotFound(4242))
        ));
        assert_eq!(record.players(), vec![2001, 2002, 2003, 1001, 1002, 1003]);
    }

    #[test]
    fn test_platoons_group_by_squad_index() {
        let record = record_with("");
        let (allied, enemy) = record.platoons(None).unwrap();
        assert_eq!(allied.get(&1), Some(&vec![1001, 1002]));
        assert_eq!(enemy.get(&2), Some(&vec![2001]));
        // the row for 9999 is on neither roster: skipped from both
        assert!(allied.get(&3).is_none());
        assert!(enemy.get(&3).is_none());
        // swapped perspective swaps the groupings
        let (allied, enemy) = record.platoons(Some(2001)).unwrap();
        assert_eq!(allied.get(&2), Some(&vec![2001]));
        assert_eq!(enemy.get(&1), Some(&vec![1001, 1002]));
    }

    #[test]
    fn test_battle_result_matrix() {
        // raw win, winner team one
        let record = record_with("");
        assert_eq!(record.battle_result(None), BattleResult::Win);
        assert_eq!(record.battle_result(Some(1002)), BattleResult::Win);
        assert_eq!(record.battle_result(Some(2001)), BattleResult::Loss);

        // raw not_win: allies lost
        let json = record_json("").replace("\"br\": 1", "\"br\": 0");
        let record = ReplayRecord::parse(&json).unwrap();
        assert_eq!(record.battle_result(None), BattleResult::Loss);
        assert_eq!(record.battle_result(Some(2001)), BattleResult::Win);

        // raw loss behaves exactly like not_win
        let json = record_json("").replace("\"br\": 1", "\"br\": 2");
        let record = ReplayRecord::parse(&json).unwrap();
        assert_eq!(record.battle_result(None), BattleResult::Loss);
        assert_eq!(record.battle_result(Some(2001)), BattleResult::Win);

        // winner team draw resolves to draw for both sides
        let json = record_json("")
            .replace("\"br\": 1", "\"br\": 0")
            .replace("\"wt\": 1", "\"wt\": 0");
        let record = ReplayRecord::parse(&json).unwrap();
        assert_eq!(record.battle_result(None), BattleResult::Draw);
        assert_eq!(record.battle_result(Some(2001)), BattleResult::Draw);

        // incomplete short-circuits for every perspective
        let json = record_json("").replace("\"br\": 1", "\"br\": -1");
        let record = ReplayRecord::parse(&json).unwrap();
        assert_eq!(record.battle_result(None), BattleResult::Incomplete);
        assert_eq!(record.battle_result(Some(2001)), BattleResult::Incomplete);
        assert_eq!(record.battle_result(Some(4242)), BattleResult::Incomplete);

        // unknown player on a completed battle
        assert_eq!(record_with("").battle_result(Some(4242)), BattleResult::Incomplete);
    }
}
