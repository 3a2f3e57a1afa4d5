//! Replay data model
//!
//! - [`model`] - battle summary, per-player details and wire enums
//! - [`record`] - replay records, identity resolution and perspective
//!   queries

pub mod model;
pub mod record;

pub use model::{
    Achievement, BattleResult, ReplayDetail, ReplaySummary, VehicleClass, WinnerTeam,
};
pub use record::{
    PlatoonGroups, ReplayData, ReplayRecord, URL_REPLAY_DOWNLOAD_BASE, URL_REPLAY_VIEW_BASE,
};
