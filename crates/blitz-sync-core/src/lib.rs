//! # blitz-sync-core
//!
//! Core library for ingesting World of Tanks Blitz battle replays and
//! synchronizing them with replays.wotinspector.com.
//!
//! This crate provides the foundational functionality for:
//! - Parsing replay JSON payloads into a canonical battle data model
//! - Perspective-relative roster, platoon and battle-result queries
//! - Server realm classification from account identifiers
//! - Deterministic composite identifiers for per-vehicle statistics
//! - Fetching, idempotently uploading and listing replays under a
//!   shared outbound rate budget
//!
//! ## Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`region`] - Server realm classification
//! - [`replay`] - Battle summaries, replay records and perspective queries
//! - [`stats`] - Per-vehicle statistics and their composite identity
//! - [`sync`] - Rate-limited synchronization client
//!
//! ## Example
//!
//! ```no_run
//! use blitz_sync_core::{WotInspector, DEFAULT_RATE_LIMIT};
//!
//! # async fn run() {
//! let client = WotInspector::new(DEFAULT_RATE_LIMIT, None).expect("client");
//! if let Some(replay) = client.get_replay("48f3d51b2120c23e2e1f5f4f4e1c3a77").await {
//!     println!("battle result: {}", replay.battle_result(None));
//! }
//! # }
//! ```

// Module declarations
pub mod error;
pub mod region;
pub mod replay;
pub mod stats;
pub mod sync;

mod utils;

// Re-export key types for convenience

// Error types
pub use error::{Error, Result};

// Region classification
pub use region::{Region, API_REGIONS};

// Replay data model
pub use replay::{
    Achievement, BattleResult, PlatoonGroups, ReplayData, ReplayDetail, ReplayRecord,
    ReplaySummary, VehicleClass, WinnerTeam,
};

// Tank statistics
pub use stats::{ApiError, StatId, TankStat, TankStatAll, TankStatsResponse};

// Synchronization client
pub use sync::{replay_digest, RateLimiter, ThrottledClient, WotInspector, DEFAULT_RATE_LIMIT};
