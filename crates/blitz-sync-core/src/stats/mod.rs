//! Per-vehicle statistics
//!
//! - [`id`] - the fixed-width composite storage identifier
//! - [`model`] - statistics rows and the API response envelope

pub mod id;
pub mod model;

pub use id::{StatId, ACCOUNT_ID_BITS, BATTLE_TIME_BITS, TANK_ID_BITS};
pub use model::{ApiError, TankStat, TankStatAll, TankStatsResponse};
