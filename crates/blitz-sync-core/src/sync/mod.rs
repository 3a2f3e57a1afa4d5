//! Replay synchronization with the hosting service
//!
//! - [`throttle`] - the shared outbound request budget
//! - [`client`] - fetch, idempotent upload and listing-page scraping

pub mod client;
pub mod throttle;

pub use client::{
    replay_digest, WotInspector, DEFAULT_RATE_LIMIT, URL_REPLAY_INFO, URL_REPLAY_LISTING_BASE,
    URL_REPLAY_UPLOAD,
};
pub use throttle::{RateLimiter, ThrottledClient};
