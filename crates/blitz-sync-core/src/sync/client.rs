//! Client for the replays.wotinspector.com hosting service
//!
//! Uploads are idempotent: the candidate replay identifier is the MD5
//! digest of the raw replay bytes, and an existence probe against the
//! info endpoint short-circuits re-submission of byte-identical
//! payloads. Byte-identical payloads from different participants of the
//! same battle are not produced by the game client, so this only
//! deduplicates genuinely repeated submissions, not multi-perspective
//! uploads of one battle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::{Digest, Md5};
use reqwest::multipart::{Form, Part};
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::replay::record::URL_REPLAY_DOWNLOAD_BASE;
use crate::replay::ReplayRecord;
use crate::sync::throttle::ThrottledClient;
use crate::utils::last_path_segment;

/// Base URL of paginated replay listing pages
pub const URL_REPLAY_LISTING_BASE: &str = "https://replays.wotinspector.com/en/sort/ut/page/";
/// Upload endpoint; query parameters carry the upload metadata
pub const URL_REPLAY_UPLOAD: &str = "https://api.wotinspector.com/replay/upload";
/// Info-lookup endpoint; suffixed with a replay identifier
pub const URL_REPLAY_INFO: &str = "https://api.wotinspector.com/replay/upload?details=full&key=";

/// Default outbound budget: 20 requests per hour
pub const DEFAULT_RATE_LIMIT: f64 = 20.0 / 3600.0;

const MAX_RETRIES: u32 = 3;
const RETRY_SLEEP: Duration = Duration::from_secs(1);

/// Candidate replay identifier of a payload: the MD5 digest of its raw
/// bytes, hex encoded.
pub fn replay_digest(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Replay synchronization client.
///
/// All calls against the info-lookup, download and listing prefixes
/// share one rate-limited outbound channel; everything else (the upload
/// endpoint included) goes out unthrottled.
pub struct WotInspector {
    session: ThrottledClient,
    /// Sequence counter for diagnostic labeling of uploads
    upload_seq: AtomicU32,
}

impl WotInspector {
    /// Build a client with the given outbound budget (requests per
    /// second) and an optional API token.
    pub fn new(rate_limit: f64, auth_token: Option<&str>) -> Result<Self> {
        let filters = vec![
            URL_REPLAY_INFO.to_string(),
            URL_REPLAY_DOWNLOAD_BASE.to_string(),
            URL_REPLAY_LISTING_BASE.to_string(),
        ];
        Ok(Self {
            session: ThrottledClient::new(rate_limit, filters, auth_token)?,
            upload_seq: AtomicU32::new(1),
        })
    }

    /// Info-lookup URL of a replay
    pub fn url_replay_info(replay_id: &str) -> String {
        format!("{URL_REPLAY_INFO}{replay_id}")
    }

    /// Listing-page URL of a zero-based page index
    pub fn url_replay_listing(page: u32) -> String {
        format!("{URL_REPLAY_LISTING_BASE}{page}?vt=#filters")
    }

    /// Fetch one replay by identifier.
    ///
    /// Any transport error or unparsable body yields `None` (logged).
    /// This doubles as the existence probe for upload deduplication.
    pub async fn get_replay(&self, replay_id: &str) -> Option<ReplayRecord> {
        let url = Self::url_replay_info(replay_id);
        match self.fetch_record(&url).await {
            Ok(record) => Some(record),
            Err(err) => {
                debug!("no replay for {replay_id}: {err}");
                None
            }
        }
    }

    async fn fetch_record(&self, url: &str) -> Result<ReplayRecord> {
        let response = self.session.get(url).await?.error_for_status()?;
        let text = response.text().await?;
        ReplayRecord::parse(&text)
    }

    /// Upload raw replay bytes, deduplicating by content digest.
    ///
    /// When a record already exists under the digest it is returned as
    /// is and no upload request goes out. Otherwise the payload is
    /// posted as a base64-encoded multipart file, retrying a failed or
    /// unparsable response up to three times with a fixed sleep in
    /// between. Exhausting the retries yields `None` (logged), never an
    /// error.
    pub async fn post_replay(
        &self,
        data: &[u8],
        filename: &str,
        title: &str,
        account_id: i64,
        private: bool,
    ) -> Option<ReplayRecord> {
        let seq = self.upload_seq.fetch_add(1, Ordering::Relaxed);
        let digest = replay_digest(data);

        if let Some(existing) = self.get_replay(&digest).await {
            debug!("{seq}: already uploaded: {title}");
            return Some(existing);
        }

        let url = match reqwest::Url::parse_with_params(
            URL_REPLAY_UPLOAD,
            &[
                ("title", title),
                ("private", if private { "1" } else { "0" }),
                ("uploaded_by", account_id.to_string().as_str()),
                ("details", "full"),
                ("key", digest.as_str()),
            ],
        ) {
            Ok(url) => url,
            Err(err) => {
                error!("{seq}: could not build upload URL: {err}");
                return None;
            }
        };
        let encoded = BASE64.encode(data);

        for attempt in 1..=MAX_RETRIES {
            debug!("{seq}: posting {title}, attempt {attempt}/{MAX_RETRIES}");
            let part = Part::text(encoded.clone()).file_name(filename.to_string());
            let form = Form::new().part("file", part);
            match self.session.post_multipart(url.clone(), form).await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(text) => match ReplayRecord::parse(&text) {
                        Ok(record) => return Some(record),
                        Err(err) => debug!("{seq}: invalid response body: {err}"),
                    },
                    Err(err) => debug!("{seq}: could not read response body: {err}"),
                },
                Ok(response) => debug!("{seq}: got HTTP/{}", response.status()),
                Err(err) => debug!("{seq}: request failed: {err}"),
            }
            sleep(RETRY_SLEEP).await;
        }
        warn!("{seq}: could not post replay: {title}");
        None
    }

    /// Fetch one listing page and return the raw HTML body. Pagination
    /// is the caller's business.
    pub async fn get_replay_listing(&self, page: u32) -> Result<String> {
        let url = Self::url_replay_listing(page);
        let response = self.session.get(&url).await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Collect the distinct replay identifiers a listing page links to.
    ///
    /// Anchors without an href, or pointing outside the download prefix,
    /// are skipped individually; input that is not HTML at all simply
    /// produces no anchors. The page's markup is outside this system's
    /// control, so nothing here is an error.
    pub fn parse_replay_ids(doc: &str) -> HashSet<String> {
        let mut replay_ids = HashSet::new();
        let Ok(selector) = Selector::parse("a") else {
            return replay_ids;
        };
        let document = Html::parse_document(doc);
        for anchor in document.select(&selector) {
            match anchor.value().attr("href") {
                Some(href) => match Self::replay_id_from_url(href) {
                    Some(id) => {
                        debug!("adding replay link: {href}");
                        replay_ids.insert(id.to_string());
                    }
                    None => debug!("skipping unrelated link: {href}"),
                },
                None => debug!("skipping anchor without href"),
            }
        }
        replay_ids
    }

    /// Trailing path segment of a download URL, if it is one
    pub fn replay_id_from_url(url: &str) -> Option<&str> {
        if !url.starts_with(URL_REPLAY_DOWNLOAD_BASE) {
            return None;
        }
        last_path_segment(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_builders() {
        assert_eq!(
            WotInspector::url_replay_info("abc123"),
            "https://api.wotinspector.com/replay/upload?details=full&key=abc123"
        );
        assert_eq!(
            WotInspector::url_replay_listing(3),
            "https://replays.wotinspector.com/en/sort/ut/page/3?vt=#filters"
        );
    }

    #[test]
    fn test_replay_digest_is_md5_hex() {
        assert_eq!(
            replay_digest(b"hello world"),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        // same bytes, same candidate id
        assert_eq!(replay_digest(b"x"), replay_digest(b"x"));
        assert_ne!(replay_digest(b"x"), replay_digest(b"y"));
    }

    #[test]
    fn test_replay_id_from_url() {
        let url = format!("{URL_REPLAY_DOWNLOAD_BASE}abc123");
        assert_eq!(WotInspector::replay_id_from_url(&url), Some("abc123"));
        assert_eq!(
            WotInspector::replay_id_from_url("https://example.com/en/download/abc123"),
            None
        );
        assert_eq!(WotInspector::replay_id_from_url(URL_REPLAY_DOWNLOAD_BASE), None);
    }

    #[test]
    fn test_parse_replay_ids() {
        let html = format!(
            r#"<html><body>
                <a href="{URL_REPLAY_DOWNLOAD_BASE}abc123">replay</a>
                <a href="{URL_REPLAY_DOWNLOAD_BASE}abc123">same replay again</a>
                <a href="https://example.com/unrelated">elsewhere</a>
                <a>no href</a>
            </body></html>"#
        );
        let ids = WotInspector::parse_replay_ids(&html);
        assert_eq!(ids, HashSet::from(["abc123".to_string()]));
    }

    #[test]
    fn test_parse_replay_ids_tolerates_garbage() {
        assert!(WotInspector::parse_replay_ids("").is_empty());
        assert!(WotInspector::parse_replay_ids("not html at all \u{0000}<<<").is_empty());
    }
}
