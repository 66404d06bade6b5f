//! Service configuration and storefront constants

use std::str::FromStr;
use std::time::Duration;

use crate::region::{Region, UnknownRegion};

// =============================================================================
// Storefront endpoints
// =============================================================================

/// APKPure download endpoint; `{packageName}` is the Android application id
pub const APKPURE_URL_TEMPLATE: &str = "https://d.apkpure.net/b/XAPK/{packageName}?version=latest";

/// Fixed mirror for the CN package (not listed on APKPure)
pub const CN_PACKAGE_URL: &str = "https://ugapk.com/djogd";

/// TapTap CN serves a stripped page to non-mobile user agents
pub const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 12; SM-S908E Build/SKQ1.220123.001; wv) \
     AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/108.0.5359.124 Mobile Safari/537.36";

// =============================================================================
// Defaults
// =============================================================================

/// Default scheduler interval between refresh cycles (minutes)
pub const DEFAULT_REFRESH_INTERVAL_MIN: u64 = 5;

/// Default per-request network timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Engine version substituted when a bundle's authoring version is stripped
pub const DEFAULT_FALLBACK_ENGINE_VERSION: &str = "2022.3.21f1";

/// Resolved process configuration, built from CLI arguments and their
/// environment fallbacks in `main`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    /// Empty means the admin endpoint is disabled (503)
    pub admin_api_key: String,
    pub http_proxy: Option<String>,
    pub enabled_regions: Vec<Region>,
    pub fallback_engine_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_MIN * 60),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            admin_api_key: String::new(),
            http_proxy: None,
            enabled_regions: Region::ALL.to_vec(),
            fallback_engine_version: DEFAULT_FALLBACK_ENGINE_VERSION.to_string(),
        }
    }
}

/// Parse a comma-separated region list (`"JP,EN,TW"`), ignoring empty
/// segments. Unknown region names are an error.
pub fn parse_region_list(raw: &str) -> Result<Vec<Region>, UnknownRegion> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Region::from_str)
        .collect()
}
