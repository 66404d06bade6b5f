//! TapTap CN storefront-API version resolver

use regex::Regex;
use reqwest::Client;
use tracing::debug;

use crate::config::USER_AGENT;
use crate::error::ResolveError;

const DEFAULT_TAPTAP_BASE: &str = "https://www.taptap.cn";

/// Resolves the latest version from a TapTap CN app page.
///
/// The page embeds app metadata as JSON; the version is matched straight
/// out of the body as a `"softwareVersion":"X.Y.Z"` field. A mobile
/// user agent is required or the field is absent.
pub struct TapTapCnResolver {
    client: Client,
    base_url: String,
    version_re: Regex,
}

impl TapTapCnResolver {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_TAPTAP_BASE.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            version_re: Regex::new(r#""softwareVersion":"(\d+\.\d+\.\d+)""#).unwrap(),
        }
    }

    pub async fn latest_version(&self, app_id: &str) -> Result<String, ResolveError> {
        let url = format!("{}/app/{}?os=android", self.base_url, app_id);
        debug!("Fetching TapTap CN page: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ResolveError::Status { status: response.status(), url });
        }

        let body = response.text().await?;
        self.version_re
            .captures(&body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or(ResolveError::TokenNotFound(url))
    }
}
