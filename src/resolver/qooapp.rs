//! QooApp storefront-page version resolver

use regex::Regex;
use reqwest::Client;
use tracing::debug;

use crate::error::ResolveError;

const DEFAULT_QOOAPP_BASE: &str = "https://apps.qoo-app.com";

/// Resolves the latest version from a QooApp app page.
///
/// The page lists app facts in a `<ul class="app-info android">` block,
/// one `row` per fact with the value inside a `<var>` element; the second
/// row holds the version.
pub struct QooAppResolver {
    client: Client,
    base_url: String,
    app_info_re: Regex,
    var_re: Regex,
}

impl QooAppResolver {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_QOOAPP_BASE.to_string())
    }

    pub fn with_base_url(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            app_info_re: Regex::new(
                r#"(?s)<ul[^>]*class="[^"]*\bapp-info\b[^"]*\bandroid\b[^"]*"[^>]*>(.*?)</ul>"#,
            )
            .unwrap(),
            var_re: Regex::new(r"(?s)<var[^>]*>\s*(.*?)\s*</var>").unwrap(),
        }
    }

    pub async fn latest_version(&self, app_id: &str) -> Result<String, ResolveError> {
        let url = format!("{}/en/app/{}", self.base_url, app_id);
        debug!("Fetching QooApp page: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ResolveError::Status { status: response.status(), url });
        }

        let body = response.text().await?;
        self.extract_version(&body)
            .ok_or(ResolveError::TokenNotFound(url))
    }

    /// Pull the version token out of the Android app-info list: the value
    /// of the second `row`, i.e. the second `<var>` inside the block.
    fn extract_version(&self, html: &str) -> Option<String> {
        let block = self.app_info_re.captures(html)?.get(1)?.as_str();
        let version = self.var_re.captures_iter(block).nth(1)?.get(1)?.as_str();
        (!version.is_empty()).then(|| version.to_string())
    }
}
