//! Latest-version resolution against regional storefronts
//!
//! Each region's `StorefrontSource` names the storefront and listing that
//! publishes its version. Two strategies exist: scraping the QooApp app
//! page markup and pattern-matching the TapTap CN page body. Both fail
//! loudly on a non-success status or a missing version token; neither
//! caches anything.

pub mod qooapp;
pub mod taptap;

pub use qooapp::QooAppResolver;
pub use taptap::TapTapCnResolver;

use reqwest::Client;

use crate::error::ResolveError;
use crate::region::StorefrontSource;

/// Dispatches a region's static storefront source to the right strategy.
pub struct StorefrontResolver {
    qooapp: QooAppResolver,
    taptap: TapTapCnResolver,
}

impl StorefrontResolver {
    pub fn new(client: Client) -> Self {
        Self {
            qooapp: QooAppResolver::new(client.clone()),
            taptap: TapTapCnResolver::new(client),
        }
    }

    /// Override storefront base URLs, for tests against a local server.
    pub fn with_base_urls(client: Client, qooapp_base: String, taptap_base: String) -> Self {
        Self {
            qooapp: QooAppResolver::with_base_url(client.clone(), qooapp_base),
            taptap: TapTapCnResolver::with_base_url(client, taptap_base),
        }
    }

    /// Resolve the latest published version string for one source.
    pub async fn resolve(&self, source: &StorefrontSource) -> Result<String, ResolveError> {
        match source {
            StorefrontSource::QooAppPage { app_id } => self.qooapp.latest_version(app_id).await,
            StorefrontSource::TapTapCn { app_id } => self.taptap.latest_version(app_id).await,
        }
    }
}
