//! Per-region update orchestration and the refresh scheduler
//!
//! One attempt runs resolve → compare → fetch → extract → publish in
//! strict order. The cache is read once up front and written once at the
//! end; both are short critical sections, so attempts for different
//! regions can interleave without a reader ever observing a partial
//! record. Scratch files are private to an attempt and removed on every
//! exit path, best effort.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bundle::{BuildMetadata, BundleError, Environment, decode_build_metadata};
use crate::cache::{VersionCache, VersionRecord};
use crate::config::Settings;
use crate::error::{DecodeError, UpdateError};
use crate::fetch::PackageFetcher;
use crate::package;
use crate::region::{Region, RegionSpec};
use crate::resolver::StorefrontResolver;

/// Per-region result of a batch refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOutcome {
    /// A record was published, or the cached one was still current
    Ok,
    /// The package was readable but held no target record
    Failed,
    /// Any other step of the attempt failed
    Error,
}

/// Drives updates for the enabled region set against one shared cache.
pub struct Updater {
    cache: Arc<VersionCache>,
    resolver: StorefrontResolver,
    fetcher: PackageFetcher,
    specs: HashMap<Region, RegionSpec>,
    regions: Vec<Region>,
    fallback_engine_version: String,
}

/// Shared HTTP client honoring the configured proxy and timeout.
pub fn build_client(settings: &Settings) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(settings.request_timeout);
    if let Some(proxy) = &settings.http_proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    builder.build()
}

impl Updater {
    /// Production wiring: static region specs for the enabled set.
    pub fn from_settings(settings: &Settings, cache: Arc<VersionCache>) -> reqwest::Result<Self> {
        let client = build_client(settings)?;
        let specs = settings.enabled_regions.iter().map(|&r| RegionSpec::of(r)).collect();
        Ok(Self::with_parts(
            cache,
            StorefrontResolver::new(client.clone()),
            PackageFetcher::new(client),
            specs,
            settings.fallback_engine_version.clone(),
        ))
    }

    pub fn with_parts(
        cache: Arc<VersionCache>,
        resolver: StorefrontResolver,
        fetcher: PackageFetcher,
        specs: Vec<RegionSpec>,
        fallback_engine_version: String,
    ) -> Self {
        let regions = specs.iter().map(|s| s.region).collect();
        let specs = specs.into_iter().map(|s| (s.region, s)).collect();
        Self { cache, resolver, fetcher, specs, regions, fallback_engine_version }
    }

    pub fn cache(&self) -> &Arc<VersionCache> {
        &self.cache
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// One end-to-end attempt for a single region.
    ///
    /// Without `force`, an unchanged resolved version short-circuits to
    /// the cached record before any download happens. Failures leave the
    /// cache exactly as it was.
    pub async fn update_region(
        &self,
        region: Region,
        force: bool,
    ) -> Result<VersionRecord, UpdateError> {
        let spec = self
            .specs
            .get(&region)
            .ok_or(UpdateError::RegionDisabled(region))?;

        let cached = self.cache.get(region).await;
        let latest = self.resolver.resolve(&spec.source).await?;

        if !force {
            if let Some(cached) = cached {
                if cached.app_version == latest {
                    info!("[{}] version {} unchanged, skipping", region, latest);
                    return Ok(cached);
                }
            }
        }

        info!("[{}] new version {}, downloading package...", region, latest);
        let scratch = self.fetcher.fetch(&spec.package_url).await?;
        let extracted = self.extract(scratch.clone(), latest).await;

        // Best-effort cleanup on every path; a leftover scratch file is
        // worth a warning, never a failed attempt.
        if let Err(e) = tokio::fs::remove_file(&scratch).await {
            warn!("[{}] failed to remove scratch file {}: {}", region, scratch.display(), e);
        }

        let meta = extracted?;
        let record = VersionRecord::new(meta, Utc::now());
        self.cache.insert(region, record.clone()).await;
        info!("[{}] updated: v{} hash={}", region, record.app_version, record.app_hash);
        Ok(record)
    }

    /// Walk the package, load every candidate payload into one
    /// environment, decode the target record. Archive and binary work is
    /// blocking, so it runs off the async threads.
    async fn extract(
        &self,
        package_path: PathBuf,
        resolved_version: String,
    ) -> Result<BuildMetadata, UpdateError> {
        let fallback = self.fallback_engine_version.clone();
        tokio::task::spawn_blocking(move || {
            let candidates = package::collect_candidates(&package_path)?;
            let mut env = Environment::new(fallback);
            for candidate in &candidates {
                env.load(&candidate.data)?;
            }
            if env.is_empty() {
                return Err(BundleError::Empty.into());
            }
            Ok(decode_build_metadata(&env, &resolved_version)?)
        })
        .await?
    }

    /// Sequential batch over the enabled regions. One region's failure is
    /// downgraded to its outcome and never aborts the rest.
    pub async fn update_all(&self, force: bool) -> HashMap<Region, UpdateOutcome> {
        let mut results = HashMap::new();
        for &region in &self.regions {
            let outcome = match self.update_region(region, force).await {
                Ok(_) => UpdateOutcome::Ok,
                Err(UpdateError::Decode(DecodeError::RecordNotFound)) => {
                    error!("[{}] no target record in package", region);
                    UpdateOutcome::Failed
                }
                Err(e) => {
                    error!("[{}] update failed: {}", region, e);
                    UpdateOutcome::Error
                }
            };
            results.insert(region, outcome);
        }
        results
    }

    /// Perpetual refresh loop. No error is fatal; only cancellation,
    /// observed at the sleep boundary, ends it.
    pub async fn run_scheduler(&self, interval: Duration, cancel: CancellationToken) {
        loop {
            info!("Scheduled refresh starting...");
            let results = self.update_all(false).await;
            info!("Scheduled refresh done: {:?}; next in {:?}", results, interval);
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler cancelled, exiting loop");
                    break;
                }
                _ = sleep(interval) => {}
            }
        }
    }
}
