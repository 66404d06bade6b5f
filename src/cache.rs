//! In-memory per-region version cache
//!
//! The cache is the only shared mutable state in the process. It is an
//! explicitly owned object handed around behind an `Arc`, never implicit
//! module state. Records enter whole and are only ever replaced, never
//! deleted, so readers either see nothing or a complete record. The cache
//! is empty on every process start; there is no persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::bundle::BuildMetadata;
use crate::region::Region;

/// The decoded, cached unit of build metadata for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub app_version: String,
    pub app_hash: String,
    pub data_version: String,
    pub multi_play_version: String,
    pub asset_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(meta: BuildMetadata, updated_at: DateTime<Utc>) -> Self {
        Self {
            app_version: meta.app_version,
            app_hash: meta.app_hash,
            data_version: meta.data_version,
            multi_play_version: meta.multi_play_version,
            asset_hash: meta.asset_hash,
            updated_at,
        }
    }
}

/// Region → latest successfully extracted record.
#[derive(Default)]
pub struct VersionCache {
    inner: RwLock<HashMap<Region, VersionRecord>>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, region: Region) -> Option<VersionRecord> {
        self.inner.read().await.get(&region).cloned()
    }

    /// Replace the region's record atomically from a reader's view.
    pub async fn insert(&self, region: Region, record: VersionRecord) {
        self.inner.write().await.insert(region, record);
    }

    /// Clone of the whole map, for the query layer.
    pub async fn snapshot(&self) -> HashMap<Region, VersionRecord> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(app_version: &str) -> VersionRecord {
        VersionRecord {
            app_version: app_version.to_string(),
            app_hash: "hash".to_string(),
            data_version: "1.0.0".to_string(),
            multi_play_version: "4.2.0".to_string(),
            asset_hash: "asset".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn starts_empty() {
        let cache = VersionCache::new();
        assert!(cache.get(Region::JP).await.is_none());
        assert!(cache.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn insert_replaces_whole_record() {
        let cache = VersionCache::new();
        cache.insert(Region::JP, record("4.2.0")).await;
        cache.insert(Region::JP, record("4.2.1")).await;

        let got = cache.get(Region::JP).await.unwrap();
        assert_eq!(got.app_version, "4.2.1");
        assert_eq!(cache.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn regions_are_independent() {
        let cache = VersionCache::new();
        cache.insert(Region::JP, record("4.2.1")).await;
        assert!(cache.get(Region::EN).await.is_none());
        assert!(cache.get(Region::JP).await.is_some());
    }
}
