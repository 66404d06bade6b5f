//! Regional storefront configuration
//!
//! The region set is closed: each variant maps to exactly one storefront
//! source for version resolution and one package download URL. The mapping
//! is static data decided at table-construction time, so the resolver never
//! re-dispatches per call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{APKPURE_URL_TEMPLATE, CN_PACKAGE_URL};

/// A region name that is not part of the closed set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown region: {0}")]
pub struct UnknownRegion(pub String);

/// A distinct storefront/market the application is published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    JP,
    EN,
    TW,
    KR,
    CN,
}

impl Region {
    pub const ALL: [Region; 5] = [Region::JP, Region::EN, Region::TW, Region::KR, Region::CN];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::JP => "JP",
            Region::EN => "EN",
            Region::TW => "TW",
            Region::KR => "KR",
            Region::CN => "CN",
        }
    }

    /// Android application id on the regional storefront
    pub fn package_name(&self) -> &'static str {
        match self {
            Region::JP => "com.sega.pjsekai",
            Region::TW => "com.hermes.mk.asia",
            Region::KR => "com.pjsekai.kr",
            Region::EN => "com.sega.ColorfulStage.en",
            Region::CN => "com.hermes.mk",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "JP" => Ok(Region::JP),
            "EN" => Ok(Region::EN),
            "TW" => Ok(Region::TW),
            "KR" => Ok(Region::KR),
            "CN" => Ok(Region::CN),
            _ => Err(UnknownRegion(s.to_string())),
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which storefront, and which app listing on it, publishes this region's
/// latest version. Selected once when the region table is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorefrontSource {
    /// QooApp app page; the version sits in the app-info markup
    QooAppPage { app_id: &'static str },
    /// TapTap CN app page; the version sits in an embedded
    /// `"softwareVersion"` JSON field
    TapTapCn { app_id: &'static str },
}

/// Static configuration for one region: how to resolve its version and
/// where to download its package from.
#[derive(Debug, Clone)]
pub struct RegionSpec {
    pub region: Region,
    pub source: StorefrontSource,
    pub package_url: String,
}

impl RegionSpec {
    /// Production spec for a region.
    pub fn of(region: Region) -> Self {
        let source = match region {
            Region::JP => StorefrontSource::QooAppPage { app_id: "9038" },
            Region::TW => StorefrontSource::QooAppPage { app_id: "18298" },
            Region::EN => StorefrontSource::QooAppPage { app_id: "18337" },
            Region::KR => StorefrontSource::QooAppPage { app_id: "20082" },
            Region::CN => StorefrontSource::TapTapCn { app_id: "223265" },
        };
        let package_url = match region {
            Region::CN => CN_PACKAGE_URL.to_string(),
            _ => APKPURE_URL_TEMPLATE.replace("{packageName}", region.package_name()),
        };
        Self { region, source, package_url }
    }
}
