//! Error types for the update pipeline

use thiserror::Error;

use crate::bundle::BundleError;
use crate::region::Region;
use crate::version::MalformedVersion;

/// Latest-version resolution against a storefront failed.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("storefront returned status {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error("version token not found in storefront response: {0}")]
    TokenNotFound(String),
}

/// Package download failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("download returned status {status} from {url}")]
    Status { status: reqwest::StatusCode, url: String },

    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Package archive could not be opened or held no usable payloads.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error reading archive entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("no asset-bundle payload entries found in package")]
    NoCandidates,
}

/// Target record extraction failed after the bundle itself parsed.
///
/// The two kinds are deliberately distinct: a caller must be able to tell
/// "the configuration object is not in this build" apart from "the object
/// is there but disagrees with the storefront version".
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("target configuration object not found in any loaded payload")]
    RecordNotFound,

    #[error("decoded app version {decoded} is behind resolved version {resolved}")]
    VersionMismatch { decoded: String, resolved: String },

    #[error("target object data malformed: {0}")]
    Malformed(BundleError),

    #[error(transparent)]
    MalformedVersion(#[from] MalformedVersion),
}

/// Umbrella error for one region's update attempt.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("version resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("package download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("package container unusable: {0}")]
    Container(#[from] ContainerError),

    #[error("asset bundle unreadable: {0}")]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("extraction task panicked or was cancelled: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("region {0} is not enabled")]
    RegionDisabled(Region),
}
