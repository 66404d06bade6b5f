//! Minimal asset-bundle reading
//!
//! Just enough of the UnityFS container and serialized-file formats to
//! enumerate top-level objects and decode one known configuration object.
//! This is deliberately not a general-purpose reader: type trees are
//! skipped structurally, object payloads other than the target schema are
//! never interpreted, and only the compression schemes these payloads
//! actually ship with (none, LZ4/LZ4HC) are supported.
//!
//! # Modules
//!
//! - [`bundle_file`]: UnityFS header, blocks info, storage blocks, nodes
//! - [`serialized`]: serialized-file header, type table, object table
//! - [`env`]: merges payloads into one enumerable object environment
//! - [`decode`]: locates and decodes the player-setting record

pub mod bundle_file;
pub mod decode;
pub mod env;
pub mod serialized;

pub use decode::{BuildMetadata, decode_build_metadata};
pub use env::Environment;

use thiserror::Error;

/// Binary-format failure while reading a bundle or serialized file.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("not an asset bundle: signature {0:?}")]
    Signature(String),

    #[error("unsupported bundle format version {0}")]
    UnsupportedFormat(u32),

    #[error("unsupported serialized-file generation {0}")]
    UnsupportedGeneration(u32),

    #[error("unsupported block compression scheme {0}")]
    UnsupportedCompression(u32),

    #[error("lz4 block decompression failed: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),

    #[error("truncated or malformed data: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid utf-8 in {0}")]
    InvalidString(&'static str),

    #[error("bundle node out of range: offset {offset} size {size}")]
    NodeOutOfRange { offset: i64, size: i64 },

    #[error("object {path_id} out of range")]
    ObjectOutOfRange { path_id: i64 },

    #[error("no serialized payloads could be loaded")]
    Empty,
}
