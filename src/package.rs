//! Package container walking
//!
//! An installable package is a zip that may embed further `.apk`
//! sub-packages (split/bundle distributions). The walker scans the given
//! archive plus each nested package entry it contains, collecting the
//! asset-bundle payloads the extractor cares about. Current regional
//! packages nest exactly one level deep, but that is an observation about
//! today's data, not a format guarantee; each call walks the container it
//! is handed, so deeper nesting composes.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::ContainerError;

/// Payload entries worth loading: two content-hashed bundle names the
/// build pipeline emits, plus the engine's default bundle filename.
const PAYLOAD_NAMES: [&str; 3] = [
    "6350e2ec327334c8a9b7f494f344a761",
    "c726e51b6fe37463685916a1687158dd",
    "data.unity3d",
];

/// One asset-bundle payload pulled out of a package, scoped to a single
/// extraction attempt.
pub struct Candidate {
    pub name: String,
    pub data: Vec<u8>,
}

fn is_payload_name(entry_name: &str) -> bool {
    let last = entry_name.rsplit('/').next().unwrap_or(entry_name);
    PAYLOAD_NAMES.contains(&last)
}

fn is_nested_package(entry_name: &str) -> bool {
    entry_name.to_ascii_lowercase().ends_with(".apk")
}

/// Collect candidate payloads from a package file on disk.
///
/// Fails when the archive cannot be opened or when no payload entry shows
/// up anywhere in it.
pub fn collect_candidates(path: &Path) -> Result<Vec<Candidate>, ContainerError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let candidates = walk_archive(&mut archive)?;
    if candidates.is_empty() {
        return Err(ContainerError::NoCandidates);
    }
    Ok(candidates)
}

/// Scan one archive and every nested package entry inside it.
pub fn walk_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<Candidate>, ContainerError> {
    let mut found = Vec::new();
    scan_entries(archive, &mut found)?;

    for index in 0..archive.len() {
        let needs_reopen = {
            let entry = archive.by_index(index)?;
            is_nested_package(entry.name())
        };
        if !needs_reopen {
            continue;
        }
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        // Nested packages run to gigabytes; spill to an unlinked scratch
        // file instead of holding the whole entry in memory.
        let mut scratch = tempfile::tempfile()?;
        std::io::copy(&mut entry, &mut scratch)?;
        drop(entry);
        scratch.seek(SeekFrom::Start(0))?;

        debug!("Opening nested package entry: {}", name);
        let mut nested = ZipArchive::new(scratch)?;
        scan_entries(&mut nested, &mut found)?;
    }

    Ok(found)
}

fn scan_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    found: &mut Vec<Candidate>,
) -> Result<(), ContainerError> {
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !is_payload_name(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        debug!("Found payload entry: {} ({} bytes)", name, data.len());
        found.push(Candidate { name, data });
    }
    Ok(())
}
