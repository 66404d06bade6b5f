//! Object environment merging multiple payloads
//!
//! Build metadata can be split across several payload files inside one
//! package; loading them all into one environment makes their objects
//! jointly enumerable, so the decoder does not care which file carried
//! the target.

use tracing::{debug, warn};

use super::BundleError;
use super::bundle_file::{BundleFile, is_bundle};
use super::serialized::{ObjectInfo, SerializedFile};

/// A merged view over every serialized file loaded so far.
pub struct Environment {
    fallback_engine_version: String,
    files: Vec<SerializedFile>,
}

/// One enumerable object: its table entry plus the file that owns it.
pub struct ObjectHandle<'a> {
    file: &'a SerializedFile,
    pub info: &'a ObjectInfo,
}

impl ObjectHandle<'_> {
    pub fn class_id(&self) -> i32 {
        self.info.class_id
    }

    pub fn big_endian(&self) -> bool {
        self.file.big_endian
    }

    pub fn data(&self) -> Result<&[u8], BundleError> {
        self.file.object_data(self.info)
    }
}

impl Environment {
    pub fn new(fallback_engine_version: impl Into<String>) -> Self {
        Self {
            fallback_engine_version: fallback_engine_version.into(),
            files: Vec::new(),
        }
    }

    /// Load one payload: a UnityFS bundle (every node that parses as a
    /// serialized file is added) or a bare serialized file.
    pub fn load(&mut self, data: &[u8]) -> Result<(), BundleError> {
        if is_bundle(data) {
            let bundle = BundleFile::parse(data)?;
            for node in &bundle.nodes {
                match SerializedFile::parse(&node.data) {
                    Ok(file) => self.add_file(file),
                    // Resource nodes (.resS and friends) sit next to the
                    // serialized files; they are data, not objects.
                    Err(e) => debug!("Skipping bundle node {:?}: {}", node.path, e),
                }
            }
            Ok(())
        } else {
            let file = SerializedFile::parse(data)?;
            self.add_file(file);
            Ok(())
        }
    }

    fn add_file(&mut self, mut file: SerializedFile) {
        // Release builds strip the authoring version; substitute the
        // configured fallback so the load proceeds. Object layout is what
        // decoding depends on, not this string.
        if file.engine_version.is_empty() || file.engine_version == "0.0.0" {
            warn!(
                "Stripped engine version in serialized file, assuming {}",
                self.fallback_engine_version
            );
            file.engine_version = self.fallback_engine_version.clone();
        }
        self.files.push(file);
    }

    /// True when no serialized file was loaded at all.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All objects across all loaded files.
    pub fn objects(&self) -> impl Iterator<Item = ObjectHandle<'_>> {
        self.files
            .iter()
            .flat_map(|file| file.objects.iter().map(move |info| ObjectHandle { file, info }))
    }
}
