//! Player-setting record decoding
//!
//! The build-identifying fields live in one MonoBehaviour whose internal
//! name is `production_android`. Its script fields follow a fixed schema
//! (seven version integers, two hash strings); nothing else in the
//! environment is interpreted.

use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{BundleError, Environment};
use crate::error::DecodeError;
use crate::version::is_at_least;

/// Class id Unity assigns to scripted components.
pub const MONO_BEHAVIOUR_CLASS_ID: i32 = 114;

/// Internal name of the production Android configuration object.
pub const TARGET_OBJECT_NAME: &str = "production_android";

/// Build-identifying fields decoded from the target object. `updatedAt`
/// is stamped by the orchestrator when the record enters the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub app_version: String,
    pub app_hash: String,
    pub data_version: String,
    pub multi_play_version: String,
    pub asset_hash: String,
}

/// Scan the environment for the target object and decode it, then check
/// the decoded app version against the storefront-resolved one.
///
/// The two failure kinds are distinct on purpose: [`DecodeError::RecordNotFound`]
/// when no loaded payload carries the object, [`DecodeError::VersionMismatch`]
/// when it decodes to a version behind the resolved one. Neither may
/// publish anything to the cache.
pub fn decode_build_metadata(
    env: &Environment,
    resolved_version: &str,
) -> Result<BuildMetadata, DecodeError> {
    for object in env.objects() {
        if object.class_id() != MONO_BEHAVIOUR_CLASS_ID {
            continue;
        }
        let data = match object.data() {
            Ok(data) => data,
            Err(e) => {
                debug!("Unreadable MonoBehaviour {}: {}", object.info.path_id, e);
                continue;
            }
        };
        // Cheap name peek first; most MonoBehaviours are not ours and
        // their script fields will not match the schema.
        match peek_name(data, object.big_endian()) {
            Ok(name) if name == TARGET_OBJECT_NAME => {
                let setting = RawPlayerSetting::read(data, object.big_endian())
                    .map_err(DecodeError::Malformed)?;
                return finish(setting, resolved_version);
            }
            Ok(_) => {}
            Err(e) => debug!(
                "MonoBehaviour {} name unreadable, skipping: {}",
                object.info.path_id, e
            ),
        }
    }
    Err(DecodeError::RecordNotFound)
}

fn finish(setting: RawPlayerSetting, resolved_version: &str) -> Result<BuildMetadata, DecodeError> {
    let app_version = format!("{}.{}.{}", setting.major, setting.minor, setting.build);
    if !is_at_least(&app_version, resolved_version)? {
        return Err(DecodeError::VersionMismatch {
            decoded: app_version,
            resolved: resolved_version.to_string(),
        });
    }
    Ok(BuildMetadata {
        data_version: format!(
            "{}.{}.{}",
            setting.data_major, setting.data_minor, setting.data_build
        ),
        multi_play_version: format!(
            "{}.{}.{}",
            setting.major, setting.minor, setting.data_revision
        ),
        app_version,
        app_hash: setting.app_hash,
        asset_hash: setting.asset_hash,
    })
}

/// Script fields in on-disk order.
struct RawPlayerSetting {
    major: i32,
    minor: i32,
    build: i32,
    data_major: i32,
    data_minor: i32,
    data_build: i32,
    data_revision: i32,
    app_hash: String,
    asset_hash: String,
}

impl RawPlayerSetting {
    fn read(data: &[u8], big_endian: bool) -> Result<Self, BundleError> {
        let mut reader = ValueReader::new(data, big_endian);
        reader.skip_behaviour_header()?;
        let _name = reader.read_aligned_string()?;
        Ok(Self {
            major: reader.read_i32()?,
            minor: reader.read_i32()?,
            build: reader.read_i32()?,
            data_major: reader.read_i32()?,
            data_minor: reader.read_i32()?,
            data_build: reader.read_i32()?,
            data_revision: reader.read_i32()?,
            app_hash: reader.read_aligned_string()?,
            asset_hash: reader.read_aligned_string()?,
        })
    }
}

/// Read only the `m_Name` of a MonoBehaviour's data region.
pub fn peek_name(data: &[u8], big_endian: bool) -> Result<String, BundleError> {
    let mut reader = ValueReader::new(data, big_endian);
    reader.skip_behaviour_header()?;
    reader.read_aligned_string()
}

/// Cursor over an object's data region with the owning file's endianness.
struct ValueReader<'a> {
    cur: Cursor<&'a [u8]>,
    big_endian: bool,
}

impl<'a> ValueReader<'a> {
    fn new(data: &'a [u8], big_endian: bool) -> Self {
        Self { cur: Cursor::new(data), big_endian }
    }

    /// m_GameObject pptr, m_Enabled + padding, m_Script pptr.
    fn skip_behaviour_header(&mut self) -> Result<(), BundleError> {
        self.skip(12)?;
        self.cur.read_u8()?;
        self.align4()?;
        self.skip(12)?;
        Ok(())
    }

    fn read_i32(&mut self) -> Result<i32, BundleError> {
        Ok(if self.big_endian {
            self.cur.read_i32::<BigEndian>()?
        } else {
            self.cur.read_i32::<LittleEndian>()?
        })
    }

    fn read_u32(&mut self) -> Result<u32, BundleError> {
        Ok(if self.big_endian {
            self.cur.read_u32::<BigEndian>()?
        } else {
            self.cur.read_u32::<LittleEndian>()?
        })
    }

    /// Length-prefixed utf-8, padded to 4 bytes.
    fn read_aligned_string(&mut self) -> Result<String, BundleError> {
        let len = self.read_u32()? as usize;
        if len > self.cur.get_ref().len() {
            return Err(BundleError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "string length exceeds object data",
            )));
        }
        let mut bytes = vec![0u8; len];
        std::io::Read::read_exact(&mut self.cur, &mut bytes)?;
        self.align4()?;
        String::from_utf8(bytes).map_err(|_| BundleError::InvalidString("aligned string"))
    }

    fn skip(&mut self, count: i64) -> Result<(), BundleError> {
        self.cur.seek(SeekFrom::Current(count))?;
        Ok(())
    }

    fn align4(&mut self) -> Result<(), BundleError> {
        let pos = self.cur.position();
        let rem = pos % 4;
        if rem != 0 {
            self.cur.seek(SeekFrom::Start(pos + 4 - rem))?;
        }
        Ok(())
    }
}
