//! Serialized-file parsing: header, type table, object table
//!
//! The header is big-endian; an endianness flag in it governs the rest of
//! the file. Generations 17 through 22 (Unity 2017+) are accepted. Type
//! trees, when present, are skipped structurally: object decoding in this
//! crate follows a fixed schema and never consults them.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use tracing::debug;

use super::BundleError;

const MONO_BEHAVIOUR_CLASS_ID: i32 = 114;

/// One entry of the object table.
pub struct ObjectInfo {
    pub path_id: i64,
    pub byte_start: u64,
    pub byte_size: u32,
    pub class_id: i32,
}

/// A parsed serialized file: object table plus the raw bytes needed to
/// read each object's data region.
pub struct SerializedFile {
    /// Authoring engine version from the metadata, possibly stripped.
    pub engine_version: String,
    pub big_endian: bool,
    pub objects: Vec<ObjectInfo>,
    data_offset: u64,
    raw: Vec<u8>,
}

struct SerializedType {
    class_id: i32,
}

impl SerializedFile {
    pub fn parse(data: &[u8]) -> Result<Self, BundleError> {
        let mut cur = Cursor::new(data);

        let _metadata_size = cur.read_u32::<BigEndian>()?;
        let _file_size = cur.read_u32::<BigEndian>()?;
        let generation = cur.read_u32::<BigEndian>()?;
        let mut data_offset = u64::from(cur.read_u32::<BigEndian>()?);
        if !(17..=22).contains(&generation) {
            return Err(BundleError::UnsupportedGeneration(generation));
        }

        let endian_flag = cur.read_u8()?;
        let mut reserved = [0u8; 3];
        cur.read_exact(&mut reserved)?;
        if generation >= 22 {
            let _metadata_size = cur.read_u32::<BigEndian>()?;
            let _file_size = cur.read_i64::<BigEndian>()?;
            data_offset = cur.read_i64::<BigEndian>()? as u64;
            let _unknown = cur.read_i64::<BigEndian>()?;
        }
        let big_endian = endian_flag != 0;
        let mut reader = MetaReader { cur, big_endian };

        let engine_version = reader.read_cstring("engine version")?;
        let _target_platform = reader.read_u32()?;
        let enable_type_tree = reader.read_u8()? != 0;

        let type_count = reader.read_i32()?;
        let mut types = Vec::with_capacity(type_count.max(0) as usize);
        for _ in 0..type_count {
            let class_id = reader.read_i32()?;
            let _is_stripped = reader.read_u8()?;
            let _script_type_index = reader.read_i16()?;
            if class_id == MONO_BEHAVIOUR_CLASS_ID {
                reader.skip(16)?; // script id hash
            }
            reader.skip(16)?; // old type hash
            if enable_type_tree {
                reader.skip_type_tree(generation)?;
            }
            types.push(SerializedType { class_id });
        }

        let object_count = reader.read_i32()?;
        let mut objects = Vec::with_capacity(object_count.max(0) as usize);
        for _ in 0..object_count {
            reader.align4()?;
            let path_id = reader.read_i64()?;
            let byte_start = if generation >= 22 {
                reader.read_i64()? as u64
            } else {
                u64::from(reader.read_u32()?)
            };
            let byte_size = reader.read_u32()?;
            let type_id = reader.read_i32()?;
            let class_id = types
                .get(usize::try_from(type_id).unwrap_or(usize::MAX))
                .map(|t| t.class_id)
                .ok_or(BundleError::ObjectOutOfRange { path_id })?;
            objects.push(ObjectInfo { path_id, byte_start, byte_size, class_id });
        }
        // Script types and externals follow but nothing here needs them.

        debug!(
            "Serialized file: generation {}, engine {:?}, {} objects",
            generation,
            engine_version,
            objects.len()
        );

        Ok(Self {
            engine_version,
            big_endian,
            objects,
            data_offset,
            raw: data.to_vec(),
        })
    }

    /// Raw data region of one object.
    pub fn object_data(&self, info: &ObjectInfo) -> Result<&[u8], BundleError> {
        let start = self
            .data_offset
            .checked_add(info.byte_start)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(BundleError::ObjectOutOfRange { path_id: info.path_id })?;
        let end = start
            .checked_add(info.byte_size as usize)
            .ok_or(BundleError::ObjectOutOfRange { path_id: info.path_id })?;
        self.raw
            .get(start..end)
            .ok_or(BundleError::ObjectOutOfRange { path_id: info.path_id })
    }
}

/// Cursor over the metadata section with the file's declared endianness.
struct MetaReader<'a> {
    cur: Cursor<&'a [u8]>,
    big_endian: bool,
}

impl MetaReader<'_> {
    fn read_u8(&mut self) -> Result<u8, BundleError> {
        Ok(self.cur.read_u8()?)
    }

    fn read_i16(&mut self) -> Result<i16, BundleError> {
        Ok(if self.big_endian {
            self.cur.read_i16::<BigEndian>()?
        } else {
            self.cur.read_i16::<LittleEndian>()?
        })
    }

    fn read_u32(&mut self) -> Result<u32, BundleError> {
        Ok(if self.big_endian {
            self.cur.read_u32::<BigEndian>()?
        } else {
            self.cur.read_u32::<LittleEndian>()?
        })
    }

    fn read_i32(&mut self) -> Result<i32, BundleError> {
        Ok(if self.big_endian {
            self.cur.read_i32::<BigEndian>()?
        } else {
            self.cur.read_i32::<LittleEndian>()?
        })
    }

    fn read_i64(&mut self) -> Result<i64, BundleError> {
        Ok(if self.big_endian {
            self.cur.read_i64::<BigEndian>()?
        } else {
            self.cur.read_i64::<LittleEndian>()?
        })
    }

    fn read_cstring(&mut self, what: &'static str) -> Result<String, BundleError> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.cur.read_u8()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        String::from_utf8(bytes).map_err(|_| BundleError::InvalidString(what))
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

    /// Skip a blob-format type tree without interpreting it.
    fn skip_type_tree(&mut self, generation: u32) -> Result<(), BundleError> {
        let node_count = self.read_i32()?;
        let string_buffer_size = self.read_i32()?;
        let node_size: i64 = if generation >= 19 { 32 } else { 24 };
        self.skip(i64::from(node_count) * node_size + i64::from(string_buffer_size))?;
        if generation >= 21 {
            // type dependency list
            let dep_count = self.read_i32()?;
            self.skip(i64::from(dep_count) * 4)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixture;

    #[test]
    fn parses_object_table_and_data() {
        let fields = fixture::PlayerSettingFields::default();
        let body = fixture::mono_behaviour_body(&fields);
        let data = fixture::serialized_file("2022.3.21f1", &[(114, body.clone())]);

        let file = SerializedFile::parse(&data).unwrap();
        assert_eq!(file.engine_version, "2022.3.21f1");
        assert!(!file.big_endian);
        assert_eq!(file.objects.len(), 1);
        assert_eq!(file.objects[0].class_id, 114);
        assert_eq!(file.object_data(&file.objects[0]).unwrap(), body.as_slice());
    }

    #[test]
    fn parses_multiple_objects() {
        let body_a = fixture::mono_behaviour_body(&fixture::PlayerSettingFields::default());
        let body_b = vec![1u8, 2, 3, 4];
        let data = fixture::serialized_file("2022.3.21f1", &[(114, body_a), (1, body_b.clone())]);

        let file = SerializedFile::parse(&data).unwrap();
        assert_eq!(file.objects.len(), 2);
        assert_eq!(file.objects[1].class_id, 1);
        assert_eq!(file.object_data(&file.objects[1]).unwrap(), body_b.as_slice());
    }

    #[test]
    fn overflowing_object_bounds_are_out_of_range_not_a_panic() {
        let body = vec![1u8, 2, 3, 4];
        let data = fixture::serialized_file("2022.3.21f1", &[(1, body)]);
        let file = SerializedFile::parse(&data).unwrap();

        // Header fields a hostile file could declare: byte_start pushing
        // the start sum past u64, byte_size reaching far past the file.
        let hostile = ObjectInfo {
            path_id: 99,
            byte_start: u64::MAX,
            byte_size: 16,
            class_id: 114,
        };
        assert!(matches!(
            file.object_data(&hostile),
            Err(BundleError::ObjectOutOfRange { path_id: 99 })
        ));

        let hostile = ObjectInfo {
            path_id: 100,
            byte_start: 0,
            byte_size: u32::MAX,
            class_id: 114,
        };
        assert!(matches!(
            file.object_data(&hostile),
            Err(BundleError::ObjectOutOfRange { path_id: 100 })
        ));
    }

    #[test]
    fn rejects_old_generations() {
        let mut data = fixture::serialized_file("5.6.0f1", &[]);
        data[8..12].copy_from_slice(&9u32.to_be_bytes());
        let result = SerializedFile::parse(&data);
        assert!(matches!(result, Err(BundleError::UnsupportedGeneration(9))));
    }

    #[test]
    fn truncated_file_is_an_io_error() {
        let data = fixture::serialized_file("2022.3.21f1", &[]);
        let result = SerializedFile::parse(&data[..10]);
        assert!(matches!(result, Err(BundleError::Io(_))));
    }
}
