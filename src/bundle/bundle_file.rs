//! UnityFS bundle container parsing
//!
//! Layout: a big-endian header (signature, format version, engine version
//! strings, sizes, flags), a blocks-info section (optionally LZ4-packed,
//! optionally placed at the end of the file), then the storage blocks.
//! Decompressed blocks form one blob that the node table slices into the
//! individual payload files.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::debug;

use super::BundleError;

const SIGNATURE: &str = "UnityFS";

/// Blocks info lives at the end of the file instead of after the header.
const FLAG_BLOCKS_INFO_AT_END: u32 = 0x80;

/// Low bits of a flags word select the compression scheme.
const COMPRESSION_MASK: u32 = 0x3F;

const COMPRESSION_NONE: u32 = 0;
const COMPRESSION_LZMA: u32 = 1;
const COMPRESSION_LZ4: u32 = 2;
const COMPRESSION_LZ4HC: u32 = 3;

/// One named payload file carried by a bundle.
pub struct BundleNode {
    pub path: String,
    pub data: Vec<u8>,
}

/// A parsed UnityFS bundle: engine version strings and payload nodes.
pub struct BundleFile {
    /// Authoring engine version recorded in the header; may be stripped
    /// to a placeholder in release builds.
    pub engine_version: String,
    pub nodes: Vec<BundleNode>,
}

/// True when the byte stream carries the UnityFS signature.
pub fn is_bundle(data: &[u8]) -> bool {
    data.len() > SIGNATURE.len()
        && data.starts_with(SIGNATURE.as_bytes())
        && data[SIGNATURE.len()] == 0
}

impl BundleFile {
    pub fn parse(data: &[u8]) -> Result<Self, BundleError> {
        let mut cur = Cursor::new(data);

        let signature = read_cstring(&mut cur, "bundle signature")?;
        if signature != SIGNATURE {
            return Err(BundleError::Signature(signature));
        }
        let format_version = cur.read_u32::<BigEndian>()?;
        if !(6..=8).contains(&format_version) {
            return Err(BundleError::UnsupportedFormat(format_version));
        }
        let _player_version = read_cstring(&mut cur, "player version")?;
        let engine_version = read_cstring(&mut cur, "engine version")?;
        let _bundle_size = cur.read_i64::<BigEndian>()?;
        let compressed_info_size = cur.read_u32::<BigEndian>()? as usize;
        let uncompressed_info_size = cur.read_u32::<BigEndian>()? as usize;
        let flags = cur.read_u32::<BigEndian>()?;

        if format_version >= 7 {
            align_stream(&mut cur, 16)?;
        }

        let info_compressed = if flags & FLAG_BLOCKS_INFO_AT_END != 0 {
            if compressed_info_size > data.len() {
                return Err(BundleError::Io(truncated("blocks info at end")));
            }
            data[data.len() - compressed_info_size..].to_vec()
        } else {
            let mut buf = vec![0u8; compressed_info_size];
            cur.read_exact(&mut buf)?;
            buf
        };
        let info = decompress(flags & COMPRESSION_MASK, &info_compressed, uncompressed_info_size)?;

        let (blocks, node_table) = parse_blocks_info(&info)?;
        debug!(
            "Bundle: format {}, engine {:?}, {} blocks, {} nodes",
            format_version,
            engine_version,
            blocks.len(),
            node_table.len()
        );

        let mut blob = Vec::with_capacity(blocks.iter().map(|b| b.uncompressed_size).sum());
        for block in &blocks {
            let mut stored = vec![0u8; block.compressed_size];
            cur.read_exact(&mut stored)?;
            let chunk = decompress(
                u32::from(block.flags) & COMPRESSION_MASK,
                &stored,
                block.uncompressed_size,
            )?;
            blob.extend_from_slice(&chunk);
        }

        let mut nodes = Vec::with_capacity(node_table.len());
        for entry in node_table {
            // Negative offsets and sizes never slice; both must convert.
            let range = match (usize::try_from(entry.offset), usize::try_from(entry.size)) {
                (Ok(offset), Ok(size)) => offset
                    .checked_add(size)
                    .filter(|&end| end <= blob.len())
                    .map(|end| offset..end),
                _ => None,
            };
            let Some(range) = range else {
                return Err(BundleError::NodeOutOfRange {
                    offset: entry.offset,
                    size: entry.size,
                });
            };
            nodes.push(BundleNode {
                path: entry.path,
                data: blob[range].to_vec(),
            });
        }

        Ok(Self { engine_version, nodes })
    }
}

struct StorageBlock {
    uncompressed_size: usize,
    compressed_size: usize,
    flags: u16,
}

struct NodeEntry {
    offset: i64,
    size: i64,
    path: String,
}

fn parse_blocks_info(info: &[u8]) -> Result<(Vec<StorageBlock>, Vec<NodeEntry>), BundleError> {
    let mut cur = Cursor::new(info);
    cur.seek(SeekFrom::Current(16))?; // uncompressed data hash

    let block_count = cur.read_i32::<BigEndian>()?;
    let mut blocks = Vec::new();
    for _ in 0..block_count {
        blocks.push(StorageBlock {
            uncompressed_size: cur.read_u32::<BigEndian>()? as usize,
            compressed_size: cur.read_u32::<BigEndian>()? as usize,
            flags: cur.read_u16::<BigEndian>()?,
        });
    }

    let node_count = cur.read_i32::<BigEndian>()?;
    let mut nodes = Vec::new();
    for _ in 0..node_count {
        let offset = cur.read_i64::<BigEndian>()?;
        let size = cur.read_i64::<BigEndian>()?;
        let _node_flags = cur.read_u32::<BigEndian>()?;
        let path = read_cstring(&mut cur, "node path")?;
        nodes.push(NodeEntry { offset, size, path });
    }

    Ok((blocks, nodes))
}

fn decompress(scheme: u32, data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>, BundleError> {
    match scheme {
        COMPRESSION_NONE => Ok(data.to_vec()),
        COMPRESSION_LZ4 | COMPRESSION_LZ4HC => {
            Ok(lz4_flex::block::decompress(data, uncompressed_size)?)
        }
        COMPRESSION_LZMA => Err(BundleError::UnsupportedCompression(COMPRESSION_LZMA)),
        other => Err(BundleError::UnsupportedCompression(other)),
    }
}

fn read_cstring<R: Read>(reader: &mut R, what: &'static str) -> Result<String, BundleError> {
    let mut bytes = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        if byte[0] == 0 {
            break;
        }
        bytes.push(byte[0]);
    }
    String::from_utf8(bytes).map_err(|_| BundleError::InvalidString(what))
}

fn align_stream<T: AsRef<[u8]>>(cur: &mut Cursor<T>, to: u64) -> Result<(), BundleError> {
    let pos = cur.position();
    let rem = pos % to;
    if rem != 0 {
        cur.seek(SeekFrom::Start(pos + to - rem))?;
    }
    Ok(())
}

fn truncated(what: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, what.to_string())
}
