//! Shared fixtures for end-to-end tests: a synthetic package (zip →
//! UnityFS bundle → serialized file → player-setting object) and canned
//! storefront pages.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

pub const MONO_BEHAVIOUR: i32 = 114;

/// Script fields of the player-setting object, in schema order.
pub struct PlayerSetting {
    pub name: &'static str,
    pub version: (i32, i32, i32),
    pub data_version: (i32, i32, i32),
    pub data_revision: i32,
    pub app_hash: &'static str,
    pub asset_hash: &'static str,
}

impl Default for PlayerSetting {
    fn default() -> Self {
        Self {
            name: "production_android",
            version: (4, 2, 1),
            data_version: (1, 0, 0),
            data_revision: 0,
            app_hash: "deadbeef",
            asset_hash: "cafef00d",
        }
    }
}

fn write_aligned_string(out: &mut Vec<u8>, s: &str) {
    out.write_u32::<LittleEndian>(s.len() as u32).unwrap();
    out.extend_from_slice(s.as_bytes());
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn mono_behaviour_body(setting: &PlayerSetting) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0u8; 12]); // m_GameObject
    out.push(1); // m_Enabled
    out.extend_from_slice(&[0u8; 3]);
    out.extend_from_slice(&[0u8; 12]); // m_Script
    write_aligned_string(&mut out, setting.name);
    let (major, minor, build) = setting.version;
    let (data_major, data_minor, data_build) = setting.data_version;
    for v in [major, minor, build, data_major, data_minor, data_build, setting.data_revision] {
        out.write_i32::<LittleEndian>(v).unwrap();
    }
    write_aligned_string(&mut out, setting.app_hash);
    write_aligned_string(&mut out, setting.asset_hash);
    out
}

/// Generation-21, little-endian serialized file with one object.
fn serialized_file(class_id: i32, body: &[u8]) -> Vec<u8> {
    const HEADER_LEN: usize = 20;

    let mut meta = Vec::new();
    meta.extend_from_slice(b"2022.3.21f1\0");
    meta.write_u32::<LittleEndian>(13).unwrap(); // Android
    meta.push(0); // no type tree
    meta.write_i32::<LittleEndian>(1).unwrap();
    meta.write_i32::<LittleEndian>(class_id).unwrap();
    meta.push(0);
    meta.write_i16::<LittleEndian>(0).unwrap();
    if class_id == MONO_BEHAVIOUR {
        meta.extend_from_slice(&[0u8; 16]);
    }
    meta.extend_from_slice(&[0u8; 16]);
    meta.write_i32::<LittleEndian>(1).unwrap(); // object count

    let mut table = Vec::new();
    let mut pos = HEADER_LEN + meta.len();
    while pos % 4 != 0 {
        table.push(0);
        pos += 1;
    }
    table.write_i64::<LittleEndian>(1).unwrap();
    table.write_u32::<LittleEndian>(0).unwrap();
    table.write_u32::<LittleEndian>(body.len() as u32).unwrap();
    table.write_i32::<LittleEndian>(0).unwrap();

    let data_offset = (HEADER_LEN + meta.len() + table.len()) as u32;
    let mut out = Vec::new();
    out.write_u32::<BigEndian>((meta.len() + table.len()) as u32).unwrap();
    out.write_u32::<BigEndian>(data_offset + body.len() as u32).unwrap();
    out.write_u32::<BigEndian>(21).unwrap();
    out.write_u32::<BigEndian>(data_offset).unwrap();
    out.extend_from_slice(&[0u8; 4]); // little-endian + reserved
    out.extend_from_slice(&meta);
    out.extend_from_slice(&table);
    out.extend_from_slice(body);
    out
}

/// Format-6 UnityFS bundle with one uncompressed block and one node.
fn unityfs_bundle(node_path: &str, payload: &[u8]) -> Vec<u8> {
    let mut info = Vec::new();
    info.extend_from_slice(&[0u8; 16]);
    info.write_i32::<BigEndian>(1).unwrap();
    info.write_u32::<BigEndian>(payload.len() as u32).unwrap();
    info.write_u32::<BigEndian>(payload.len() as u32).unwrap();
    info.write_u16::<BigEndian>(0).unwrap();
    info.write_i32::<BigEndian>(1).unwrap();
    info.write_i64::<BigEndian>(0).unwrap();
    info.write_i64::<BigEndian>(payload.len() as i64).unwrap();
    info.write_u32::<BigEndian>(4).unwrap();
    info.extend_from_slice(node_path.as_bytes());
    info.push(0);

    let mut out = Vec::new();
    out.extend_from_slice(b"UnityFS\0");
    out.write_u32::<BigEndian>(6).unwrap();
    out.extend_from_slice(b"5.x.x\0");
    out.extend_from_slice(b"2022.3.21f1\0");
    let total = out.len() + 8 + 4 + 4 + 4 + info.len() + payload.len();
    out.write_i64::<BigEndian>(total as i64).unwrap();
    out.write_u32::<BigEndian>(info.len() as u32).unwrap();
    out.write_u32::<BigEndian>(info.len() as u32).unwrap();
    out.write_u32::<BigEndian>(0).unwrap();
    out.extend_from_slice(&info);
    out.extend_from_slice(payload);
    out
}

/// A complete installable package holding the player-setting bundle under
/// the default asset-bundle filename.
pub fn package_with(setting: &PlayerSetting) -> Vec<u8> {
    let file = serialized_file(MONO_BEHAVIOUR, &mono_behaviour_body(setting));
    let bundle = unityfs_bundle("CAB-config", &file);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let stored = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer.start_file("assets/data.unity3d", stored).unwrap();
    writer.write_all(&bundle).unwrap();
    writer.start_file("classes.dex", stored).unwrap();
    writer.write_all(b"dex").unwrap();
    writer.finish().unwrap().into_inner()
}

/// Same payload, but nested one level down inside a split `.apk` entry.
pub fn split_package_with(setting: &PlayerSetting) -> Vec<u8> {
    let file = serialized_file(MONO_BEHAVIOUR, &mono_behaviour_body(setting));
    let bundle = unityfs_bundle("CAB-config", &file);

    let mut inner = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let stored = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    inner
        .start_file("assets/6350e2ec327334c8a9b7f494f344a761", stored)
        .unwrap();
    inner.write_all(&bundle).unwrap();
    let inner = inner.finish().unwrap().into_inner();

    let mut outer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    outer.start_file("manifest.json", stored).unwrap();
    outer.write_all(b"{}").unwrap();
    outer.start_file("split_main.apk", stored).unwrap();
    outer.write_all(&inner).unwrap();
    outer.finish().unwrap().into_inner()
}

/// QooApp app page carrying the given version in the second info row.
pub fn qooapp_page(version: &str) -> String {
    format!(
        r#"<html><body>
        <ul class="app-info android">
            <li class="row"><span>Size</span><var>1.2 GB</var></li>
            <li class="row"><span>Version</span><var>{version}</var></li>
        </ul>
        </body></html>"#
    )
}

/// TapTap CN page body embedding the given version.
pub fn taptap_page(version: &str) -> String {
    format!(r#"<script>{{"softwareVersion":"{version}","os":"android"}}</script>"#)
}
