//! Synthetic Madden 22 installs for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gridiron::cas::{BlockWriter, Codec};
use gridiron::common::hash::hash_str;
use gridiron::common::FbGuid;
use gridiron::ebx::{EbxBuilder, EbxFieldType, SharedTypeWriter, SHARED_TYPE_DESCRIPTORS};
use gridiron::toc::build_initfs;
use tempfile::TempDir;

pub const KEY: [u8; 16] = *b"m22-initfs-key!!";
pub const DATA_PACKAGE: &str = "Data/Win32/superbundlelayout/madden_installpackage_00";
pub const PATCH_PACKAGE: &str = "Patch/Win32/superbundlelayout/madden_installpackage_00";
pub const SOUND_TYPE: &str = "SoundWaveAsset";

/// A throwaway install with empty data and patch partitions.
pub struct Install {
    pub dir: TempDir,
}

impl Install {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Madden22.exe"), b"").unwrap();
        fs::create_dir_all(dir.path().join("Data/Win32/superbundlelayout")).unwrap();
        fs::create_dir_all(dir.path().join("Patch/Win32/superbundlelayout")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn exe(&self) -> PathBuf {
        self.root().join("Madden22.exe")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn write(&self, relative: &str, bytes: &[u8]) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    pub fn write_initfs(&self, partition: &str, files: &[(&str, &[u8])]) {
        self.write(&format!("{partition}/initfs_Win32"), &build_initfs(files, &KEY));
    }
}

/// Instance payload of the scenario resource: 312 non-zero bytes, then 186 zeros.
pub fn scenario_payload() -> Vec<u8> {
    let mut payload: Vec<u8> = (0..312u32).map(|i| (i % 255 + 1) as u8).collect();
    payload.resize(498, 0);
    payload
}

/// `Sound/X`: a 48-byte header and a 498-byte payload, 546 bytes in all.
pub fn scenario_ebx() -> Vec<u8> {
    let ebx = EbxBuilder::new("Sound/X", FbGuid::EMPTY, hash_str(SOUND_TYPE))
        .payload(&scenario_payload())
        .build();
    assert_eq!(ebx.len(), 546);
    ebx
}

/// A zstd frame holding `scenario_ebx()`: one raw block with the first 360
/// bytes and an RLE block for the zero tail. 374 bytes.
pub fn scenario_frame() -> Vec<u8> {
    let ebx = scenario_ebx();
    assert!(ebx[360..].iter().all(|&b| b == 0));

    let mut frame = vec![0x28, 0xB5, 0x2F, 0xFD];
    // Single segment, two-byte content size (546 - 256).
    frame.extend_from_slice(&[0x60, 0x22, 0x01]);
    // Raw block, 360 bytes, not last.
    frame.extend_from_slice(&[0x40, 0x0B, 0x00]);
    frame.extend_from_slice(&ebx[..360]);
    // RLE block, 186 zero bytes, last.
    frame.extend_from_slice(&[0xD3, 0x05, 0x00, 0x00]);
    assert_eq!(frame.len(), 374);
    frame
}

/// `cas_01`: a stored filler chunk, then `Sound/X` as one compressed block at
/// `0x720C` taking `0x17E` bytes.
pub fn scenario_container() -> Vec<u8> {
    let mut writer = BlockWriter::new();
    writer.write_stored(&vec![0xAB; 0x720C - 8], true).unwrap();
    let offset = writer
        .write_raw(Codec::Zstd, 546, &scenario_frame(), true)
        .unwrap();
    assert_eq!(offset, 0x720C);
    assert_eq!(writer.position() - offset, 0x17E);
    writer.into_inner()
}

/// A container with one zstd chunk per name, split into 64-byte blocks.
pub fn container(names: &[&str]) -> Vec<u8> {
    let mut writer = BlockWriter::new();
    for (i, name) in names.iter().enumerate() {
        let payload: Vec<u8> = (0..100 + i * 13).map(|b| (b * 7 + i) as u8).collect();
        let ebx = EbxBuilder::new(*name, FbGuid::EMPTY, 0).payload(&payload).build();
        writer.write_zstd_chunk(&ebx, 64).unwrap();
    }
    writer.into_inner()
}

/// Shared type descriptors with `SoundWaveAsset` and one extra type.
pub fn type_descriptors(extra: &str) -> SharedTypeWriter {
    let mut writer = SharedTypeWriter::new();
    let sound = writer.add_type(SOUND_TYPE, EbxFieldType::Struct, 8, 4);
    writer.add_field(sound, "ChannelCount", EbxFieldType::Int32, 0, 0);
    writer.add_field(sound, "Loudness", EbxFieldType::UInt16, 4, 0);
    writer.add_type(extra, EbxFieldType::Struct, 0, 1);
    writer
}

/// The partition stored in the initfs.
pub fn type_partition(extra: &str) -> Vec<u8> {
    type_descriptors(extra).build_partition()
}

pub fn install_types(install: &Install, partition: &str, extra: &str) {
    let partition_bytes = type_partition(extra);
    install.write_initfs(partition, &[(SHARED_TYPE_DESCRIPTORS, &partition_bytes[..])]);
}
