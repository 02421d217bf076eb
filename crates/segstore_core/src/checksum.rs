//! CRC32 checksums for relocation verification.

use crate::error::CoreResult;

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Checksums of a data set's files, keyed by path relative to the data
/// set root (`/`-separated).
pub type ChecksumMap = BTreeMap<String, u32>;

/// Computes the CRC32 (IEEE polynomial) of a byte slice.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

/// Computes the CRC32 of a file, streaming its content.
pub fn file_crc32(path: &Path) -> CoreResult<u32> {
    let mut file = fs::File::open(path)?;
    let mut buffer = [0u8; 64 * 1024];
    let mut crc = 0xFFFF_FFFF_u32;
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        for &byte in &buffer[..read] {
            crc = crc32_step(crc, byte);
        }
    }
    Ok(!crc)
}

fn crc32_step(crc: u32, byte: u8) -> u32 {
    let mut value = (crc ^ u32::from(byte)) & 0xFF;
    for _ in 0..8 {
        if value & 1 != 0 {
            value = (value >> 1) ^ 0xEDB8_8320;
        } else {
            value >>= 1;
        }
    }
    (crc >> 8) ^ value
}

/// Computes checksums of every file below `root`, keyed by relative path.
pub fn directory_checksums(root: &Path) -> CoreResult<ChecksumMap> {
    let mut checksums = ChecksumMap::new();
    collect_checksums(root, root, &mut checksums)?;
    Ok(checksums)
}

fn collect_checksums(root: &Path, dir: &Path, out: &mut ChecksumMap) -> CoreResult<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_checksums(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.insert(relative, file_crc32(&path)?);
        }
    }
    Ok(())
}
