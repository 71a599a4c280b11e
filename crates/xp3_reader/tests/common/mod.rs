//! Helpers assembling XP3 archives for tests
#![allow(dead_code)]

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use tempfile::NamedTempFile;
use xp3_reader::types::SIGNATURE;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builds an archive in memory, data first and index last
#[derive(Default)]
pub struct ArchiveBuilder {
    data: Vec<u8>,
    records: Vec<Vec<u8>>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes to the data area, returning their archive offset
    pub fn data(&mut self, bytes: &[u8]) -> u64 {
        let offset = (SIGNATURE.len() + self.data.len()) as u64;
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Add a member stored as is
    pub fn stored(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        let offset = self.data(bytes);
        self.entry(name, 0, bytes.len() as u64, &[(offset, bytes.len() as u64)])
    }

    /// Add a zlib compressed member
    pub fn compressed(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        let packed = zlib(bytes);
        let offset = self.data(&packed);
        self.entry(name, 1, bytes.len() as u64, &[(offset, packed.len() as u64)])
    }

    /// Add an index record with an `info` segment and the given `file` segments
    pub fn entry(&mut self, name: &str, flags: u32, size: u64, segments: &[(u64, u64)]) -> &mut Self {
        let mut body = name_field(name);
        body.extend(b"info");
        body.extend(12u64.to_le_bytes());
        body.extend(flags.to_le_bytes());
        body.extend(size.to_le_bytes());
        for (offset, length) in segments {
            body.extend(b"file");
            body.extend(16u64.to_le_bytes());
            body.extend(offset.to_le_bytes());
            body.extend(length.to_le_bytes());
        }
        self.record(body)
    }

    /// Add an index record with an arbitrary body
    pub fn record(&mut self, body: Vec<u8>) -> &mut Self {
        self.records.push(body);
        self
    }

    /// The decoded index blob
    pub fn index(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for body in &self.records {
            out.extend((body.len() as u32).to_le_bytes());
            out.extend(body);
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_index(&self.index())
    }

    pub fn build_compressed(&self) -> Vec<u8> {
        self.build_with_index(&zlib(&self.index()))
    }

    /// Assemble the archive around an index blob given as stored on disk
    pub fn build_with_index(&self, index: &[u8]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        out.extend(&self.data);
        let index_offset = out.len() as u64;
        out.push(0);
        out.extend((index.len() as u64).to_le_bytes());
        out.extend(index);
        out.extend(index_offset.to_le_bytes());
        out
    }
}

/// A UTF-16LE name prefixed with its length in code units
pub fn name_field(name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut out = (units.len() as u16).to_le_bytes().to_vec();
    units.iter().for_each(|u| out.extend(u.to_le_bytes()));
    out
}

/// Write `bytes` to a temporary `.xp3` file
pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".xp3")
        .tempfile()
        .unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
