//! Index and member decompression handling.

use std::io::{self, Read};

use flate2::read::ZlibDecoder;
use tracing::{instrument, warn};

/// First two bytes of a zlib stream using the default compression level
pub const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9C];

/// Largest size hint trusted when pre-allocating an inflate buffer
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Identifies the storage format of a member's data inside the XP3 file
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// Data was compressed using Zlib
    Zlib,
}

impl CompressionMethod {
    /// Derive the method from the flags of an `info` sub-record.
    ///
    /// Any value in the low three bits means the stream codec was applied.
    pub fn from_flags(flags: u32) -> Self {
        if flags & 0x7 != 0 {
            CompressionMethod::Zlib
        } else {
            CompressionMethod::None
        }
    }
}

/// Whether `data` starts like a zlib stream.
pub fn is_zlib_stream(data: &[u8]) -> bool {
    data.starts_with(&ZLIB_MAGIC)
}

/// Inflate a complete zlib stream.
///
/// `size_hint` only sizes the initial buffer, the stream decides the final length.
#[instrument(skip(data), fields(len = data.len()), err)]
pub fn inflate(data: &[u8], size_hint: u64) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint.min(MAX_PREALLOCATION) as usize);
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Inflate member data, falling back to the stored bytes when they do not inflate.
///
/// Archives may flag members with compression values this reader does not
/// understand, so a failed inflate hands back the data untouched instead of
/// failing the extraction.
pub fn inflate_or_stored(stored: Vec<u8>, size_hint: u64) -> Vec<u8> {
    match inflate(&stored, size_hint) {
        Ok(data) => data,
        Err(e) => {
            warn!("returning stored bytes, unable to inflate member: {e}");
            stored
        }
    }
}
