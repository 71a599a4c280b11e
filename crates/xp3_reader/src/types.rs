//! Base types for structure of XP3 file.

use binrw::BinRead;

/// Signature every XP3 archive starts with
pub const SIGNATURE: [u8; 11] = *b"XP3\r\n \n\x1a\x8b\x67\x01";

/// Size of the index offset stored at the very end of the archive
pub const TRAILER_SIZE: u64 = 8;

/// Smallest source that can hold both the signature and the trailer
pub const MIN_ARCHIVE_SIZE: u64 = SIGNATURE.len() as u64 + TRAILER_SIZE;

/// Tag of a sub-record locating part of a member's data
pub const FILE_TAG: [u8; 4] = *b"file";

/// Tag of a sub-record describing a member's compression and size
pub const INFO_TAG: [u8; 4] = *b"info";

/// Header found at the index offset, in front of the index blob
///
/// All data is stored in little endian format
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(little)]
pub struct IndexHeader {
    /// Reserved byte, read and ignored
    pub reserved: u8,

    /// The number of bytes of the index blob that follows
    pub size: u64,
}

/// Body of a `file` sub-record, following its tag
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(little)]
pub struct FileChunk {
    /// Size field of the sub-record, not needed to read it
    pub chunk_size: u64,

    /// The offset from the start of the archive of this segment
    pub offset: u64,

    /// The number of bytes in this segment
    pub length: u64,
}

/// Body of an `info` sub-record, following its tag
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(little)]
pub struct InfoChunk {
    /// Size field of the sub-record, not needed to read it
    pub chunk_size: u64,

    /// Member flags, the low three bits select the compression
    pub flags: u32,

    /// The size of the member once decompressed
    pub original_size: u64,
}
