//! This library handles reading **XP3** archives used by the *KiriKiri* visual novel engine.
//!
//! # XP3 Archive Format Documentation
//!
//! This crate provides utilities to read and extract data from the **XP3** archive format which
//! bundles the scripts, images and sounds of a game into a single file. XP3 files are typically
//! identified with the `.xp3` extension.
//!
//! ## File Structure
//!
//! An XP3 file consists of a signature, followed by the data of its members, an index and a
//! trailer pointing at the index.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Signature              | 11 bytes: `58 50 33 0D 0A 20 0A 1A 8B 67 01`               |
//! | 0x000B         | Data                   | Member data, addressed by the index                        |
//! | Index Offset   | Index                  | Index header followed by the index blob                    |
//! | End - 8        | Index Offset           | 8 bytes: Offset to the index from the start of the file    |
//!
//! ### Trailer
//!
//! The last 8 bytes of the file hold the offset of the index. It must point past the signature
//! and before the end of the file.
//!
//! ### Index
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Reserved               | 1 byte: Read and ignored                                |
//! | 0x0001         | Index Size             | 8 bytes: Number of bytes in the index blob              |
//! | 0x0009         | Index Blob             | (Index Size) bytes: Records, possibly zlib compressed   |
//!
//! When the blob starts with the zlib header `78 9C` it is inflated before being parsed.
//! The decoded blob is a list of records, each a 4-byte size followed by that many bytes. A
//! size of zero ends the list.
//!
//! ### Records
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name Length            | 2 bytes: Number of UTF-16 code units in the name        |
//! | 0x0002         | Name                   | (Name Length * 2) bytes: UTF-16LE member name           |
//! | ...            | Segments               | Tagged segments until the end of the record             |
//!
//! Each segment starts with a 4-byte tag:
//!
//! - **`file`**: 8 bytes (skipped), an 8-byte offset and an 8-byte length locating part of the
//!   member's data. A member's data is the concatenation of its `file` ranges, in order.
//! - **`info`**: 8 bytes (skipped), 4 bytes of flags and the 8-byte size of the member once
//!   decompressed. Any value in the low three bits of the flags means the data is zlib
//!   compressed.
//! - Anything else: an 8-byte size followed by that many bytes, which are skipped.
//!
//! Records without a `file` segment do not produce a member.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.xp3`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression Methods**:
//!   - None
//!   - Zlib
//!

pub mod compression;
pub mod error;
mod index;
pub mod read;
pub mod types;

pub use compression::CompressionMethod;
pub use read::{Catalog, MemberEntry, Segment, Xp3Archive};
