//! Types for reading XP3 archives
//!

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    compression::{self, CompressionMethod},
    error::{Error, FileNotFoundError, FormatError, Result},
    index::{self, Members},
    types::{IndexHeader, MIN_ARCHIVE_SIZE, SIGNATURE, TRAILER_SIZE},
};

/// A contiguous byte range of the archive backing part of a member
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    /// Offset from the start of the archive
    pub offset: u64,
    /// Number of bytes in the range
    pub length: u64,
}

/// Structure representing an XP3 member entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberEntry {
    /// Ranges to concatenate, in order, to rebuild the stored data
    pub segments: Vec<Segment>,
    /// Method of compressing the member in the xp3
    pub compression: CompressionMethod,
    /// Size of the member when extracted, as declared by the index
    pub uncompressed_size: u64,
}

impl MemberEntry {
    /// Whether the stored data has to be inflated
    pub fn is_compressed(&self) -> bool {
        self.compression != CompressionMethod::None
    }

    /// Get the size of the member, in bytes, in the archive
    pub fn stored_size(&self) -> u64 {
        self.segments
            .iter()
            .fold(0u64, |total, s| total.saturating_add(s.length))
    }
}

/// Members of a loaded XP3 archive
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn dump_xp3_contents(mut reader: impl Read + Seek) -> xp3_reader::error::Result<()> {
///     let catalog = xp3_reader::Catalog::read(&mut reader)?;
///
///     for name in catalog.names() {
///         let data = catalog.extract(&mut reader, name)?;
///         println!("{name}: {} bytes", data.len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    source_len: u64,
    members: Members,
}

impl Catalog {
    /// Validate an XP3 byte source and decode its index.
    #[instrument(skip(reader), err)]
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Catalog> {
        let source_len = reader.seek(SeekFrom::End(0))?;
        let index_offset = Self::read_trailer(reader, source_len)?;
        let index = Self::read_index(reader, index_offset)?;
        let members = index::parse_index(&index)?;

        Ok(Catalog {
            source_len,
            members,
        })
    }

    fn read_trailer<R: Read + Seek>(reader: &mut R, source_len: u64) -> Result<u64> {
        if source_len < MIN_ARCHIVE_SIZE {
            return Err(FormatError::TooSmall(source_len).into());
        }

        let mut signature = [0u8; SIGNATURE.len()];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut signature)?;
        if signature != SIGNATURE {
            return Err(FormatError::BadSignature.into());
        }

        reader.seek(SeekFrom::Start(source_len - TRAILER_SIZE))?;
        let offset = reader.read_u64::<LittleEndian>()?;
        if offset < SIGNATURE.len() as u64 || offset >= source_len {
            return Err(FormatError::InvalidIndexOffset {
                offset,
                len: source_len,
            }
            .into());
        }

        Ok(offset)
    }

    fn read_index<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<Vec<u8>> {
        reader.seek(SeekFrom::Start(offset))?;
        let header = IndexHeader::read(reader).map_err(|e| {
            if e.is_eof() {
                Error::from(FormatError::CorruptIndex(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("index header at {offset} is cut off"),
                )))
            } else {
                Error::from(e)
            }
        })?;
        debug!(offset, size = header.size, "reading index");

        let mut blob = Vec::new();
        reader.by_ref().take(header.size).read_to_end(&mut blob)?;
        if (blob.len() as u64) < header.size {
            return Err(FormatError::CorruptIndex(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("index holds {} of {} bytes", blob.len(), header.size),
            ))
            .into());
        }

        if compression::is_zlib_stream(&blob) {
            return compression::inflate(&blob, 0)
                .map_err(|e| FormatError::CorruptIndex(e).into());
        }

        Ok(blob)
    }

    /// Number of members in the catalog.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the catalog contains no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of the source the catalog was read from
    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    /// Member names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.members.keys().map(|s| s.as_ref()).collect();
        names.sort_unstable();
        names
    }

    /// Get the entry of a member, if it's present.
    #[inline(always)]
    pub fn get(&self, name: &str) -> Option<&MemberEntry> {
        self.members.get(name)
    }

    /// Returns an iterator over the members, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MemberEntry)> {
        self.members.iter().map(|(name, entry)| (name.as_ref(), entry))
    }

    /// Total declared size of the members once extracted.
    pub fn decompressed_size(&self) -> u128 {
        self.members
            .values()
            .map(|entry| entry.uncompressed_size as u128)
            .sum()
    }

    /// Read a member's data from the source this catalog was read from.
    ///
    /// Compressed members that fail to inflate are returned as stored.
    #[instrument(skip(self, reader), err)]
    pub fn extract<R: Read + Seek>(&self, reader: &mut R, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .get(name)
            .ok_or_else(|| FileNotFoundError::Name(name.to_owned()))?;

        for segment in &entry.segments {
            let in_bounds = segment
                .offset
                .checked_add(segment.length)
                .is_some_and(|end| end <= self.source_len);
            if !in_bounds {
                return Err(FormatError::SegmentOutOfBounds {
                    offset: segment.offset,
                    length: segment.length,
                }
                .into());
            }
        }

        let mut stored = Vec::with_capacity(entry.stored_size().min(self.source_len) as usize);
        for segment in &entry.segments {
            reader.seek(SeekFrom::Start(segment.offset))?;
            let read = reader
                .by_ref()
                .take(segment.length)
                .read_to_end(&mut stored)?;
            if (read as u64) < segment.length {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("segment at {} ended early", segment.offset),
                )
                .into());
            }
        }

        Ok(match entry.compression {
            CompressionMethod::None => stored,
            CompressionMethod::Zlib => {
                compression::inflate_or_stored(stored, entry.uncompressed_size)
            }
        })
    }
}

/// XP3 archive reader
///
/// The archive file is opened for each operation and closed afterwards, so a
/// loaded archive can be shared between threads that extract concurrently.
///
/// ```no_run
/// fn list_xp3_contents(path: &std::path::Path) -> xp3_reader::error::Result<()> {
///     let xp3 = xp3_reader::Xp3Archive::open(path)?;
///
///     for name in xp3.list_members() {
///         let data = xp3.extract(name)?;
///         println!("{name}: {} bytes", data.len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Xp3Archive {
    path: PathBuf,
    catalog: Option<Arc<Catalog>>,
}

impl Xp3Archive {
    /// Create a reader for the archive at `path` without loading it.
    pub fn new(path: impl AsRef<Path>) -> Xp3Archive {
        Xp3Archive {
            path: path.as_ref().to_owned(),
            catalog: None,
        }
    }

    /// Open and load the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Xp3Archive> {
        let mut archive = Self::new(path);
        archive.load()?;
        Ok(archive)
    }

    /// Read the archive's index, replacing any catalog from an earlier load.
    ///
    /// On failure the archive is left unloaded.
    #[instrument(skip(self), fields(path = %self.path.display()), err)]
    pub fn load(&mut self) -> Result<()> {
        self.catalog = None;

        let mut file = File::open(&self.path)?;
        let catalog = Catalog::read(&mut file)?;
        info!(members = catalog.len(), "loaded archive");

        self.catalog = Some(Arc::new(catalog));
        Ok(())
    }

    /// Whether the last call to [`Xp3Archive::load`] succeeded
    pub fn is_loaded(&self) -> bool {
        self.catalog.is_some()
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the archive file when it was loaded
    pub fn file_size(&self) -> u64 {
        self.catalog.as_ref().map_or(0, |c| c.source_len())
    }

    /// The loaded catalog, if any
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_deref()
    }

    /// Number of members in this XP3.
    pub fn len(&self) -> usize {
        self.catalog.as_ref().map_or(0, |c| c.len())
    }

    /// Whether this XP3 archive contains no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member names, sorted. Empty when the archive is not loaded.
    pub fn list_members(&self) -> Vec<&str> {
        self.catalog.as_ref().map_or_else(Vec::new, |c| c.names())
    }

    /// Get the entry of a member, if the archive is loaded and it's present.
    pub fn entry(&self, name: &str) -> Option<&MemberEntry> {
        self.catalog.as_ref().and_then(|c| c.get(name))
    }

    /// Total declared size of the members once extracted.
    pub fn decompressed_size(&self) -> u128 {
        self.catalog.as_ref().map_or(0, |c| c.decompressed_size())
    }

    /// Extract a member's data by name.
    pub fn extract(&self, name: &str) -> Result<Vec<u8>> {
        let Some(catalog) = &self.catalog else {
            warn!(name, "extracting from an archive that is not loaded");
            return Err(Error::FileNotFound(FileNotFoundError::NotLoaded));
        };
        if catalog.get(name).is_none() {
            return Err(FileNotFoundError::Name(name.to_owned()).into());
        }

        let mut file = File::open(&self.path)?;
        catalog.extract(&mut file, name)
    }
}
