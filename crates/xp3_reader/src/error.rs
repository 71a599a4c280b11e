//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is an invalid xp3 archive
    #[error("file is an invalid xp3 archive")]
    InvalidArchive(#[from] FormatError),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),
}

/// Error type describing why the contents of an archive could not be trusted
#[derive(Error, Diagnostic, Debug)]
pub enum FormatError {
    /// the first bytes are not the xp3 signature
    #[error("bad signature")]
    BadSignature,

    /// the source cannot hold a signature and a trailer
    #[error("file too small ({0} bytes)")]
    TooSmall(u64),

    /// the trailer points outside of the archive
    #[error("invalid index offset {offset} for a file of {len} bytes")]
    InvalidIndexOffset { offset: u64, len: u64 },

    /// the index blob could not be read or inflated
    #[error("corrupt index")]
    CorruptIndex(#[source] std::io::Error),

    /// an index record ends inside its member name
    #[error("truncated name")]
    TruncatedName,

    /// a member segment points outside of the archive
    #[error("segment at {offset} with length {length} is out of bounds")]
    SegmentOutOfBounds { offset: u64, length: u64 },
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
pub enum FileNotFoundError {
    /// by name {0}
    #[error("by name {0}")]
    Name(String),

    /// the archive has not been loaded
    #[error("archive not loaded")]
    NotLoaded,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
