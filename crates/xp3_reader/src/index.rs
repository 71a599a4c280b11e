//! Walking a decoded XP3 index and parsing its entries
//!

use binrw::BinRead;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use indexmap::IndexMap;
use std::io::{Cursor, Read};
use tracing::{debug, instrument, trace, warn};

use crate::{
    compression::CompressionMethod,
    error::{FormatError, Result},
    read::{MemberEntry, Segment},
    types::{FileChunk, InfoChunk, FILE_TAG, INFO_TAG},
};

/// Members of an index, keyed by name
pub(crate) type Members = IndexMap<Box<str>, MemberEntry>;

/// Walk the `{u32 size, body}` records of a decoded index.
///
/// The walk ends at a zero size, when fewer than four bytes remain, or after a
/// record that runs past the end of the index. Such a record is parsed from the
/// bytes that remain.
#[instrument(skip(index), fields(len = index.len()))]
pub(crate) fn parse_index(index: &[u8]) -> Result<Members> {
    let mut members = Members::new();
    let mut pos = 0usize;

    while index.len() - pos >= 4 {
        let record_size = LittleEndian::read_u32(&index[pos..pos + 4]) as usize;
        if record_size == 0 {
            trace!(pos, "end of index marker");
            break;
        }

        let start = pos + 4;
        let end = start.saturating_add(record_size);
        if end > index.len() {
            warn!(pos, record_size, "index ends inside a record");
            match parse_entry(&index[start..]) {
                Ok(entry) => insert(&mut members, entry),
                Err(e) => warn!("dropping truncated record: {e}"),
            }
            break;
        }

        insert(&mut members, parse_entry(&index[start..end])?);
        pos = end;
    }

    debug!(members = members.len(), "parsed index");
    Ok(members)
}

fn insert(members: &mut Members, entry: Option<(Box<str>, MemberEntry)>) {
    if let Some((name, entry)) = entry {
        if members.insert(name, entry).is_some() {
            debug!("duplicate member name, keeping the later record");
        }
    }
}

/// Parse one index record into a named member.
///
/// Returns `None` for records that do not locate any data.
pub(crate) fn parse_entry(body: &[u8]) -> Result<Option<(Box<str>, MemberEntry)>> {
    let units = body
        .get(..2)
        .map(LittleEndian::read_u16)
        .ok_or(FormatError::TruncatedName)? as usize;
    let name_end = 2 + units * 2;
    let name_raw = body.get(2..name_end).ok_or(FormatError::TruncatedName)?;

    let name: Vec<u16> = name_raw
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .collect();
    let name = String::from_utf16_lossy(&name);

    let mut entry = MemberEntry::default();
    let mut cursor = Cursor::new(&body[name_end..]);
    let len = cursor.get_ref().len() as u64;

    loop {
        let mut tag = [0u8; 4];
        if cursor.read_exact(&mut tag).is_err() {
            break;
        }

        match tag {
            FILE_TAG => {
                let Ok(chunk) = FileChunk::read(&mut cursor) else {
                    debug!(%name, "truncated file segment");
                    break;
                };
                entry.segments.push(Segment {
                    offset: chunk.offset,
                    length: chunk.length,
                });
            }
            INFO_TAG => {
                let Ok(chunk) = InfoChunk::read(&mut cursor) else {
                    debug!(%name, "truncated info segment");
                    break;
                };
                entry.compression = CompressionMethod::from_flags(chunk.flags);
                entry.uncompressed_size = chunk.original_size;
            }
            _ => {
                let Ok(size) = cursor.read_u64::<LittleEndian>() else {
                    break;
                };
                let remaining = len - cursor.position();
                if size > remaining {
                    debug!(%name, ?tag, size, "segment runs past the record");
                    break;
                }
                trace!(%name, ?tag, size, "skipping unknown segment");
                cursor.set_position(cursor.position() + size);
            }
        }
    }

    if entry.segments.is_empty() {
        debug!(%name, "record has no data segments");
        return Ok(None);
    }

    Ok(Some((name.into(), entry)))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{parse_entry, parse_index};
    use crate::{
        compression::CompressionMethod,
        error::{Error, FormatError, Result},
        read::Segment,
    };

    fn name(value: &str) -> Vec<u8> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let mut out = (units.len() as u16).to_le_bytes().to_vec();
        units.iter().for_each(|u| out.extend(u.to_le_bytes()));
        out
    }

    fn file(offset: u64, length: u64) -> Vec<u8> {
        let mut out = b"file".to_vec();
        out.extend(16u64.to_le_bytes());
        out.extend(offset.to_le_bytes());
        out.extend(length.to_le_bytes());
        out
    }

    fn info(flags: u32, size: u64) -> Vec<u8> {
        let mut out = b"info".to_vec();
        out.extend(12u64.to_le_bytes());
        out.extend(flags.to_le_bytes());
        out.extend(size.to_le_bytes());
        out
    }

    fn record(body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as u32).to_le_bytes().to_vec();
        out.extend(body);
        out
    }

    #[test]
    fn parse_single_segment() -> Result<()> {
        let body = [name("a.txt"), file(11, 5)].concat();

        let (member, entry) = parse_entry(&body)?.expect("entry");
        assert_eq!(&*member, "a.txt");
        assert_eq!(entry.segments, vec![Segment { offset: 11, length: 5 }]);
        assert_eq!(entry.compression, CompressionMethod::None);

        Ok(())
    }

    #[test]
    fn parse_info_and_segments_in_order() -> Result<()> {
        let body = [name("bg/title.png"), info(1, 300), file(40, 10), file(11, 20)].concat();

        let (member, entry) = parse_entry(&body)?.expect("entry");
        assert_eq!(&*member, "bg/title.png");
        assert!(entry.is_compressed());
        assert_eq!(entry.uncompressed_size, 300);
        assert_eq!(
            entry.segments,
            vec![
                Segment { offset: 40, length: 10 },
                Segment { offset: 11, length: 20 },
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_utf16_name() -> Result<()> {
        let body = [name("立ち絵/𝄞.tlg"), file(11, 1)].concat();

        let (member, _) = parse_entry(&body)?.expect("entry");
        assert_eq!(&*member, "立ち絵/𝄞.tlg");

        Ok(())
    }

    #[test]
    fn skip_unknown_segment() -> Result<()> {
        let mut adlr = b"adlr".to_vec();
        adlr.extend(4u64.to_le_bytes());
        adlr.extend([0xDE, 0xAD, 0xBE, 0xEF]);
        let body = [name("a.txt"), adlr, file(11, 5)].concat();

        let (_, entry) = parse_entry(&body)?.expect("entry");
        assert_eq!(entry.segments, vec![Segment { offset: 11, length: 5 }]);

        Ok(())
    }

    #[test]
    fn stop_at_oversized_unknown_segment() -> Result<()> {
        let mut junk = b"junk".to_vec();
        junk.extend(1000u64.to_le_bytes());
        let body = [name("a.txt"), file(11, 5), junk, file(20, 5)].concat();

        let (_, entry) = parse_entry(&body)?.expect("entry");
        assert_eq!(entry.segments, vec![Segment { offset: 11, length: 5 }]);

        Ok(())
    }

    #[test]
    fn stop_at_truncated_file_segment() -> Result<()> {
        let truncated = file(20, 5)[..12].to_vec();
        let body = [name("a.txt"), file(11, 5), truncated].concat();

        let (_, entry) = parse_entry(&body)?.expect("entry");
        assert_eq!(entry.segments.len(), 1);

        Ok(())
    }

    #[test]
    fn drop_metadata_only_record() -> Result<()> {
        let body = [name("a.txt"), info(0, 5)].concat();
        assert!(parse_entry(&body)?.is_none());

        Ok(())
    }

    #[test]
    fn reject_truncated_name() {
        let mut body = name("a.txt");
        body.truncate(5);

        assert!(matches!(
            parse_entry(&body),
            Err(Error::InvalidArchive(FormatError::TruncatedName))
        ));
        assert!(matches!(
            parse_entry(&[0x01]),
            Err(Error::InvalidArchive(FormatError::TruncatedName))
        ));
    }

    #[test]
    fn walk_stops_at_end_marker() -> Result<()> {
        let index = [
            record(&[name("a.txt"), file(11, 1)].concat()),
            0u32.to_le_bytes().to_vec(),
            record(&[name("b.txt"), file(12, 1)].concat()),
        ]
        .concat();

        let members = parse_index(&index)?;
        assert_eq!(members.len(), 1);
        assert!(members.contains_key("a.txt"));

        Ok(())
    }

    #[test]
    fn walk_ignores_short_tail() -> Result<()> {
        let index = [record(&[name("a.txt"), file(11, 1)].concat()), vec![0x01, 0x00]].concat();

        let members = parse_index(&index)?;
        assert_eq!(members.len(), 1);

        Ok(())
    }

    #[test]
    fn walk_keeps_truncated_final_record() -> Result<()> {
        let mut last = record(&[name("b.txt"), file(12, 3), file(30, 3)].concat());
        last.truncate(last.len() - 10);
        let index = [record(&[name("a.txt"), file(11, 1)].concat()), last].concat();

        let members = parse_index(&index)?;
        assert_eq!(members.len(), 2);
        assert_eq!(
            members["b.txt"].segments,
            vec![Segment { offset: 12, length: 3 }]
        );

        Ok(())
    }

    #[test]
    fn walk_tolerates_name_cut_by_end_of_index() -> Result<()> {
        let mut last = record(&[name("a_long_member_name.txt"), file(12, 3)].concat());
        last.truncate(10);
        let index = [record(&[name("a.txt"), file(11, 1)].concat()), last].concat();

        let members = parse_index(&index)?;
        assert_eq!(members.len(), 1);

        Ok(())
    }

    #[test]
    fn walk_fails_on_truncated_name_in_complete_record() {
        let index = record(&[0x10, 0x00, 0x41, 0x00]);

        assert!(matches!(
            parse_index(&index),
            Err(Error::InvalidArchive(FormatError::TruncatedName))
        ));
    }

    #[test]
    fn later_duplicate_wins() -> Result<()> {
        let index = [
            record(&[name("a.txt"), file(11, 1)].concat()),
            record(&[name("b.txt"), file(12, 1)].concat()),
            record(&[name("a.txt"), file(20, 4), file(30, 2)].concat()),
        ]
        .concat();

        let members = parse_index(&index)?;
        assert_eq!(members.len(), 2);
        assert_eq!(
            members["a.txt"].segments,
            vec![
                Segment { offset: 20, length: 4 },
                Segment { offset: 30, length: 2 },
            ]
        );

        Ok(())
    }
}
