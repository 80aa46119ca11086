//! Central directory parsing.
//!
//! The directory is read straight out of the in-memory archive. Reading is
//! forgiving: a truncated or partly garbled directory yields the entries
//! that could be parsed, and archives with leading stub bytes (self
//! extractors, scripts glued in front) are recovered by detecting a
//! constant offset between recorded and real positions.

use tracing::{debug, warn};

use super::structures::*;

/// Entries parsed from the central directory, plus where the archive
/// data really starts.
#[derive(Debug, Clone, Default)]
pub struct CentralDirectory {
    /// Parsed entries, sorted by local header offset.
    pub entries: Vec<CentralDirectoryEntry>,
    /// Offset of the first local file header; everything before it is
    /// preserved verbatim.
    pub zip_offset: usize,
    /// Correction added to every offset recorded in the archive.
    pub base_offset: usize,
}

/// Offset of the first local file header signature before `limit`.
///
/// Returns `limit` when there is none.
pub fn first_local_header(buf: &[u8], limit: usize) -> usize {
    let limit = limit.min(buf.len());
    buf[..limit]
        .windows(LFH_SIGNATURE.len())
        .position(|w| w == LFH_SIGNATURE)
        .unwrap_or(limit)
}

/// Parse the central directory described by `eocd`.
///
/// `cd_end` is the unadjusted end of the directory as returned by
/// [`validate`](super::locator::validate). At most `eocd.disk_entries`
/// entries are returned; fewer if the directory is truncated or a record
/// signature does not match.
pub fn read_central_directory(
    buf: &[u8],
    eocd: &EndOfCentralDirectory,
    cd_end: usize,
) -> CentralDirectory {
    let zip_offset = first_local_header(buf, eocd.cd_offset as usize);
    let mut base_offset = 0;
    let mut cd_end = cd_end;

    let mut entries = Vec::with_capacity(eocd.disk_entries as usize);
    let mut pos = eocd.cd_offset as usize;

    for i in 0..eocd.disk_entries as usize {
        if pos + CentralDirectoryEntry::SIZE > cd_end {
            warn!(
                "Central directory header {} passed end, all remaining headers ignored",
                i
            );
            break;
        }

        if !buf[pos..].starts_with(CentralDirectoryEntry::SIGNATURE) {
            // Offsets may be relative to the first local header rather than
            // to the start of the file.
            let shifted = pos + zip_offset;
            if i == 0
                && cd_end + zip_offset <= buf.len()
                && buf[shifted..].starts_with(CentralDirectoryEntry::SIGNATURE)
            {
                debug!(base_offset = zip_offset, "detected prepended data");
                base_offset = zip_offset;
                pos = shifted;
                cd_end += base_offset;
            } else {
                warn!(
                    "Central directory header magic mismatch at offset {:#x}",
                    pos
                );
                break;
            }
        }

        match CentralDirectoryEntry::from_bytes(&buf[pos..]) {
            Ok(entry) => {
                pos += entry.record_len();
                entries.push(entry);
            }
            Err(e) => {
                warn!("Central directory header {}: {}", i, e);
                break;
            }
        }
    }

    if pos != cd_end {
        warn!("Central directory size mismatch");
    }

    sort_entries(&mut entries);

    CentralDirectory {
        entries,
        zip_offset,
        base_offset,
    }
}

/// Order entries by where their data lives.
///
/// The sort is stable: entries sharing an offset keep directory order.
pub fn sort_entries(entries: &mut [CentralDirectoryEntry]) {
    entries.sort_by_key(|e| e.lfh_offset);
}
