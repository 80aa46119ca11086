//! Re-emitting the central directory after compaction.

use anyhow::Result;
use tracing::{debug, warn};

use super::structures::*;

/// Write a fresh central directory and EOCD at `write`.
///
/// `entries` must be in physical order with offsets already pointing at the
/// relocated local headers. File names are copied from those headers, not
/// from the old directory, which may have been overwritten by now. Flag bit
/// 3, extra fields, entry comments and the archive comment are all dropped.
///
/// Trailing entries are dropped if the directory would not fit in `buf`.
/// Returns the new archive length.
pub fn write_directory(
    buf: &mut [u8],
    entries: &mut Vec<CentralDirectoryEntry>,
    write: usize,
    base_offset: usize,
) -> Result<usize> {
    let record_len =
        |e: &CentralDirectoryEntry| CentralDirectoryEntry::SIZE + e.file_name_len as usize;
    let mut cd_size: usize = entries.iter().map(record_len).sum();
    while write + cd_size + EndOfCentralDirectory::SIZE > buf.len() {
        let Some(dropped) = entries.pop() else { break };
        warn!(
            "No room left for central directory, dropping entry at {:#x}",
            dropped.lfh_offset
        );
        cd_size -= record_len(&dropped);
    }

    let cd_offset = u32::try_from(write - base_offset)?;
    let mut pos = write;
    for entry in entries.iter_mut() {
        entry.flags &= !FLAG_DATA_DESCRIPTOR;
        entry.extra_field_len = 0;
        entry.comment_len = 0;
        entry.write_to(&mut buf[pos..])?;
        pos += CentralDirectoryEntry::SIZE;

        let name = base_offset + entry.lfh_offset as usize + LFH_SIZE;
        let name_len = entry.file_name_len as usize;
        buf.copy_within(name..name + name_len, pos);
        pos += name_len;
    }

    let count = u16::try_from(entries.len())?;
    let eocd = EndOfCentralDirectory {
        disk_number: 0,
        disk_with_cd: 0,
        disk_entries: count,
        total_entries: count,
        cd_size: u32::try_from(pos - write)?,
        cd_offset,
        comment_len: 0,
    };
    eocd.write_to(&mut buf[pos..])?;

    debug!(entries = count, cd_offset, cd_size = eocd.cd_size, "central directory written");
    Ok(pos + EndOfCentralDirectory::SIZE)
}
