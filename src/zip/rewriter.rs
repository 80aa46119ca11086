//! In-place compaction of a ZIP archive.
//!
//! Entries are walked in the order their data appears in the buffer. Each
//! local header and payload is moved down to a write cursor that never
//! overtakes the read position, with extra fields stripped and deflate
//! payloads recompressed on the way. The directory is rebuilt behind the
//! last entry.

use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;
use tracing::{debug, info, warn};

use super::compress::{self, Recompressed};
use super::locator::{find_eocd, validate};
use super::parser::read_central_directory;
use super::structures::*;
use super::writer::write_directory;
use crate::minify::Minifier;
use crate::options::Context;

/// Shrink the ZIP archive in `buf` and return its new length.
///
/// The result occupies `buf[..len]` and `len <= buf.len()`. Archives that
/// cannot be understood are left untouched and their full length returned.
/// `ctx` is the context of the level `buf` was found at; entries of this
/// archive live one level deeper.
pub fn shrink(buf: &mut [u8], ctx: &Context<'_>, minifier: &dyn Minifier) -> usize {
    let ctx = ctx.descend();

    if buf.len() > u32::MAX as usize {
        warn!("Archives larger than 4 GiB are not supported");
        return buf.len();
    }

    let (eocd, eocd_pos) = match find_eocd(buf) {
        Ok(found) => found,
        Err(e) => {
            warn!("{}", e);
            return buf.len();
        }
    };
    let cd_end = match validate(&eocd, eocd_pos) {
        Ok(cd_end) => cd_end,
        Err(e) => {
            warn!("{}", e);
            return buf.len();
        }
    };

    let directory = read_central_directory(buf, &eocd, cd_end);
    if directory.entries.is_empty() {
        warn!("No usable central directory entries");
        return buf.len();
    }
    debug!(
        entries = directory.entries.len(),
        base_offset = directory.base_offset,
        depth = ctx.depth,
        "compacting archive"
    );

    let mut rewriter = Rewriter {
        buf: &mut *buf,
        limit: eocd_pos,
        base_offset: directory.base_offset,
        write: directory.zip_offset,
        read_floor: directory.zip_offset,
        ctx,
        minifier,
    };

    let mut written = Vec::with_capacity(directory.entries.len());
    for entry in directory.entries {
        match rewriter.process(entry) {
            Step::Written(entry) => written.push(entry),
            Step::Skipped => {}
            Step::Stop => break,
        }
    }

    let write = rewriter.write;
    let base_offset = rewriter.base_offset;
    match write_directory(buf, &mut written, write, base_offset) {
        Ok(len) => len,
        Err(e) => {
            warn!("Failed to write central directory: {}", e);
            buf.len()
        }
    }
}

/// Outcome of processing one directory entry.
enum Step {
    /// Entry was compacted; its directory record now reflects the new layout.
    Written(CentralDirectoryEntry),
    /// Entry could not be located and is left out of the output.
    Skipped,
    /// The rest of the archive cannot be trusted.
    Stop,
}

struct Rewriter<'a, 'c> {
    buf: &'a mut [u8],
    /// Entry data must end before this offset (the EOCD record).
    limit: usize,
    base_offset: usize,
    /// Next free byte of the compacted archive.
    write: usize,
    /// End of the last entry read; earlier bytes may be overwritten.
    read_floor: usize,
    ctx: Context<'c>,
    minifier: &'a dyn Minifier,
}

impl Rewriter<'_, '_> {
    fn process(&mut self, mut entry: CentralDirectoryEntry) -> Step {
        let read = self.base_offset + entry.lfh_offset as usize;

        if read < self.read_floor {
            warn!(
                "Local header at {:#x} overlaps the previous entry, dropped",
                entry.lfh_offset
            );
            return Step::Skipped;
        }
        if read + LFH_SIZE > self.limit || !self.buf[read..].starts_with(LFH_SIGNATURE) {
            warn!("Invalid local header offset: {:#x}", entry.lfh_offset);
            return Step::Skipped;
        }

        // The payload follows the local header's own name; the directory's
        // length only governs the rewritten directory record.
        let local_name_len = LittleEndian::read_u16(&self.buf[read + 26..]);
        if local_name_len != entry.file_name_len {
            warn!("Filename length mismatch between local file header and central directory");
        }

        let header_size = LFH_SIZE + local_name_len as usize;
        if read + header_size > self.limit {
            warn!("Reached EOF in local header");
            return Step::Stop;
        }

        let new_offset = (self.write - self.base_offset) as u32;
        let write = self.write;
        self.buf.copy_within(read..read + header_size, write);

        let Ok(mut header) = LocalHeaderMut::new(&mut self.buf[write..write + header_size]) else {
            return Step::Skipped;
        };
        let extra_len = header.extra_field_len() as usize;
        header.set_extra_field_len(0);

        let flags = header.flags();
        if flags & FLAG_DATA_DESCRIPTOR != 0 {
            header.set_flags(flags & !FLAG_DATA_DESCRIPTOR);
            header.set_crc32(entry.crc32);
            header.set_compressed_size(entry.compressed_size);
            header.set_uncompressed_size(entry.uncompressed_size);
        }
        let method = CompressionMethod::from_u16(header.compression_method());
        let compressed_size = header.compressed_size() as usize;

        let data_start = read + header_size + extra_len;
        let data_end = data_start + compressed_size;
        if data_end > self.limit {
            warn!("Compressed size too large");
            return Step::Stop;
        }

        let name_start = write + LFH_SIZE;
        let name =
            String::from_utf8_lossy(&self.buf[name_start..write + header_size]).into_owned();
        let has_content = compressed_size != 0
            || method != CompressionMethod::Stored
            || flags & FLAG_DATA_DESCRIPTOR != 0;
        if has_content && self.ctx.may_recurse() {
            let indent = "  ".repeat(self.ctx.depth.saturating_sub(1) as usize);
            info!("{}{}", indent, name);
        }

        let dest = write + header_size;
        let encrypted = flags & FLAG_ENCRYPTED != 0;
        let payload_len = if method != CompressionMethod::Deflate
            || encrypted
            || self.ctx.options.fast
        {
            self.buf.copy_within(data_start..data_end, dest);
            if method == CompressionMethod::Stored
                && !encrypted
                && self.ctx.may_recurse()
                && compressed_size > 0
            {
                let payload = &mut self.buf[dest..dest + compressed_size];
                let len = self.minifier.minify(payload, &name, &self.ctx).min(compressed_size);
                let crc = crc32fast::hash(&payload[..len]);
                let stored = len as u32;
                self.set_payload(write, &mut entry, CompressionMethod::Stored, crc, stored, stored);
                len
            } else {
                compressed_size
            }
        } else {
            self.recompress(write, dest, &mut entry, data_start..data_end, &name)
        };

        entry.lfh_offset = new_offset;
        self.write = dest + payload_len;
        self.read_floor = data_end;
        Step::Written(entry)
    }

    /// Deflate path; returns the length of the payload written at `dest`.
    ///
    /// The crc and size to verify against are taken from the already
    /// relocated header at `header_at`.
    fn recompress(
        &mut self,
        header_at: usize,
        dest: usize,
        entry: &mut CentralDirectoryEntry,
        source: Range<usize>,
        name: &str,
    ) -> usize {
        let header = &self.buf[header_at..];
        let crc32 = LittleEndian::read_u32(&header[14..]);
        let uncompressed_size = LittleEndian::read_u32(&header[22..]);

        let outcome = compress::recompress(
            &self.buf[source.clone()],
            crc32,
            uncompressed_size,
            name,
            &self.ctx,
            self.minifier,
        );

        match outcome {
            Recompressed::Empty => {
                self.set_payload(header_at, entry, CompressionMethod::Stored, 0, 0, 0);
                0
            }
            Recompressed::Original => {
                let len = source.len();
                self.buf.copy_within(source, dest);
                len
            }
            Recompressed::Stored { data, crc32 } => {
                self.buf[dest..dest + data.len()].copy_from_slice(&data);
                let len = data.len() as u32;
                self.set_payload(header_at, entry, CompressionMethod::Stored, crc32, len, len);
                data.len()
            }
            Recompressed::Deflated {
                data,
                crc32,
                uncompressed_size,
            } => {
                self.buf[dest..dest + data.len()].copy_from_slice(&data);
                let len = data.len() as u32;
                self.set_payload(
                    header_at,
                    entry,
                    CompressionMethod::Deflate,
                    crc32,
                    len,
                    uncompressed_size,
                );
                data.len()
            }
        }
    }

    /// Record a new payload on both the local header and the directory entry.
    ///
    /// Payloads never outgrow the original entry, so sizes always fit u32.
    fn set_payload(
        &mut self,
        header_at: usize,
        entry: &mut CentralDirectoryEntry,
        method: CompressionMethod,
        crc32: u32,
        compressed: u32,
        uncompressed: u32,
    ) {
        let method = method.as_u16();
        entry.compression_method = method;
        entry.crc32 = crc32;
        entry.compressed_size = compressed;
        entry.uncompressed_size = uncompressed;
        if let Ok(mut header) = LocalHeaderMut::new(&mut self.buf[header_at..]) {
            header.set_payload(method, crc32, compressed, uncompressed);
        }
    }
}
