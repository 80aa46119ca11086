#![allow(dead_code)]

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};

use zipshrink::zip::{CentralDirectoryEntry, EndOfCentralDirectory, LFH_SIGNATURE};

pub const FLAG_ENCRYPTED: u16 = 1;
pub const FLAG_DATA_DESCRIPTOR: u16 = 8;

/// One entry to put in a test archive.
#[derive(Clone)]
pub struct Entry {
    pub name: String,
    pub method: u16,
    pub content: Vec<u8>,
    /// Payload as written; defaults to `content` stored or fast-deflated.
    pub payload: Vec<u8>,
    pub crc32: u32,
    pub flags: u16,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
}

impl Entry {
    pub fn stored(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            method: 0,
            content: content.to_vec(),
            payload: content.to_vec(),
            crc32: crc32fast::hash(content),
            flags: 0,
            extra: Vec::new(),
            comment: Vec::new(),
        }
    }

    pub fn deflated(name: &str, content: &[u8]) -> Self {
        Self {
            method: 8,
            payload: fast_deflate(content),
            ..Self::stored(name, content)
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_extra(mut self, extra: &[u8]) -> Self {
        self.extra = extra.to_vec();
        self
    }

    pub fn with_comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn with_crc(mut self, crc32: u32) -> Self {
        self.crc32 = crc32;
        self
    }
}

/// How to lay out a test archive.
#[derive(Default)]
pub struct Layout {
    /// Bytes glued in front of the archive.
    pub stub: Vec<u8>,
    /// Record offsets relative to the end of the stub instead of the file start.
    pub relative_offsets: bool,
    /// Emit the central directory in reverse physical order.
    pub reverse_directory: bool,
    pub archive_comment: Vec<u8>,
}

pub fn fast_deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Some kilobytes of text that fast deflate leaves room to improve on.
pub fn sample_text(seed: u32) -> Vec<u8> {
    (0..600u32)
        .flat_map(|i| {
            format!(
                "{} record {} value={} status={}\n",
                seed,
                i % 41,
                (i * 7919 + seed) % 113,
                ["ok", "retry", "failed"][(i % 3) as usize]
            )
            .into_bytes()
        })
        .collect()
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn build(entries: &[Entry]) -> Vec<u8> {
    build_with(entries, &Layout::default())
}

pub fn build_with(entries: &[Entry], layout: &Layout) -> Vec<u8> {
    let mut out = layout.stub.clone();
    let base = if layout.relative_offsets { layout.stub.len() } else { 0 };
    let mut offsets = Vec::new();

    for e in entries {
        offsets.push((out.len() - base) as u32);
        let descriptor = e.flags & FLAG_DATA_DESCRIPTOR != 0;
        out.extend_from_slice(LFH_SIGNATURE);
        put16(&mut out, 20);
        put16(&mut out, e.flags);
        put16(&mut out, e.method);
        put16(&mut out, 0x6000);
        put16(&mut out, 0x5021);
        if descriptor {
            put32(&mut out, 0);
            put32(&mut out, 0);
            put32(&mut out, 0);
        } else {
            put32(&mut out, e.crc32);
            put32(&mut out, e.payload.len() as u32);
            put32(&mut out, e.content.len() as u32);
        }
        put16(&mut out, e.name.len() as u16);
        put16(&mut out, e.extra.len() as u16);
        out.extend_from_slice(e.name.as_bytes());
        out.extend_from_slice(&e.extra);
        out.extend_from_slice(&e.payload);
        if descriptor {
            out.extend_from_slice(b"PK\x07\x08");
            put32(&mut out, e.crc32);
            put32(&mut out, e.payload.len() as u32);
            put32(&mut out, e.content.len() as u32);
        }
    }

    let cd_offset = (out.len() - base) as u32;
    let mut order: Vec<usize> = (0..entries.len()).collect();
    if layout.reverse_directory {
        order.reverse();
    }
    for i in order {
        let e = &entries[i];
        let record = CentralDirectoryEntry {
            version_made_by: 20,
            version_needed: 20,
            flags: e.flags,
            compression_method: e.method,
            last_mod_time: 0x6000,
            last_mod_date: 0x5021,
            crc32: e.crc32,
            compressed_size: e.payload.len() as u32,
            uncompressed_size: e.content.len() as u32,
            file_name_len: e.name.len() as u16,
            extra_field_len: e.extra.len() as u16,
            comment_len: e.comment.len() as u16,
            disk_number_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            lfh_offset: offsets[i],
        };
        let mut fixed = vec![0u8; CentralDirectoryEntry::SIZE];
        record.write_to(&mut fixed).unwrap();
        out.extend(fixed);
        out.extend_from_slice(e.name.as_bytes());
        out.extend_from_slice(&e.extra);
        out.extend_from_slice(&e.comment);
    }
    let cd_size = (out.len() - base) as u32 - cd_offset;

    let eocd = EndOfCentralDirectory {
        disk_number: 0,
        disk_with_cd: 0,
        disk_entries: entries.len() as u16,
        total_entries: entries.len() as u16,
        cd_size,
        cd_offset,
        comment_len: layout.archive_comment.len() as u16,
    };
    let mut tail = vec![0u8; EndOfCentralDirectory::SIZE];
    eocd.write_to(&mut tail).unwrap();
    out.extend(tail);
    out.extend_from_slice(&layout.archive_comment);
    out
}

/// An entry as found in a rewritten archive.
#[derive(Debug)]
pub struct Extracted {
    /// Name as recorded in the central directory.
    pub name: String,
    /// Name as recorded in the local header.
    pub local_name: String,
    pub record: CentralDirectoryEntry,
    /// Local header bytes (fixed part).
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
    pub content: Vec<u8>,
}

impl Extracted {
    pub fn header_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.header[at], self.header[at + 1]])
    }

    pub fn header_u32(&self, at: usize) -> u32 {
        u32::from_le_bytes(self.header[at..at + 4].try_into().unwrap())
    }
}

/// Read back an archive produced by the engine: no archive comment, so the
/// EOCD is the last 22 bytes. `base` is the stub length for relative offsets.
pub fn read_archive(data: &[u8], base: usize) -> (EndOfCentralDirectory, Vec<Extracted>) {
    let eocd_pos = data.len() - EndOfCentralDirectory::SIZE;
    let eocd = EndOfCentralDirectory::from_bytes(&data[eocd_pos..]).unwrap();
    assert_eq!(eocd.comment_len, 0);
    assert_eq!(
        base + eocd.cd_offset as usize + eocd.cd_size as usize,
        eocd_pos,
        "directory must end at the EOCD"
    );

    let mut pos = base + eocd.cd_offset as usize;
    let mut entries = Vec::new();
    for _ in 0..eocd.total_entries {
        let record = CentralDirectoryEntry::from_bytes(&data[pos..]).unwrap();
        let name_start = pos + CentralDirectoryEntry::SIZE;
        let name = String::from_utf8_lossy(
            &data[name_start..name_start + record.file_name_len as usize],
        )
        .into_owned();
        pos += record.record_len();

        let lfh = base + record.lfh_offset as usize;
        assert_eq!(&data[lfh..lfh + 4], LFH_SIGNATURE);
        let header = data[lfh..lfh + 30].to_vec();
        let name_len = u16::from_le_bytes([header[26], header[27]]) as usize;
        let extra_len = u16::from_le_bytes([header[28], header[29]]) as usize;
        let local_name =
            String::from_utf8_lossy(&data[lfh + 30..lfh + 30 + name_len]).into_owned();
        let start = lfh + 30 + name_len + extra_len;
        let payload = data[start..start + record.compressed_size as usize].to_vec();
        let content = match record.compression_method {
            0 => payload.clone(),
            8 => inflate(&payload),
            _ => payload.clone(),
        };

        entries.push(Extracted {
            name,
            local_name,
            record,
            header,
            payload,
            content,
        });
    }
    assert_eq!(pos, eocd_pos);
    (eocd, entries)
}

pub fn shrink(data: &mut Vec<u8>, options: &zipshrink::Options) -> usize {
    let ctx = zipshrink::Context::new(options);
    let len = zipshrink::zip::shrink(data, &ctx, &zipshrink::Dispatcher);
    assert!(len <= data.len());
    data.truncate(len);
    len
}

pub fn quick_options() -> zipshrink::Options {
    zipshrink::Options {
        iterations: 3,
        ..Default::default()
    }
}
