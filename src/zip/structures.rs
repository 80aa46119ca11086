use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use anyhow::{Result, bail};

/// General purpose flag: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 1 << 0;
/// General purpose flag: crc and sizes follow the payload in a data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Truncated End of Central Directory");
        }

        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory signature");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Encode the record (signature included) into the start of `out`.
    pub fn write_to(&self, out: &mut [u8]) -> Result<()> {
        if out.len() < Self::SIZE {
            bail!("No room for End of Central Directory");
        }
        out[0..4].copy_from_slice(Self::SIGNATURE);

        let mut cursor = Cursor::new(&mut out[4..Self::SIZE]);
        cursor.write_u16::<LittleEndian>(self.disk_number)?;
        cursor.write_u16::<LittleEndian>(self.disk_with_cd)?;
        cursor.write_u16::<LittleEndian>(self.disk_entries)?;
        cursor.write_u16::<LittleEndian>(self.total_entries)?;
        cursor.write_u32::<LittleEndian>(self.cd_size)?;
        cursor.write_u32::<LittleEndian>(self.cd_offset)?;
        cursor.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }

    /// Split and spanned archives record more than one disk.
    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus name, extra and comment.
///
/// Only the fixed part is kept; the name is always re-read from the
/// (possibly relocated) local header when the directory is written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
    pub comment_len: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u32,
}

impl CentralDirectoryEntry {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Truncated Central Directory File Header");
        }

        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid Central Directory File Header signature");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_len: cursor.read_u16::<LittleEndian>()?,
            extra_field_len: cursor.read_u16::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
            disk_number_start: cursor.read_u16::<LittleEndian>()?,
            internal_attrs: cursor.read_u16::<LittleEndian>()?,
            external_attrs: cursor.read_u32::<LittleEndian>()?,
            lfh_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Encode the fixed part (signature included) into the start of `out`.
    pub fn write_to(&self, out: &mut [u8]) -> Result<()> {
        if out.len() < Self::SIZE {
            bail!("No room for Central Directory File Header");
        }
        out[0..4].copy_from_slice(Self::SIGNATURE);

        let mut cursor = Cursor::new(&mut out[4..Self::SIZE]);
        cursor.write_u16::<LittleEndian>(self.version_made_by)?;
        cursor.write_u16::<LittleEndian>(self.version_needed)?;
        cursor.write_u16::<LittleEndian>(self.flags)?;
        cursor.write_u16::<LittleEndian>(self.compression_method)?;
        cursor.write_u16::<LittleEndian>(self.last_mod_time)?;
        cursor.write_u16::<LittleEndian>(self.last_mod_date)?;
        cursor.write_u32::<LittleEndian>(self.crc32)?;
        cursor.write_u32::<LittleEndian>(self.compressed_size)?;
        cursor.write_u32::<LittleEndian>(self.uncompressed_size)?;
        cursor.write_u16::<LittleEndian>(self.file_name_len)?;
        cursor.write_u16::<LittleEndian>(self.extra_field_len)?;
        cursor.write_u16::<LittleEndian>(self.comment_len)?;
        cursor.write_u16::<LittleEndian>(self.disk_number_start)?;
        cursor.write_u16::<LittleEndian>(self.internal_attrs)?;
        cursor.write_u32::<LittleEndian>(self.external_attrs)?;
        cursor.write_u32::<LittleEndian>(self.lfh_offset)?;
        Ok(())
    }

    /// Size of this record in the directory, including its variable tail.
    pub fn record_len(&self) -> usize {
        Self::SIZE
            + self.file_name_len as usize
            + self.extra_field_len as usize
            + self.comment_len as usize
    }

    pub fn method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.compression_method)
    }
}

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Mutable view over a local file header living inside the archive buffer.
///
/// Field accessors decode straight from the borrowed bytes; nothing is
/// copied out, so updates land in the archive as they are made.
pub struct LocalHeaderMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> LocalHeaderMut<'a> {
    const FLAGS: usize = 6;
    const METHOD: usize = 8;
    const CRC32: usize = 14;
    const COMPRESSED_SIZE: usize = 18;
    const UNCOMPRESSED_SIZE: usize = 22;
    const FILE_NAME_LEN: usize = 26;
    const EXTRA_FIELD_LEN: usize = 28;

    /// Wrap the header starting at `bytes[0]`.
    ///
    /// Fails if fewer than [`LFH_SIZE`] bytes remain or the signature is wrong.
    pub fn new(bytes: &'a mut [u8]) -> Result<Self> {
        if bytes.len() < LFH_SIZE {
            bail!("Truncated Local File Header");
        }
        if &bytes[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header signature");
        }
        Ok(Self { bytes })
    }

    pub fn flags(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[Self::FLAGS..])
    }

    pub fn set_flags(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.bytes[Self::FLAGS..], value);
    }

    pub fn compression_method(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[Self::METHOD..])
    }

    pub fn set_compression_method(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.bytes[Self::METHOD..], value);
    }

    pub fn crc32(&self) -> u32 {
        LittleEndian::read_u32(&self.bytes[Self::CRC32..])
    }

    pub fn set_crc32(&mut self, value: u32) {
        LittleEndian::write_u32(&mut self.bytes[Self::CRC32..], value);
    }

    pub fn compressed_size(&self) -> u32 {
        LittleEndian::read_u32(&self.bytes[Self::COMPRESSED_SIZE..])
    }

    pub fn set_compressed_size(&mut self, value: u32) {
        LittleEndian::write_u32(&mut self.bytes[Self::COMPRESSED_SIZE..], value);
    }

    pub fn uncompressed_size(&self) -> u32 {
        LittleEndian::read_u32(&self.bytes[Self::UNCOMPRESSED_SIZE..])
    }

    pub fn set_uncompressed_size(&mut self, value: u32) {
        LittleEndian::write_u32(&mut self.bytes[Self::UNCOMPRESSED_SIZE..], value);
    }

    pub fn file_name_len(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[Self::FILE_NAME_LEN..])
    }

    pub fn set_file_name_len(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.bytes[Self::FILE_NAME_LEN..], value);
    }

    pub fn extra_field_len(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[Self::EXTRA_FIELD_LEN..])
    }

    pub fn set_extra_field_len(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.bytes[Self::EXTRA_FIELD_LEN..], value);
    }

    /// Set method, crc and both sizes in one go.
    pub fn set_payload(&mut self, method: u16, crc32: u32, compressed: u32, uncompressed: u32) {
        self.set_compression_method(method);
        self.set_crc32(crc32);
        self.set_compressed_size(compressed);
        self.set_uncompressed_size(uncompressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CentralDirectoryEntry {
        CentralDirectoryEntry {
            version_made_by: 20,
            version_needed: 20,
            flags: FLAG_DATA_DESCRIPTOR,
            compression_method: 8,
            last_mod_time: 0x6000,
            last_mod_date: 0x5021,
            crc32: 0xDEADBEEF,
            compressed_size: 123,
            uncompressed_size: 456,
            file_name_len: 5,
            extra_field_len: 4,
            comment_len: 2,
            disk_number_start: 0,
            internal_attrs: 1,
            external_attrs: 0x81A40000,
            lfh_offset: 77,
        }
    }

    #[test]
    fn central_directory_entry_encodes_at_fixed_offsets() {
        let entry = sample_entry();
        let mut buf = [0u8; CentralDirectoryEntry::SIZE];
        entry.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], CentralDirectoryEntry::SIGNATURE);
        assert_eq!(LittleEndian::read_u32(&buf[16..]), 0xDEADBEEF);
        assert_eq!(LittleEndian::read_u16(&buf[28..]), 5);
        assert_eq!(LittleEndian::read_u32(&buf[42..]), 77);
        assert_eq!(CentralDirectoryEntry::from_bytes(&buf).unwrap(), entry);
        assert_eq!(entry.record_len(), 46 + 5 + 4 + 2);
    }

    #[test]
    fn short_or_mislabelled_records_are_rejected() {
        assert!(CentralDirectoryEntry::from_bytes(&[0u8; 45]).is_err());
        assert!(CentralDirectoryEntry::from_bytes(&[0u8; 46]).is_err());
        assert!(EndOfCentralDirectory::from_bytes(b"PK\x05\x06").is_err());

        let mut small = [0u8; 10];
        let eocd = EndOfCentralDirectory::from_bytes(&[
            0x50, 0x4B, 0x05, 0x06, 0, 0, 0, 0, 2, 0, 2, 0, 10, 0, 0, 0, 20, 0, 0, 0, 0, 0,
        ])
        .unwrap();
        assert!(eocd.write_to(&mut small).is_err());
    }

    #[test]
    fn multi_disk_detection() {
        let mut eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 3,
            total_entries: 3,
            cd_size: 0,
            cd_offset: 0,
            comment_len: 0,
        };
        assert!(!eocd.is_multi_disk());
        eocd.total_entries = 4;
        assert!(eocd.is_multi_disk());
        eocd.total_entries = 3;
        eocd.disk_number = 1;
        assert!(eocd.is_multi_disk());
    }

    #[test]
    fn local_header_view_edits_in_place() {
        let mut buf = vec![0u8; LFH_SIZE + 3];
        buf[0..4].copy_from_slice(LFH_SIGNATURE);
        buf[26] = 3;
        buf[28] = 9;

        let mut header = LocalHeaderMut::new(&mut buf).unwrap();
        assert_eq!(header.file_name_len(), 3);
        assert_eq!(header.extra_field_len(), 9);
        header.set_extra_field_len(0);
        header.set_payload(0, 0x01020304, 11, 12);
        header.set_flags(FLAG_DATA_DESCRIPTOR);

        assert_eq!(buf[28], 0);
        assert_eq!(&buf[14..18], &[4, 3, 2, 1]);
        assert_eq!(buf[18], 11);
        assert_eq!(buf[22], 12);
        assert_eq!(buf[6], 8);
    }

    #[test]
    fn local_header_view_requires_signature_and_length() {
        let mut short = [0x50, 0x4B, 0x03, 0x04, 0, 0];
        assert!(LocalHeaderMut::new(&mut short).is_err());
        let mut wrong = [0u8; LFH_SIZE];
        assert!(LocalHeaderMut::new(&mut wrong).is_err());
    }
}
