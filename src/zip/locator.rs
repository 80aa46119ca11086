//! Finding and sanity-checking the End of Central Directory record.

use anyhow::{Result, bail};

use super::structures::EndOfCentralDirectory;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Locate the EOCD record and parse it.
///
/// Searches backwards through the last `65535 + 4` bytes of `buf` for the
/// last occurrence of the signature. Returns the record and its offset.
///
/// # Errors
///
/// Fails if there is no signature in the window or if the record found
/// would run past the end of the buffer.
pub fn find_eocd(buf: &[u8]) -> Result<(EndOfCentralDirectory, usize)> {
    let signature = EndOfCentralDirectory::SIGNATURE;
    let search_start = buf
        .len()
        .saturating_sub(MAX_COMMENT_SIZE + signature.len());

    let Some(pos) = buf[search_start..]
        .windows(signature.len())
        .rposition(|w| w == signature)
        .map(|i| search_start + i)
    else {
        bail!("EOCD not found");
    };

    if pos + EndOfCentralDirectory::SIZE > buf.len() {
        bail!("EOF inside EOCD at offset {:#x}", pos);
    }

    let eocd = EndOfCentralDirectory::from_bytes(&buf[pos..])?;
    Ok((eocd, pos))
}

/// Reject archive layouts the rewriter cannot handle.
///
/// Returns the (unadjusted) end offset of the central directory.
pub fn validate(eocd: &EndOfCentralDirectory, eocd_pos: usize) -> Result<usize> {
    if eocd.is_multi_disk() {
        bail!("Neither split nor spanned archives are supported");
    }

    let cd_end = eocd.cd_offset as usize + eocd.cd_size as usize;
    if cd_end > eocd_pos {
        bail!(
            "Central directory too large: ends at {:#x}, EOCD at {:#x}",
            cd_end,
            eocd_pos
        );
    }
    Ok(cd_end)
}
