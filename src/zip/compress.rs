//! Recompression of deflate entries.
//!
//! An entry is inflated, checked against the directory's crc and size,
//! handed to the recursive minifier, and deflated again with zopfli. The
//! smallest of stored, new deflate and original deflate wins.

use anyhow::{Result, anyhow};
use flate2::read::DeflateDecoder;
use std::io::Read;
use tracing::{debug, warn};

use crate::minify::Minifier;
use crate::options::Context;

/// Representation chosen for an entry's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recompressed {
    /// Nothing to compress; store zero bytes.
    Empty,
    /// Keep the original compressed bytes untouched.
    Original,
    /// Store the (possibly minified) content uncompressed.
    Stored { data: Vec<u8>, crc32: u32 },
    /// Use a new, smaller deflate stream.
    Deflated {
        data: Vec<u8>,
        crc32: u32,
        uncompressed_size: u32,
    },
}

/// Which of the three candidates to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Store,
    NewDeflate,
    Original,
}

/// Pick the smallest representation.
///
/// Store wins when the plain content is no larger than either deflate
/// stream, then the new stream if it is strictly smaller than the
/// original, otherwise the original.
pub fn choose(uncompressed: usize, new_compressed: usize, orig_compressed: usize) -> Choice {
    if uncompressed <= new_compressed && uncompressed <= orig_compressed {
        Choice::Store
    } else if new_compressed < orig_compressed {
        Choice::NewDeflate
    } else {
        Choice::Original
    }
}

/// Inflate a raw deflate stream, reading at most `limit` bytes of output.
///
/// `limit` comes from an untrusted header, so it only caps the output; the
/// initial allocation is sized from the input.
pub fn inflate(compressed: &[u8], limit: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(limit.min(compressed.len().saturating_mul(4)));
    DeflateDecoder::new(compressed)
        .take(limit as u64)
        .read_to_end(&mut out)?;
    Ok(out)
}

/// Deflate `data` with zopfli.
pub fn deflate(data: &[u8], ctx: &Context<'_>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    zopfli::compress(ctx.options.zopfli(), zopfli::Format::Deflate, data, &mut out)
        .map_err(|e| anyhow!("zopfli: {:?}", e))?;
    Ok(out)
}

/// Recompress one deflate entry.
///
/// `crc32` and `uncompressed_size` are the values the content must match
/// after inflating; on any mismatch the original bytes are kept.
pub fn recompress(
    compressed: &[u8],
    crc32: u32,
    uncompressed_size: u32,
    name: &str,
    ctx: &Context<'_>,
    minifier: &dyn Minifier,
) -> Recompressed {
    if uncompressed_size == 0 {
        return Recompressed::Empty;
    }

    let expected = uncompressed_size as usize;
    let mut content = match inflate(compressed, expected + 1) {
        Ok(content) if content.len() == expected && crc32fast::hash(&content) == crc32 => content,
        Ok(_) => {
            warn!("{}: size or CRC32 mismatch, skipping this file", name);
            return Recompressed::Original;
        }
        Err(e) => {
            warn!("{}: decompression failed ({}), skipping this file", name, e);
            return Recompressed::Original;
        }
    };

    if ctx.may_recurse() {
        let len = minifier.minify(&mut content, name, ctx).min(expected);
        content.truncate(len);
    }

    let deflated = match deflate(&content, ctx) {
        Ok(deflated) => deflated,
        Err(e) => {
            warn!("{}: recompression failed ({})", name, e);
            return Recompressed::Original;
        }
    };

    debug!(
        name,
        original = compressed.len(),
        zopfli = deflated.len(),
        plain = content.len(),
        "recompressed"
    );

    // Both candidates are bounded by the original entry, so they fit u32.
    match choose(content.len(), deflated.len(), compressed.len()) {
        Choice::Store => Recompressed::Stored {
            crc32: crc32fast::hash(&content),
            data: content,
        },
        Choice::NewDeflate => Recompressed::Deflated {
            crc32: crc32fast::hash(&content),
            uncompressed_size: content.len() as u32,
            data: deflated,
        },
        Choice::Original => Recompressed::Original,
    }
}
