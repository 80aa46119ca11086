//! Recursive minification of payloads found inside archives.
//!
//! The ZIP engine does not know about other formats. Whenever it holds an
//! entry's plain content it asks a [`Minifier`] to shrink it; the
//! [`Dispatcher`] recognizes nested ZIP-family containers (jar, apk, docx,
//! another zip...) and feeds them back into the engine.

use std::path::Path;
use tracing::debug;

use crate::options::Context;
use crate::zip::{self, LFH_SIGNATURE};

/// Shrinks a byte buffer without changing what a reader of its format sees.
pub trait Minifier: Sync {
    /// Minify `data` in place and return its new length.
    ///
    /// The result occupies `data[..len]`; `len` must not exceed `data.len()`.
    /// `ctx` is the context of the level the payload was found at.
    ///
    /// There is no separate headroom argument: callers move the payload to
    /// its final place first, and a minified result never grows, so the
    /// slice itself is all the room a minifier gets.
    fn minify(&self, data: &mut [u8], name: &str, ctx: &Context<'_>) -> usize;
}

/// Leaves every payload as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Minifier for Identity {
    fn minify(&self, data: &mut [u8], _name: &str, _ctx: &Context<'_>) -> usize {
        data.len()
    }
}

/// Format detection by magic number or extension, recursing into archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dispatcher;

/// Extensions of formats that are ZIP archives underneath.
const ZIP_EXTENSIONS: &[&str] = &[
    "zip", "jar", "war", "ear", "aar", "apk", "ipa", "xpi", "crx", "epub", "docx", "xlsx",
    "pptx", "odt", "ods", "odp", "odg", "vsix", "nupkg", "whl", "kmz", "3mf",
];

impl Dispatcher {
    /// Returns true when `data` looks like a ZIP-family container.
    ///
    /// Archives with leading stub data do not start with a local header, so
    /// a known extension on `name` is accepted as well.
    pub fn is_zip(data: &[u8], name: &str) -> bool {
        if data.starts_with(LFH_SIGNATURE) {
            return true;
        }
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ZIP_EXTENSIONS.iter().any(|z| z.eq_ignore_ascii_case(ext)))
    }
}

impl Minifier for Dispatcher {
    fn minify(&self, data: &mut [u8], name: &str, ctx: &Context<'_>) -> usize {
        if Self::is_zip(data, name) {
            debug!(name, depth = ctx.depth, "zip archive");
            return zip::shrink(data, ctx, self);
        }
        data.len()
    }
}
