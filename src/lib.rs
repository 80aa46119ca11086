//! # zipshrink
//!
//! Losslessly shrink ZIP-family archives (zip, jar, apk, docx, epub, ...).
//!
//! The archive is rewritten in place inside a single in-memory buffer:
//! entries are compacted towards the start, extra fields and comments are
//! dropped, and deflate entries are recompressed with zopfli whenever that
//! is smaller. Nested archives found inside entries are processed
//! recursively. Every entry extracts to exactly the same bytes as before.
//!
//! ## Features
//!
//! - Recovers archives with prepended stub data (self-extractors)
//! - Tolerates truncated central directories and bogus entries
//! - Resolves data descriptors from the central directory
//! - Falls back to storing entries that do not compress
//! - Leaves encrypted entries and unknown methods byte-identical
//!
//! ## Example
//!
//! ```no_run
//! use zipshrink::{Context, Dispatcher, Options, zip};
//!
//! let mut data = std::fs::read("archive.zip").unwrap();
//! let options = Options::default();
//! let len = zip::shrink(&mut data, &Context::new(&options), &Dispatcher);
//! data.truncate(len);
//! std::fs::write("archive.zip", &data).unwrap();
//! ```

pub mod cli;
pub mod io;
pub mod minify;
pub mod options;
pub mod zip;

pub use cli::Cli;
pub use io::{Report, collect_files, minify_bytes, minify_file};
pub use minify::{Dispatcher, Identity, Minifier};
pub use options::{Context, Options};
