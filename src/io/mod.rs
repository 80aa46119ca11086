//! Loading files from disk and writing the minified result back.

mod local;

pub use local::{Report, collect_files, minify_bytes, minify_file};
