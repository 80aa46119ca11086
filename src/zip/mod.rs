//! ZIP archive compaction and recompression.
//!
//! This module shrinks ZIP-family archives held entirely in memory, without
//! changing the content any reader would extract from them.
//!
//! ## Architecture
//!
//! The pipeline runs strictly in this order:
//!
//! - [`locator`]: find the End of Central Directory (EOCD) and reject
//!   split/spanned archives or impossible directory bounds
//! - [`parser`]: read the central directory, detect prepended stub data,
//!   and sort entries by physical position
//! - [`rewriter`]: move every local header and payload down to a write
//!   cursor, stripping extra fields and clearing data descriptors
//! - [`compress`]: per-entry choice between stored, original deflate and a
//!   zopfli re-encode
//! - [`writer`]: emit a fresh central directory and EOCD
//!
//! Any stage can give up. Archive-level problems leave the buffer untouched;
//! entry-level problems keep or drop that one entry.
//!
//! ## Output layout
//!
//! 1. Everything before the first local header (e.g. a self-extractor stub)
//! 2. Local file headers without extra fields, each followed by its payload
//! 3. Central directory with no extra fields or comments
//! 4. EOCD record without archive comment
//!
//! ## Limitations
//!
//! - No ZIP64 support
//! - No multi-disk archive support
//! - Encrypted entries and methods other than STORED/DEFLATE are only moved

mod compress;
mod locator;
mod parser;
mod rewriter;
mod structures;
mod writer;

pub use compress::{Choice, Recompressed, choose, deflate, inflate, recompress};
pub use locator::{find_eocd, validate};
pub use parser::{CentralDirectory, first_local_header, read_central_directory, sort_entries};
pub use rewriter::shrink;
pub use structures::*;
pub use writer::write_directory;
