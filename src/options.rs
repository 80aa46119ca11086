//! Tuning knobs shared by every nesting level of a run.
//!
//! Nothing here is global: an [`Options`] value is built once (usually from
//! the command line) and a [`Context`] borrowing it is passed down through
//! the engine and the recursive minifier.

use std::num::NonZeroU64;

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Deepest nesting level whose payloads are still handed to the minifier.
    pub max_depth: u32,
    /// Move deflate entries as they are instead of recompressing them.
    pub fast: bool,
    /// Zopfli iteration count; higher is slower and usually smaller.
    pub iterations: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: u32::MAX,
            fast: false,
            iterations: 15,
        }
    }
}

impl Options {
    pub(crate) fn zopfli(&self) -> zopfli::Options {
        zopfli::Options {
            iteration_count: NonZeroU64::new(self.iterations).unwrap_or(NonZeroU64::MIN),
            ..Default::default()
        }
    }
}

/// Options plus the nesting level currently being processed.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub options: &'a Options,
    pub depth: u32,
}

impl<'a> Context<'a> {
    /// Context for a top-level file.
    pub fn new(options: &'a Options) -> Self {
        Self { options, depth: 0 }
    }

    /// The same run, one container level deeper.
    pub fn descend(&self) -> Self {
        Self {
            options: self.options,
            depth: self.depth.saturating_add(1),
        }
    }

    /// Whether payloads found at this level may be minified recursively.
    pub fn may_recurse(&self) -> bool {
        self.depth <= self.options.max_depth
    }
}
