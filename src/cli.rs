use clap::Parser;
use std::path::PathBuf;

use crate::options::Options;

#[derive(Parser, Debug)]
#[command(name = "zipshrink")]
#[command(version)]
#[command(about = "Losslessly shrink ZIP-family archives in place", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipshrink app.apk                 recompress every entry of app.apk\n  \
  zipshrink -i 50 dist/             try harder on all files below dist/\n  \
  zipshrink -f -d 1 bundle.jar      only compact, no recompression or recursion")]
pub struct Cli {
    /// Files or directories to process
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Zopfli iteration count
    #[arg(short = 'i', long, value_name = "N", default_value_t = 15)]
    pub iterations: u64,

    /// Maximum nesting depth whose payloads are minified
    #[arg(short = 'd', long, value_name = "DEPTH")]
    pub max_depth: Option<u32>,

    /// Fast mode: move deflate entries without recompressing them
    #[arg(short = 'f', long)]
    pub fast: bool,

    /// Number of files processed concurrently
    #[arg(short = 'p', long, value_name = "JOBS", default_value_t = 1)]
    pub parallel: usize,

    /// Quiet mode, only report errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode, report pipeline details
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn options(&self) -> Options {
        Options {
            max_depth: self.max_depth.unwrap_or(u32::MAX),
            fast: self.fast,
            iterations: self.iterations,
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
