//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;
use tracklink_core::SearchConfig;

/// Find YouTube and 4shared links for every track in a playlist CSV.
#[derive(Parser, Debug, Clone)]
#[command(name = "tracklink")]
#[command(version)]
pub struct Cli {
    /// Playlist CSV (Exportify export or "Música,Artista" columns)
    pub input: PathBuf,

    /// Directory for the result files (defaults to the input's directory)
    #[arg(short, long, env = "TRACKLINK_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Seconds each worker waits between lookups (0.1-10)
    #[arg(long)]
    pub delay: Option<f64>,

    /// Attempts per track for network errors (1-10)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Parallel workers (1-3)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Config file to use instead of the default location
    #[arg(long, env = "TRACKLINK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Apply flags on top of file and environment settings.
    pub fn apply_overrides(&self, search: &mut SearchConfig) {
        if let Some(delay) = self.delay {
            search.delay_secs = delay;
        }
        if let Some(max_retries) = self.max_retries {
            search.max_retries = max_retries;
        }
        if let Some(concurrency) = self.concurrency {
            search.concurrency = concurrency;
        }
    }

    /// Base name for result files: `<stem>_with_links`.
    #[must_use]
    pub fn output_stem(&self) -> String {
        let stem = self
            .input
            .file_stem()
            .map_or_else(|| "playlist".into(), |s| s.to_string_lossy().into_owned());
        format!("{stem}_with_links")
    }

    /// Where result files go.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| {
            self.input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
        })
    }
}
