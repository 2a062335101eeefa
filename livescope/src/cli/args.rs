//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::{CaptureConfig, DEFAULT_BLOCK_CAPACITY};
use crate::view::{LiveColumn, SortOrder, UPDATE_PERIOD_MS};

#[derive(Parser, Debug)]
#[command(
    name = "livescope",
    about = "Replay a function-timer capture into the live functions view",
    after_help = "\
EXAMPLES:
    livescope capture.jsonl                        Replay and print the busiest functions
    livescope capture.jsonl --sort total --top 20  Rank by total time
    livescope capture.jsonl --filter 'draw world'  Only functions matching every word
    livescope capture.jsonl --speed 1              Replay at recorded speed"
)]
pub struct Args {
    /// Capture file (JSON Lines: session header, then events)
    #[arg(value_name = "CAPTURE")]
    pub capture: PathBuf,

    /// Only show functions whose name contains every whitespace-separated word
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Sort column: name, count, total, avg, min, max, module, address
    #[arg(short, long, default_value = "count", value_parser = parse_column)]
    pub sort: LiveColumn,

    /// Sort ascending instead of the column's default order
    #[arg(long, conflicts_with = "descending")]
    pub ascending: bool,

    /// Sort descending instead of the column's default order
    #[arg(long)]
    pub descending: bool,

    /// Timer records per storage block
    #[arg(long, default_value_t = DEFAULT_BLOCK_CAPACITY, value_parser = positive)]
    pub block_capacity: usize,

    /// Re-sort interval in milliseconds
    #[arg(
        long,
        default_value_t = UPDATE_PERIOD_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub refresh_ms: u64,

    /// Stop after N seconds (0 = until the capture is exhausted)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Replay speed relative to the recorded timeline (omit for as fast as possible)
    #[arg(long, value_parser = positive_speed)]
    pub speed: Option<f64>,

    /// Rows to print
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Print the table on every refresh, not only at the end
    #[arg(long)]
    pub headless: bool,

    /// Report the fastest and slowest call of this function
    #[arg(long, value_name = "FUNCTION")]
    pub min_max: Option<String>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Explicit sort order, if one was requested.
    #[must_use]
    pub fn sort_order(&self) -> Option<SortOrder> {
        if self.ascending {
            Some(SortOrder::Ascending)
        } else if self.descending {
            Some(SortOrder::Descending)
        } else {
            None
        }
    }

    #[must_use]
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig { block_capacity: self.block_capacity }
    }

    #[must_use]
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

fn parse_column(s: &str) -> Result<LiveColumn, String> {
    s.parse().map_err(|e: crate::domain::ViewError| e.to_string())
}

fn positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be greater than 0".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn positive_speed(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(speed) if speed.is_finite() && speed > 0.0 => Ok(speed),
        Ok(_) => Err("must be a finite number greater than 0".to_owned()),
        Err(e) => Err(e.to_string()),
    }
}
