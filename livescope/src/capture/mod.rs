//! Capture storage and ingestion
//!
//! - `timer_chain`: per-thread append-only block storage, lock-free reads
//! - `stats`: per-function count/total/min/max, updated per timer
//! - `listener`: the `CaptureListener` contract transports deliver through
//! - `capture_data`: one session's storage; implements `CaptureListener`
//! - `queries`: on-demand scans (min/max duration, next/previous call)

pub mod capture_data;
pub mod listener;
pub mod queries;
pub mod stats;
pub mod timer_chain;

pub use capture_data::{CaptureData, SessionInfo};
pub use listener::CaptureListener;
pub use queries::{MinMax, TimerLocation, TimerRef};
pub use stats::{FunctionStats, FunctionStatsTable};
pub use timer_chain::{Block, ChainWriter, TimerChain, DEFAULT_BLOCK_CAPACITY};

/// Storage tuning for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Timer records per block. Every chain allocates blocks of this size.
    pub block_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { block_capacity: DEFAULT_BLOCK_CAPACITY }
    }
}
