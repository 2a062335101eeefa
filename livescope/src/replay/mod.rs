//! Capture-file replay
//!
//! - `file`: JSON Lines capture format and loader
//! - `transport`: transport and ingestion threads feeding a `CaptureData`

pub mod file;
pub mod transport;

pub use file::CaptureFile;
pub use transport::{Replay, ReplayOptions, ReplaySummary, CHANNEL_CAPACITY};
