//! Structured error types for livescope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{FunctionAddress, Tid};
use thiserror::Error;

/// Failures on the ingestion (producer) path.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The record ends before it starts. It is dropped and never reaches the
    /// timer chains or the statistics table.
    #[error("Malformed timer for {function} on {tid}: end {end_ns} < start {start_ns}")]
    MalformedTimer { function: FunctionAddress, tid: Tid, start_ns: u64, end_ns: u64 },

    /// A new block could not be allocated. Fatal to the capture.
    #[error("Failed to allocate a {capacity}-record block for {tid}")]
    BlockAllocation { tid: Tid, capacity: usize },

    /// A previous block allocation failure aborted the capture.
    #[error("Capture aborted; timer ingestion is disabled")]
    CaptureAborted,
}

impl IngestError {
    /// True for errors that end the capture session.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IngestError::MalformedTimer { .. })
    }
}

/// Failures while loading a capture file.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to parse capture line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Capture file has no session header")]
    MissingSession,

    #[error("Second session header at line {0}")]
    DuplicateSession(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures at the string boundary of the view layer.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}
