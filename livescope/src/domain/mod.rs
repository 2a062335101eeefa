//! Shared vocabulary for capture storage and views
//!
//! - `types`: thread ids, function addresses and nanosecond durations, each
//!   with the display form the functions table uses
//! - `errors`: ingestion, replay and view failures

pub mod errors;
pub mod types;

pub use types::{Duration, FunctionAddress, Tid};

pub use errors::{IngestError, ReplayError, ViewError};
