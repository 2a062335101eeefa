//! # Shared Data Structures (Capture Transport ↔ Live Core)
//!
//! Defines the records a capture transport delivers into the live core. The
//! transport (process attachment, tracing, symbol lookup) lives outside this
//! workspace; everything it hands over is expressed with the types below.
//!
//! ## Key Types
//!
//! - [`TimerRecord`] - One completed function call measured on one thread
//! - [`CallStack`] - Resolved call stack, keyed by a content hash
//! - [`CallstackEvent`] - A sample associating a thread and time with a call stack
//! - [`AddressInfo`] - An address resolved to a symbol by the transport
//! - [`FunctionInfo`] - A function selected for instrumentation
//! - [`CaptureEvent`] - Closed set of everything the transport may deliver
//!
//! With the `serde` feature every type derives `Serialize`/`Deserialize`, and
//! [`CaptureEvent`] uses an internally tagged `"type"` field so a capture can be
//! stored as JSON Lines.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Timers
// ============================================================================

/// One completed function-call timing measurement.
///
/// Immutable once written into a timer chain. Addresses are absolute (already
/// relocated by the module's load bias).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerRecord {
    /// Absolute address of the instrumented function
    pub function_address: u64,

    /// Thread that executed the call
    pub thread_id: i32,

    /// Entry timestamp in nanoseconds (monotonic clock)
    pub start_ns: u64,

    /// Exit timestamp in nanoseconds (monotonic clock)
    pub end_ns: u64,
}

impl TimerRecord {
    #[must_use]
    pub fn new(function_address: u64, thread_id: i32, start_ns: u64, end_ns: u64) -> Self {
        Self { function_address, thread_id, start_ns, end_ns }
    }

    /// Elapsed time, or `None` when the record ends before it starts.
    #[must_use]
    pub fn elapsed_ns(&self) -> Option<u64> {
        self.end_ns.checked_sub(self.start_ns)
    }
}

// ============================================================================
// Call stacks
// ============================================================================

/// Fully resolved call stack (innermost frame first), keyed by a content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CallStack {
    pub hash: u64,
    pub frames: Vec<u64>,
}

impl CallStack {
    /// Build a call stack and derive its key from the frame addresses.
    #[must_use]
    pub fn new(frames: Vec<u64>) -> Self {
        let hash = Self::hash_frames(&frames);
        Self { hash, frames }
    }

    /// Content hash used as the call stack key.
    ///
    /// Uses `DefaultHasher::new()`, which is keyed with fixed zero keys, so the
    /// same frames always produce the same key within one build.
    #[must_use]
    pub fn hash_frames(frames: &[u64]) -> u64 {
        let mut hasher = DefaultHasher::new();
        frames.hash(&mut hasher);
        hasher.finish()
    }
}

/// A sampled call stack observed on a thread at a point in time.
///
/// `callstack_hash` is an opaque reference: it may name a call stack that has
/// not been delivered yet, or never will be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CallstackEvent {
    pub time_ns: u64,
    pub callstack_hash: u64,
    pub thread_id: i32,
}

// ============================================================================
// Symbols
// ============================================================================

/// An absolute address resolved to a symbol by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AddressInfo {
    pub absolute_address: u64,
    pub function_name: String,
    pub offset_in_function: u64,
    pub module_path: String,
}

/// A function selected for instrumentation in a capture.
///
/// `address` is relative to the module; the capture's load bias for
/// `module_path` turns it into the absolute address timers refer to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionInfo {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pretty_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub module_path: String,
    pub address: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub size: u64,
    /// Set for the profiler's own instrumentation entry points, which are
    /// hooked as part of every capture but are not user functions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub instrumentation: bool,
}

impl FunctionInfo {
    /// Demangled name when known, raw name otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.pretty_name.is_empty() {
            &self.name
        } else {
            &self.pretty_name
        }
    }

    /// File name of `module_path` (the part after the last `/`).
    #[must_use]
    pub fn module_name(&self) -> &str {
        self.module_path.rsplit('/').next().unwrap_or(&self.module_path)
    }
}

// ============================================================================
// Event variant
// ============================================================================

/// Every kind of event a capture transport delivers.
///
/// No ordering is required between kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum CaptureEvent {
    Timer(TimerRecord),
    KeyAndString { key: u64, string: String },
    Callstack(CallStack),
    CallstackEvent(CallstackEvent),
    ThreadName { thread_id: i32, name: String },
    AddressInfo(AddressInfo),
}
