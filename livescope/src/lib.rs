//! # livescope - Live Capture Storage and Function Statistics
//!
//! livescope is the in-memory core of a live function-timing profiler. A
//! capture transport streams completed function calls (timers) and lookup
//! data while a capture runs; livescope stores them per thread, keeps
//! per-function statistics current, and serves a sortable, filterable
//! functions table that refreshes while data keeps arriving.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Capture Transport                           │
//! │         (live process tracing, or a replayed capture file)      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ CaptureEvent (timers, strings, stacks, ...)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 livescope (This Crate)                          │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Replay    │──▶│ CaptureData  │◀──│    Live      │         │
//! │  │ (JSON Lines) │   │  (listener)  │   │  Functions   │         │
//! │  └──────────────┘   └──────┬───────┘   │    View      │         │
//! │                            │           └──────┬───────┘         │
//! │              ┌─────────────┴──────┐           │                 │
//! │              ▼                    ▼           ▼                 │
//! │       ┌──────────────┐   ┌──────────────┐ ┌──────────────┐      │
//! │       │ Timer Chains │   │  Statistics  │ │  Data View   │      │
//! │       │ (per thread) │   │    Table     │ │ (filter/sort)│      │
//! │       └──────────────┘   └──────────────┘ └──────────────┘      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: storage and ingestion for one capture session
//!   - `timer_chain`: append-only block storage, one writer, lock-free readers
//!   - `stats`: per-function count/total/min/max
//!   - `capture_data`: the sink; implements [`capture::CaptureListener`]
//!   - `queries`: min/max duration and next/previous call scans
//!
//! - [`view`]: tabular presentation
//!   - `data_view`: generic filter (AND of tokens) and stable sort over rows
//!   - `live_functions`: the live functions table with Idle/Live states
//!
//! - [`replay`]: JSON Lines capture files and the threads that replay them
//!
//! - [`cli`]: command-line argument parsing
//!
//! - [`domain`]: newtypes (Tid, `FunctionAddress`, Duration) and error enums
//!
//! ## Threading Model
//!
//! One ingestion thread writes; any number of threads read. Reads never wait
//! for the producer except while it pushes a new block or touches the same
//! statistics shard. The owner of a [`view::LiveFunctionsView`] calls
//! `on_timer()` periodically (every [`view::UPDATE_PERIOD`]) to re-sort.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Replay a capture and print the functions with the most calls
//! ./livescope capture.jsonl
//!
//! # Replay at recorded speed, refreshing a table ranked by total time
//! ./livescope capture.jsonl --speed 1 --headless --sort total
//! ```
//!
//! ## Key Concepts
//!
//! - **Timer**: one completed call of an instrumented function on one thread
//! - **Block**: fixed-capacity array of timers; sealed when full, never moves
//! - **Module bias**: load offset added to a function's address in its module

pub mod capture;
pub mod cli;
pub mod domain;
pub mod replay;
pub mod view;
