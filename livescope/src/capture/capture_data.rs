//! # Capture Data
//!
//! Everything recorded during one capture session, and the sink that fills it.
//!
//! ## Data Flow
//!
//! ```text
//! transport ──CaptureEvent──▶ CaptureData (CaptureListener)
//!                                 │
//!                                 ├── timer ──▶ ChainWriter (per thread) ──▶ TimerChain
//!                                 │        └──▶ FunctionStatsTable
//!                                 ├── string / callstack / address info ──▶ lookup tables
//!                                 └── callstack event / thread name ──────▶ lookup tables
//! ```
//!
//! A timer is appended to its chain before it is folded into the statistics,
//! so a record is never counted in the statistics without also being present
//! in a chain. Readers may briefly see a record in a chain that statistics do
//! not include yet.
//!
//! ## Lifetime
//!
//! A `CaptureData` is created when a capture starts and dropped as a whole
//! when the next capture starts or the session is cleared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use livescope_common::{AddressInfo, CallStack, CallstackEvent, FunctionInfo, TimerRecord};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::listener::CaptureListener;
use super::stats::{FunctionStats, FunctionStatsTable};
use super::timer_chain::{ChainWriter, TimerChain};
use super::CaptureConfig;
use crate::domain::{FunctionAddress, IngestError, Tid};

/// What is known about a capture before its first event arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub process_id: i32,
    /// Load bias per module path; absent modules have a bias of 0.
    #[serde(default)]
    pub module_biases: HashMap<String, u64>,
    /// Functions selected for instrumentation in this capture.
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
}

/// Storage and aggregates for one capture session.
pub struct CaptureData {
    session: SessionInfo,
    config: CaptureConfig,

    // Timer storage
    writers: DashMap<i32, ChainWriter>,
    chains: RwLock<Vec<Arc<TimerChain>>>,
    stats: FunctionStatsTable,

    // Lookup tables
    strings: DashMap<u64, String>,
    callstacks: DashMap<u64, CallStack>,
    callstack_events: RwLock<Vec<CallstackEvent>>,
    thread_names: DashMap<i32, String>,
    address_infos: DashMap<u64, AddressInfo>,

    // Ingestion counters
    timers_ingested: AtomicU64,
    timers_rejected: AtomicU64,
    aborted: AtomicBool,
}

impl CaptureData {
    #[must_use]
    pub fn new(session: SessionInfo, config: CaptureConfig) -> Self {
        Self {
            session,
            config,
            writers: DashMap::new(),
            chains: RwLock::new(Vec::new()),
            stats: FunctionStatsTable::new(),
            strings: DashMap::new(),
            callstacks: DashMap::new(),
            callstack_events: RwLock::new(Vec::new()),
            thread_names: DashMap::new(),
            address_infos: DashMap::new(),
            timers_ingested: AtomicU64::new(0),
            timers_rejected: AtomicU64::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn process_id(&self) -> i32 {
        self.session.process_id
    }

    /// Functions selected for instrumentation, in session order.
    #[must_use]
    pub fn selected_functions(&self) -> &[FunctionInfo] {
        &self.session.functions
    }

    /// Runtime address of a function: its module-relative address plus the
    /// module's load bias.
    #[must_use]
    pub fn absolute_address(&self, function: &FunctionInfo) -> u64 {
        let bias = self.session.module_biases.get(&function.module_path).copied().unwrap_or(0);
        function.address.wrapping_add(bias)
    }

    /// Statistics for a function, or the zero value if it was never called.
    #[must_use]
    pub fn function_stats_or_default(&self, function: &FunctionInfo) -> FunctionStats {
        self.stats.get(self.absolute_address(function))
    }

    #[must_use]
    pub fn function_stats(&self) -> &FunctionStatsTable {
        &self.stats
    }

    // -------------------------------------------------------------------------
    // Timer chains
    // -------------------------------------------------------------------------

    /// Snapshot of all chains, in the order their threads first reported a
    /// timer.
    #[must_use]
    pub fn timer_chains(&self) -> Vec<Arc<TimerChain>> {
        self.chains.read().clone()
    }

    #[must_use]
    pub fn timer_chain(&self, tid: Tid) -> Option<Arc<TimerChain>> {
        self.chains.read().iter().find(|c| c.tid() == tid).cloned()
    }

    fn new_chain(&self, tid: Tid) -> ChainWriter {
        let (chain, writer) = TimerChain::new(tid, self.config.block_capacity);
        self.chains.write().push(chain);
        debug!("Created timer chain for {tid}");
        writer
    }

    // -------------------------------------------------------------------------
    // Lookup tables
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn string(&self, key: u64) -> Option<String> {
        self.strings.get(&key).map(|s| s.clone())
    }

    #[must_use]
    pub fn callstack(&self, hash: u64) -> Option<CallStack> {
        self.callstacks.get(&hash).map(|c| c.clone())
    }

    /// Snapshot of call stack samples in arrival order.
    #[must_use]
    pub fn callstack_events(&self) -> Vec<CallstackEvent> {
        self.callstack_events.read().clone()
    }

    #[must_use]
    pub fn thread_name(&self, tid: Tid) -> Option<String> {
        self.thread_names.get(&tid.0).map(|n| n.clone())
    }

    #[must_use]
    pub fn address_info(&self, absolute_address: u64) -> Option<AddressInfo> {
        self.address_infos.get(&absolute_address).map(|a| a.clone())
    }

    // -------------------------------------------------------------------------
    // Counters
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn timers_ingested(&self) -> u64 {
        self.timers_ingested.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn timers_rejected(&self) -> u64 {
        self.timers_rejected.load(Ordering::Relaxed)
    }

    /// True once a block allocation failure has ended timer ingestion.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

impl CaptureListener for CaptureData {
    fn on_timer(&self, timer: TimerRecord) -> Result<(), IngestError> {
        if self.is_aborted() {
            return Err(IngestError::CaptureAborted);
        }

        let Some(duration_ns) = timer.elapsed_ns() else {
            self.timers_rejected.fetch_add(1, Ordering::Relaxed);
            let err = IngestError::MalformedTimer {
                function: FunctionAddress(timer.function_address),
                tid: Tid(timer.thread_id),
                start_ns: timer.start_ns,
                end_ns: timer.end_ns,
            };
            warn!("{err}; record dropped");
            return Err(err);
        };

        let appended = {
            let mut writer = self
                .writers
                .entry(timer.thread_id)
                .or_insert_with(|| self.new_chain(Tid(timer.thread_id)));
            writer.append(timer)
        };
        if let Err(err) = appended {
            self.aborted.store(true, Ordering::Release);
            warn!("{err}; aborting capture");
            return Err(err);
        }

        self.stats.update(timer.function_address, duration_ns);
        self.timers_ingested.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn on_key_and_string(&self, key: u64, string: String) {
        self.strings.insert(key, string);
    }

    fn on_callstack(&self, callstack: CallStack) {
        self.callstacks.insert(callstack.hash, callstack);
    }

    fn on_callstack_event(&self, event: CallstackEvent) {
        self.callstack_events.write().push(event);
    }

    fn on_thread_name(&self, thread_id: i32, name: String) {
        self.thread_names.insert(thread_id, name);
    }

    fn on_address_info(&self, address_info: AddressInfo) {
        self.address_infos.insert(address_info.absolute_address, address_info);
    }
}

impl std::fmt::Debug for CaptureData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureData")
            .field("process_id", &self.session.process_id)
            .field("chains", &self.chains.read().len())
            .field("timers_ingested", &self.timers_ingested())
            .field("timers_rejected", &self.timers_rejected())
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}
