//! Per-function timing statistics, updated as timers stream in.
//!
//! Adapted from the streaming hotspot aggregator: instead of re-scanning all
//! timers on every refresh, each ingested timer folds into its function's
//! entry in O(1).
//!
//! # Consistency
//!
//! Entries live in a `DashMap` keyed by absolute function address. An update
//! holds the entry's shard lock for the whole transition, and reads copy the
//! entry out under the same lock, so a reader sees either the state before an
//! update or after it, never a mix of fields. Updates and reads on functions in
//! other shards proceed in parallel.

use dashmap::DashMap;

/// Aggregate timing for one function.
///
/// `FunctionStats::default()` is the "no data" value returned for functions
/// that have never been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionStats {
    pub count: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

impl FunctionStats {
    /// Fold one call's duration in.
    pub fn record(&mut self, duration_ns: u64) {
        if self.count == 0 {
            self.min_ns = duration_ns;
            self.max_ns = duration_ns;
        } else {
            self.min_ns = self.min_ns.min(duration_ns);
            self.max_ns = self.max_ns.max(duration_ns);
        }
        self.count += 1;
        self.total_ns = self.total_ns.saturating_add(duration_ns);
    }

    /// `total_ns / count`, or 0 with no calls.
    #[must_use]
    pub fn average_ns(&self) -> u64 {
        self.total_ns.checked_div(self.count).unwrap_or(0)
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Statistics for every function seen in a capture.
#[derive(Debug, Default)]
pub struct FunctionStatsTable {
    functions: DashMap<u64, FunctionStats>,
}

impl FunctionStatsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call of `function_address` lasting `duration_ns`.
    pub fn update(&self, function_address: u64, duration_ns: u64) {
        self.functions.entry(function_address).or_default().record(duration_ns);
    }

    /// Current snapshot, or the zero value for an unseen function.
    #[must_use]
    pub fn get(&self, function_address: u64) -> FunctionStats {
        self.functions.get(&function_address).map(|s| *s).unwrap_or_default()
    }

    /// Number of distinct functions observed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Copy every entry out, sorted by address.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(u64, FunctionStats)> {
        let mut all: Vec<_> = self.functions.iter().map(|e| (*e.key(), *e.value())).collect();
        all.sort_unstable_by_key(|(address, _)| *address);
        all
    }
}
