//! On-demand scans over the timer chains.
//!
//! None of these keep an index: each walks every block of every chain that
//! exists when it starts. Cost is O(total records), which is fine for
//! user-triggered lookups and is bounded only by the capture's length.
//! Scans never block the producer; blocks appended mid-scan are not visited.
//!
//! Iteration order is chain creation order, then block order, then slot
//! order. All "first wins" tie-breaks refer to that order.

use livescope_common::TimerRecord;

use super::capture_data::CaptureData;
use crate::domain::Tid;

/// Stable handle to a stored timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerLocation {
    pub tid: Tid,
    pub block: usize,
    pub index: usize,
}

/// A stored timer together with where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRef {
    pub location: TimerLocation,
    pub timer: TimerRecord,
}

impl TimerRef {
    #[must_use]
    pub fn duration_ns(&self) -> u64 {
        self.timer.elapsed_ns().unwrap_or(0)
    }
}

/// Fastest and slowest recorded call of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMax {
    pub min: TimerRef,
    pub max: TimerRef,
}

impl CaptureData {
    /// Visit every stored timer of one function.
    fn for_each_call(&self, function_address: u64, mut f: impl FnMut(TimerRef)) {
        for chain in self.timer_chains() {
            let tid = chain.tid();
            chain.for_each(|block, index, timer| {
                if timer.function_address == function_address {
                    f(TimerRef { location: TimerLocation { tid, block, index }, timer: *timer });
                }
            });
        }
    }

    /// Locate the minimum- and maximum-duration calls of a function.
    ///
    /// On equal durations the first call encountered is kept. Returns `None`
    /// if the function has no stored calls.
    #[must_use]
    pub fn find_extreme_duration_records(&self, function_address: u64) -> Option<MinMax> {
        let mut result: Option<MinMax> = None;
        self.for_each_call(function_address, |call| {
            let extremes = result.get_or_insert(MinMax { min: call, max: call });
            if call.duration_ns() < extremes.min.duration_ns() {
                extremes.min = call;
            }
            if call.duration_ns() > extremes.max.duration_ns() {
                extremes.max = call;
            }
        });
        result
    }

    /// The call of a function with the earliest start strictly after
    /// `after_ns`, or the earliest call overall when `after_ns` is `None`.
    #[must_use]
    pub fn find_next_function_call(
        &self,
        function_address: u64,
        after_ns: Option<u64>,
    ) -> Option<TimerRef> {
        let mut best: Option<TimerRef> = None;
        self.for_each_call(function_address, |call| {
            if after_ns.is_some_and(|t| call.timer.start_ns <= t) {
                return;
            }
            if best.is_none_or(|b| call.timer.start_ns < b.timer.start_ns) {
                best = Some(call);
            }
        });
        best
    }

    /// The call of a function with the latest end strictly before
    /// `before_ns`, or the latest call overall when `before_ns` is `None`.
    #[must_use]
    pub fn find_previous_function_call(
        &self,
        function_address: u64,
        before_ns: Option<u64>,
    ) -> Option<TimerRef> {
        let mut best: Option<TimerRef> = None;
        self.for_each_call(function_address, |call| {
            if before_ns.is_some_and(|t| call.timer.end_ns >= t) {
                return;
            }
            if best.is_none_or(|b| call.timer.end_ns > b.timer.end_ns) {
                best = Some(call);
            }
        });
        best
    }

    /// Resolve a handle returned by one of the scans.
    #[must_use]
    pub fn timer_at(&self, location: TimerLocation) -> Option<TimerRecord> {
        self.timer_chain(location.tid)?.get(location.block, location.index)
    }
}
