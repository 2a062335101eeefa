//! Live functions view - the instrumented functions of the running capture,
//! with their call statistics, sortable and filterable while data streams in.
//!
//! # States
//!
//! ```text
//!            on_capture_started(data)
//!   ┌──────┐ ───────────────────────▶ ┌──────┐ ◀─┐
//!   │ Idle │                          │ Live │   │ on_timer(): re-sort
//!   └──────┘ ◀─────────────────────── └──────┘ ──┘
//!            on_capture_stopped()
//! ```
//!
//! - **Idle**: no capture; the view is empty and every query returns nothing.
//! - **Live**: rows are the capture's selected functions. The owner calls
//!   [`LiveFunctionsView::on_timer`] every [`UPDATE_PERIOD`] so the current
//!   sort keeps up with changing statistics. Refresh is polled, not pushed.
//!
//! # Sorting
//!
//! Each sort snapshots every visible row's key (statistics included) once and
//! then stable-sorts on the snapshot. Statistics changing during the sort
//! cannot make the comparator inconsistent; the order is exact for the moment
//! the keys were taken and catches up on the next tick.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use livescope_common::FunctionInfo;
use log::{debug, info};

use super::data_view::{DataView, SortOrder};
use crate::capture::{CaptureData, FunctionStats, MinMax, TimerRef};
use crate::domain::{self, FunctionAddress, ViewError};

/// Milliseconds between re-sorts of a live view.
pub const UPDATE_PERIOD_MS: u64 = 300;

/// How often a live view should be re-sorted.
pub const UPDATE_PERIOD: Duration = Duration::from_millis(UPDATE_PERIOD_MS);

// =============================================================================
// COLUMNS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveColumn {
    Name,
    Count,
    Total,
    Average,
    Min,
    Max,
    Module,
    Address,
}

impl LiveColumn {
    pub const ALL: [LiveColumn; 8] = [
        LiveColumn::Name,
        LiveColumn::Count,
        LiveColumn::Total,
        LiveColumn::Average,
        LiveColumn::Min,
        LiveColumn::Max,
        LiveColumn::Module,
        LiveColumn::Address,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            LiveColumn::Name => "Function",
            LiveColumn::Count => "Count",
            LiveColumn::Total => "Total",
            LiveColumn::Average => "Avg",
            LiveColumn::Min => "Min",
            LiveColumn::Max => "Max",
            LiveColumn::Module => "Module",
            LiveColumn::Address => "Address",
        }
    }

    /// Order used the first time a column is sorted: text and addresses
    /// ascending, statistics largest first.
    #[must_use]
    pub fn default_order(self) -> SortOrder {
        match self {
            LiveColumn::Name | LiveColumn::Module | LiveColumn::Address => SortOrder::Ascending,
            LiveColumn::Count
            | LiveColumn::Total
            | LiveColumn::Average
            | LiveColumn::Min
            | LiveColumn::Max => SortOrder::Descending,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Key this column sorts by.
    fn sort_key(self, data: &CaptureData, function: &FunctionInfo) -> SortKey {
        let stat = |pick: fn(&FunctionStats) -> u64| {
            SortKey::Number(pick(&data.function_stats_or_default(function)))
        };
        match self {
            LiveColumn::Name => SortKey::Text(function.display_name().to_owned()),
            LiveColumn::Count => stat(|s| s.count),
            LiveColumn::Total => stat(|s| s.total_ns),
            LiveColumn::Average => stat(FunctionStats::average_ns),
            LiveColumn::Min => stat(|s| s.min_ns),
            LiveColumn::Max => stat(|s| s.max_ns),
            LiveColumn::Module => SortKey::Text(function.module_name().to_owned()),
            LiveColumn::Address => SortKey::Number(data.absolute_address(function)),
        }
    }
}

impl fmt::Display for LiveColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LiveColumn {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" | "function" => Ok(LiveColumn::Name),
            "count" => Ok(LiveColumn::Count),
            "total" => Ok(LiveColumn::Total),
            "avg" | "average" => Ok(LiveColumn::Average),
            "min" => Ok(LiveColumn::Min),
            "max" => Ok(LiveColumn::Max),
            "module" => Ok(LiveColumn::Module),
            "address" => Ok(LiveColumn::Address),
            _ => Err(ViewError::UnknownColumn(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Number(u64),
    Text(String),
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug)]
enum ViewState {
    Idle,
    Live(Arc<CaptureData>),
}

/// Sortable, filterable list of the functions instrumented in a capture.
#[derive(Debug)]
pub struct LiveFunctionsView {
    state: ViewState,
    functions: DataView<FunctionInfo>,
    sorting_column: LiveColumn,
    sorting_orders: [SortOrder; LiveColumn::ALL.len()],
    /// Absolute addresses of the functions that passed the last filter
    visible_functions: HashSet<u64>,
}

impl Default for LiveFunctionsView {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveFunctionsView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ViewState::Idle,
            functions: DataView::new(),
            sorting_column: LiveColumn::Count,
            sorting_orders: LiveColumn::ALL.map(LiveColumn::default_order),
            visible_functions: HashSet::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Idle → Live. Rows are rebuilt from the capture's selected functions.
    pub fn on_capture_started(&mut self, data: Arc<CaptureData>) {
        info!("Live functions view tracking capture of pid {}", data.process_id());
        self.state = ViewState::Live(data);
        self.refresh();
    }

    /// Live → Idle. All rows and filter state are dropped.
    pub fn on_capture_stopped(&mut self) {
        self.state = ViewState::Idle;
        self.functions.clear();
        self.visible_functions.clear();
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.state, ViewState::Live(_))
    }

    #[must_use]
    pub fn capture_data(&self) -> Option<&Arc<CaptureData>> {
        match &self.state {
            ViewState::Idle => None,
            ViewState::Live(data) => Some(data),
        }
    }

    /// Rebuild rows from the capture's selected functions, in ascending
    /// address order, skipping instrumentation entry points.
    ///
    /// The filter is cleared and rows are left unsorted; callers reapply both.
    pub fn refresh(&mut self) {
        let Some(data) = self.capture_data().cloned() else {
            self.functions.clear();
            self.visible_functions.clear();
            return;
        };

        let mut rows: Vec<FunctionInfo> = data
            .selected_functions()
            .iter()
            .filter(|f| !f.instrumentation)
            .cloned()
            .collect();
        rows.sort_by_key(|f| data.absolute_address(f));

        self.visible_functions = rows.iter().map(|f| data.absolute_address(f)).collect();
        self.functions.set_rows(rows);
        debug!("Live functions view refreshed with {} functions", self.functions.len());
    }

    // -------------------------------------------------------------------------
    // Filter and sort
    // -------------------------------------------------------------------------

    /// Keep functions whose display name contains every token of `text`.
    ///
    /// Rows come back in refresh order; any sort is discarded.
    pub fn set_filter(&mut self, text: &str) {
        let Some(data) = self.capture_data().cloned() else {
            return;
        };
        self.functions.set_filter(text, FunctionInfo::display_name);
        self.visible_functions = self.functions.iter().map(|f| data.absolute_address(f)).collect();
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        self.functions.filter()
    }

    /// Sort by `column`. With `Some(order)` the order is also remembered for
    /// that column; with `None` the column's remembered order is used.
    pub fn set_sort(&mut self, column: LiveColumn, order: Option<SortOrder>) {
        if let Some(order) = order {
            self.sorting_orders[column.index()] = order;
        }
        self.sorting_column = column;
        self.sort();
    }

    /// Current sort column and its order.
    #[must_use]
    pub fn sorting(&self) -> (LiveColumn, SortOrder) {
        (self.sorting_column, self.sorting_orders[self.sorting_column.index()])
    }

    fn sort(&mut self) {
        let Some(data) = self.capture_data().cloned() else {
            debug_assert!(self.functions.is_empty());
            return;
        };
        let (column, order) = self.sorting();
        self.functions.sort_by_key(order, |f| column.sort_key(&data, f));
    }

    /// Periodic tick: re-sort with the current column while live.
    pub fn on_timer(&mut self) {
        if self.is_live() {
            self.sort();
        }
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The function shown at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.len()`.
    #[must_use]
    pub fn function(&self, row: usize) -> &FunctionInfo {
        self.functions.row(row)
    }

    /// The function shown at `row`, or `None` outside the view or when idle.
    #[must_use]
    pub fn get_row(&self, row: usize) -> Option<&FunctionInfo> {
        self.functions.get(row)
    }

    /// Rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &FunctionInfo> + '_ {
        self.functions.iter()
    }

    /// Statistics of the function at `row`.
    #[must_use]
    pub fn stats(&self, row: usize) -> Option<FunctionStats> {
        let data = self.capture_data()?;
        Some(data.function_stats_or_default(self.get_row(row)?))
    }

    /// Cell text. Empty when idle or when `row` is outside the view.
    #[must_use]
    pub fn value(&self, row: usize, column: LiveColumn) -> String {
        let (Some(data), Some(function)) = (self.capture_data(), self.get_row(row)) else {
            return String::new();
        };
        let stats = data.function_stats_or_default(function);
        let pretty = |ns: u64| domain::Duration(ns).to_string();

        match column {
            LiveColumn::Name => function.display_name().to_owned(),
            LiveColumn::Count => stats.count.to_string(),
            LiveColumn::Total => pretty(stats.total_ns),
            LiveColumn::Average => pretty(stats.average_ns()),
            LiveColumn::Min => pretty(stats.min_ns),
            LiveColumn::Max => pretty(stats.max_ns),
            LiveColumn::Module => function.module_path.clone(),
            LiveColumn::Address => FunctionAddress(data.absolute_address(function)).to_string(),
        }
    }

    /// Absolute addresses of the functions currently passing the filter.
    #[must_use]
    pub fn visible_functions(&self) -> &HashSet<u64> {
        &self.visible_functions
    }

    // -------------------------------------------------------------------------
    // Live queries
    // -------------------------------------------------------------------------

    /// First row whose address column reads `address`.
    ///
    /// Scans the view linearly and compares rendered addresses, so the answer
    /// always agrees with what the address column displays.
    #[must_use]
    pub fn row_from_function_address(&self, address: u64) -> Option<usize> {
        let wanted = FunctionAddress(address).to_string();
        (0..self.len()).find(|&row| self.value(row, LiveColumn::Address) == wanted)
    }

    /// Fastest and slowest recorded call of the function at `row`.
    #[must_use]
    pub fn min_max(&self, row: usize) -> Option<MinMax> {
        let data = self.capture_data()?;
        data.find_extreme_duration_records(data.absolute_address(self.get_row(row)?))
    }

    /// Earliest recorded call of the function at `row`.
    #[must_use]
    pub fn first_call(&self, row: usize) -> Option<TimerRef> {
        let data = self.capture_data()?;
        data.find_next_function_call(data.absolute_address(self.get_row(row)?), None)
    }

    /// Latest recorded call of the function at `row`.
    #[must_use]
    pub fn last_call(&self, row: usize) -> Option<TimerRef> {
        let data = self.capture_data()?;
        data.find_previous_function_call(data.absolute_address(self.get_row(row)?), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConfig, CaptureListener, SessionInfo};
    use livescope_common::TimerRecord;

    fn function(name: &str, address: u64) -> FunctionInfo {
        FunctionInfo {
            name: name.to_owned(),
            module_path: "/opt/game/bin/game".to_owned(),
            address,
            ..FunctionInfo::default()
        }
    }

    fn live_view(functions: Vec<FunctionInfo>) -> (LiveFunctionsView, Arc<CaptureData>) {
        let session = SessionInfo { process_id: 42, functions, ..SessionInfo::default() };
        let data = Arc::new(CaptureData::new(session, CaptureConfig { block_capacity: 8 }));
        let mut view = LiveFunctionsView::new();
        view.on_capture_started(Arc::clone(&data));
        (view, data)
    }

    fn call(data: &CaptureData, address: u64, start: u64, end: u64) {
        data.on_timer(TimerRecord::new(address, 1, start, end)).unwrap();
    }

    fn names(view: &LiveFunctionsView) -> Vec<&str> {
        view.rows().map(FunctionInfo::display_name).collect()
    }

    #[test]
    fn test_idle_view_is_empty() {
        let view = LiveFunctionsView::new();
        assert!(!view.is_live());
        assert!(view.is_empty());
        assert_eq!(view.get_row(0), None);
        assert_eq!(view.value(0, LiveColumn::Name), "");
        assert_eq!(view.stats(0), None);
        assert_eq!(view.min_max(0), None);
        assert_eq!(view.row_from_function_address(0x10), None);
    }

    #[test]
    fn test_idle_view_ignores_filter_sort_and_tick() {
        let mut view = LiveFunctionsView::new();
        view.set_filter("foo");
        view.set_sort(LiveColumn::Name, None);
        view.on_timer();
        assert!(view.is_empty());
    }

    #[test]
    fn test_refresh_orders_by_address_and_skips_instrumentation() {
        let mut hook = function("profiler_hook_enter", 0x5);
        hook.instrumentation = true;
        let (view, _) = live_view(vec![function("c", 0x30), hook, function("a", 0x10)]);
        assert_eq!(names(&view), vec!["a", "c"]);
        assert_eq!(view.visible_functions().len(), 2);
    }

    #[test]
    fn test_sort_by_statistic_uses_default_descending_order() {
        let (mut view, data) =
            live_view(vec![function("a", 0x10), function("b", 0x20), function("c", 0x30)]);
        call(&data, 0x20, 0, 10);
        call(&data, 0x20, 10, 20);
        call(&data, 0x30, 0, 5);

        view.set_sort(LiveColumn::Count, None);
        assert_eq!(names(&view), vec!["b", "c", "a"]);
        assert_eq!(view.sorting(), (LiveColumn::Count, SortOrder::Descending));
    }

    #[test]
    fn test_explicit_order_is_remembered_per_column() {
        let (mut view, _) = live_view(vec![function("a", 0x10), function("b", 0x20)]);
        view.set_sort(LiveColumn::Name, Some(SortOrder::Descending));
        assert_eq!(names(&view), vec!["b", "a"]);

        view.set_sort(LiveColumn::Address, None);
        assert_eq!(names(&view), vec!["a", "b"]);

        view.set_sort(LiveColumn::Name, None);
        assert_eq!(names(&view), vec!["b", "a"]);
    }

    #[test]
    fn test_ties_keep_previous_order() {
        let (mut view, data) =
            live_view(vec![function("a", 0x10), function("b", 0x20), function("c", 0x30)]);
        call(&data, 0x10, 0, 1);
        call(&data, 0x30, 0, 1);

        view.set_sort(LiveColumn::Name, Some(SortOrder::Descending));
        assert_eq!(names(&view), vec!["c", "b", "a"]);
        // a and c tie on count; they keep the c-before-a order of the last sort.
        view.set_sort(LiveColumn::Count, None);
        assert_eq!(names(&view), vec!["c", "a", "b"]);
        view.on_timer();
        assert_eq!(names(&view), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_timer_tick_resorts_as_statistics_change() {
        let (mut view, data) = live_view(vec![function("a", 0x10), function("b", 0x20)]);
        view.set_sort(LiveColumn::Total, None);
        call(&data, 0x20, 0, 100);
        view.on_timer();
        assert_eq!(names(&view), vec!["b", "a"]);

        call(&data, 0x10, 0, 500);
        view.on_timer();
        assert_eq!(names(&view), vec!["a", "b"]);
    }

    #[test]
    fn test_filter_then_read_returns_backing_order() {
        let (mut view, _) = live_view(vec![
            function("draw_world", 0x10),
            function("update", 0x20),
            function("draw_hud", 0x30),
        ]);
        view.set_sort(LiveColumn::Name, Some(SortOrder::Ascending));
        assert_eq!(view.function(0).name, "draw_hud");

        view.set_filter("DRAW");
        assert_eq!(view.function(0).name, "draw_world");
        assert_eq!(view.len(), 2);
        assert_eq!(view.visible_functions(), &HashSet::from([0x10, 0x30]));
    }

    #[test]
    fn test_values_render_statistics() {
        let (view, data) = live_view(vec![function("tick", 0x10)]);
        for (start, end) in [(0, 10), (10, 60), (60, 90)] {
            call(&data, 0x10, start, end);
        }

        assert_eq!(view.value(0, LiveColumn::Name), "tick");
        assert_eq!(view.value(0, LiveColumn::Count), "3");
        assert_eq!(view.value(0, LiveColumn::Total), "90 ns");
        assert_eq!(view.value(0, LiveColumn::Average), "30 ns");
        assert_eq!(view.value(0, LiveColumn::Min), "10 ns");
        assert_eq!(view.value(0, LiveColumn::Max), "50 ns");
        assert_eq!(view.value(0, LiveColumn::Module), "/opt/game/bin/game");
        assert_eq!(view.value(0, LiveColumn::Address), "0x10");
        assert_eq!(view.value(1, LiveColumn::Name), "");
    }

    #[test]
    fn test_row_from_function_address_uses_current_order() {
        let (mut view, _) = live_view(vec![function("a", 0x10), function("b", 0xab)]);
        assert_eq!(view.row_from_function_address(0xab), Some(1));
        view.set_sort(LiveColumn::Address, Some(SortOrder::Descending));
        assert_eq!(view.row_from_function_address(0xab), Some(0));
        assert_eq!(view.row_from_function_address(0xcd), None);
    }

    #[test]
    fn test_min_max_and_jumps_follow_row() {
        let (view, data) = live_view(vec![function("a", 0x10)]);
        call(&data, 0x10, 100, 105);
        call(&data, 0x10, 10, 15);
        call(&data, 0x10, 200, 209);

        let extremes = view.min_max(0).unwrap();
        assert_eq!(extremes.min.timer.start_ns, 100);
        assert_eq!(extremes.max.timer.start_ns, 200);
        assert_eq!(view.first_call(0).unwrap().timer.start_ns, 10);
        assert_eq!(view.last_call(0).unwrap().timer.end_ns, 209);
    }

    #[test]
    fn test_capture_stop_clears_everything() {
        let (mut view, _) = live_view(vec![function("a", 0x10)]);
        view.set_filter("a");
        view.on_capture_stopped();
        assert!(!view.is_live());
        assert!(view.is_empty());
        assert!(view.visible_functions().is_empty());
        assert_eq!(view.filter(), "");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_function_outside_view_panics() {
        let (view, _) = live_view(vec![function("a", 0x10)]);
        let _ = view.function(1);
    }

    #[test]
    fn test_column_parsing() {
        assert_eq!("AVG".parse::<LiveColumn>().unwrap(), LiveColumn::Average);
        assert_eq!("function".parse::<LiveColumn>().unwrap(), LiveColumn::Name);
        let err = "hooked".parse::<LiveColumn>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown column: hooked");
    }
}
