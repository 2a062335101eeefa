//! Sortable, filterable projection over a backing collection.
//!
//! # Architecture
//!
//! ```text
//! rows:    [ A, B, C, D ]        backing collection, never reordered
//! indices: [ 2, 0, 3 ]           view row → backing position
//! view:    [ C, A, D ]
//! ```
//!
//! Sorting permutes `indices` only; filtering replaces `indices` with a
//! subsequence of backing positions. Rows are addressed by position, so
//! comparators can look rows up freely while `indices` is being reordered.
//!
//! # Invariants
//!
//! - `indices.len() <= rows.len()`
//! - every entry of `indices` is a distinct, in-range backing position
//!
//! # Contract
//!
//! - [`DataView::set_filter`] rebuilds `indices` in backing order, dropping any
//!   previous sort. Callers that want sorted, filtered rows sort again after
//!   filtering.
//! - Sorting is stable: rows that compare equal keep the order they had in
//!   `indices` before the sort.
//! - [`DataView::set_rows`] resets `indices` to the identity and drops the
//!   filter text.

use std::cmp::{Ordering, Reverse};

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Turn an ascending comparison result into one for this direction.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Comparator over a key extracted from each row.
///
/// The key is recomputed on every comparison; use [`DataView::sort_by_key`]
/// when keys are expensive or may change between comparisons.
pub fn compare_by<T, K: Ord>(
    key: impl Fn(&T) -> K,
    order: SortOrder,
) -> impl Fn(&T, &T) -> Ordering {
    move |a: &T, b: &T| order.apply(key(a).cmp(&key(b)))
}

/// Lower-cased, whitespace-separated filter tokens.
fn filter_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// True if `name` contains every token, ignoring case.
fn matches_all(name: &str, tokens: &[String]) -> bool {
    let name = name.to_lowercase();
    tokens.iter().all(|token| name.contains(token.as_str()))
}

/// Index-permutation view over `rows`.
#[derive(Debug, Clone)]
pub struct DataView<T> {
    rows: Vec<T>,
    indices: Vec<usize>,
    filter: String,
}

impl<T> Default for DataView<T> {
    fn default() -> Self {
        Self { rows: Vec::new(), indices: Vec::new(), filter: String::new() }
    }
}

impl<T> DataView<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rows(rows: Vec<T>) -> Self {
        let mut view = Self::new();
        view.set_rows(rows);
        view
    }

    /// Replace the backing collection. `indices` becomes the identity and the
    /// filter text is cleared.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.indices = (0..rows.len()).collect();
        self.rows = rows;
        self.filter.clear();
    }

    /// Drop all rows and state.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.indices.clear();
        self.filter.clear();
    }

    /// Keep, in backing order, the rows whose name contains every
    /// whitespace-separated token of `text` (case-insensitive).
    ///
    /// Empty or blank `text` keeps every row. Any previous sort is discarded.
    pub fn set_filter(&mut self, text: &str, name: impl Fn(&T) -> &str) {
        let tokens = filter_tokens(text);
        self.indices = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_all(name(*row), &tokens))
            .map(|(i, _)| i)
            .collect();
        text.clone_into(&mut self.filter);
    }

    /// Current filter text.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Stable sort of the visible rows with a comparator.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let rows = &self.rows;
        self.indices.sort_by(|&a, &b| compare(&rows[a], &rows[b]));
    }

    /// Stable sort of the visible rows by a key computed once per row.
    ///
    /// Keys are taken as a snapshot before any comparison, so the sort stays
    /// consistent even if the data behind `key` changes while it runs.
    pub fn sort_by_key<K: Ord>(&mut self, order: SortOrder, mut key: impl FnMut(&T) -> K) {
        let rows = &self.rows;
        match order {
            SortOrder::Ascending => self.indices.sort_by_cached_key(|&i| key(&rows[i])),
            SortOrder::Descending => {
                self.indices.sort_by_cached_key(|&i| Reverse(key(&rows[i])));
            }
        }
    }

    /// Number of visible rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Visible row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not below [`DataView::len`]. Asking for a row outside
    /// the view is a caller defect.
    #[must_use]
    pub fn row(&self, i: usize) -> &T {
        assert!(i < self.indices.len(), "Row {i} out of bounds for view of {} rows", self.len());
        &self.rows[self.indices[i]]
    }

    /// Visible row `i`, or `None` outside the view.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&T> {
        self.indices.get(i).map(|&pos| &self.rows[pos])
    }

    /// The permutation: view row → backing position.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The backing collection, in backing order.
    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Visible rows in view order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.indices.iter().map(|&pos| &self.rows[pos])
    }

    /// First visible row satisfying `predicate`.
    #[must_use]
    pub fn position(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter().position(|row| predicate(row))
    }
}
