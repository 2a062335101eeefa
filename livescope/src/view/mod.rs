//! Views over capture data
//!
//! - `data_view`: generic filter/sort engine over a backing row list
//! - `live_functions`: the live functions table built on it

pub mod data_view;
pub mod live_functions;

pub use data_view::{compare_by, DataView, SortOrder};
pub use live_functions::{LiveColumn, LiveFunctionsView, UPDATE_PERIOD, UPDATE_PERIOD_MS};
