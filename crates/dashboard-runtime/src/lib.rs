//! Runtime layer for the payroll dashboard.
//!
//! Fetches the record collections concurrently, aggregates them and
//! publishes the finished context for the report views.

pub mod loader;
pub mod source;
pub mod state;

pub use dashboard_core as core;
pub use dashboard_data as data;
