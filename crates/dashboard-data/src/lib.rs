//! Data ingestion layer for the payroll dashboard.
//!
//! Reads record collections from disk, normalizes the spreadsheet-derived
//! rows into a month-by-department dataset and classifies extracted payslip
//! line items.

pub mod aggregator;
pub mod payslips;
pub mod reader;

pub use dashboard_core as core;
