//! Core types and pure transforms for the payroll dashboard.
//!
//! Holds the monthly data model, the month/department/number normalizers
//! used during ingestion, the derived-metric formulas every view relies on,
//! Brazilian-locale formatting and CLI settings.

pub mod calculations;
pub mod data_processors;
pub mod departments;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{DashboardError, Result};
