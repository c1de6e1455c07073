//! The dashboard context shared with every view.
//!
//! A [`DashboardContext`] is built completely before it is published, so a
//! reader of [`DashboardState`] sees either a whole dataset or the error of
//! the last load, never a half-aggregated one.

use std::sync::{Arc, RwLock};

use dashboard_core::models::MonthlyDataset;
use dashboard_data::aggregator::IngestStats;
use serde::Serialize;

// ── Context ───────────────────────────────────────────────────────────────────

/// Facts about how a context was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMetadata {
    /// RFC 3339 timestamp of the load.
    pub generated_at: String,
    pub expenditure_rows: usize,
    pub earnings_rows: usize,
    pub load_time_seconds: f64,
}

/// Everything the reports read: the aggregated dataset plus load details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardContext {
    pub dataset: MonthlyDataset,
    pub stats: IngestStats,
    pub metadata: LoadMetadata,
}

// ── DashboardState ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub enum LoadState {
    /// Nothing loaded yet.
    #[default]
    Empty,
    Ready(Arc<DashboardContext>),
    /// The last load failed; carries the user-facing message.
    Failed(String),
}

/// Shared slot holding the currently published context.
#[derive(Debug, Default)]
pub struct DashboardState {
    inner: RwLock<LoadState>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> LoadState {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The published context, if the last load succeeded.
    pub fn context(&self) -> Option<Arc<DashboardContext>> {
        match self.current() {
            LoadState::Ready(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Replace whatever was published with `context`.
    pub fn publish(&self, context: Arc<DashboardContext>) {
        self.set(LoadState::Ready(context));
    }

    /// Replace whatever was published with a failure. Earlier data is
    /// discarded.
    pub fn fail(&self, message: impl Into<String>) {
        self.set(LoadState::Failed(message.into()));
    }

    fn set(&self, state: LoadState) {
        match self.inner.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn context(rows: usize) -> Arc<DashboardContext> {
        Arc::new(DashboardContext {
            dataset: MonthlyDataset::default(),
            stats: IngestStats::default(),
            metadata: LoadMetadata {
                generated_at: "2025-01-01T00:00:00+00:00".to_string(),
                expenditure_rows: rows,
                earnings_rows: 0,
                load_time_seconds: 0.0,
            },
        })
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = DashboardState::new();
        assert!(matches!(state.current(), LoadState::Empty));
        assert!(state.context().is_none());
    }

    #[test]
    fn test_publish_then_read() {
        let state = DashboardState::new();
        let ctx = context(3);
        state.publish(Arc::clone(&ctx));
        let read = state.context().unwrap();
        assert!(Arc::ptr_eq(&read, &ctx));
    }

    #[test]
    fn test_failure_replaces_published_context() {
        let state = DashboardState::new();
        state.publish(context(3));
        state.fail("boom");
        assert!(state.context().is_none());
        match state.current() {
            LoadState::Failed(msg) => assert_eq!(msg, "boom"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_context_serializes_camel_case() {
        let json = serde_json::to_value(&*context(2)).unwrap();
        assert_eq!(json["metadata"]["expenditureRows"], 2);
        assert!(json["dataset"]["months"].as_array().unwrap().is_empty());
    }
}
