//! Loading and publishing the dashboard context.
//!
//! [`DashboardLoader::load`] fetches the expenditure and earnings
//! collections concurrently, retrying each fetch with linear back-off, and
//! aggregates them into a [`DashboardContext`]. If either fetch ultimately
//! fails the whole load fails; a dashboard built from one source only would
//! misreport profit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{FetchFilter, RawEarningsRow, RawRow, Record};
use dashboard_data::aggregator::AggregationEngine;

use crate::source::RowSource;
use crate::state::{DashboardContext, DashboardState, LoadMetadata};

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_EXPENDITURES_COLLECTION: &str = "expenditures";
pub const DEFAULT_EARNINGS_COLLECTION: &str = "earnings";

/// Default number of attempts per collection.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Back-off step between attempts: 0 ms, 100 ms, 200 ms, …
const RETRY_STEP_MS: u64 = 100;

// ── DashboardLoader ───────────────────────────────────────────────────────────

/// Builds dashboard contexts from a [`RowSource`].
///
/// # Example
/// ```no_run
/// use dashboard_runtime::loader::DashboardLoader;
/// use dashboard_runtime::source::FileRowSource;
///
/// # async fn run() -> dashboard_core::Result<()> {
/// let loader = DashboardLoader::new(FileRowSource::new("data"));
/// let ctx = loader.load().await?;
/// println!("{} months", ctx.dataset.months().len());
/// # Ok(())
/// # }
/// ```
pub struct DashboardLoader<S> {
    source: S,
    expenditures: String,
    earnings: String,
    filter: FetchFilter,
    attempts: u32,
}

impl<S: RowSource> DashboardLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            expenditures: DEFAULT_EXPENDITURES_COLLECTION.to_string(),
            earnings: DEFAULT_EARNINGS_COLLECTION.to_string(),
            filter: FetchFilter::default(),
            attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }

    pub fn with_collections(
        mut self,
        expenditures: impl Into<String>,
        earnings: impl Into<String>,
    ) -> Self {
        self.expenditures = expenditures.into();
        self.earnings = earnings.into();
        self
    }

    /// Filter applied to both collections.
    pub fn with_filter(mut self, filter: FetchFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Attempts per collection; at least one is always made.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Fetch both collections and build a complete context.
    pub async fn load(&self) -> Result<DashboardContext> {
        let started = Instant::now();

        let (expenditure_records, earnings_records) = tokio::try_join!(
            self.fetch_with_retry(&self.expenditures),
            self.fetch_with_retry(&self.earnings),
        )?;

        if expenditure_records.is_empty() && earnings_records.is_empty() {
            return Err(DashboardError::NoData);
        }

        let rows: Vec<RawRow> = expenditure_records.into_iter().map(RawRow::from).collect();
        let earnings: Vec<RawEarningsRow> = earnings_records
            .into_iter()
            .map(RawEarningsRow::from)
            .collect();

        let (dataset, stats) = AggregationEngine::aggregate_with_stats(&rows, &earnings);
        if dataset.is_empty() {
            tracing::warn!(
                rows_without_month = stats.rows_without_month,
                earnings_without_month = stats.earnings_without_month,
                "no row had a usable month"
            );
            return Err(DashboardError::NoData);
        }

        let metadata = LoadMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            expenditure_rows: rows.len(),
            earnings_rows: earnings.len(),
            load_time_seconds: started.elapsed().as_secs_f64(),
        };

        tracing::info!(
            months = dataset.months().len(),
            departments = dataset.departments().len(),
            expenditure_rows = metadata.expenditure_rows,
            earnings_rows = metadata.earnings_rows,
            load_time_seconds = metadata.load_time_seconds,
            "dashboard context built"
        );

        Ok(DashboardContext {
            dataset,
            stats,
            metadata,
        })
    }

    /// Load and publish into `state`. On failure the state is set to
    /// [`LoadState::Failed`](crate::state::LoadState::Failed) and the error
    /// is returned.
    pub async fn refresh(&self, state: &DashboardState) -> Result<Arc<DashboardContext>> {
        match self.load().await {
            Ok(context) => {
                let context = Arc::new(context);
                state.publish(Arc::clone(&context));
                Ok(context)
            }
            Err(e) => {
                tracing::error!(error = %e, "dashboard load failed");
                state.fail(e.to_string());
                Err(e)
            }
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// Fetch `collection`, retrying with linear back-off.
    ///
    /// A missing collection or malformed JSON is not retried: neither goes
    /// away by waiting.
    async fn fetch_with_retry(&self, collection: &str) -> Result<Vec<Record>> {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let sleep_ms = u64::from(attempt) * RETRY_STEP_MS;
                tracing::debug!(collection, attempt, sleep_ms, "retrying fetch after back-off");
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
            }

            match self.source.fetch(collection, &self.filter).await {
                Ok(records) => {
                    tracing::debug!(collection, records = records.len(), "collection fetched");
                    return Ok(records);
                }
                Err(e @ (DashboardError::DataPathNotFound(_) | DashboardError::JsonParse(_))) => {
                    return Err(e)
                }
                Err(e) => {
                    tracing::warn!(collection, attempt, error = %e, "fetch attempt failed");
                    attempt += 1;
                    if attempt >= self.attempts {
                        return Err(DashboardError::FetchFailed {
                            collection: collection.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LoadState;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    /// In-memory source; collections listed in `failing` error on the first
    /// `failures` calls.
    #[derive(Default)]
    struct MemorySource {
        collections: HashMap<String, Vec<Record>>,
        failing: Vec<String>,
        failures: u32,
        calls: AtomicU32,
    }

    impl MemorySource {
        fn with(mut self, collection: &str, records: Vec<Record>) -> Self {
            self.collections.insert(collection.to_string(), records);
            self
        }

        fn failing(mut self, collection: &str, failures: u32) -> Self {
            self.failing.push(collection.to_string());
            self.failures = failures;
            self
        }
    }

    #[async_trait]
    impl RowSource for MemorySource {
        async fn fetch(&self, collection: &str, filter: &FetchFilter) -> Result<Vec<Record>> {
            if self.failing.iter().any(|c| c == collection) {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if call < self.failures {
                    return Err(DashboardError::Io(std::io::Error::other("store unavailable")));
                }
            }
            Ok(self
                .collections
                .get(collection)
                .map(|records| records.iter().filter(|r| filter.matches(r)).cloned().collect())
                .unwrap_or_default())
        }
    }

    fn sample_source() -> MemorySource {
        MemorySource::default()
            .with(
                "expenditures",
                vec![
                    record(json!({
                        "Month": "2025-01",
                        "Department": "Operação",
                        "total": 1000,
                        "bonus": 50,
                        "employeeCount": 10,
                        "company": "Acme"
                    })),
                    record(json!({
                        "Month": "2025-01",
                        "Department": "Total Geral",
                        "total": 1000,
                        "company": "Acme"
                    })),
                    record(json!({
                        "Month": "2025-01",
                        "Department": "Operação",
                        "total": 999,
                        "company": "Other"
                    })),
                ],
            )
            .with(
                "earnings",
                vec![record(json!({"Mês": "01/2025", "Faturamento": "R$ 5.000,00"}))],
            )
    }

    #[tokio::test]
    async fn test_load_builds_context() {
        let loader = DashboardLoader::new(sample_source());
        let ctx = loader.load().await.unwrap();

        assert_eq!(ctx.dataset.months().len(), 1);
        assert_eq!(ctx.metadata.expenditure_rows, 3);
        assert_eq!(ctx.metadata.earnings_rows, 1);
        assert_eq!(ctx.stats.subtotal_rows_skipped, 1);
        assert!(!ctx.metadata.generated_at.is_empty());

        let month = ctx.dataset.month(&ctx.dataset.months()[0]).unwrap();
        assert_eq!(month.earnings(), 5000.0);
        assert_eq!(month.total_spend(), 2049.0);
    }

    #[tokio::test]
    async fn test_filter_applies_to_both_collections() {
        let filter = FetchFilter::new(vec!["company=Acme".parse().unwrap()]);
        let loader = DashboardLoader::new(sample_source()).with_filter(filter);
        let ctx = loader.load().await.unwrap();

        // Earnings rows carry no company field, so none pass the filter.
        assert_eq!(ctx.metadata.earnings_rows, 0);
        let month = ctx.dataset.month(&ctx.dataset.months()[0]).unwrap();
        assert_eq!(month.total_spend(), 1050.0);
        assert_eq!(month.earnings(), 0.0);
    }

    #[tokio::test]
    async fn test_both_sources_empty_is_no_data() {
        let loader = DashboardLoader::new(MemorySource::default());
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, DashboardError::NoData));
    }

    #[tokio::test]
    async fn test_no_usable_month_is_no_data() {
        let source = MemorySource::default()
            .with(
                "expenditures",
                vec![record(json!({"Month": "garbage", "Department": "RH", "Total": 10}))],
            )
            .with(
                "earnings",
                vec![record(json!({"Mês": "not a month", "Faturamento": 10}))],
            );
        let loader = DashboardLoader::new(source);
        assert!(matches!(loader.load().await.unwrap_err(), DashboardError::NoData));

        let state = DashboardState::new();
        assert!(loader.refresh(&state).await.is_err());
        assert!(matches!(state.current(), LoadState::Failed(_)));
        assert!(state.context().is_none());
    }

    /// Always fails with a parse error and counts calls.
    #[derive(Default)]
    struct MalformedSource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl RowSource for MalformedSource {
        async fn fetch(&self, _collection: &str, _filter: &FetchFilter) -> Result<Vec<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let err = serde_json::from_str::<Value>("[{\"Mês\": ").unwrap_err();
            Err(DashboardError::JsonParse(err))
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_not_retried() {
        let loader = DashboardLoader::new(MalformedSource::default()).with_attempts(5);
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, DashboardError::JsonParse(_)));
        // try_join! may cancel the second fetch after the first fails, so at
        // most one call per collection.
        let calls = loader.source.calls.load(Ordering::SeqCst);
        assert!((1..=2).contains(&calls), "calls = {calls}");
    }

    #[tokio::test]
    async fn test_one_source_empty_still_loads() {
        let source = MemorySource::default().with(
            "earnings",
            vec![record(json!({"Mês": "02/2025", "Faturamento": 10}))],
        );
        let ctx = DashboardLoader::new(source).load().await.unwrap();
        assert_eq!(ctx.dataset.months().len(), 1);
        assert!(ctx.dataset.departments().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let source = sample_source().failing("earnings", 2);
        let loader = DashboardLoader::new(source).with_attempts(3);
        let ctx = loader.load().await.unwrap();
        assert_eq!(ctx.metadata.earnings_rows, 1);
        assert_eq!(loader.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_one_failing_source_fails_the_load() {
        let source = sample_source().failing("earnings", u32::MAX);
        let loader = DashboardLoader::new(source).with_attempts(2);
        let err = loader.load().await.unwrap_err();
        match err {
            DashboardError::FetchFailed { collection, reason } => {
                assert_eq!(collection, "earnings");
                assert!(reason.contains("store unavailable"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_publishes_and_fails() {
        let state = DashboardState::new();

        let ok = DashboardLoader::new(sample_source());
        let ctx = ok.refresh(&state).await.unwrap();
        assert!(Arc::ptr_eq(&state.context().unwrap(), &ctx));

        let broken = DashboardLoader::new(sample_source().failing("expenditures", u32::MAX))
            .with_attempts(1);
        assert!(broken.refresh(&state).await.is_err());
        assert!(matches!(state.current(), LoadState::Failed(_)));
        assert!(state.context().is_none());
    }

    #[tokio::test]
    async fn test_custom_collection_names() {
        let source = MemorySource::default().with(
            "receitas",
            vec![record(json!({"Mês": "03/2025", "Faturamento": 1}))],
        );
        let loader = DashboardLoader::new(source).with_collections("folha", "receitas");
        let ctx = loader.load().await.unwrap();
        assert_eq!(ctx.metadata.earnings_rows, 1);
    }
}
