//! Folding raw expenditure and earnings rows into a [`MonthlyDataset`].

use std::collections::{BTreeMap, BTreeSet};

use dashboard_core::data_processors::{MonthKeyNormalizer, NumericCoercer};
use dashboard_core::departments::{DepartmentCanonicalizer, DepartmentLabel};
use dashboard_core::models::{
    DepartmentMonthMetrics, MonthAggregate, MonthKey, MonthlyDataset, RawEarningsRow, RawRow,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

// ── IngestStats ───────────────────────────────────────────────────────────────

/// Counters describing what happened to each input row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub rows_seen: usize,
    pub rows_aggregated: usize,
    /// "Total Geral" rows skipped so they are not double counted.
    pub subtotal_rows_skipped: usize,
    pub rows_without_month: usize,
    pub rows_without_department: usize,
    pub earnings_seen: usize,
    pub earnings_applied: usize,
    pub earnings_without_month: usize,
}

// ── AggregationEngine ─────────────────────────────────────────────────────────

/// Stateless builder of the month × department matrix.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Build a dataset from both row sequences.
    pub fn aggregate(rows: &[RawRow], earnings: &[RawEarningsRow]) -> MonthlyDataset {
        Self::aggregate_with_stats(rows, earnings).0
    }

    /// Build a dataset and report how many rows were used or dropped.
    ///
    /// 1. Every row of either input with a resolvable month seeds that month,
    ///    so months with only earnings or only payroll still appear.
    /// 2. Expenditure rows are summed per (month, department); subtotal rows
    ///    and rows without a department are skipped.
    /// 3. Earnings rows set the month's revenue; a later row for the same
    ///    month overwrites an earlier one.
    ///
    /// Rows whose month cannot be normalized are dropped with a warning.
    pub fn aggregate_with_stats(
        rows: &[RawRow],
        earnings: &[RawEarningsRow],
    ) -> (MonthlyDataset, IngestStats) {
        let mut stats = IngestStats {
            rows_seen: rows.len(),
            earnings_seen: earnings.len(),
            ..IngestStats::default()
        };

        let row_keys: Vec<Option<MonthKey>> = rows
            .iter()
            .map(|row| resolve_month(row.month(), "expenditure"))
            .collect();
        let earnings_keys: Vec<Option<MonthKey>> = earnings
            .iter()
            .map(|row| resolve_month(row.month(), "earnings"))
            .collect();

        let mut by_month: BTreeMap<MonthKey, MonthAggregate> = row_keys
            .iter()
            .chain(earnings_keys.iter())
            .flatten()
            .map(|key| (key.clone(), MonthAggregate::default()))
            .collect();
        let mut departments: BTreeSet<String> = BTreeSet::new();

        for (row, key) in rows.iter().zip(&row_keys) {
            let Some(key) = key else {
                stats.rows_without_month += 1;
                continue;
            };

            let label = row
                .department()
                .and_then(Value::as_str)
                .and_then(DepartmentCanonicalizer::classify);
            let department = match label {
                Some(DepartmentLabel::Department(name)) => name,
                Some(DepartmentLabel::Subtotal) => {
                    stats.subtotal_rows_skipped += 1;
                    continue;
                }
                None => {
                    warn!(month = %key, "dropping expenditure row without department");
                    stats.rows_without_department += 1;
                    continue;
                }
            };

            let contribution = DepartmentMonthMetrics::contribution(
                NumericCoercer::coerce(row.total()),
                NumericCoercer::coerce(row.bonus()),
                NumericCoercer::coerce(row.meal_voucher()),
                NumericCoercer::coerce(row.employee_count()),
            );

            by_month
                .entry(key.clone())
                .or_default()
                .add_contribution(&department, &contribution);
            departments.insert(department);
            stats.rows_aggregated += 1;
        }

        for (row, key) in earnings.iter().zip(&earnings_keys) {
            let Some(key) = key else {
                stats.earnings_without_month += 1;
                continue;
            };
            by_month
                .entry(key.clone())
                .or_default()
                .set_earnings(NumericCoercer::coerce(row.revenue()));
            stats.earnings_applied += 1;
        }

        let dataset = MonthlyDataset::new(by_month, departments);

        debug!(
            months = dataset.months().len(),
            departments = dataset.departments().len(),
            rows_aggregated = stats.rows_aggregated,
            subtotal_rows_skipped = stats.subtotal_rows_skipped,
            rows_without_month = stats.rows_without_month,
            earnings_applied = stats.earnings_applied,
            "dataset aggregated"
        );

        (dataset, stats)
    }
}

/// Normalize a row's month field, warning when the row has to be dropped.
fn resolve_month(value: Option<&Value>, kind: &str) -> Option<MonthKey> {
    let key = MonthKeyNormalizer::normalize(value);
    if key.is_none() {
        match value {
            Some(v) => warn!(kind, raw = %v, "dropping row with unparsable month"),
            None => warn!(kind, "dropping row without month"),
        }
    }
    key
}

// ── Tests ─────────────────────────────────────────────────────────────────────
