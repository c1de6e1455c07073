//! Monthly overview and department breakdown reports.
//!
//! A [`Report`] is assembled once from the published context and then either
//! printed as an aligned text table or serialized as JSON.

use std::fmt::Write as _;

use dashboard_core::calculations::{AllocationMode, DerivedMetrics, MonthRange, RangeSummary};
use dashboard_core::formatting::{format_brl, format_number_br, format_percent, format_share};
use dashboard_core::models::{MonthKey, MonthlyDataset};
use dashboard_data::aggregator::IngestStats;
use dashboard_runtime::state::{DashboardContext, LoadMetadata};
use serde::Serialize;

/// One line of the monthly overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthOverviewRow {
    pub month: MonthKey,
    pub spend: f64,
    pub employees: f64,
    pub average_per_employee: f64,
    pub earnings: f64,
    pub net_profit: f64,
    pub profit_margin: f64,
    /// Spend change from the previous listed month, in percent.
    pub spend_change: Option<f64>,
}

/// One department of the latest month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentBreakdownRow {
    pub department: String,
    pub grand_total: f64,
    pub employee_count: f64,
    /// Fraction of the month's spend.
    pub share: f64,
    pub allocated_earnings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentBreakdown {
    pub month: MonthKey,
    pub rows: Vec<DepartmentBreakdownRow>,
}

/// Everything a report shows, borrowed from the context where possible.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub range: String,
    pub allocation: String,
    pub summary: RangeSummary,
    pub months: Vec<MonthOverviewRow>,
    pub latest_month: Option<DepartmentBreakdown>,
    pub metadata: &'a LoadMetadata,
    pub stats: &'a IngestStats,
    pub dataset: &'a MonthlyDataset,
}

impl<'a> Report<'a> {
    pub fn build(context: &'a DashboardContext, range: MonthRange, mode: AllocationMode) -> Self {
        let dataset = &context.dataset;
        let selected = DerivedMetrics::select_months(dataset.months(), range);
        let changes = DerivedMetrics::month_over_month(dataset, selected);

        let months = selected
            .iter()
            .enumerate()
            .filter_map(|(idx, key)| {
                let month = dataset.month(key)?;
                Some(MonthOverviewRow {
                    month: key.clone(),
                    spend: month.total_spend(),
                    employees: month.total_employees(),
                    average_per_employee: DerivedMetrics::average_per_employee(month),
                    earnings: month.earnings(),
                    net_profit: DerivedMetrics::net_profit(month),
                    profit_margin: DerivedMetrics::profit_margin(month),
                    spend_change: idx.checked_sub(1).and_then(|prev| changes[prev]),
                })
            })
            .collect();

        let latest_month = dataset.latest_month().and_then(|key| {
            let month = dataset.month(key)?;
            let allocation = DerivedMetrics::allocate_earnings(month, mode);
            let rows = month
                .departments()
                .iter()
                .map(|(name, metrics)| DepartmentBreakdownRow {
                    department: name.clone(),
                    grand_total: metrics.grand_total,
                    employee_count: metrics.employee_count,
                    share: DerivedMetrics::department_share(month, name),
                    allocated_earnings: allocation.get(name).copied().unwrap_or(0.0),
                })
                .collect();
            Some(DepartmentBreakdown {
                month: key.clone(),
                rows,
            })
        });

        Self {
            range: range.to_string(),
            allocation: mode.to_string(),
            summary: DerivedMetrics::summarize_range(dataset, selected),
            months,
            latest_month,
            metadata: &context.metadata,
            stats: &context.stats,
            dataset,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_table(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_table(&mut out);
        out
    }

    fn write_table(&self, out: &mut String) -> std::fmt::Result {
        // ── Monthly overview ─────────────────────────────────────────────
        writeln!(out, "Monthly overview (range: {})", self.range)?;
        writeln!(
            out,
            "{:<8} {:>18} {:>10} {:>16} {:>18} {:>18} {:>9} {:>9}",
            "Month", "Spend", "Staff", "Avg/employee", "Earnings", "Net profit", "Margin", "Change"
        )?;
        for row in &self.months {
            writeln!(
                out,
                "{:<8} {:>18} {:>10} {:>16} {:>18} {:>18} {:>9} {:>9}",
                row.month.label_pt(),
                format_brl(row.spend),
                format_number_br(row.employees, 0),
                format_brl(row.average_per_employee),
                format_brl(row.earnings),
                format_brl(row.net_profit),
                format_percent(row.profit_margin, 1),
                row.spend_change
                    .map(|c| format_percent(c, 1))
                    .unwrap_or_else(|| "-".to_string()),
            )?;
        }

        let s = &self.summary;
        writeln!(out)?;
        writeln!(
            out,
            "{} months | spend {} | earnings {} | net profit {} ({}) | avg staff {} | avg/employee {}",
            s.months,
            format_brl(s.total_spend),
            format_brl(s.total_earnings),
            format_brl(s.net_profit),
            format_percent(s.profit_margin, 1),
            format_number_br(s.average_employees, 1),
            format_brl(s.average_per_employee),
        )?;

        // ── Latest month breakdown ───────────────────────────────────────
        let Some(latest) = &self.latest_month else {
            return Ok(());
        };
        writeln!(out)?;
        writeln!(
            out,
            "Departments in {} (earnings allocated by {})",
            latest.month.label_pt(),
            self.allocation
        )?;
        writeln!(
            out,
            "{:<26} {:>18} {:>10} {:>8} {:>18}",
            "Department", "Grand total", "Staff", "Share", "Allocated"
        )?;
        for row in &latest.rows {
            writeln!(
                out,
                "{:<26} {:>18} {:>10} {:>8} {:>18}",
                row.department,
                format_brl(row.grand_total),
                format_number_br(row.employee_count, 0),
                format_share(row.share, 1),
                format_brl(row.allocated_earnings),
            )?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
