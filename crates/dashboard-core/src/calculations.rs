use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::models::{DepartmentMonthMetrics, MonthAggregate, MonthKey, MonthlyDataset};

// ── Selectors ─────────────────────────────────────────────────────────────────

/// Weight used to split a month's earnings across departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    /// Proportional to each department's employee count.
    Headcount,
    /// Proportional to each department's grand total.
    Spend,
}

impl FromStr for AllocationMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "headcount" => Ok(Self::Headcount),
            "spend" => Ok(Self::Spend),
            other => Err(DashboardError::Config(format!(
                "unknown allocation mode {other:?} (expected headcount or spend)"
            ))),
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Headcount => f.write_str("headcount"),
            Self::Spend => f.write_str("spend"),
        }
    }
}

/// How many trailing months a view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthRange {
    Last(usize),
    All,
}

impl FromStr for MonthRange {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Self::Last(n)),
            _ => Err(DashboardError::InvalidRange(s.to_string())),
        }
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Last(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

// ── RangeSummary ──────────────────────────────────────────────────────────────

/// Headline figures over a selection of months.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSummary {
    pub months: usize,
    pub total_spend: f64,
    pub total_earnings: f64,
    pub net_profit: f64,
    /// Percentage of earnings left after spend; 0 without earnings.
    pub profit_margin: f64,
    /// Mean monthly head count.
    pub average_employees: f64,
    /// Total spend divided by summed monthly head count.
    pub average_per_employee: f64,
}

// ── DerivedMetrics ────────────────────────────────────────────────────────────

/// Stateless collection of figures derived from an aggregated dataset.
///
/// A department or month with no data is zero everywhere; none of these
/// functions divides by zero or returns NaN.
pub struct DerivedMetrics;

impl DerivedMetrics {
    /// Spend per employee, 0 when the month has no head count.
    pub fn average_per_employee(month: &MonthAggregate) -> f64 {
        ratio(month.total_spend(), month.total_employees())
    }

    /// Fraction of the month's spend attributable to `department`.
    pub fn department_share(month: &MonthAggregate, department: &str) -> f64 {
        ratio(month.department(department).grand_total, month.total_spend())
    }

    /// [`department_share`](Self::department_share) for every department present.
    pub fn department_shares(month: &MonthAggregate) -> BTreeMap<String, f64> {
        month
            .departments()
            .keys()
            .map(|name| (name.clone(), Self::department_share(month, name)))
            .collect()
    }

    pub fn net_profit(month: &MonthAggregate) -> f64 {
        month.earnings() - month.total_spend()
    }

    /// Net profit as a percentage of earnings, 0 without earnings.
    pub fn profit_margin(month: &MonthAggregate) -> f64 {
        if month.earnings() > 0.0 {
            Self::net_profit(month) / month.earnings() * 100.0
        } else {
            0.0
        }
    }

    /// Split the month's earnings across its departments by `mode`.
    ///
    /// Every department present gets an entry. When the denominator is zero
    /// all entries are zero.
    pub fn allocate_earnings(month: &MonthAggregate, mode: AllocationMode) -> BTreeMap<String, f64> {
        let weight = |m: &DepartmentMonthMetrics| match mode {
            AllocationMode::Headcount => m.employee_count,
            AllocationMode::Spend => m.grand_total,
        };
        let denominator: f64 = month.departments().values().map(weight).sum();

        month
            .departments()
            .iter()
            .map(|(name, metrics)| {
                let share = ratio(weight(metrics), denominator);
                (name.clone(), share * month.earnings())
            })
            .collect()
    }

    /// Trailing `range` months of an ascending month sequence.
    ///
    /// Asking for more months than exist returns everything.
    pub fn select_months(months: &[MonthKey], range: MonthRange) -> &[MonthKey] {
        match range {
            MonthRange::All => months,
            MonthRange::Last(n) => &months[months.len().saturating_sub(n)..],
        }
    }

    /// Headline totals over `months`; months missing from the dataset count as zero.
    pub fn summarize_range(dataset: &MonthlyDataset, months: &[MonthKey]) -> RangeSummary {
        let mut total_spend = 0.0;
        let mut total_earnings = 0.0;
        let mut employee_months = 0.0;
        for month in months.iter().filter_map(|k| dataset.month(k)) {
            total_spend += month.total_spend();
            total_earnings += month.earnings();
            employee_months += month.total_employees();
        }

        let net_profit = total_earnings - total_spend;
        RangeSummary {
            months: months.len(),
            total_spend,
            total_earnings,
            net_profit,
            profit_margin: if total_earnings > 0.0 {
                net_profit / total_earnings * 100.0
            } else {
                0.0
            },
            average_employees: ratio(employee_months, months.len() as f64),
            average_per_employee: ratio(total_spend, employee_months),
        }
    }

    /// Grand total of `department` for each of `months` (0 where absent).
    pub fn department_series(
        dataset: &MonthlyDataset,
        department: &str,
        months: &[MonthKey],
    ) -> Vec<f64> {
        months
            .iter()
            .map(|k| {
                dataset
                    .month(k)
                    .map(|m| m.department(department).grand_total)
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Percentage change of total spend from each month to the next.
    ///
    /// The result has one entry per consecutive pair; an entry is `None`
    /// when the earlier month had no spend.
    pub fn month_over_month(dataset: &MonthlyDataset, months: &[MonthKey]) -> Vec<Option<f64>> {
        let spend = |k: &MonthKey| dataset.month(k).map(MonthAggregate::total_spend).unwrap_or(0.0);
        months
            .windows(2)
            .map(|pair| {
                let (prev, next) = (spend(&pair[0]), spend(&pair[1]));
                if prev > 0.0 {
                    Some((next - prev) / prev * 100.0)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Per-department metrics summed over `months`.
    pub fn department_totals(
        dataset: &MonthlyDataset,
        months: &[MonthKey],
    ) -> BTreeMap<String, DepartmentMonthMetrics> {
        let mut totals: BTreeMap<String, DepartmentMonthMetrics> = BTreeMap::new();
        for month in months.iter().filter_map(|k| dataset.month(k)) {
            for (name, metrics) in month.departments() {
                totals.entry(name.clone()).or_default().absorb(metrics);
            }
        }
        totals
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
