use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped JSON object as handed over by the record store.
pub type Record = serde_json::Map<String, Value>;

// ── Field aliases ─────────────────────────────────────────────────────────────

/// Keys that may carry the month/date of an expenditure row.
pub const MONTH_KEYS: &[&str] = &["Month", "Mês", "Mes", "month", "Data"];
/// Keys that may carry the department label.
pub const DEPARTMENT_KEYS: &[&str] = &["Department", "Departamento", "department"];
/// Keys that may carry the base compensation total.
pub const TOTAL_KEYS: &[&str] = &["Total", "total"];
/// Keys that may carry the bonus amount.
pub const BONUS_KEYS: &[&str] = &["Bonificacao 20", "Bonificação 20", "bonus"];
/// Keys that may carry the meal-voucher allowance.
pub const MEAL_VOUCHER_KEYS: &[&str] = &["Vale Alimentação", "Vale Alimentacao", "mealVoucher"];
/// Keys that may carry the head count.
pub const EMPLOYEE_COUNT_KEYS: &[&str] = &[
    "Employee Count",
    "Quantidade de Funcionários",
    "Quantidade de Funcionarios",
    "employeeCount",
];
/// Keys that may carry the month of an earnings row.
pub const EARNINGS_MONTH_KEYS: &[&str] = &["Mês", "Mes", "Month", "month", "Data"];
/// Keys that may carry the revenue of an earnings row.
pub const REVENUE_KEYS: &[&str] = &["Faturamento", "faturamento", "Revenue", "revenue"];

/// Return the first alias present in `record` with a non-null value.
fn find_field<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|v| !v.is_null())
}

// ── Raw rows ──────────────────────────────────────────────────────────────────

/// One expenditure row exactly as the store returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(pub Record);

impl RawRow {
    pub fn month(&self) -> Option<&Value> {
        find_field(&self.0, MONTH_KEYS)
    }

    pub fn department(&self) -> Option<&Value> {
        find_field(&self.0, DEPARTMENT_KEYS)
    }

    pub fn total(&self) -> Option<&Value> {
        find_field(&self.0, TOTAL_KEYS)
    }

    pub fn bonus(&self) -> Option<&Value> {
        find_field(&self.0, BONUS_KEYS)
    }

    pub fn meal_voucher(&self) -> Option<&Value> {
        find_field(&self.0, MEAL_VOUCHER_KEYS)
    }

    pub fn employee_count(&self) -> Option<&Value> {
        find_field(&self.0, EMPLOYEE_COUNT_KEYS)
    }
}

impl From<Record> for RawRow {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

/// One earnings (revenue) row exactly as the store returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEarningsRow(pub Record);

impl RawEarningsRow {
    pub fn month(&self) -> Option<&Value> {
        find_field(&self.0, EARNINGS_MONTH_KEYS)
    }

    pub fn revenue(&self) -> Option<&Value> {
        find_field(&self.0, REVENUE_KEYS)
    }
}

impl From<Record> for RawEarningsRow {
    fn from(record: Record) -> Self {
        Self(record)
    }
}

// ── FetchFilter ───────────────────────────────────────────────────────────────

/// A single `field == value` clause applied by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub value: String,
}

impl FilterClause {
    /// `true` when `record[field]` equals `value`.
    ///
    /// Strings compare verbatim; numbers and booleans compare by their JSON
    /// text. Missing and `null` fields never match.
    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.field) {
            Some(Value::String(s)) => *s == self.value,
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string() == self.value,
            _ => false,
        }
    }
}

impl std::str::FromStr for FilterClause {
    type Err = String;

    /// Parse `FIELD=VALUE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((field, value)) if !field.trim().is_empty() => Ok(Self {
                field: field.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected FIELD=VALUE, got {s:?}")),
        }
    }
}

/// Conjunction of equality clauses; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFilter {
    pub clauses: Vec<FilterClause>,
}

impl FetchFilter {
    pub fn new(clauses: Vec<FilterClause>) -> Self {
        Self { clauses }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

// ── MonthKey ──────────────────────────────────────────────────────────────────

/// Portuguese month abbreviations, January first.
pub const PT_MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Canonical `YYYY-MM` month key.
///
/// Always seven characters with a zero-padded month in `01..=12`, so the
/// derived lexicographic ordering is also chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey(String);

impl MonthKey {
    /// Build a key from numeric parts, rejecting out-of-range values.
    pub fn from_parts(year: i32, month: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self(format!("{:04}-{:02}", year, month)))
    }

    /// Key of the calendar month containing `date`.
    pub fn from_date<D: Datelike>(date: &D) -> Option<Self> {
        Self::from_parts(date.year(), date.month())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn month(&self) -> u32 {
        self.0[5..].parse().unwrap_or_default()
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year(), self.month(), 1)
    }

    /// Short Portuguese chart label, e.g. `jan/25`.
    pub fn label_pt(&self) -> String {
        let idx = (self.month() as usize).saturating_sub(1).min(11);
        format!("{}/{:02}", PT_MONTH_ABBREVIATIONS[idx], self.year().rem_euclid(100))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(format!("not a YYYY-MM month key: {value}"));
        }
        let year: i32 = value[..4].parse().map_err(|_| value.clone())?;
        let month: u32 = value[5..].parse().map_err(|_| value.clone())?;
        Self::from_parts(year, month).ok_or_else(|| format!("month out of range: {value}"))
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.0
    }
}

// ── DepartmentMonthMetrics ────────────────────────────────────────────────────

/// Payroll figures for one department in one month.
///
/// Every field is a running sum over all contributing source rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentMonthMetrics {
    /// Base compensation.
    pub total: f64,
    pub bonus: f64,
    pub meal_voucher: f64,
    pub employee_count: f64,
    /// `total + bonus`.
    pub grand_total: f64,
}

impl DepartmentMonthMetrics {
    /// Metrics contributed by a single source row.
    ///
    /// This is the only place the grand-total formula lives; every other
    /// figure is a sum of contributions built here.
    pub fn contribution(total: f64, bonus: f64, meal_voucher: f64, employee_count: f64) -> Self {
        Self {
            total,
            bonus,
            meal_voucher,
            employee_count,
            grand_total: total + bonus,
        }
    }

    /// Add `other` into `self` field by field.
    pub fn absorb(&mut self, other: &DepartmentMonthMetrics) {
        self.total += other.total;
        self.bonus += other.bonus;
        self.meal_voucher += other.meal_voucher;
        self.employee_count += other.employee_count;
        self.grand_total += other.grand_total;
    }
}

// ── MonthAggregate ────────────────────────────────────────────────────────────

/// All departments for one month plus the month-level running totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthAggregate {
    departments: BTreeMap<String, DepartmentMonthMetrics>,
    total_spend: f64,
    total_employees: f64,
    earnings: f64,
}

impl MonthAggregate {
    /// Accumulate one row's contribution into `department` and the month totals.
    pub fn add_contribution(&mut self, department: &str, contribution: &DepartmentMonthMetrics) {
        self.departments
            .entry(department.to_string())
            .or_default()
            .absorb(contribution);
        self.total_spend += contribution.grand_total;
        self.total_employees += contribution.employee_count;
    }

    /// Overwrite the month's revenue figure.
    pub fn set_earnings(&mut self, earnings: f64) {
        self.earnings = earnings;
    }

    pub fn departments(&self) -> &BTreeMap<String, DepartmentMonthMetrics> {
        &self.departments
    }

    /// Metrics for `department`, all zero when it has no rows this month.
    pub fn department(&self, department: &str) -> DepartmentMonthMetrics {
        self.departments
            .get(department)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_spend(&self) -> f64 {
        self.total_spend
    }

    pub fn total_employees(&self) -> f64 {
        self.total_employees
    }

    pub fn earnings(&self) -> f64 {
        self.earnings
    }

    /// Total spend recomputed from the department map.
    pub fn resummed_spend(&self) -> f64 {
        self.departments.values().map(|d| d.grand_total).sum()
    }
}

// ── MonthlyDataset ────────────────────────────────────────────────────────────

/// The month × department matrix every view reads from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyDataset {
    months: Vec<MonthKey>,
    departments: BTreeSet<String>,
    by_month: BTreeMap<MonthKey, MonthAggregate>,
}

impl MonthlyDataset {
    /// Assemble a dataset from its per-month aggregates.
    ///
    /// `months` is derived from the map keys and every department referenced
    /// by any month is registered, so both dataset invariants hold.
    pub fn new(by_month: BTreeMap<MonthKey, MonthAggregate>, departments: BTreeSet<String>) -> Self {
        let mut departments = departments;
        for aggregate in by_month.values() {
            departments.extend(aggregate.departments.keys().cloned());
        }
        Self {
            months: by_month.keys().cloned().collect(),
            departments,
            by_month,
        }
    }

    /// Month keys in ascending chronological order.
    pub fn months(&self) -> &[MonthKey] {
        &self.months
    }

    /// Every department seen, in sorted order.
    pub fn departments(&self) -> &BTreeSet<String> {
        &self.departments
    }

    pub fn by_month(&self) -> &BTreeMap<MonthKey, MonthAggregate> {
        &self.by_month
    }

    pub fn month(&self, key: &MonthKey) -> Option<&MonthAggregate> {
        self.by_month.get(key)
    }

    pub fn latest_month(&self) -> Option<&MonthKey> {
        self.months.last()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}
