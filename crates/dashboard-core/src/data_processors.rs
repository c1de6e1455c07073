use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{MonthKey, PT_MONTH_ABBREVIATIONS};

// ── MonthKeyNormalizer ────────────────────────────────────────────────────────

static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})").expect("regex is valid"));
static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})").expect("regex is valid"));
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{4})").expect("regex is valid"));
static ABBREVIATED_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\p{L}{3,})\.?-(\d{2})$").expect("regex is valid"));

/// Two-digit years below this value belong to the 2000s.
const CENTURY_PIVOT: i32 = 70;

/// Parses the month/date representations found across the spreadsheet
/// exports into a canonical [`MonthKey`].
pub struct MonthKeyNormalizer;

impl MonthKeyNormalizer {
    /// Normalize a raw JSON field.
    ///
    /// Missing, `null` and non-string values yield `None` without any
    /// pattern being attempted.
    pub fn normalize(value: Option<&Value>) -> Option<MonthKey> {
        match value {
            Some(Value::String(s)) => Self::normalize_str(s),
            _ => None,
        }
    }

    /// Normalize a month string. Patterns are tried in this order:
    ///
    /// 1. `YYYY-MM…` (ISO prefix)
    /// 2. `D/M/YYYY` or `DD/MM/YYYY`
    /// 3. `M/YYYY`
    /// 4. `<abbr>.-YY` with a Portuguese month abbreviation, e.g. `jan.-25`
    pub fn normalize_str(raw: &str) -> Option<MonthKey> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Some(caps) = ISO_PREFIX.captures(s) {
            return Self::key_from(&caps[1], &caps[2]);
        }
        if let Some(caps) = DAY_MONTH_YEAR.captures(s) {
            return Self::key_from(&caps[3], &caps[2]);
        }
        if let Some(caps) = MONTH_YEAR.captures(s) {
            return Self::key_from(&caps[2], &caps[1]);
        }
        if let Some(caps) = ABBREVIATED_MONTH.captures(s) {
            let month = Self::month_from_abbreviation(&caps[1])?;
            let yy: i32 = caps[2].parse().ok()?;
            let year = if yy < CENTURY_PIVOT { 2000 + yy } else { 1900 + yy };
            return MonthKey::from_parts(year, month);
        }

        None
    }

    /// Resolve the first three letters of `name` against the Portuguese table.
    pub fn month_from_abbreviation(name: &str) -> Option<u32> {
        let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
        PT_MONTH_ABBREVIATIONS
            .iter()
            .position(|m| *m == prefix)
            .map(|idx| idx as u32 + 1)
    }

    fn key_from(year: &str, month: &str) -> Option<MonthKey> {
        MonthKey::from_parts(year.parse().ok()?, month.parse().ok()?)
    }
}

// ── NumericCoercer ────────────────────────────────────────────────────────────

/// Turns loosely typed spreadsheet numbers into finite `f64` values.
///
/// Never fails: anything that cannot be read as a number becomes `0.0`.
pub struct NumericCoercer;

impl NumericCoercer {
    /// Coerce a raw JSON field.
    pub fn coerce(value: Option<&Value>) -> f64 {
        match value {
            Some(Value::Number(n)) => finite_or_zero(n.as_f64().unwrap_or_default()),
            Some(Value::String(s)) => Self::coerce_str(s),
            _ => 0.0,
        }
    }

    /// Coerce a Brazilian-formatted numeric string such as `"R$ 1.234,56"`.
    ///
    /// Currency symbols, quotes and whitespace are dropped. When a decimal
    /// comma is present every dot is a thousands separator; without a comma,
    /// dots are treated as thousands separators only when they group digits
    /// in threes (`"10.000"`), otherwise as a decimal point (`"1500.5"`).
    /// A value wrapped in parentheses is negative.
    pub fn coerce_str(raw: &str) -> f64 {
        let mut s = raw.replace("R$", "");
        s.retain(|c| !matches!(c, '$' | '"' | '\'') && !c.is_whitespace());

        let negative = s.starts_with('(') && s.ends_with(')');
        let s = s.trim_matches(|c| c == '(' || c == ')');
        if s.is_empty() {
            return 0.0;
        }

        let normalized = if s.contains(',') {
            s.replace('.', "").replace(',', ".")
        } else if is_dot_grouped(s) {
            s.replace('.', "")
        } else {
            s.to_string()
        };

        let value = normalized
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        if negative {
            -value
        } else {
            value
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `true` for strings like `1.234` or `1.234.567` where dots group digits.
fn is_dot_grouped(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut groups = digits.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    let tail: Vec<&str> = groups.collect();
    if tail.is_empty() {
        return false;
    }
    (1..=3).contains(&head.len())
        && head != "0"
        && head.bytes().all(|b| b.is_ascii_digit())
        && tail
            .iter()
            .all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
