/// Format a number the Brazilian way: `.` groups thousands, `,` separates
/// decimals.
///
/// # Examples
///
/// ```
/// use dashboard_core::formatting::format_number_br;
///
/// assert_eq!(format_number_br(1234.5, 1), "1.234,5");
/// assert_eq!(format_number_br(1234567.0, 0), "1.234.567");
/// assert_eq!(format_number_br(0.0, 2), "0,00");
/// assert_eq!(format_number_br(-9876.5, 1), "-9.876,5");
/// ```
pub fn format_number_br(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return format_number_br(0.0, decimals);
    }
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a tiny epsilon so exact decimal midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let text = format!("{:.*}", decimals as usize, rounded);
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut result = group_thousands(int_part);
    if let Some(frac) = frac_part {
        result.push(',');
        result.push_str(frac);
    }

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format an amount in reais.
///
/// # Examples
///
/// ```
/// use dashboard_core::formatting::format_brl;
///
/// assert_eq!(format_brl(1234.56), "R$ 1.234,56");
/// assert_eq!(format_brl(0.0), "R$ 0,00");
/// assert_eq!(format_brl(-9.99), "-R$ 9,99");
/// ```
pub fn format_brl(amount: f64) -> String {
    let body = format_number_br(amount.abs(), 2);
    if amount < 0.0 && body != "0,00" {
        format!("-R$ {}", body)
    } else {
        format!("R$ {}", body)
    }
}

/// Format a value that is already a percentage.
///
/// ```
/// use dashboard_core::formatting::format_percent;
///
/// assert_eq!(format_percent(12.345, 1), "12,3%");
/// ```
pub fn format_percent(value: f64, decimals: u32) -> String {
    format!("{}%", format_number_br(value, decimals))
}

/// Format a fraction (`0.25`) as a percentage (`25,0%`).
pub fn format_share(fraction: f64, decimals: u32) -> String {
    format_percent(fraction * 100.0, decimals)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert dots every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push('.');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number_br ─────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number_br(0.0, 0), "0");
        assert_eq!(format_number_br(0.0, 2), "0,00");
    }

    #[test]
    fn test_format_number_no_thousands() {
        assert_eq!(format_number_br(123.456, 2), "123,46");
    }

    #[test]
    fn test_format_number_millions() {
        assert_eq!(format_number_br(1_234_567.0, 0), "1.234.567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number_br(-9_876.5, 1), "-9.876,5");
    }

    #[test]
    fn test_format_number_negative_rounding_to_zero() {
        assert_eq!(format_number_br(-0.001, 2), "0,00");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number_br(1.005, 2), "1,01");
    }

    #[test]
    fn test_format_number_non_finite() {
        assert_eq!(format_number_br(f64::NAN, 2), "0,00");
    }

    // ── format_brl ───────────────────────────────────────────────────────────

    #[test]
    fn test_format_brl_positive() {
        assert_eq!(format_brl(10_000.0), "R$ 10.000,00");
    }

    #[test]
    fn test_format_brl_negative() {
        assert_eq!(format_brl(-1_500.5), "-R$ 1.500,50");
    }

    #[test]
    fn test_format_brl_large() {
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
    }

    // ── percentages ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(40.0, 1), "40,0%");
        assert_eq!(format_percent(-12.5, 0), "-13%");
    }

    #[test]
    fn test_format_share() {
        assert_eq!(format_share(0.25, 1), "25,0%");
        assert_eq!(format_share(0.0, 1), "0,0%");
    }
}
