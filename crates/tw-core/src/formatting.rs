//! Number formatting for reports, log summaries and chart labels.

/// Format a number with thousands separators and a fixed number of decimals.
///
/// # Examples
///
/// ```
/// use tw_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return format_stat(value, decimals);
    }
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a relative epsilon so exact binary midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let grouped = group_thousands(&(rounded.trunc() as u64).to_string());
    let body = if decimals == 0 {
        grouped
    } else {
        let frac = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        format!("{}{}", grouped, &frac[1..])
    };

    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

/// Format a statistic, rendering undefined values as `nan`.
///
/// ```
/// use tw_core::formatting::format_stat;
///
/// assert_eq!(format_stat(0.12345, 3), "0.123");
/// assert_eq!(format_stat(f64::NAN, 3), "nan");
/// ```
pub fn format_stat(value: f64, decimals: u32) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:.prec$}", value, prec = decimals as usize)
    }
}

/// `(part / whole) * 100`, `0.0` when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

/// Pie-slice label, e.g. `"42.3%"`.
pub fn format_share(part: f64, whole: f64) -> String {
    format!("{:.1}%", percentage(part, whole))
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    let len = s.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_000.0, 0), "1,000");
        assert_eq!(format_number(999.0, 0), "999");
    }

    #[test]
    fn test_format_number_rounds_midpoint_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    #[test]
    fn test_format_number_nan() {
        assert_eq!(format_number(f64::NAN, 2), "nan");
    }

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(2.0, 2), "2.00");
        assert_eq!(format_stat(f64::INFINITY, 1), "inf");
    }

    #[test]
    fn test_percentage_zero_whole() {
        assert_eq!(percentage(10.0, 0.0), 0.0);
        assert!((percentage(1.0, 4.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_format_share() {
        assert_eq!(format_share(1.0, 3.0), "33.3%");
    }
}
