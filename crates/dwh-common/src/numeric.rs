//! Locale-invariant numeric parsing and formatting.
//!
//! Every number that reaches an output artifact goes through
//! [`format_numeric`], and every raw cell that is coerced to a number goes
//! through [`parse_f64`], so both sides of a persisted snapshot agree on the
//! textual form of a value.

/// Formats a floating-point number without trailing zeros or exponent.
///
/// Integral values are written without a decimal point and negative zero is
/// written as `0`.
///
/// # Examples
///
/// ```
/// use dwh_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(1.50), "1.5");
/// assert_eq!(format_numeric(2019.0), "2019");
/// assert_eq!(format_numeric(100.0), "100");
/// ```
pub fn format_numeric(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let s = format!("{v}");
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Strictly parses a string as a finite `f64`.
///
/// Surrounding whitespace is ignored. Empty strings, non-numeric text and
/// non-finite values (`NaN`, `inf`) yield `None`.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a surrogate key cell.
///
/// Accepts plain positive integers and their float renderings (`"3"`,
/// `"3.0"`), which is how keys come back from spreadsheets and older
/// exports. Zero, negative and fractional values are rejected.
pub fn parse_key(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    if let Ok(key) = trimmed.parse::<u64>() {
        return (key > 0).then_some(key);
    }
    let float = parse_f64(trimmed)?;
    if float >= 1.0 && float.fract() == 0.0 && float <= u64::MAX as f64 {
        Some(float as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_numeric(1.0), "1");
        assert_eq!(format_numeric(1.5), "1.5");
        assert_eq!(format_numeric(0.0), "0");
        assert_eq!(format_numeric(-0.0), "0");
        assert_eq!(format_numeric(-2.25), "-2.25");
    }

    #[test]
    fn test_format_numeric_keeps_integer_zeros() {
        assert_eq!(format_numeric(100.0), "100");
        assert_eq!(format_numeric(2019.0), "2019");
        assert_eq!(format_numeric(10.50), "10.5");
    }

    #[test]
    fn test_format_numeric_never_uses_exponent() {
        assert_eq!(format_numeric(1e21), "1000000000000000000000");
        assert_eq!(format_numeric(0.000_000_1), "0.0000001");
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("  "), None);
        assert_eq!(parse_f64("3.25"), Some(3.25));
        assert_eq!(parse_f64("  3.25  "), Some(3.25));
        assert_eq!(parse_f64("-7"), Some(-7.0));
        assert_eq!(parse_f64("invalid"), None);
        assert_eq!(parse_f64("1,5"), None);
    }

    #[test]
    fn test_parse_f64_rejects_non_finite() {
        assert_eq!(parse_f64("NaN"), None);
        assert_eq!(parse_f64("inf"), None);
        assert_eq!(parse_f64("-infinity"), None);
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("1"), Some(1));
        assert_eq!(parse_key(" 42 "), Some(42));
        assert_eq!(parse_key("3.0"), Some(3));
        assert_eq!(parse_key("0"), None);
        assert_eq!(parse_key("-1"), None);
        assert_eq!(parse_key("2.5"), None);
        assert_eq!(parse_key(""), None);
    }

    proptest! {
        #[test]
        fn formatted_numbers_parse_back(v in -1.0e12f64..1.0e12f64) {
            let text = format_numeric(v);
            prop_assert_eq!(parse_f64(&text), Some(if v == 0.0 { 0.0 } else { v }));
        }

        #[test]
        fn formatted_integers_have_no_decimal_point(v in -1_000_000i64..1_000_000i64) {
            let text = format_numeric(v as f64);
            prop_assert_eq!(text, v.to_string());
        }
    }
}
