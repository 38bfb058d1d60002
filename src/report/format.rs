use num_format::{Locale, ToFormattedString as _};

/// Format with thousands separators and two decimals (`1,234.56`).
///
/// Always uses the en locale ('.' as decimal mark) regardless of the
/// user's locale.
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let cents = (value.abs() * 100.0).round() as i64;
    let sign = if value < 0.0 && cents != 0 { "-" } else { "" };
    format!(
        "{sign}{}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Currency in the report's `$#,##0.00` form; negatives print as `$-12.00`.
pub fn format_currency(value: f64) -> String {
    format!("${}", format_grouped(value))
}

/// A statistic value, or `n/a` when it is undefined for the view.
pub fn format_statistic(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), format_grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_and_rounds_to_cents() {
        assert_eq!(format_grouped(1234567.891), "1,234,567.89");
        assert_eq!(format_grouped(0.005), "0.01");
        assert_eq!(format_grouped(-1500.0), "-1,500.00");
        assert_eq!(format_grouped(-0.001), "0.00");
    }

    #[test]
    fn currency_has_dollar_prefix() {
        assert_eq!(format_currency(600.0), "$600.00");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-12.0), "$-12.00");
    }

    #[test]
    fn undefined_statistic_is_not_zero() {
        assert_eq!(format_statistic(None), "n/a");
        assert_eq!(format_statistic(Some(0.0)), "0.00");
    }
}
