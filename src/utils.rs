//! Display formatting helpers for financial values.

/// Format a large dollar amount with a T/B/M suffix, or `N/A` when absent.
///
/// Values under a million are rendered with thousands separators, e.g.
/// `$12,345.67`.
pub fn format_large_number(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "N/A".to_string();
    };

    let negative = value < 0.0;
    let abs = value.abs();

    let formatted = if abs >= 1_000_000_000_000.0 {
        format!("${:.2}T", abs / 1_000_000_000_000.0)
    } else if abs >= 1_000_000_000.0 {
        format!("${:.2}B", abs / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("${:.2}M", abs / 1_000_000.0)
    } else {
        format!("${}", with_thousands_separators(abs))
    };

    if negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

fn with_thousands_separators(abs: f64) -> String {
    let plain = format!("{:.2}", abs);
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    format!("{}.{}", grouped, frac_part)
}
