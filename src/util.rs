// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV number handling so the rest of the
// code can assume typed values, with `None` standing for a missing cell.
use num_format::{Locale, ToFormattedString};

/// Parse a cell into `f64` the lenient way comparison exports need.
///
/// - Trims whitespace.
/// - Treats a comma as the decimal separator (`"1,5"` is `1.5`).
/// - Returns `None` for empty cells, unparsable text and non-finite values.
pub fn parse_f64_lenient(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', ".");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `true` when a cell carried text that `parse_f64_lenient` had to discard.
pub fn is_coercion_loss(raw: Option<&str>, parsed: Option<f64>) -> bool {
    parsed.is_none() && raw.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Non-blank, trimmed text or `None`.
pub fn non_blank(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). Undefined below two values.
pub fn sample_std(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let m = mean(v)?;
    let ss: f64 = v.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (v.len() - 1) as f64).sqrt())
}

pub fn median(mut v: Vec<f64>) -> Option<f64> {
    // Taken by value so the sort happens in place without a clone at the
    // call site.
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some((v[mid - 1] + v[mid]) / 2.0)
    }
}

/// Largest present value, ignoring missing ones.
pub fn max_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().reduce(f64::max)
}

/// Round to `decimals` places, ties to even.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round_ties_even() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places with locale-aware thousands separators
    // (e.g. `1,234,567.89`). The sign is read off the rounded text so that
    // `-0.001` prints as `0.00`.
    let s = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let mut res = match int_part.parse::<u64>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        // Beyond u64 the digits are kept as-is rather than misreported.
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    let neg = n < 0.0 && s.bytes().any(|b| matches!(b, b'1'..=b'9'));
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_optional(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "NaN".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g. `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
