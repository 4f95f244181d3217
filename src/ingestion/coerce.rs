//! Numeric coercion for delimited-text cells.
//!
//! Every cell read from delimited text goes through [`try_coerce_numeric`] as it is appended to
//! its column. Whether a column ends up numeric or categorical is decided later, by the interner.

use crate::types::RawValue;

/// Largest integer magnitude that survives a round trip through `f64` unchanged (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Coerce a raw cell into a number when it looks like one.
///
/// - empty or whitespace-only → [`RawValue::Missing`]
/// - `-?(digits[.digits?] | .digits)([eE][+-]?digits)?`, surrounding whitespace ignored →
///   [`RawValue::Number`] (leading zeros are fine: `007` is 7)
/// - integers beyond ±2^53 stay text, so long identifiers are not rounded
/// - anything else (`+1`, `inf`, `NaN`, `0x1f`, `1,000`) → [`RawValue::Text`] with the original
///   cell
pub fn try_coerce_numeric(cell: &str) -> RawValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return RawValue::Missing;
    }

    let Some(is_integer) = numeric_shape(trimmed) else {
        return RawValue::Text(cell.to_string());
    };

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && !(is_integer && n.abs() > MAX_SAFE_INTEGER) => RawValue::Number(n),
        _ => RawValue::Text(cell.to_string()),
    }
}

/// Returns `Some(is_integer)` when `s` matches the accepted number grammar.
fn numeric_shape(s: &str) -> Option<bool> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    let mut has_dot = false;
    if i < bytes.len() && bytes[i] == b'.' {
        has_dot = true;
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    let mut has_exp = false;
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        has_exp = true;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    (i == bytes.len()).then_some(!has_dot && !has_exp)
}
