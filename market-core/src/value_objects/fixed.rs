//! Decimal string <-> fixed-point conversion shared by `Price` and `Quantity`.

use super::error::ValueError;

/// 8 implied decimal places
pub const FIXED_DECIMALS: u8 = 8;
pub const FIXED_SCALE: i64 = 100_000_000;

/// Parse an unsigned decimal string ("123.45678901") into a raw scaled value.
///
/// Digits past the 8th decimal place are truncated.
pub(crate) fn parse_unsigned(s: &str) -> Result<i64, ValueError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValueError::Empty);
    }
    if s.starts_with('-') {
        return Err(ValueError::Negative(s.to_string()));
    }

    let (int_str, frac_str) = match s.split_once('.') {
        Some((int_str, frac_str)) => (int_str, frac_str),
        None => (s, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if int_str.is_empty() || !all_digits(int_str) || !all_digits(frac_str) {
        return Err(ValueError::Invalid(s.to_string()));
    }

    let int_part: i64 = int_str
        .parse()
        .map_err(|_| ValueError::Overflow(s.to_string()))?;

    let frac_digits = &frac_str[..frac_str.len().min(FIXED_DECIMALS as usize)];
    let frac_scaled = if frac_digits.is_empty() {
        0
    } else {
        let frac: i64 = frac_digits
            .parse()
            .map_err(|_| ValueError::Invalid(s.to_string()))?;
        frac * 10i64.pow(FIXED_DECIMALS as u32 - frac_digits.len() as u32)
    };

    int_part
        .checked_mul(FIXED_SCALE)
        .and_then(|v| v.checked_add(frac_scaled))
        .ok_or_else(|| ValueError::Overflow(s.to_string()))
}

/// Convert a non-negative finite float into a raw scaled value.
pub(crate) fn from_f64(value: f64) -> Result<i64, ValueError> {
    if !value.is_finite() {
        return Err(ValueError::Invalid(value.to_string()));
    }
    if value < 0.0 {
        return Err(ValueError::Negative(value.to_string()));
    }
    let scaled = (value * FIXED_SCALE as f64).round();
    if scaled > i64::MAX as f64 {
        return Err(ValueError::Overflow(value.to_string()));
    }
    Ok(scaled as i64)
}

/// Render a raw scaled value without trailing fractional zeros ("50000", "0.5").
pub(crate) fn format(raw: i64, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let int_part = raw / FIXED_SCALE;
    let frac_part = (raw % FIXED_SCALE).abs();
    if frac_part == 0 {
        return write!(f, "{}", int_part);
    }
    let frac = format!("{:08}", frac_part);
    write!(f, "{}.{}", int_part, frac.trim_end_matches('0'))
}
