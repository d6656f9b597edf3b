//! Numeric literal decoding.
//!
//! baksmali prints integer constants as hexadecimal magnitudes with an
//! optional leading minus sign (`0x1f`, `-0x1`) and an optional width suffix
//! (`L` for wide, `t` for byte, `s` for short).

/// Decode a smali hex literal into a signed 64-bit integer.
///
/// Returns `None` when the text is not a hex literal or does not fit.
pub fn decode_hex_literal(text: &str) -> Option<i64> {
    let text = text.trim().trim_end_matches(['L', 't', 's']);

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let digits = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, 16).ok()?;
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return None;
        }
        Some((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).ok()
    }
}
