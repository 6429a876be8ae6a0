//! Lenient parsing for provider-native numeric fields.
//!
//! Market-data APIs that predate JSON number types ship every figure as a
//! string, sometimes with thousands separators or a leading sign marker.
//! These helpers normalize such fields without panicking on garbage input.

/// Parses a provider numeric string into `f64`.
///
/// Tolerates surrounding whitespace, thousands separators (`,`) and an
/// explicit leading `+`. Returns `None` for empty or unparseable input.
pub fn lenient_f64(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Parses a provider numeric string into a non-negative volume figure.
///
/// Negative values are rejected; volume can legitimately be zero on
/// trading halts.
pub fn lenient_volume(raw: &str) -> Option<f64> {
    lenient_f64(raw).filter(|v| *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_separated_numbers() {
        assert_eq!(lenient_f64("12345"), Some(12345.0));
        assert_eq!(lenient_f64("1,234,567"), Some(1_234_567.0));
        assert_eq!(lenient_f64(" 72.5 "), Some(72.5));
        assert_eq!(lenient_f64("+3.2"), Some(3.2));
        assert_eq!(lenient_f64("-120"), Some(-120.0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(lenient_f64(""), None);
        assert_eq!(lenient_f64("  "), None);
        assert_eq!(lenient_f64("n/a"), None);
    }

    #[test]
    fn volume_rejects_negative() {
        assert_eq!(lenient_volume("0"), Some(0.0));
        assert_eq!(lenient_volume("-5"), None);
    }
}
