//! Quantity-string arithmetic (`spec.md` §4.D point 2, §9 design note on the
//! `isdigit()`-based unit split). The unit is treated as the suffix
//! starting at the first non-digit byte and kept verbatim — no attempt is
//! made to normalize `Gi` vs `G` vs `Ki`.

/// Splits `"4Gi"` into `("4", "Gi")`. A quantity with no digit prefix splits
/// to `("", raw)`.
pub fn split_quantity(raw: &str) -> (&str, &str) {
    let split_at = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    raw.split_at(split_at)
}

/// `value * (1 + multiplier)`, unit preserved, per `spec.md` §4.D point 2:
/// "memory limit = MEMORY × (1 + JOB_LIMIT_MULTIPLIER) preserving the unit
/// suffix".
pub fn scaled_quantity(raw: &str, multiplier: f64) -> String {
    let (value, unit) = split_quantity(raw);
    let value: i64 = value.parse().unwrap_or(0);
    let scaled = value + ((value as f64) * multiplier) as i64;
    format!("{scaled}{unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_digit_prefix_from_unit() {
        assert_eq!(split_quantity("512Mi"), ("512", "Mi"));
        assert_eq!(split_quantity("250m"), ("250", "m"));
    }

    #[test]
    fn scales_preserving_unit() {
        assert_eq!(scaled_quantity("1000Mi", 0.5), "1500Mi");
        assert_eq!(scaled_quantity("4Gi", 0.25), "5Gi");
    }
}
