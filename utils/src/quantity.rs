//! Formatting helpers for Kubernetes decimal quantities.
//!
//! The only quantity this operator computes itself (everything else is copied through from the
//! cluster object) is the JVM heap size derived from a node's memory request.

/// Computes `floor(percentage / 100 * memory_request_bytes)`, the byte count fed into
/// `-Xmx<N>` on the main container.
///
/// `percentage` is validated elsewhere to be `> 0`; this function tolerates any `i64` and simply
/// produces `0` for a non-positive input rather than panicking, since it may run before
/// admission validation has had a chance to reject the object.
#[must_use]
pub fn heap_bytes(percentage: i64, memory_request_bytes: i64) -> i64 {
    if percentage <= 0 || memory_request_bytes <= 0 {
        return 0;
    }
    let ratio = percentage as f64 / 100.0_f64;
    (ratio * memory_request_bytes as f64) as i64
}

/// Renders a byte count as a Kubernetes decimal-SI quantity string (no suffix for byte-scale
/// values, matching `resource.NewQuantity(n, resource.DecimalSI).String()`).
#[must_use]
pub fn decimal_quantity(bytes: i64) -> String {
    bytes.to_string()
}

/// Parses a Kubernetes resource quantity string (e.g. `"512Mi"`, `"2Gi"`, `"1000"`) into a byte
/// count. Supports the binary (`Ki`/`Mi`/`Gi`/`Ti`) and decimal (`k`/`M`/`G`/`T`) suffixes; a bare
/// number is interpreted as bytes. Returns `None` for anything else rather than panicking, since
/// this runs on user-supplied spec content that admission may not yet have rejected.
#[must_use]
pub fn parse_quantity_bytes(quantity: &str) -> Option<i64> {
    const BINARY: &[(&str, i64)] = &[("Ki", 1 << 10), ("Mi", 1 << 20), ("Gi", 1 << 30), ("Ti", 1 << 40)];
    const DECIMAL: &[(&str, i64)] = &[("k", 1_000), ("M", 1_000_000), ("G", 1_000_000_000), ("T", 1_000_000_000_000)];

    let trimmed = quantity.trim();
    for (suffix, multiplier) in BINARY.iter().chain(DECIMAL) {
        if let Some(number) = trimmed.strip_suffix(suffix) {
            return number.trim().parse::<f64>().ok().map(|n| (n * *multiplier as f64) as i64);
        }
    }
    trimmed.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_percent_of_one_thousand_is_nine_hundred_fifty() {
        assert_eq!(heap_bytes(95, 1000), 950);
    }

    #[test]
    fn zero_percentage_yields_zero() {
        assert_eq!(heap_bytes(0, 1000), 0);
    }

    #[test]
    fn quantity_string_has_no_suffix() {
        assert_eq!(decimal_quantity(950), "950");
    }

    #[test]
    fn parses_binary_and_decimal_suffixes() {
        assert_eq!(parse_quantity_bytes("512Mi"), Some(512 * (1 << 20)));
        assert_eq!(parse_quantity_bytes("2Gi"), Some(2 * (1 << 30)));
        assert_eq!(parse_quantity_bytes("1000"), Some(1000));
        assert_eq!(parse_quantity_bytes("bogus"), None);
    }
}
