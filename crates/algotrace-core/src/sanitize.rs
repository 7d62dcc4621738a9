//! Mapping of non-JSON numeric values to `null`.
//!
//! Domain logic often keeps sentinels such as "no bound set yet" as
//! `f64::INFINITY` / `f64::NEG_INFINITY`. JSON has no representation for
//! those, so they must be passed through [`sanitize`] before being embedded
//! in a step payload. The recorder does not deep-scan payloads.

/// Maps positive and negative infinity to `None`; every other value passes
/// through unchanged.
///
/// Accepts both `f64` and `Option<f64>`, so sanitizing an already sanitized
/// value is a no-op:
///
/// ```
/// use algotrace_core::sanitize;
///
/// assert_eq!(sanitize(f64::NEG_INFINITY), None);
/// assert_eq!(sanitize(2.5), Some(2.5));
/// assert_eq!(sanitize(sanitize(f64::INFINITY)), None);
/// ```
///
/// `NaN` is not special-cased here; `serde_json` already serializes it as
/// `null`.
pub fn sanitize(value: impl Into<Option<f64>>) -> Option<f64> {
    value.into().filter(|v| !v.is_infinite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn infinities_become_none() {
        assert_eq!(sanitize(f64::INFINITY), None);
        assert_eq!(sanitize(f64::NEG_INFINITY), None);
    }

    #[test]
    fn finite_values_pass_through() {
        assert_eq!(sanitize(0.0), Some(0.0));
        assert_eq!(sanitize(-3.5), Some(-3.5));
        assert_eq!(sanitize(f64::MAX), Some(f64::MAX));
        assert_eq!(sanitize(None), None);
    }

    #[test]
    fn sanitized_infinity_serializes_as_null() {
        let json = serde_json::to_string(&sanitize(f64::NEG_INFINITY)).unwrap();
        assert_eq!(json, "null");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(x in prop::num::f64::ANY) {
            let once = sanitize(x);
            let twice = sanitize(once);
            // Compare bit patterns so NaN inputs are handled.
            prop_assert_eq!(once.map(f64::to_bits), twice.map(f64::to_bits));
        }

        #[test]
        fn finite_values_are_unchanged(x in -1e300f64..1e300f64) {
            prop_assert_eq!(sanitize(x), Some(x));
        }
    }
}
