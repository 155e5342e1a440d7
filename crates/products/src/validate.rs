//! Field-level checks shared by every record constructor.

use rust_decimal::Decimal;

use catalog_core::{DomainError, DomainResult};

/// Trimmed, non-empty text no longer than `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    bounded(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Optional text: blank collapses to `None`, anything else is length-checked.
pub fn optional_text(field: &str, value: Option<&str>, max: Option<usize>) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            if let Some(max) = max {
                bounded(field, v, max)?;
            }
            Ok(Some(v.to_string()))
        }
    }
}

fn bounded(field: &str, value: &str, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

/// Non-negative fixed-point number with at most `scale` decimal places and
/// `digits` significant digits overall, rescaled to exactly `scale` places.
pub fn fixed_point(field: &str, value: Decimal, digits: u32, scale: u32) -> DomainResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    let normalized = value.normalize();
    if normalized.scale() > scale {
        return Err(DomainError::validation(format!(
            "{field} allows at most {scale} decimal places"
        )));
    }
    let limit = Decimal::from(10u64.pow(digits - scale));
    if normalized.trunc() >= limit {
        return Err(DomainError::validation(format!(
            "{field} allows at most {} digits before the decimal point",
            digits - scale
        )));
    }
    let mut out = normalized;
    out.rescale(scale);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", "  Nike ", 100).unwrap(), "Nike");
        assert!(matches!(
            required_text("name", "   ", 100),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn required_text_counts_characters_not_bytes() {
        assert!(required_text("name", "ééééé", 5).is_ok());
        assert!(required_text("name", "éééééé", 5).is_err());
    }

    #[test]
    fn optional_text_collapses_blank_to_none() {
        assert_eq!(optional_text("barcode", Some("  "), Some(50)).unwrap(), None);
        assert_eq!(optional_text("barcode", None, Some(50)).unwrap(), None);
        assert_eq!(
            optional_text("barcode", Some(" 123 "), Some(50)).unwrap(),
            Some("123".to_string())
        );
    }

    #[test]
    fn fixed_point_rescales_and_bounds() {
        let v = fixed_point("unit_price", Decimal::from(100), 10, 2).unwrap();
        assert_eq!(v.to_string(), "100.00");

        assert!(fixed_point("unit_price", Decimal::new(12345, 3), 10, 2).is_err());
        assert!(fixed_point("unit_price", Decimal::new(-1, 0), 10, 2).is_err());
        assert!(fixed_point("discount", Decimal::from(1000), 5, 2).is_err());
        assert!(fixed_point("discount", Decimal::new(99999, 2), 5, 2).is_ok());
    }

    #[test]
    fn fixed_point_accepts_trailing_zeros_beyond_scale() {
        let v = fixed_point("unit_price", Decimal::new(10000, 4), 10, 2).unwrap();
        assert_eq!(v.to_string(), "1.00");
    }
}
