//! # Validation Module
//!
//! Input validation for operator-entered values. Runs before business
//! logic; a failure here means nothing was mutated or persisted.

use crate::cart::Discount;
use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest accepted day offset for vencimiento scheduling (10 years).
pub const MAX_DAY_OFFSET: i64 = 3650;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (tutor, paciente, product).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a catalog search query.
///
/// Empty is fine (returns default results); capped at 100 characters.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a discrete quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a continuous dose amount.
///
/// ## Rules
/// - Must be finite and positive
/// - Capped at 10,000 units (fat-finger guard)
pub fn validate_dose(dose: f64) -> ValidationResult<()> {
    if !dose.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "dose".to_string(),
            reason: "must be a number".to_string(),
        });
    }

    if dose <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "dose".to_string(),
        });
    }

    if dose > 10_000.0 {
        return Err(ValidationError::OutOfRange {
            field: "dose".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a price in centavos.
///
/// Zero is allowed (courtesy items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment entry amount in centavos.
///
/// Operator-entered entries must be positive; only the synthetic vuelto
/// entry carries a negative amount, and it is never validated here.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a per-line discount.
///
/// Percentage caps at 100%; fixed amounts must be non-negative but are
/// NOT capped to the line subtotal.
pub fn validate_discount(discount: &Discount) -> ValidationResult<()> {
    match discount {
        Discount::None => Ok(()),
        Discount::Percentage { bps } => {
            if *bps > 10_000 {
                return Err(ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: 10_000,
                });
            }
            Ok(())
        }
        Discount::Fixed { cents } => {
            if *cents < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
            Ok(())
        }
    }
}

/// Validates a vencimiento day offset.
///
/// Zero is accepted and means "skip scheduling".
pub fn validate_day_offset(days: i64) -> ValidationResult<()> {
    if !(0..=MAX_DAY_OFFSET).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 0,
            max: MAX_DAY_OFFSET,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Firulais").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  pipeta ").unwrap(), "pipeta");
        assert!(validate_search_query(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_dose() {
        assert!(validate_dose(0.5).is_ok());
        assert!(validate_dose(0.0).is_err());
        assert!(validate_dose(-1.0).is_err());
        assert!(validate_dose(f64::NAN).is_err());
        assert!(validate_dose(20_000.0).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(&Discount::None).is_ok());
        assert!(validate_discount(&Discount::Percentage { bps: 10_000 }).is_ok());
        assert!(validate_discount(&Discount::Percentage { bps: 10_001 }).is_err());
        assert!(validate_discount(&Discount::Fixed { cents: 0 }).is_ok());
        assert!(validate_discount(&Discount::Fixed { cents: -1 }).is_err());
    }

    #[test]
    fn test_validate_day_offset() {
        assert!(validate_day_offset(0).is_ok());
        assert!(validate_day_offset(30).is_ok());
        assert!(validate_day_offset(-1).is_err());
        assert!(validate_day_offset(4000).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(100).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-100).is_err());
    }
}
