//! # Validation Module
//!
//! Input rules applied by the engine before any write is planned.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                  │
//! │  ├── Lenient numeric input (see `numbers`)                              │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: LedgerEngine                                                  │
//! │  └── THIS MODULE: names, quantities, amounts, optional text             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                         │
//! │  └── NOT NULL and CHECK constraints (SQLite backend)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbook_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("Cotton Shirt").unwrap();
//! validate_quantity(5).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT, MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_TRANSACTION_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or entity name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LENGTH`] characters
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_name;
///
/// assert!(validate_name("Ahmed Traders").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates free text (notes, descriptions, addresses).
pub fn validate_text(field: &str, text: &str) -> ValidationResult<()> {
    if text.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }
    Ok(())
}

/// Trims optional text and maps empty or whitespace-only values to `None`.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::normalize_optional;
///
/// assert_eq!(normalize_optional(Some("  ".to_string())), None);
/// assert_eq!(normalize_optional(Some(" 0300 ".to_string())), Some("0300".to_string()));
/// ```
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Light email check: one `@` with text on both sides and a dot in the
/// domain. Deliverability is not our concern.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::invalid_format("email", "missing @"));
    };

    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::invalid_format("email", "malformed address"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::invalid_format("email", "malformed domain"));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format("email", "contains whitespace"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a transaction quantity.
///
/// ## Rules
/// - Must be positive (no zero-quantity movements)
/// - At most [`MAX_TRANSACTION_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_TRANSACTION_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_TRANSACTION_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount such as a price or cost.
///
/// ## Rules
/// - Must not be negative
/// - At most [`MAX_AMOUNT`]
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.units() > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates a non-negative count such as `min_stock` or initial stock.
pub fn validate_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a referenced id: present and non-blank.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
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
        assert!(validate_name("Shirt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(matches!(
            validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_name_length_counts_characters() {
        // Arabic letters are two bytes each in UTF-8.
        let name = "ق".repeat(MAX_NAME_LENGTH);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_TRANSACTION_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-3).is_err());
        assert!(matches!(
            validate_quantity(MAX_TRANSACTION_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_amount_and_count() {
        assert!(validate_amount("price", Money::zero()).is_ok());
        assert!(validate_amount("price", Money::from_units(-1)).is_err());
        assert!(validate_amount("price", Money::from_units(MAX_AMOUNT)).is_ok());
        assert!(matches!(
            validate_amount("price", Money::from_units(MAX_AMOUNT + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_count("min_stock", 0).is_ok());
        assert!(validate_count("min_stock", -1).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some(String::new())), None);
        assert_eq!(
            normalize_optional(Some("  Lahore ".to_string())),
            Some("Lahore".to_string())
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("shop@example.com").is_ok());
        assert!(validate_email("shop.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("shop@example").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("product", "p-1").is_ok());
        assert!(validate_id("product", "  ").is_err());
    }
}
