//! # Numeric Input
//!
//! Lenient parsing for numbers typed on a phone keyboard.
//!
//! ```text
//! "١٢٫٥ kg"  ──normalize──►  "12.5"  ──parse_amount──►  Money(13)
//! "۳۰ pcs"   ──normalize──►  "30"    ──parse_quantity──► 30
//! ```
//!
//! Both Arabic-Indic (U+0660..U+0669) and Extended Arabic-Indic
//! (U+06F0..U+06F9) digits are accepted. Everything that is not a digit or
//! the first decimal point is dropped, so a sign cannot be typed: the ledger
//! has no negative inputs.

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

const ARABIC_DECIMAL_SEPARATOR: char = '\u{066B}';

fn ascii_digit(c: char) -> Option<char> {
    let offset = match c {
        '0'..='9' => return Some(c),
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

/// Maps localized digits to ASCII and strips everything except digits and
/// the first decimal point.
///
/// ## Example
/// ```rust
/// use stockbook_core::numbers::normalize_digits;
///
/// assert_eq!(normalize_digits("١٢٣"), "123");
/// assert_eq!(normalize_digits("Rs 1,250.50.1"), "1250.501");
/// ```
pub fn normalize_digits(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut seen_point = false;

    for c in input.chars() {
        if let Some(d) = ascii_digit(c) {
            out.push(d);
        } else if (c == '.' || c == ARABIC_DECIMAL_SEPARATOR) && !seen_point {
            seen_point = true;
            out.push('.');
        }
    }

    out
}

fn split_number<'a>(field: &str, normalized: &'a str) -> ValidationResult<(&'a str, &'a str)> {
    let (whole, fraction) = normalized.split_once('.').unwrap_or((normalized, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok((whole, fraction))
}

fn parse_whole(field: &str, whole: &str) -> ValidationResult<i64> {
    if whole.is_empty() {
        return Ok(0);
    }
    whole
        .parse::<i64>()
        .map_err(|_| ValidationError::invalid_format(field, "number is too large"))
}

/// Parses a quantity. Fractional quantities are rejected; a zero fraction
/// ("12.0") is accepted.
///
/// Range checks belong to [`crate::validation::validate_quantity`].
pub fn parse_quantity(input: &str) -> ValidationResult<i64> {
    let normalized = normalize_digits(input);
    let (whole, fraction) = split_number("quantity", &normalized)?;

    if fraction.chars().any(|c| c != '0') {
        return Err(ValidationError::invalid_format(
            "quantity",
            "must be a whole number",
        ));
    }

    parse_whole("quantity", whole)
}

/// Parses an amount, rounding half up to whole currency units.
///
/// ## Example
/// ```rust
/// use stockbook_core::numbers::parse_amount;
///
/// assert_eq!(parse_amount("99.5").unwrap().units(), 100);
/// assert_eq!(parse_amount("99.49").unwrap().units(), 99);
/// ```
pub fn parse_amount(input: &str) -> ValidationResult<Money> {
    let normalized = normalize_digits(input);
    let (whole, fraction) = split_number("amount", &normalized)?;
    let units = parse_whole("amount", whole)?;

    let round_up = fraction
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .is_some_and(|d| d >= 5);

    let units = if round_up {
        units
            .checked_add(1)
            .ok_or_else(|| ValidationError::invalid_format("amount", "number is too large"))?
    } else {
        units
    };

    Ok(Money::from_units(units))
}

// =============================================================================
// Unit Tests
// =============================================================================
