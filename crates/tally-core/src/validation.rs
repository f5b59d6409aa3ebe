//! # Validation Module
//!
//! Input validation for ledger writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Screen                                                       │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger (Rust)                                                │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: arithmetic and range rules                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Record Store                                                 │
//! │  └── A write either fully replaces a collection or changes nothing     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The till's arithmetic is never trusted: [`validate_items`] recomputes
//! every subtotal and the total before anything is persisted.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::PurchaseItem;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted name (good or customer).
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LEN`] characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_name;
///
/// assert!(validate_name("name", "Rice (1kg)").is_ok());
/// assert!(validate_name("name", "  ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional free-text field (customer name, phone, reason).
pub fn validate_optional_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a catalogue price. Goods are never free.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::must_be_positive("price"));
    }
    Ok(())
}

/// Validates a line quantity (at least 1).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(())
}

/// Validates a stock level. Zero means out of stock.
pub fn validate_stock_level(level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stockLevel".to_string(),
        });
    }
    Ok(())
}

/// Validates `0 < amount <= limit`.
///
/// ## User Workflow
/// ```text
/// Refund 250.00 on a 200.00 sale
///      │
///      ▼
/// validate_amount_within("refund amount", 250.00, 200.00)
///      │
///      ├── amount <= 0?     → MustBePositive
///      ├── amount > limit?  → ExceedsLimit  ◄── this case
///      └── OK               → proceed
/// ```
pub fn validate_amount_within(field: &str, amount: Money, limit: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }

    if amount > limit {
        return Err(ValidationError::ExceedsLimit {
            field: field.to_string(),
            amount,
            limit,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates purchase lines and returns their exact total.
///
/// ## Rules
/// - At least one line
/// - Every line has a good id, a name, a positive price, a quantity ≥ 1
/// - Every `subtotal == price × quantity`
pub fn validate_items(items: &[PurchaseItem]) -> ValidationResult<Money> {
    if items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }

    for (index, item) in items.iter().enumerate() {
        if item.good_id.trim().is_empty() {
            return Err(ValidationError::required("goodId"));
        }
        validate_name("item name", &item.name)?;
        validate_price(item.price)?;
        validate_quantity(item.quantity)?;

        let expected = item
            .price
            .checked_multiply_quantity(item.quantity)
            .ok_or_else(|| ValidationError::AmountOverflow {
                field: format!("item {} subtotal", index + 1),
            })?;
        if item.subtotal != expected {
            return Err(ValidationError::SubtotalMismatch {
                line: index + 1,
                expected,
                actual: item.subtotal,
            });
        }
    }

    Money::checked_sum(items.iter().map(|i| i.subtotal)).ok_or_else(|| ValidationError::AmountOverflow {
        field: "total".to_string(),
    })
}

/// Validates lines and checks the caller's claimed total against them.
pub fn validate_items_and_total(items: &[PurchaseItem], claimed_total: Money) -> ValidationResult<Money> {
    let expected = validate_items(items)?;

    if claimed_total != expected {
        return Err(ValidationError::TotalMismatch {
            expected,
            actual: claimed_total,
        });
    }

    Ok(expected)
}

// =============================================================================
// Unit Tests
// =============================================================================
