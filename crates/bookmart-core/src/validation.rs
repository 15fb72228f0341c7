//! # Validation Module
//!
//! Boundary validation and access guards for Bookmart.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request boundary (HTTP glue, outside this repo)              │
//! │  ├── Shape checks (deserialization)                                    │
//! │  └── THIS MODULE: field rules + access guard, called explicitly        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (availability gate)                                   │
//! │  ├── Customer active?                                                  │
//! │  └── All books sellable?                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Compare-and-set status writes                                     │
//! │                                                                         │
//! │  Defense in depth: each layer catches a different failure class        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! These are plain functions rather than declarative annotations so the
//! "is this request even shaped right" question is answerable anywhere,
//! without a framework in the loop.

use std::collections::BTreeSet;

use crate::error::{ValidationError, ValidationResult};
use crate::types::Role;
use crate::{MAX_BOOKS_PER_PURCHASE, MAX_EMAIL_LEN, MAX_NAME_LEN};

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer or book name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 200 characters
///
/// ## Example
/// ```rust
/// use bookmart_core::validation::validate_name;
///
/// assert!(validate_name("The Name of the Wind").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 320 characters
/// - Must contain exactly one `@` with non-empty local and domain parts
/// - Must not contain whitespace
///
/// Deliberately shallow - deliverability is not this core's problem,
/// uniqueness is checked against the store at registration time.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let mut parts = email.split('@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || parts.next().is_some() {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected local@domain".to_string(),
        });
    }

    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a raw password credential (before hashing).
///
/// ## Rules
/// - Must not be empty
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free listings)
///
/// ## Example
/// ```rust
/// use bookmart_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // $10.99
/// assert!(validate_price_cents(0).is_ok());     // Free book
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// ```
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

/// Validates an entity id (store-assigned ids are always positive).
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Purchase Request Validator
// =============================================================================

/// Validates the inbound purchase request shape.
///
/// ## Rules
/// - Customer id positive
/// - Book id set non-empty (a purchase references at least one book)
/// - Every book id positive
/// - At most MAX_BOOKS_PER_PURCHASE entries
///
/// The set type guarantees unique membership by construction; duplicate
/// ids in the wire payload collapse before they reach this check.
pub fn validate_purchase_request(
    customer_id: i64,
    book_ids: &BTreeSet<i64>,
) -> ValidationResult<()> {
    validate_id("customer_id", customer_id)?;

    if book_ids.is_empty() {
        return Err(ValidationError::Required {
            field: "book_ids".to_string(),
        });
    }

    if book_ids.len() > MAX_BOOKS_PER_PURCHASE {
        return Err(ValidationError::TooMany {
            field: "book_ids".to_string(),
            max: MAX_BOOKS_PER_PURCHASE,
        });
    }

    for &id in book_ids {
        validate_id("book_ids", id)?;
    }

    Ok(())
}

// =============================================================================
// Access Guard
// =============================================================================

/// Capability check: may this actor act on a customer-owned resource?
///
/// Replaces route-level ownership annotations with an explicit predicate
/// the request boundary calls before entering the engine. Admins may act
/// on anything; everyone else only on their own resources.
pub fn can_access_customer(actor_id: i64, actor_roles: &BTreeSet<Role>, resource_owner: i64) -> bool {
    actor_id == resource_owner || actor_roles.contains(&Role::Admin)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("The Hobbit").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("reader@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("reader@").is_err());
        assert!(validate_email("two@@signs.com").is_err());
        assert!(validate_email("has space@example.com").is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-1).is_err());
    }

    #[test]
    fn test_validate_purchase_request() {
        let books: BTreeSet<i64> = [1, 2, 3].into();
        assert!(validate_purchase_request(1, &books).is_ok());

        // Empty book set
        assert!(validate_purchase_request(1, &BTreeSet::new()).is_err());

        // Bad customer id
        assert!(validate_purchase_request(0, &books).is_err());

        // Bad book id
        let bad: BTreeSet<i64> = [1, -2].into();
        assert!(validate_purchase_request(1, &bad).is_err());
    }

    #[test]
    fn test_can_access_customer() {
        let customer_only: BTreeSet<Role> = [Role::Customer].into();
        let admin: BTreeSet<Role> = [Role::Customer, Role::Admin].into();

        assert!(can_access_customer(7, &customer_only, 7));
        assert!(!can_access_customer(7, &customer_only, 8));
        assert!(can_access_customer(7, &admin, 8));
    }
}
