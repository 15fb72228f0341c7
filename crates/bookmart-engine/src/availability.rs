//! # Availability Gate
//!
//! Pre-commit checks for purchase requests: the buying customer must be
//! Active, and every requested book must currently be sellable.
//!
//! These checks run before any mutation, so a rejected request leaves
//! no trace in the store. They are advisory under concurrency; the
//! compare-and-set commit is what actually closes the race.

use std::collections::BTreeSet;

use crate::error::{EngineError, EngineResult};
use bookmart_db::Database;

/// Read-only availability checks backed by the store.
#[derive(Debug, Clone)]
pub struct AvailabilityValidator {
    db: Database,
}

impl AvailabilityValidator {
    /// Creates a new validator.
    pub fn new(db: Database) -> Self {
        AvailabilityValidator { db }
    }

    /// Whether the customer exists and is Active.
    ///
    /// ## Returns
    /// * `Ok(true)` - Customer is Active
    /// * `Ok(false)` - Customer exists but is Inactive
    /// * `Err(EngineError::NotFound)` - Customer does not resolve
    pub async fn customer_is_active(&self, id: i64) -> EngineResult<bool> {
        let customer = self
            .db
            .customers()
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", id))?;

        Ok(customer.is_active())
    }

    /// Whether every id resolves to a currently sellable book.
    ///
    /// A missing id counts as unsellable rather than an error; the caller
    /// reports the whole set as unavailable either way.
    pub async fn all_books_sellable(&self, ids: &BTreeSet<i64>) -> EngineResult<bool> {
        if ids.is_empty() {
            return Ok(false);
        }

        let id_vec: Vec<i64> = ids.iter().copied().collect();
        let books = self.db.books().get_all_by_ids(&id_vec).await?;

        if books.len() != ids.len() {
            return Ok(false);
        }

        Ok(books.iter().all(|b| b.is_sellable()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bookmart_core::{BookStatus, CustomerStatus, NewBook, NewCustomer, Role};
    use bookmart_db::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_customer(db: &Database, email: &str) -> i64 {
        db.customers()
            .insert(&NewCustomer {
                name: "C".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$fake".to_string(),
                roles: [Role::Customer].into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_customer_activity() {
        let db = test_db().await;
        let validator = AvailabilityValidator::new(db.clone());
        let id = seed_customer(&db, "c@example.com").await;

        assert!(validator.customer_is_active(id).await.unwrap());

        db.customers().set_status(id, CustomerStatus::Inactive).await.unwrap();
        assert!(!validator.customer_is_active(id).await.unwrap());

        let err = validator.customer_is_active(9999).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_books_sellable() {
        let db = test_db().await;
        let validator = AvailabilityValidator::new(db.clone());
        let owner = seed_customer(&db, "o@example.com").await;

        let a = db
            .books()
            .insert(&NewBook {
                name: "A".to_string(),
                price_cents: 100,
                customer_id: owner,
            })
            .await
            .unwrap();
        let b = db
            .books()
            .insert(&NewBook {
                name: "B".to_string(),
                price_cents: 200,
                customer_id: owner,
            })
            .await
            .unwrap();

        let both: BTreeSet<i64> = [a.id, b.id].into();
        assert!(validator.all_books_sellable(&both).await.unwrap());

        // One book sold: the whole set is unavailable
        db.books()
            .transition_batch(&[b.id], BookStatus::Active, BookStatus::Sold)
            .await
            .unwrap();
        assert!(!validator.all_books_sellable(&both).await.unwrap());

        // Missing ids are unsellable, not an error
        let with_missing: BTreeSet<i64> = [a.id, 9999].into();
        assert!(!validator.all_books_sellable(&with_missing).await.unwrap());

        // Empty set is never sellable
        assert!(!validator.all_books_sellable(&BTreeSet::new()).await.unwrap());
    }
}
