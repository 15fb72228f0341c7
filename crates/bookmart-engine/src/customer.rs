//! # Customer Service
//!
//! Account lifecycle: registration with password hashing, profile
//! updates, lookups, and deactivation with the book cascade.
//!
//! ## Deactivation Order
//! ```text
//! deactivate(id)
//!     │
//!     ├── 1. resolve customer (NotFound if absent)
//!     ├── 2. cancel every Active book the customer owns
//!     └── 3. flip the customer to Inactive
//!
//! The cascade runs before the status flip, so no moment exists where
//! the customer is Inactive while their books are still purchasable.
//! Sold and Deleted books are untouched; the sales record stays intact.
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use bookmart_core::{validation, Customer, CustomerStatus, NewCustomer, Page, PageRequest, Role};
use bookmart_db::{Database, StoreError};

/// Customer account operations.
#[derive(Debug, Clone)]
pub struct CustomerService {
    db: Database,
}

impl CustomerService {
    /// Creates a new CustomerService.
    pub fn new(db: Database) -> Self {
        CustomerService { db }
    }

    /// Registers a new customer account.
    ///
    /// The password is hashed with Argon2 before it reaches the store;
    /// the plaintext is never persisted. New accounts start Active with
    /// the Customer role.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Registered account
    /// * `Err(EngineError::EmailTaken)` - Email already registered
    /// * `Err(EngineError::Validation)` - Field validation failed
    pub async fn register(&self, name: &str, email: &str, password: &str) -> EngineResult<Customer> {
        validation::validate_name(name)?;
        validation::validate_email(email)?;
        validation::validate_password(password)?;

        if !self.email_available(email).await? {
            return Err(EngineError::EmailTaken(email.to_string()));
        }

        let password_hash = hash_password(password)?;

        let new = NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            roles: [Role::Customer].into(),
        };

        // The unique index is the authority; a concurrent registration
        // that slips past the availability check above still loses here.
        let customer = match self.db.customers().insert(&new).await {
            Ok(customer) => customer,
            Err(StoreError::UniqueViolation { .. }) => {
                return Err(EngineError::EmailTaken(email.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(id = %customer.id, "Customer registered");
        Ok(customer)
    }

    /// Gets a customer by id.
    pub async fn get(&self, id: i64) -> EngineResult<Customer> {
        self.db
            .customers()
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", id))
    }

    /// Lists customers, optionally filtered by a name fragment.
    pub async fn get_all(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> EngineResult<Page<Customer>> {
        let result = match name {
            Some(fragment) => self.db.customers().list_by_name(fragment, page).await?,
            None => self.db.customers().list(page).await?,
        };
        Ok(result)
    }

    /// Updates a customer's profile (name and email).
    pub async fn update(&self, id: i64, name: &str, email: &str) -> EngineResult<Customer> {
        validation::validate_name(name)?;
        validation::validate_email(email)?;

        match self.db.customers().update(id, name, email).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation { .. }) => {
                return Err(EngineError::EmailTaken(email.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.get(id).await
    }

    /// Whether an email is free to register.
    pub async fn email_available(&self, email: &str) -> EngineResult<bool> {
        Ok(!self.db.customers().exists_by_email(email).await?)
    }

    /// Deactivates a customer account.
    ///
    /// Soft delete: the row stays, purchases keep resolving. Every
    /// Active book the customer owns is cancelled first, then the
    /// account is flipped to Inactive. Already-inactive accounts
    /// deactivate again without error.
    ///
    /// ## Returns
    /// * `Ok(u64)` - Number of books cancelled by the cascade
    pub async fn deactivate(&self, id: i64) -> EngineResult<u64> {
        // Resolve first so a bad id fails before any mutation
        let customer = self.get(id).await?;
        if !customer.is_active() {
            warn!(id = %id, "Deactivating an already inactive customer");
        }

        let cancelled = self.db.books().cancel_active_by_owner(id).await?;
        self.db
            .customers()
            .set_status(id, CustomerStatus::Inactive)
            .await?;

        info!(id = %id, books_cancelled = cancelled, "Customer deactivated");
        Ok(cancelled)
    }
}

/// Asserts the actor may act on the given customer's resources:
/// the account owner themselves, or any admin.
pub fn authorize_account_access(actor: &Customer, resource_owner: i64) -> EngineResult<()> {
    if validation::can_access_customer(actor.id, &actor.roles, resource_owner) {
        Ok(())
    } else {
        Err(EngineError::Forbidden)
    }
}

fn hash_password(password: &str) -> EngineResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| EngineError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use bookmart_core::{BookStatus, NewBook};
    use bookmart_db::DbConfig;

    async fn service() -> (Database, CustomerService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (db.clone(), CustomerService::new(db))
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (_db, svc) = service().await;

        let customer = svc
            .register("Ana", "ana@example.com", "correct horse battery")
            .await
            .unwrap();

        assert!(customer.id > 0);
        assert_eq!(customer.status, CustomerStatus::Active);
        assert!(customer.roles.contains(&Role::Customer));
        assert_ne!(customer.password_hash, "correct horse battery");
        assert!(customer.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let (_db, svc) = service().await;

        svc.register("Ana", "ana@example.com", "password one").await.unwrap();
        let err = svc
            .register("Other", "ana@example.com", "password two")
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::EmailTaken);
        assert!(!svc.email_available("ana@example.com").await.unwrap());
        assert!(svc.email_available("free@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let (_db, svc) = service().await;

        let err = svc.register("", "a@example.com", "long enough pw").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);

        let err = svc.register("Ana", "not-an-email", "long enough pw").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (_db, svc) = service().await;

        let created = svc.register("Ana", "ana@example.com", "password one").await.unwrap();
        let updated = svc
            .update(created.id, "Ana Maria", "ana.maria@example.com")
            .await
            .unwrap();

        assert_eq!(updated.name, "Ana Maria");
        assert_eq!(updated.email, "ana.maria@example.com");

        let err = svc.update(9999, "X", "x@example.com").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CustomerNotFound);
    }

    #[tokio::test]
    async fn test_deactivate_cascades_exactly_over_active_books() {
        let (db, svc) = service().await;

        let owner = svc.register("Ana", "ana@example.com", "password one").await.unwrap();
        let other = svc.register("Bea", "bea@example.com", "password two").await.unwrap();

        let active = db
            .books()
            .insert(&NewBook {
                name: "Active".to_string(),
                price_cents: 100,
                customer_id: owner.id,
            })
            .await
            .unwrap();
        let sold = db
            .books()
            .insert(&NewBook {
                name: "Sold".to_string(),
                price_cents: 200,
                customer_id: owner.id,
            })
            .await
            .unwrap();
        let foreign = db
            .books()
            .insert(&NewBook {
                name: "Foreign".to_string(),
                price_cents: 300,
                customer_id: other.id,
            })
            .await
            .unwrap();
        db.books()
            .transition_batch(&[sold.id], BookStatus::Active, BookStatus::Sold)
            .await
            .unwrap();

        let cancelled = svc.deactivate(owner.id).await.unwrap();
        assert_eq!(cancelled, 1);

        assert_eq!(svc.get(owner.id).await.unwrap().status, CustomerStatus::Inactive);
        assert_eq!(
            db.books().get(active.id).await.unwrap().unwrap().status,
            BookStatus::Cancelled
        );
        assert_eq!(
            db.books().get(sold.id).await.unwrap().unwrap().status,
            BookStatus::Sold
        );
        assert_eq!(
            db.books().get(foreign.id).await.unwrap().unwrap().status,
            BookStatus::Active
        );

        // Deactivating again is a no-op cascade, not an error
        assert_eq!(svc.deactivate(owner.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivate_missing_customer() {
        let (_db, svc) = service().await;
        let err = svc.deactivate(9999).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CustomerNotFound);
    }

    #[tokio::test]
    async fn test_get_all_name_filter() {
        let (_db, svc) = service().await;

        svc.register("Maria Reader", "m1@example.com", "password one").await.unwrap();
        svc.register("Mario Reader", "m2@example.com", "password two").await.unwrap();
        svc.register("Joana", "j@example.com", "password three").await.unwrap();

        let filtered = svc.get_all(Some("Reader"), PageRequest::default()).await.unwrap();
        assert_eq!(filtered.total_items, 2);

        let all = svc.get_all(None, PageRequest::default()).await.unwrap();
        assert_eq!(all.total_items, 3);
    }

    #[tokio::test]
    async fn test_account_access_rules() {
        let (_db, svc) = service().await;

        let owner = svc.register("Ana", "ana@example.com", "password one").await.unwrap();
        let mut admin = svc.register("Root", "root@example.com", "password two").await.unwrap();
        admin.roles.insert(Role::Admin);
        let stranger = svc.register("Bea", "bea@example.com", "password three").await.unwrap();

        assert!(authorize_account_access(&owner, owner.id).is_ok());
        assert!(authorize_account_access(&admin, owner.id).is_ok());
        assert!(matches!(
            authorize_account_access(&stranger, owner.id),
            Err(EngineError::Forbidden)
        ));
    }
}
