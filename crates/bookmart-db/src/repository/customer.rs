//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Key Operations
//! - CRUD with store-assigned integer ids
//! - Email uniqueness surfaced as `StoreError::UniqueViolation`
//! - Soft delete only: `set_status` flips Active → Inactive, rows are
//!   never removed

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use bookmart_core::{Customer, CustomerStatus, NewCustomer, Page, PageRequest, Role};

/// Raw row shape; the JSON role column is parsed on the way out.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    status: CustomerStatus,
    roles: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_customer(self) -> StoreResult<Customer> {
        let roles: BTreeSet<Role> = serde_json::from_str(&self.roles)
            .map_err(|e| StoreError::Internal(format!("bad roles column: {e}")))?;

        Ok(Customer {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            status: self.status,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const CUSTOMER_COLUMNS: &str =
    "id, name, email, password_hash, status, roles, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer and returns it with its assigned id.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Inserted customer with store-assigned id
    /// * `Err(StoreError::UniqueViolation)` - Email already registered
    pub async fn insert(&self, new: &NewCustomer) -> StoreResult<Customer> {
        debug!(email = %new.email, "Inserting customer");

        let now = Utc::now();
        let roles = serde_json::to_string(&new.roles)
            .map_err(|e| StoreError::Internal(format!("roles serialization: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, email, password_hash, status, roles, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(CustomerStatus::Active)
        .bind(&roles)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            status: CustomerStatus::Active,
            roles: new.roles.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a customer by id.
    ///
    /// ## Returns
    /// * `Ok(Some(Customer))` - Customer found
    /// * `Ok(None)` - Customer not found
    pub async fn get(&self, id: i64) -> StoreResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CustomerRow::into_customer).transpose()
    }

    /// Checks whether a customer id resolves.
    pub async fn exists_by_id(&self, id: i64) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Checks whether an email is already registered.
    pub async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Updates a customer's profile fields (name, email).
    ///
    /// Status, roles and the password hash are deliberately not written
    /// here; status changes go through [`set_status`](Self::set_status).
    pub async fn update(&self, id: i64, name: &str, email: &str) -> StoreResult<()> {
        debug!(id = %id, "Updating customer");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2,
                email = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Sets a customer's status.
    ///
    /// Used by the deactivation flow after the book cascade completes.
    pub async fn set_status(&self, id: i64, status: CustomerStatus) -> StoreResult<()> {
        debug!(id = %id, ?status, "Setting customer status");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                status = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Lists customers in identity order.
    pub async fn list(&self, page: PageRequest) -> StoreResult<Page<Customer>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id LIMIT ?1 OFFSET ?2"
        ))
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CustomerRow::into_customer)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page::new(items, page, total as u64))
    }

    /// Lists customers whose name contains the given fragment.
    pub async fn list_by_name(&self, fragment: &str, page: PageRequest) -> StoreResult<Page<Customer>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE name LIKE '%' || ?1 || '%'",
        )
        .bind(fragment)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE name LIKE '%' || ?1 || '%' ORDER BY id LIMIT ?2 OFFSET ?3"
        ))
        .bind(fragment)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CustomerRow::into_customer)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page::new(items, page, total as u64))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
