//! # Purchase Ledger
//!
//! Insert-only store for purchase records.
//!
//! A purchase row is written once at commit time and never updated or
//! deleted afterwards, with a single exception: the fiscal reference
//! column starts NULL and is filled in exactly once by the fiscal
//! consumer. The frozen `total_cents` is what the ledger reports even if
//! book prices change later.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use bookmart_core::{NewPurchase, Page, PageRequest, Purchase};

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: i64,
    customer_id: i64,
    fiscal_ref: Option<String>,
    total_cents: i64,
    created_at: DateTime<Utc>,
}

impl PurchaseRow {
    fn into_purchase(self, book_ids: Vec<i64>) -> Purchase {
        Purchase {
            id: self.id,
            customer_id: self.customer_id,
            book_ids,
            fiscal_ref: self.fiscal_ref,
            total_cents: self.total_cents,
            created_at: self.created_at,
        }
    }
}

const PURCHASE_COLUMNS: &str = "id, customer_id, fiscal_ref, total_cents, created_at";

/// Repository for the purchase ledger.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Appends a purchase record and its book references, atomically.
    ///
    /// The fiscal reference starts empty; the consumer fills it in later.
    ///
    /// ## Returns
    /// * `Ok(Purchase)` - Appended record with store-assigned id
    /// * `Err(StoreError::ForeignKeyViolation)` - Customer or book id does
    ///   not resolve
    pub async fn append(&self, new: &NewPurchase) -> StoreResult<Purchase> {
        debug!(
            customer = %new.customer_id,
            books = new.book_ids.len(),
            total_cents = new.total_cents,
            "Appending purchase"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO purchases (customer_id, fiscal_ref, total_cents, created_at)
            VALUES (?1, NULL, ?2, ?3)
            "#,
        )
        .bind(new.customer_id)
        .bind(new.total_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let purchase_id = result.last_insert_rowid();

        for book_id in &new.book_ids {
            sqlx::query("INSERT INTO purchase_books (purchase_id, book_id) VALUES (?1, ?2)")
                .bind(purchase_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Purchase {
            id: purchase_id,
            customer_id: new.customer_id,
            book_ids: new.book_ids.clone(),
            fiscal_ref: None,
            total_cents: new.total_cents,
            created_at: now,
        })
    }

    /// Gets a purchase by id, with its book references in id order.
    pub async fn get(&self, id: i64) -> StoreResult<Option<Purchase>> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let book_ids = self.book_ids_for(row.id).await?;
                Ok(Some(row.into_purchase(book_ids)))
            }
            None => Ok(None),
        }
    }

    /// Lists all purchases in ledger order (oldest first).
    pub async fn list_all(&self, page: PageRequest) -> StoreResult<Page<Purchase>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY id LIMIT ?1 OFFSET ?2"
        ))
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = self.attach_books(rows).await?;
        Ok(Page::new(items, page, total as u64))
    }

    /// Lists a customer's purchases in ledger order.
    pub async fn list_by_customer(
        &self,
        customer_id: i64,
        page: PageRequest,
    ) -> StoreResult<Page<Purchase>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE customer_id = ?1")
                .bind(customer_id)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             WHERE customer_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
        ))
        .bind(customer_id)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = self.attach_books(rows).await?;
        Ok(Page::new(items, page, total as u64))
    }

    /// Records the fiscal reference for a committed purchase.
    ///
    /// The only column of a ledger row that is ever rewritten.
    pub async fn set_fiscal_ref(&self, id: i64, fiscal_ref: &str) -> StoreResult<()> {
        debug!(purchase = %id, "Recording fiscal reference");

        let result = sqlx::query("UPDATE purchases SET fiscal_ref = ?2 WHERE id = ?1")
            .bind(id)
            .bind(fiscal_ref)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Purchase", id));
        }

        Ok(())
    }

    async fn book_ids_for(&self, purchase_id: i64) -> StoreResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT book_id FROM purchase_books WHERE purchase_id = ?1 ORDER BY book_id",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn attach_books(&self, rows: Vec<PurchaseRow>) -> StoreResult<Vec<Purchase>> {
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let book_ids = self.book_ids_for(row.id).await?;
            items.push(row.into_purchase(book_ids));
        }
        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bookmart_core::{NewBook, NewCustomer, Role};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_customer(db: &Database, email: &str) -> i64 {
        db.customers()
            .insert(&NewCustomer {
                name: "Buyer".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$fake".to_string(),
                roles: [Role::Customer].into(),
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_book(db: &Database, owner: i64, cents: i64) -> i64 {
        db.books()
            .insert(&NewBook {
                name: "Book".to_string(),
                price_cents: cents,
                customer_id: owner,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let db = test_db().await;
        let buyer = seed_customer(&db, "b@example.com").await;
        let seller = seed_customer(&db, "s@example.com").await;
        let b1 = seed_book(&db, seller, 1000).await;
        let b2 = seed_book(&db, seller, 1550).await;
        let repo = db.purchases();

        let purchase = repo
            .append(&NewPurchase {
                customer_id: buyer,
                book_ids: vec![b1, b2],
                total_cents: 2550,
            })
            .await
            .unwrap();

        assert!(purchase.id > 0);
        assert!(purchase.fiscal_ref.is_none());

        let fetched = repo.get(purchase.id).await.unwrap().unwrap();
        assert_eq!(fetched.book_ids, vec![b1, b2]);
        assert_eq!(fetched.total_cents, 2550);

        assert!(repo.get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_unknown_refs_rejected() {
        let db = test_db().await;
        let buyer = seed_customer(&db, "b@example.com").await;
        let repo = db.purchases();

        // Unknown customer
        let err = repo
            .append(&NewPurchase {
                customer_id: 9999,
                book_ids: vec![],
                total_cents: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));

        // Unknown book rolls back the purchase row too
        let err = repo
            .append(&NewPurchase {
                customer_id: buyer,
                book_ids: vec![9999],
                total_cents: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));

        let all = repo.list_all(PageRequest::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_customer() {
        let db = test_db().await;
        let buyer = seed_customer(&db, "b@example.com").await;
        let other = seed_customer(&db, "o@example.com").await;
        let seller = seed_customer(&db, "s@example.com").await;
        let b1 = seed_book(&db, seller, 500).await;
        let b2 = seed_book(&db, seller, 700).await;
        let repo = db.purchases();

        repo.append(&NewPurchase {
            customer_id: buyer,
            book_ids: vec![b1],
            total_cents: 500,
        })
        .await
        .unwrap();
        repo.append(&NewPurchase {
            customer_id: other,
            book_ids: vec![b2],
            total_cents: 700,
        })
        .await
        .unwrap();

        let mine = repo.list_by_customer(buyer, PageRequest::default()).await.unwrap();
        assert_eq!(mine.total_items, 1);
        assert_eq!(mine.items[0].book_ids, vec![b1]);

        let all = repo.list_all(PageRequest::default()).await.unwrap();
        assert_eq!(all.total_items, 2);
        // Ledger order: oldest first
        assert!(all.items[0].id < all.items[1].id);
    }

    #[tokio::test]
    async fn test_set_fiscal_ref() {
        let db = test_db().await;
        let buyer = seed_customer(&db, "b@example.com").await;
        let seller = seed_customer(&db, "s@example.com").await;
        let b1 = seed_book(&db, seller, 500).await;
        let repo = db.purchases();

        let purchase = repo
            .append(&NewPurchase {
                customer_id: buyer,
                book_ids: vec![b1],
                total_cents: 500,
            })
            .await
            .unwrap();

        repo.set_fiscal_ref(purchase.id, "fe4c8d0a").await.unwrap();

        let fetched = repo.get(purchase.id).await.unwrap().unwrap();
        assert_eq!(fetched.fiscal_ref.as_deref(), Some("fe4c8d0a"));

        assert!(matches!(
            repo.set_fiscal_ref(9999, "x").await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
