//! # Book Repository
//!
//! Database operations for books, including the compare-and-set status
//! writes the purchase commit relies on.
//!
//! ## Status Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Compare-and-Set Transition                           │
//! │                                                                         │
//! │  transition_batch(ids, Active, Sold)                                   │
//! │       │                                                                 │
//! │       ▼  one transaction, one guarded UPDATE per id                     │
//! │  UPDATE books SET status = 'sold'                                      │
//! │   WHERE id = ?1 AND status = 'active'                                  │
//! │       │                                                                 │
//! │       ├── every row matched  → COMMIT                                  │
//! │       └── any row missed     → ROLLBACK + StaleStatus { ids }          │
//! │                                                                         │
//! │  The status column in the WHERE clause is what closes the window       │
//! │  between reading a book and committing the sale: of two concurrent     │
//! │  purchases for the same book, exactly one UPDATE matches.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use bookmart_core::{Book, BookStatus, NewBook, Page, PageRequest};

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    name: String,
    price_cents: i64,
    customer_id: i64,
    status: BookStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            name: row.name,
            price_cents: row.price_cents,
            customer_id: row.customer_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const BOOK_COLUMNS: &str = "id, name, price_cents, customer_id, status, created_at, updated_at";

/// Repository for book database operations.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Inserts a new book, owned by `new.customer_id`, with status Active.
    ///
    /// ## Returns
    /// * `Ok(Book)` - Inserted book with store-assigned id
    /// * `Err(StoreError::ForeignKeyViolation)` - Owner id does not resolve
    pub async fn insert(&self, new: &NewBook) -> StoreResult<Book> {
        debug!(name = %new.name, owner = %new.customer_id, "Inserting book");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO books (name, price_cents, customer_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&new.name)
        .bind(new.price_cents)
        .bind(new.customer_id)
        .bind(BookStatus::Active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Book {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            price_cents: new.price_cents,
            customer_id: new.customer_id,
            status: BookStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a book by id.
    pub async fn get(&self, id: i64) -> StoreResult<Option<Book>> {
        let row: Option<BookRow> =
            sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Book::from))
    }

    /// Gets all books whose ids appear in `ids`.
    ///
    /// Unresolvable ids are simply absent from the result; callers compare
    /// lengths to detect the shortfall. Returns books in id order.
    pub async fn get_all_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE id IN ("));

        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<BookRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Updates a book's mutable fields (name, price).
    ///
    /// The owner column is never written; ownership is fixed at creation.
    /// Status changes go through [`transition_batch`](Self::transition_batch).
    pub async fn update(&self, book: &Book) -> StoreResult<()> {
        debug!(id = %book.id, "Updating book");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE books SET
                name = ?2,
                price_cents = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(book.id)
        .bind(&book.name)
        .bind(book.price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Book", book.id));
        }

        Ok(())
    }

    /// Transitions every listed book from `from` to `to`, atomically.
    ///
    /// Each UPDATE carries the prior status in its WHERE clause, so a row
    /// that changed since the caller read it is simply not matched. One
    /// missed row rolls back the whole batch.
    ///
    /// ## Returns
    /// * `Ok(())` - All rows transitioned
    /// * `Err(StoreError::StaleStatus)` - Ids whose status was not `from`;
    ///   no row was changed
    pub async fn transition_batch(
        &self,
        ids: &[i64],
        from: BookStatus,
        to: BookStatus,
    ) -> StoreResult<()> {
        debug!(count = ids.len(), ?from, ?to, "Transitioning book batch");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut stale: Vec<i64> = Vec::new();

        for id in ids {
            let result = sqlx::query(
                r#"
                UPDATE books SET
                    status = ?3,
                    updated_at = ?4
                WHERE id = ?1 AND status = ?2
                "#,
            )
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                stale.push(*id);
            }
        }

        if !stale.is_empty() {
            tx.rollback().await?;
            warn!(ids = ?stale, ?from, "Batch transition lost the status race");
            return Err(StoreError::StaleStatus { ids: stale });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Cancels every Active book owned by the given customer.
    ///
    /// Sold and Deleted books are untouched. Returns the number of books
    /// cancelled.
    pub async fn cancel_active_by_owner(&self, customer_id: i64) -> StoreResult<u64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE books SET
                status = ?3,
                updated_at = ?4
            WHERE customer_id = ?1 AND status = ?2
            "#,
        )
        .bind(customer_id)
        .bind(BookStatus::Active)
        .bind(BookStatus::Cancelled)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(
            owner = %customer_id,
            cancelled = result.rows_affected(),
            "Cancelled active books for owner"
        );

        Ok(result.rows_affected())
    }

    /// Lists the Active books owned by the given customer.
    pub async fn find_active_by_owner(&self, customer_id: i64) -> StoreResult<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE customer_id = ?1 AND status = ?2 ORDER BY id"
        ))
        .bind(customer_id)
        .bind(BookStatus::Active)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Lists books in a given status.
    pub async fn list_by_status(
        &self,
        status: BookStatus,
        page: PageRequest,
    ) -> StoreResult<Page<Book>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE status = ?1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE status = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
        ))
        .bind(status)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Book::from).collect(),
            page,
            total as u64,
        ))
    }

    /// Lists books in a given status owned by a given customer.
    pub async fn list_by_status_and_owner(
        &self,
        status: BookStatus,
        customer_id: i64,
        page: PageRequest,
    ) -> StoreResult<Page<Book>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE status = ?1 AND customer_id = ?2",
        )
        .bind(status)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE status = ?1 AND customer_id = ?2 ORDER BY id LIMIT ?3 OFFSET ?4"
        ))
        .bind(status)
        .bind(customer_id)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Book::from).collect(),
            page,
            total as u64,
        ))
    }

    /// Lists all books in identity order.
    pub async fn list(&self, page: PageRequest) -> StoreResult<Page<Book>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ?1 OFFSET ?2"
        ))
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Book::from).collect(),
            page,
            total as u64,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
