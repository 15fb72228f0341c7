//! # Book Service
//!
//! Listing lifecycle: creation under an owner, edits to the mutable
//! fields, status-filtered queries, and deletion.
//!
//! Deletion is a status transition, not a row removal: Active → Deleted
//! through the same compare-and-set write purchases use, so deleting a
//! book that just sold surfaces as a commit conflict instead of
//! silently clobbering the sale.

use tracing::info;

use crate::error::{EngineError, EngineResult};
use bookmart_core::{validation, Book, BookStatus, NewBook, Page, PageRequest};
use bookmart_db::Database;

/// Book listing operations.
#[derive(Debug, Clone)]
pub struct BookService {
    db: Database,
}

impl BookService {
    /// Creates a new BookService.
    pub fn new(db: Database) -> Self {
        BookService { db }
    }

    /// Creates a book listing owned by the given customer.
    ///
    /// Ownership is fixed here for the book's lifetime. New listings
    /// start Active.
    pub async fn create(&self, owner_id: i64, name: &str, price_cents: i64) -> EngineResult<Book> {
        validation::validate_id("customer_id", owner_id)?;
        validation::validate_name(name)?;
        validation::validate_price_cents(price_cents)?;

        // Resolve the owner up front for a typed NotFound instead of a
        // raw foreign key failure
        if !self.db.customers().exists_by_id(owner_id).await? {
            return Err(EngineError::not_found("Customer", owner_id));
        }

        let book = self
            .db
            .books()
            .insert(&NewBook {
                name: name.to_string(),
                price_cents,
                customer_id: owner_id,
            })
            .await?;

        info!(id = %book.id, owner = %owner_id, "Book listed");
        Ok(book)
    }

    /// Gets a book by id.
    pub async fn get(&self, id: i64) -> EngineResult<Book> {
        self.db
            .books()
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Book", id))
    }

    /// Lists all books.
    pub async fn get_all(&self, page: PageRequest) -> EngineResult<Page<Book>> {
        Ok(self.db.books().list(page).await?)
    }

    /// Lists books currently for sale.
    pub async fn find_actives(&self, page: PageRequest) -> EngineResult<Page<Book>> {
        Ok(self.db.books().list_by_status(BookStatus::Active, page).await?)
    }

    /// Lists sold books, optionally restricted to one seller.
    pub async fn find_sold(
        &self,
        owner_id: Option<i64>,
        page: PageRequest,
    ) -> EngineResult<Page<Book>> {
        let result = match owner_id {
            Some(owner) => {
                self.db
                    .books()
                    .list_by_status_and_owner(BookStatus::Sold, owner, page)
                    .await?
            }
            None => self.db.books().list_by_status(BookStatus::Sold, page).await?,
        };
        Ok(result)
    }

    /// Updates a book's mutable fields.
    ///
    /// Absent fields keep their current value. Owner and status are not
    /// editable through this path.
    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        price_cents: Option<i64>,
    ) -> EngineResult<Book> {
        let mut book = self.get(id).await?;

        if let Some(name) = name {
            validation::validate_name(name)?;
            book.name = name.to_string();
        }
        if let Some(cents) = price_cents {
            validation::validate_price_cents(cents)?;
            book.price_cents = cents;
        }

        self.db.books().update(&book).await?;
        self.get(id).await
    }

    /// Deletes a book listing.
    ///
    /// Status transition Active → Deleted; the row stays so past
    /// purchases keep resolving. Terminal books (Sold, Cancelled,
    /// Deleted) cannot be deleted; the lost compare-and-set surfaces as
    /// ConflictOnCommit.
    pub async fn delete(&self, id: i64) -> EngineResult<()> {
        // Resolve first so a missing book reports NotFound, not a conflict
        self.get(id).await?;

        self.db
            .books()
            .transition_batch(&[id], BookStatus::Active, BookStatus::Deleted)
            .await?;

        info!(id = %id, "Book deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
