//! # Purchase Service
//!
//! The purchase commit pipeline.
//!
//! ## Commit Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create(customer_id, book_ids)                        │
//! │                                                                         │
//! │  1. Shape validation        reject before touching the store           │
//! │  2. Availability gate       customer Active? all books sellable?       │
//! │  3. Resolve + price         frozen total = exact sum of cents          │
//! │  4. Ledger append           purchase row + book refs, fiscal NULL      │
//! │  5. CAS commit              every book Active → Sold, or none          │
//! │  6. Publish event           fire-and-forget, strictly after 5          │
//! │                                                                         │
//! │  Steps 1-3 mutate nothing; a request rejected there can be retried     │
//! │  forever with the same answer. Step 5 losing the race surfaces as      │
//! │  ConflictOnCommit; the already-appended ledger row stays as a record   │
//! │  of the attempt.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::availability::AvailabilityValidator;
use crate::error::{EngineError, EngineResult};
use crate::events::{Notifier, PurchaseCreated};
use bookmart_core::{
    validation, Book, BookStatus, Customer, Money, NewPurchase, Page, PageRequest, Purchase,
};
use bookmart_db::Database;

/// A committed purchase with its references resolved.
///
/// The total is the frozen ledger amount, not a recomputation from
/// current book prices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    pub id: i64,
    pub customer: Customer,
    pub books: Vec<Book>,
    pub fiscal_ref: Option<String>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl PurchaseDetail {
    /// The frozen total as money.
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Purchase commit and ledger queries.
#[derive(Debug, Clone)]
pub struct PurchaseService {
    db: Database,
    validator: AvailabilityValidator,
    notifier: Notifier,
}

impl PurchaseService {
    /// Creates a new PurchaseService.
    pub fn new(db: Database, notifier: Notifier) -> Self {
        let validator = AvailabilityValidator::new(db.clone());
        PurchaseService {
            db,
            validator,
            notifier,
        }
    }

    /// Commits a purchase of the given books by the given customer.
    ///
    /// ## Returns
    /// * `Ok(PurchaseDetail)` - Committed purchase with resolved refs
    /// * `Err(EngineError::CustomerInactive)` - Buyer is not Active
    /// * `Err(EngineError::BooksUnavailable)` - A book is missing or not
    ///   sellable; nothing was written
    /// * `Err(EngineError::ConflictOnCommit)` - A concurrent writer won
    ///   the status race after the gate passed
    pub async fn create(
        &self,
        customer_id: i64,
        book_ids: &BTreeSet<i64>,
    ) -> EngineResult<PurchaseDetail> {
        validation::validate_purchase_request(customer_id, book_ids)?;

        // Availability gate: no mutation happens past a rejection here
        if !self.validator.customer_is_active(customer_id).await? {
            return Err(EngineError::CustomerInactive(customer_id));
        }
        if !self.validator.all_books_sellable(book_ids).await? {
            return Err(EngineError::BooksUnavailable(book_ids.iter().copied().collect()));
        }

        let customer = self
            .db
            .customers()
            .get(customer_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", customer_id))?;

        let ids: Vec<i64> = book_ids.iter().copied().collect();
        let books = self.db.books().get_all_by_ids(&ids).await?;
        if books.len() != ids.len() {
            // A book vanished between the gate and the resolve
            return Err(EngineError::BooksUnavailable(ids));
        }

        // Exact integer cents; frozen into the ledger at commit time
        let total: Money = books.iter().map(Book::price).sum();

        let purchase = self
            .db
            .purchases()
            .append(&NewPurchase {
                customer_id,
                book_ids: ids.clone(),
                total_cents: total.cents(),
            })
            .await?;

        // The commit point. The prior-status guard on each row decides
        // races the gate could not see; a loss rolls back every book and
        // surfaces as a conflict. The ledger row stays as the record of
        // the attempt.
        match self
            .db
            .books()
            .transition_batch(&ids, BookStatus::Active, BookStatus::Sold)
            .await
        {
            Ok(()) => {}
            Err(e) => {
                warn!(purchase = %purchase.id, error = %e, "Purchase commit lost the status race");
                return Err(e.into());
            }
        }

        info!(
            purchase = %purchase.id,
            customer = %customer_id,
            books = ids.len(),
            total = %total,
            "Purchase committed"
        );

        // Strictly after the commit; delivery failures never reach the caller
        self.notifier.publish(PurchaseCreated::new(purchase.clone()));

        let books = books
            .into_iter()
            .map(|mut b| {
                b.status = BookStatus::Sold;
                b
            })
            .collect();

        Ok(PurchaseDetail {
            id: purchase.id,
            customer,
            books,
            fiscal_ref: purchase.fiscal_ref,
            total_cents: purchase.total_cents,
            created_at: purchase.created_at,
        })
    }

    /// Gets a purchase by id.
    pub async fn get(&self, id: i64) -> EngineResult<Purchase> {
        self.db
            .purchases()
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Purchase", id))
    }

    /// Lists purchases in ledger order, optionally for one customer.
    pub async fn get_all(
        &self,
        customer_id: Option<i64>,
        page: PageRequest,
    ) -> EngineResult<Page<Purchase>> {
        let result = match customer_id {
            Some(customer) => self.db.purchases().list_by_customer(customer, page).await?,
            None => self.db.purchases().list_all(page).await?,
        };
        Ok(result)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookService;
    use crate::customer::CustomerService;
    use crate::error::ErrorCode;
    use crate::events::spawn_fiscal_consumer;
    use bookmart_db::DbConfig;
    use std::time::Duration;

    struct Fixture {
        customers: CustomerService,
        books: BookService,
        purchases: PurchaseService,
        // Held open so publishes succeed; no consumer unless a test spawns one
        _rx: tokio::sync::mpsc::Receiver<PurchaseCreated>,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (notifier, rx) = Notifier::channel(16);
        Fixture {
            customers: CustomerService::new(db.clone()),
            books: BookService::new(db.clone()),
            purchases: PurchaseService::new(db, notifier),
            _rx: rx,
        }
    }

    async fn register(f: &Fixture, email: &str) -> i64 {
        f.customers
            .register("Reader", email, "a password")
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_two_books_exact_total() {
        let f = fixture().await;
        let seller = register(&f, "seller@example.com").await;
        let buyer = register(&f, "buyer@example.com").await;

        // $10.00 + $15.50 = $25.50, exactly
        let b1 = f.books.create(seller, "First", 1000).await.unwrap();
        let b2 = f.books.create(seller, "Second", 1550).await.unwrap();

        let detail = f
            .purchases
            .create(buyer, &[b1.id, b2.id].into())
            .await
            .unwrap();

        assert_eq!(detail.total_cents, 2550);
        assert_eq!(detail.total().to_string(), "$25.50");
        assert_eq!(detail.customer.id, buyer);
        assert!(detail.fiscal_ref.is_none());
        assert!(detail.books.iter().all(|b| b.status == BookStatus::Sold));

        // Both books are off the market
        assert_eq!(f.books.get(b1.id).await.unwrap().status, BookStatus::Sold);
        assert_eq!(f.books.get(b2.id).await.unwrap().status, BookStatus::Sold);

        // Exactly one ledger entry for the buyer
        let ledger = f.purchases.get_all(Some(buyer), PageRequest::default()).await.unwrap();
        assert_eq!(ledger.total_items, 1);
        assert_eq!(ledger.items[0].book_ids, vec![b1.id, b2.id]);
    }

    #[tokio::test]
    async fn test_frozen_total_survives_price_change() {
        let f = fixture().await;
        let seller = register(&f, "seller@example.com").await;
        let buyer = register(&f, "buyer@example.com").await;

        let book = f.books.create(seller, "Book", 1000).await.unwrap();
        let detail = f.purchases.create(buyer, &[book.id].into()).await.unwrap();

        f.books.update(book.id, None, Some(9999)).await.unwrap();

        let fetched = f.purchases.get(detail.id).await.unwrap();
        assert_eq!(fetched.total_cents, 1000);
    }

    #[tokio::test]
    async fn test_sold_book_rejected_without_mutation() {
        let f = fixture().await;
        let seller = register(&f, "seller@example.com").await;
        let first = register(&f, "first@example.com").await;
        let second = register(&f, "second@example.com").await;

        let book = f.books.create(seller, "Only Copy", 1000).await.unwrap();
        f.purchases.create(first, &[book.id].into()).await.unwrap();

        // Rejection is repeatable and writes nothing
        for _ in 0..3 {
            let err = f.purchases.create(second, &[book.id].into()).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::BooksUnavailable);
        }

        assert_eq!(f.books.get(book.id).await.unwrap().status, BookStatus::Sold);
        let ledger = f.purchases.get_all(Some(second), PageRequest::default()).await.unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_customer_rejected() {
        let f = fixture().await;
        let seller = register(&f, "seller@example.com").await;
        let buyer = register(&f, "buyer@example.com").await;
        let book = f.books.create(seller, "Book", 1000).await.unwrap();

        f.customers.deactivate(buyer).await.unwrap();

        let err = f.purchases.create(buyer, &[book.id].into()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CustomerInactive);
        assert_eq!(f.books.get(book.id).await.unwrap().status, BookStatus::Active);
    }

    #[tokio::test]
    async fn test_unknown_refs() {
        let f = fixture().await;
        let seller = register(&f, "seller@example.com").await;
        let buyer = register(&f, "buyer@example.com").await;
        let book = f.books.create(seller, "Book", 1000).await.unwrap();

        let err = f.purchases.create(9999, &[book.id].into()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CustomerNotFound);

        // Unknown book ids make the whole set unavailable
        let err = f.purchases.create(buyer, &[book.id, 9999].into()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BooksUnavailable);
    }

    #[tokio::test]
    async fn test_empty_book_set_rejected() {
        let f = fixture().await;
        let buyer = register(&f, "buyer@example.com").await;

        let err = f.purchases.create(buyer, &BTreeSet::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_concurrent_purchases_single_winner() {
        let f = fixture().await;
        let seller = register(&f, "seller@example.com").await;
        let first = register(&f, "first@example.com").await;
        let second = register(&f, "second@example.com").await;

        let book = f.books.create(seller, "Only Copy", 1000).await.unwrap();
        let ids: BTreeSet<i64> = [book.id].into();

        let (a, b) = tokio::join!(
            f.purchases.create(first, &ids),
            f.purchases.create(second, &ids),
        );

        // Exactly one side wins; the loser sees the gate or the commit fail
        assert_ne!(a.is_ok(), b.is_ok(), "exactly one purchase must succeed");
        let loser = if a.is_ok() { b.unwrap_err() } else { a.unwrap_err() };
        assert!(matches!(
            loser.code(),
            ErrorCode::BooksUnavailable | ErrorCode::ConflictOnCommit
        ));

        // The book sold exactly once
        assert_eq!(f.books.get(book.id).await.unwrap().status, BookStatus::Sold);
    }

    #[tokio::test]
    async fn test_fiscal_consumer_fills_reference() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (notifier, rx) = Notifier::channel(16);
        let handle = spawn_fiscal_consumer(db.clone(), rx);

        let customers = CustomerService::new(db.clone());
        let books = BookService::new(db.clone());
        let purchases = PurchaseService::new(db.clone(), notifier.clone());

        let seller = customers
            .register("Seller", "seller@example.com", "a password")
            .await
            .unwrap();
        let buyer = customers
            .register("Buyer", "buyer@example.com", "a password")
            .await
            .unwrap();
        let book = books.create(seller.id, "Book", 1000).await.unwrap();

        let detail = purchases.create(buyer.id, &[book.id].into()).await.unwrap();
        assert!(detail.fiscal_ref.is_none());

        let mut fiscal = None;
        for _ in 0..50 {
            fiscal = purchases.get(detail.id).await.unwrap().fiscal_ref;
            if fiscal.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(fiscal.is_some(), "fiscal reference never recorded");

        drop(notifier);
        drop(purchases);
        handle.await.unwrap();
    }
}
