//! # Purchase Events
//!
//! Fire-and-forget notification pipeline for committed purchases.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Post-Commit Notification                             │
//! │                                                                         │
//! │  PurchaseService::create                                               │
//! │       │  (after ledger append + status commit)                          │
//! │       ▼                                                                 │
//! │  Notifier::publish ── try_send, never blocks, never fails the caller   │
//! │       │                                                                 │
//! │       ▼  bounded mpsc channel                                           │
//! │  fiscal consumer task                                                  │
//! │       │  generates a fiscal reference                                   │
//! │       ▼                                                                 │
//! │  purchases.fiscal_ref (written exactly once, after the fact)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A full or closed channel drops the event with a warning; the purchase
//! itself has already committed and is never rolled back over a missed
//! notification.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use bookmart_core::Purchase;
use bookmart_db::Database;

/// Default capacity for the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Emitted once per committed purchase, strictly after the status
/// transitions have committed.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCreated {
    /// Unique event id, distinct from the purchase id.
    pub event_id: Uuid,
    /// The committed ledger record.
    pub purchase: Purchase,
    /// When the event was emitted.
    pub occurred_at: DateTime<Utc>,
}

impl PurchaseCreated {
    /// Wraps a committed purchase in an event envelope.
    pub fn new(purchase: Purchase) -> Self {
        PurchaseCreated {
            event_id: Uuid::new_v4(),
            purchase,
            occurred_at: Utc::now(),
        }
    }
}

/// Publishing half of the notification pipeline.
///
/// Cloning is cheap; every service that commits purchases holds one.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<PurchaseCreated>,
}

impl Notifier {
    /// Creates a notifier and the receiving end of its channel.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let (notifier, rx) = Notifier::channel(64);
    /// let handle = spawn_fiscal_consumer(db.clone(), rx);
    /// ```
    pub fn channel(capacity: usize) -> (Notifier, mpsc::Receiver<PurchaseCreated>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Notifier { tx }, rx)
    }

    /// Publishes an event without blocking.
    ///
    /// Delivery is best-effort: a full or closed channel logs a warning
    /// and the event is dropped. Callers never see a failure.
    pub fn publish(&self, event: PurchaseCreated) {
        let purchase_id = event.purchase.id;
        if let Err(e) = self.tx.try_send(event) {
            warn!(purchase = %purchase_id, error = %e, "Dropping purchase notification");
        } else {
            debug!(purchase = %purchase_id, "Published purchase event");
        }
    }
}

/// Spawns the fiscal consumer task.
///
/// For each received event it generates a fiscal reference and records
/// it on the ledger row. Runs until every sender is dropped.
pub fn spawn_fiscal_consumer(
    db: Database,
    mut rx: mpsc::Receiver<PurchaseCreated>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let fiscal_ref = Uuid::new_v4().to_string();
            match db.purchases().set_fiscal_ref(event.purchase.id, &fiscal_ref).await {
                Ok(()) => debug!(
                    purchase = %event.purchase.id,
                    fiscal_ref = %fiscal_ref,
                    "Fiscal reference recorded"
                ),
                Err(e) => warn!(
                    purchase = %event.purchase.id,
                    error = %e,
                    "Failed to record fiscal reference"
                ),
            }
        }
        debug!("Fiscal consumer shutting down");
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bookmart_core::{NewBook, NewCustomer, NewPurchase, Role};
    use bookmart_db::DbConfig;
    use std::time::Duration;

    async fn seed_purchase(db: &Database) -> Purchase {
        let buyer = db
            .customers()
            .insert(&NewCustomer {
                name: "Buyer".to_string(),
                email: "buyer@example.com".to_string(),
                password_hash: "$argon2id$fake".to_string(),
                roles: [Role::Customer].into(),
            })
            .await
            .unwrap();
        let book = db
            .books()
            .insert(&NewBook {
                name: "Book".to_string(),
                price_cents: 500,
                customer_id: buyer.id,
            })
            .await
            .unwrap();
        db.purchases()
            .append(&NewPurchase {
                customer_id: buyer.id,
                book_ids: vec![book.id],
                total_cents: 500,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_consumer_records_fiscal_ref() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let purchase = seed_purchase(&db).await;

        let (notifier, rx) = Notifier::channel(8);
        let handle = spawn_fiscal_consumer(db.clone(), rx);

        notifier.publish(PurchaseCreated::new(purchase.clone()));

        // Poll until the consumer has written the reference
        let mut fiscal = None;
        for _ in 0..50 {
            fiscal = db.purchases().get(purchase.id).await.unwrap().unwrap().fiscal_ref;
            if fiscal.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(fiscal.is_some(), "fiscal reference was never recorded");

        drop(notifier);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_never_fails_caller() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let purchase = seed_purchase(&db).await;

        // Receiver dropped immediately: channel is closed
        let (notifier, rx) = Notifier::channel(1);
        drop(rx);

        // Logs a warning, does not panic or error
        notifier.publish(PurchaseCreated::new(purchase));
    }
}
