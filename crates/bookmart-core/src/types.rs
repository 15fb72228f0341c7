//! # Domain Types
//!
//! Core domain types used throughout Bookmart.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Book       │   │    Purchase     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │   │  id (i64)       │   │  id (i64)       │       │
//! │  │  email (unique) │   │  price_cents    │   │  customer_id    │       │
//! │  │  status         │   │  customer_id    │   │  book_ids       │       │
//! │  │  roles          │   │  status         │   │  total_cents    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ CustomerStatus  │   │   BookStatus    │   │      Role       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Active         │   │  Active         │   │  Customer       │       │
//! │  │  Inactive       │   │  Sold           │   │  Admin          │       │
//! │  └─────────────────┘   │  Cancelled      │   └─────────────────┘       │
//! │                        │  Deleted        │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has an `id: i64` assigned by the store on insert. Ids are
//! opaque to the domain; nothing is derived from their value.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Customer Status
// =============================================================================

/// Soft-delete status gate for customers.
///
/// Transitions only Active → Inactive; this core never reactivates a
/// customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    /// Customer may purchase and list books.
    Active,
    /// Customer has been deactivated (soft delete).
    Inactive,
}

impl Default for CustomerStatus {
    fn default() -> Self {
        CustomerStatus::Active
    }
}

// =============================================================================
// Role
// =============================================================================

/// Access roles attached to a customer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular customer (assigned on registration).
    Customer,
    /// Administrative access to other customers' resources.
    Admin,
}

// =============================================================================
// Book Status
// =============================================================================

/// The lifecycle status of a listed book.
///
/// ## Transition Graph
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │              ┌──────► Sold       (purchase commit)                      │
/// │              │                                                          │
/// │   Active ────┼──────► Cancelled  (owner deactivation cascade)           │
/// │              │                                                          │
/// │              └──────► Deleted    (explicit removal)                     │
/// │                                                                         │
/// │   Sold / Cancelled / Deleted are terminal - nothing returns a book      │
/// │   to Active.                                                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    /// Listed and purchasable.
    Active,
    /// Consumed by a committed purchase.
    Sold,
    /// Cancelled by the owner deactivation cascade.
    Cancelled,
    /// Explicitly removed by its owner.
    Deleted,
}

impl BookStatus {
    /// A book can be purchased only while Active.
    #[inline]
    pub const fn is_sellable(&self) -> bool {
        matches!(self, BookStatus::Active)
    }

    /// Sold, Cancelled and Deleted are terminal for this core.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, BookStatus::Active)
    }

    /// Checks whether a transition is on the directed, non-cyclic path.
    pub const fn can_transition_to(&self, next: BookStatus) -> bool {
        matches!(
            (self, next),
            (
                BookStatus::Active,
                BookStatus::Sold | BookStatus::Cancelled | BookStatus::Deleted
            )
        )
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// The password credential is stored hashed (argon2) and never leaves the
/// engine in plaintext after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier assigned by the store on insert.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Email address - globally unique among customers.
    pub email: String,

    /// Argon2 hash of the password credential.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Soft-delete status; transitions only Active → Inactive.
    pub status: CustomerStatus,

    /// Role set; at minimum `Customer`.
    pub roles: BTreeSet<Role>,

    /// When the customer registered.
    pub created_at: DateTime<Utc>,

    /// When the customer row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// True iff the customer may act as a purchaser.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

/// Input shape for customer registration (id assigned by the store).
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
}

// =============================================================================
// Book
// =============================================================================

/// A book listed for sale by a customer.
///
/// Ownership (`customer_id`) is immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier assigned by the store on insert.
    pub id: i64,

    /// Display title.
    pub name: String,

    /// Price in cents (non-negative).
    pub price_cents: i64,

    /// Owning customer (the seller).
    pub customer_id: i64,

    /// Lifecycle status.
    pub status: BookStatus,

    /// When the book was listed.
    pub created_at: DateTime<Utc>,

    /// When the book row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True iff the book may be consumed by a purchase.
    #[inline]
    pub fn is_sellable(&self) -> bool {
        self.status.is_sellable()
    }
}

/// Input shape for listing a book (id assigned by the store).
#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub price_cents: i64,
    pub customer_id: i64,
}

// =============================================================================
// Purchase
// =============================================================================

/// A committed purchase record.
///
/// Holds non-owning references to a customer and a set of books; their
/// lifecycles are independent of this record. The total is frozen at
/// commit time - later price changes never alter past purchases. The
/// ledger is insert-only; the only field ever updated afterwards is the
/// fiscal document reference, populated by an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique identifier assigned by the ledger on append.
    pub id: i64,

    /// Buying customer (reference, not owned).
    pub customer_id: i64,

    /// Purchased books (references, not owned; non-empty).
    pub book_ids: Vec<i64>,

    /// Fiscal document reference; absent at creation.
    pub fiscal_ref: Option<String>,

    /// Exact sum of the book prices at the moment of commit.
    pub total_cents: i64,

    /// When the purchase was committed.
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// Returns the frozen total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Input shape for appending a purchase (id and timestamp assigned by the
/// ledger at commit).
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub customer_id: i64,
    pub book_ids: Vec<i64>,
    pub total_cents: i64,
}

// =============================================================================
// Pagination
// =============================================================================

/// A page request: zero-based page index plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(page: u32, size: u32) -> Self {
        PageRequest { page, size }
    }

    /// Row offset for this page.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 0,
            size: crate::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a listing, ordered by insertion (identity order).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Builds a page from fetched items and the total row count.
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            total_items.div_ceil(request.size as u64)
        };

        Page {
            items,
            page: request.page,
            page_size: request.size,
            total_items,
            total_pages,
        }
    }

    /// Checks if the page carries no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
