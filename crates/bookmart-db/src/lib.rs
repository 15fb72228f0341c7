//! # bookmart-db: Database Layer for Bookmart
//!
//! This crate provides database access for the Bookmart back end.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bookmart Data Flow                               │
//! │                                                                         │
//! │  Engine call (create purchase, deactivate customer)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bookmart-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ customer.rs   │    │  (embedded)  │  │   │
//! │  │   │               │    │ book.rs       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ purchase.rs   │    │ 001_init.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                        SQLite Database                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Store implementations (customer, book, purchase)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bookmart_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/bookmart.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let book = db.books().get(42).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::book::BookRepository;
pub use repository::customer::CustomerRepository;
pub use repository::purchase::PurchaseRepository;
