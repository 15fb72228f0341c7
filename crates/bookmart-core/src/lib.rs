//! # bookmart-core: Pure Business Logic for Bookmart
//!
//! This crate is the **heart** of the Bookmart back end. It contains the
//! domain model and business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bookmart Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Request Boundary (HTTP glue)                   │   │
//! │  │    register ──► list books ──► purchase ──► deactivate         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bookmart-engine                              │   │
//! │  │    availability gate, purchase orchestration, cascades         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bookmart-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ validation│  │   error   │  │   │
//! │  │   │ Customer  │  │   Money   │  │   rules   │  │  domain   │  │   │
//! │  │   │ Book      │  │  (cents)  │  │  guards   │  │  errors   │  │   │
//! │  │   │ Purchase  │  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bookmart-db (Database Layer)                 │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Book, Purchase, statuses, pages)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary validation and access guards
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bookmart_core::Money` instead of
// `use bookmart_core::money::Money`

pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct books in a single purchase.
///
/// ## Business Reason
/// Prevents runaway requests and keeps the compare-and-set batch small.
/// Can be made configurable in future versions.
pub const MAX_BOOKS_PER_PURCHASE: usize = 100;

/// Maximum length for customer and book names.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length for email addresses (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 320;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
