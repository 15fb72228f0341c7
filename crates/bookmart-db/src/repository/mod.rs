//! # Repository Module
//!
//! Store implementations for Bookmart.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine service                                                        │
//! │       │                                                                 │
//! │       │  db.books().get_all_by_ids(&[1, 2, 3])                         │
//! │       ▼                                                                 │
//! │  BookRepository                                                        │
//! │  ├── get(&self, id)                                                    │
//! │  ├── get_all_by_ids(&self, ids)                                        │
//! │  ├── transition_batch(&self, ids, from, to)                            │
//! │  └── cancel_active_by_owner(&self, customer_id)                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every mutation of a Customer or Book goes through a repository; no    │
//! │  other component touches the rows directly.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer CRUD and status
//! - [`book::BookRepository`] - Book CRUD, batch lookup, status transitions
//! - [`purchase::PurchaseRepository`] - Insert-only purchase ledger

pub mod book;
pub mod customer;
pub mod purchase;
