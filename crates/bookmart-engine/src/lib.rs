//! # Bookmart Engine
//!
//! Purchase and inventory consistency services for Bookmart.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         bookmart-engine                                 │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────────┐  │
//! │  │ customer.rs  │  │   book.rs    │  │         purchase.rs          │  │
//! │  │ register,    │  │ list, edit,  │  │ gate → resolve → append →    │  │
//! │  │ deactivate   │  │ delete       │  │ CAS commit → publish         │  │
//! │  │ + cascade    │  │ (CAS)        │  │                              │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────┬───────────────────┘  │
//! │         │                 │                     │                      │
//! │         │        ┌────────┴────────┐   ┌────────┴────────┐             │
//! │         │        │ availability.rs │   │    events.rs    │             │
//! │         │        │ pre-commit gate │   │ notifier + the  │             │
//! │         │        └────────┬────────┘   │ fiscal consumer │             │
//! │         │                 │            └────────┬────────┘             │
//! │         ▼                 ▼                     ▼                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    bookmart-db (repositories)                    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  error.rs: the BM-xxx taxonomy every operation reports through          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two rules shape everything here. Writes that race are decided by the
//! store through prior-status guards, never by in-process reasoning. And
//! anything that happens after the commit point (notifications, fiscal
//! references) is best-effort and can never undo or fail the purchase.

pub mod availability;
pub mod book;
pub mod customer;
pub mod error;
pub mod events;
pub mod purchase;

pub use availability::AvailabilityValidator;
pub use book::BookService;
pub use customer::{authorize_account_access, CustomerService};
pub use error::{EngineError, EngineResult, ErrorCode, ErrorPayload};
pub use events::{
    spawn_fiscal_consumer, Notifier, PurchaseCreated, DEFAULT_CHANNEL_CAPACITY,
};
pub use purchase::{PurchaseDetail, PurchaseService};

// Re-exported so callers can stand up the engine without naming
// bookmart-db directly
pub use bookmart_db::{Database, DbConfig};
