//! # Engine Error Types
//!
//! The client-facing error taxonomy. Every failure that crosses the
//! engine boundary carries a stable `BM-xxx` code so callers can branch
//! on codes instead of messages.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Mapping                                        │
//! │                                                                         │
//! │  ValidationError (bookmart-core)  ──►  EngineError::Validation          │
//! │  StoreError::NotFound             ──►  EngineError::NotFound            │
//! │  StoreError::StaleStatus          ──►  EngineError::ConflictOnCommit    │
//! │  StoreError::* (infrastructure)   ──►  EngineError::Store               │
//! │                                                                         │
//! │  EngineError ──► ErrorCode (BM-xxx) + HTTP status for the boundary      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use bookmart_core::ValidationError;
use bookmart_db::StoreError;

// =============================================================================
// Error Codes
// =============================================================================

/// Stable error codes for the engine boundary.
///
/// Codes are grouped by entity: BM-0xx cross-cutting, BM-1xx books,
/// BM-2xx customers, BM-3xx purchases, BM-5xx infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Forbidden,
    InvalidRequest,
    NotFound,
    BookNotFound,
    BooksUnavailable,
    ConflictOnCommit,
    CustomerNotFound,
    CustomerInactive,
    EmailTaken,
    PurchaseNotFound,
    StoreFailure,
    Internal,
}

impl ErrorCode {
    /// The wire code, stable across releases.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Forbidden => "BM-000",
            ErrorCode::InvalidRequest => "BM-001",
            ErrorCode::NotFound => "BM-100",
            ErrorCode::BookNotFound => "BM-101",
            ErrorCode::BooksUnavailable => "BM-102",
            ErrorCode::ConflictOnCommit => "BM-103",
            ErrorCode::CustomerNotFound => "BM-201",
            ErrorCode::CustomerInactive => "BM-202",
            ErrorCode::EmailTaken => "BM-203",
            ErrorCode::PurchaseNotFound => "BM-301",
            ErrorCode::StoreFailure => "BM-500",
            ErrorCode::Internal => "BM-501",
        }
    }

    /// HTTP status an HTTP boundary would serve for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Forbidden => 403,
            ErrorCode::InvalidRequest => 422,
            ErrorCode::NotFound
            | ErrorCode::BookNotFound
            | ErrorCode::CustomerNotFound
            | ErrorCode::PurchaseNotFound => 404,
            ErrorCode::BooksUnavailable | ErrorCode::CustomerInactive | ErrorCode::EmailTaken => 422,
            ErrorCode::ConflictOnCommit => 409,
            ErrorCode::StoreFailure | ErrorCode::Internal => 500,
        }
    }
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Failures crossing the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Entity does not resolve.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: i64 },

    /// The purchasing customer is not Active.
    #[error("Customer {0} is inactive")]
    CustomerInactive(i64),

    /// One or more requested books are missing or not sellable.
    #[error("Books unavailable: {0:?}")]
    BooksUnavailable(Vec<i64>),

    /// A concurrent writer won the status race between the availability
    /// gate and the commit.
    #[error("Conflict on commit for books {0:?}")]
    ConflictOnCommit(Vec<i64>),

    /// Email is already registered.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Caller may not act on this resource.
    #[error("Access denied")]
    Forbidden,

    /// Request failed field validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Store infrastructure failure.
    #[error("Store failure: {0}")]
    Store(StoreError),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NotFound { entity, .. } => match entity.as_str() {
                "Book" => ErrorCode::BookNotFound,
                "Customer" => ErrorCode::CustomerNotFound,
                "Purchase" => ErrorCode::PurchaseNotFound,
                _ => ErrorCode::NotFound,
            },
            EngineError::CustomerInactive(_) => ErrorCode::CustomerInactive,
            EngineError::BooksUnavailable(_) => ErrorCode::BooksUnavailable,
            EngineError::ConflictOnCommit(_) => ErrorCode::ConflictOnCommit,
            EngineError::EmailTaken(_) => ErrorCode::EmailTaken,
            EngineError::Forbidden => ErrorCode::Forbidden,
            EngineError::Validation(_) => ErrorCode::InvalidRequest,
            EngineError::Store(_) => ErrorCode::StoreFailure,
            EngineError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: i64) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id,
        }
    }

    /// Serializable payload: code, message, http status.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().as_str(),
            message: self.to_string(),
            http_status: self.code().http_status(),
        }
    }
}

/// Wire shape for a surfaced error.
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "httpStatus")]
    pub http_status: u16,
}

/// Store errors keep their taxonomy position when they cross into the
/// engine: row misses become NotFound, lost compare-and-set races become
/// ConflictOnCommit, everything else is infrastructure.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            StoreError::StaleStatus { ids } => EngineError::ConflictOnCommit(ids),
            other => EngineError::Store(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::CustomerInactive.as_str(), "BM-202");
        assert_eq!(ErrorCode::ConflictOnCommit.as_str(), "BM-103");
        assert_eq!(ErrorCode::ConflictOnCommit.http_status(), 409);
        assert_eq!(ErrorCode::BooksUnavailable.http_status(), 422);
    }

    #[test]
    fn test_not_found_code_follows_entity() {
        assert_eq!(EngineError::not_found("Book", 1).code(), ErrorCode::BookNotFound);
        assert_eq!(EngineError::not_found("Customer", 1).code(), ErrorCode::CustomerNotFound);
        assert_eq!(EngineError::not_found("Purchase", 1).code(), ErrorCode::PurchaseNotFound);
        assert_eq!(EngineError::not_found("Widget", 1).code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_store_error_mapping() {
        let err: EngineError = StoreError::StaleStatus { ids: vec![7] }.into();
        assert!(matches!(err, EngineError::ConflictOnCommit(ref ids) if ids == &vec![7]));

        let err: EngineError = StoreError::not_found("Customer", 3).into();
        assert_eq!(err.code(), ErrorCode::CustomerNotFound);

        let err: EngineError = StoreError::PoolExhausted.into();
        assert_eq!(err.code(), ErrorCode::StoreFailure);
    }

    #[test]
    fn test_payload_shape() {
        let payload = EngineError::CustomerInactive(9).to_payload();
        assert_eq!(payload.code, "BM-202");
        assert_eq!(payload.http_status, 422);

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"httpStatus\":422"));
    }
}
