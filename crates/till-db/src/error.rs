//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError (till-core) ──┐                                       │
//! │  sqlx::Error ──────────────────┼──► DbError (this module)              │
//! │                                │        │                               │
//! │                                │        ▼  failed after ≥1 write?       │
//! │                                │   DbError::RolledBack { source }       │
//! │                                │        │                               │
//! │                                ▼        ▼                               │
//! │                     DbError::kind() → ErrorKind (five kinds)           │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                     ApiError (till-api) → HTTP status                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use till_core::{CoreError, ValidationError};

/// The five failure kinds callers need to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed, missing or out-of-range input. Nothing was written.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// Uniqueness violation: duplicate SKU, transaction or member identifier.
    Conflict,
    /// Storage unavailable, timed out or rejected the write.
    Persistence,
    /// A multi-step write failed after at least one write; all of it was undone.
    RolledBack,
}

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Input rejected before any unit of work opened.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A business rule rejected the write (e.g. insufficient stock).
    #[error("{0}")]
    Rule(CoreError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU
    /// - Reusing a sale transaction identifier
    /// - Two callers allocating the same member identifier
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A sale line referencing a non-existent inventory item
    /// - A member with an unknown tier
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock or balance reaching storage).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// SQLite could not take the write lock in time, or a compare-and-swap
    /// guard lost a race. Safe to retry with fresh reads.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use past the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A unit of work ran past its deadline and was rolled back.
    #[error("{operation} timed out after {millis}ms and was rolled back")]
    Timeout { operation: String, millis: u64 },

    /// A unit of work failed after applying writes; every write was undone.
    #[error("{operation} rolled back after {writes} write(s): {source}")]
    RolledBack {
        operation: String,
        writes: u32,
        #[source]
        source: Box<DbError>,
    },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The originating error, looking through [`DbError::RolledBack`].
    pub fn root(&self) -> &DbError {
        match self {
            DbError::RolledBack { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classifies this error into one of the five failure kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) | DbError::Rule(_) | DbError::CheckViolation { .. } => {
                ErrorKind::Validation
            }
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::UniqueViolation { .. } => ErrorKind::Conflict,
            DbError::RolledBack { .. } => ErrorKind::RolledBack,
            DbError::ForeignKeyViolation { .. }
            | DbError::Busy(_)
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Timeout { .. }
            | DbError::Internal(_) => ErrorKind::Persistence,
        }
    }

    /// True when repeating the whole unit of work with fresh reads may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            DbError::UniqueViolation { .. } | DbError::Busy(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr>"
                if let Some(field) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => DbError::Validation(e),
            other => DbError::Rule(other),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolled_back_keeps_the_original_error() {
        let err = DbError::RolledBack {
            operation: "commit_sale".to_string(),
            writes: 2,
            source: Box::new(DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".to_string(),
            }),
        };

        assert_eq!(err.kind(), ErrorKind::RolledBack);
        assert_eq!(err.root().kind(), ErrorKind::Persistence);
        assert!(err.to_string().contains("FOREIGN KEY"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflicts_are_retryable_through_rollback() {
        let err = DbError::RolledBack {
            operation: "create_member".to_string(),
            writes: 0,
            source: Box::new(DbError::duplicate("members.member_id", "M001")),
        };
        assert!(err.is_retryable());
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(!DbError::not_found("Member", "M404").is_retryable());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            DbError::from(ValidationError::required("reason")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(DbError::not_found("Item", "x").kind(), ErrorKind::NotFound);
        assert_eq!(DbError::duplicate("sku", "A").kind(), ErrorKind::Conflict);
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Persistence);
    }
}
