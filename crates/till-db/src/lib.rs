//! # till-db: Database Layer for Till
//!
//! SQLite storage for inventory, sales and loyalty members, accessed through
//! sqlx. Every multi-step write runs inside one [`UnitOfWork`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /sales)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ Inventory      │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │    │ Sale           │    └──────────────┘  │   │
//! │  │   │ UnitOfWork    │    │ Member         │                      │   │
//! │  │   └───────────────┘    └────────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, unit-of-work deadline
//! - [`unit_of_work`] - Commit/rollback scope for multi-step writes
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and the five-kind taxonomy
//! - [`repository`] - Stock ledger, sale commit, members
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//!
//! let item = db.inventory().adjust_stock(&item_id, 12, "recount").await?;
//! let receipt = db.sales().commit_sale(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig, StockPolicy};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::inventory::InventoryRepository;
pub use repository::member::MemberRepository;
pub use repository::sale::SaleRepository;
