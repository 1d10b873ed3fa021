//! # Repository Module
//!
//! Database repository implementations for Till.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.inventory().adjust_stock(id, 12, "recount")                │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── validate input            (till-core, before any transaction)     │
//! │  ├── db.bounded(..)            (deadline)                              │
//! │  │     └── db.begin_unit(..)   (one transaction, writes counted)       │
//! │  │           ├── SQL ...                                               │
//! │  │           └── finish(result) → COMMIT | ROLLBACK                    │
//! │  └── log the committed mutation                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`inventory::InventoryRepository`] - Stock ledger and item catalogue
//! - [`sale::SaleRepository`] - Sale commit and sale reads
//! - [`member::MemberRepository`] - Member identifiers, points and tiers

pub mod inventory;
pub mod member;
pub mod sale;

use uuid::Uuid;

/// Generates a surrogate row identifier (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
