//! # till-core: Pure Business Logic for Till
//!
//! Domain types, money arithmetic, validation rules and member identifier
//! computation. Nothing in this crate touches a database, a socket or a file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-api (axum)                              │   │
//! │  │   PATCH /inventory/{id}/stock   POST /sales   POST /members     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │        units of work, Stock Ledger, Sale Commit, Members        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │ member_id │  │ validation│   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryItem, Sale, Member, requests)
//! - [`money`] - Money type with integer arithmetic, points calculation
//! - [`member_id`] - Next member identifier from the identifiers in use
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation, run before any unit of work opens
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::member_id::next_member_id;
//! use till_core::money::Money;
//!
//! let line = Money::from_cents(1099).multiply_quantity(3);
//! assert_eq!(line.cents(), 3297);
//!
//! let next = next_member_id(["M001", "M007", "M003"]);
//! assert_eq!(next, "M008");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod member_id;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Catches keying mistakes (1000 instead of 10) at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Basis points in 100 %.
pub const BPS_SCALE: i64 = 10_000;

/// Reason recorded on the history entry written when an item is created.
pub const INITIAL_STOCK_REASON: &str = "initial stock";
