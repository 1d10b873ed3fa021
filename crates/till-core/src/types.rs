//! # Domain Types
//!
//! Entities persisted by till-db and the request/response DTOs exchanged with
//! the HTTP binding.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InventoryItem ◄──── StockHistoryEntry   (append-only, one per change) │
//! │       ▲                                                                 │
//! │       │ referenced, never owned                                         │
//! │       │                                                                 │
//! │  SaleLineItem ─────► Sale ◄──── PointsHistoryEntry ────► Member        │
//! │  (owned by Sale,     (transaction_id                      │             │
//! │   cascade-deleted)    is unique)                          ▼             │
//! │                                                    MembershipTier       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Entities carry a UUID surrogate `id` used for relations and a business key
//! where one exists (`sku`, `transaction_id`). Members are the exception:
//! their business key `member_id` (`M001`) is also the primary key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{self, Money};

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// QR / wallet payment.
    EWallet,
}

// =============================================================================
// Inventory
// =============================================================================

/// An item carried in inventory.
///
/// `stock_quantity` is never negative; the column has a CHECK constraint and
/// every write path validates before it opens a unit of work.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    pub name: String,
    pub category: String,
    pub brand: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Units on hand.
    pub stock_quantity: i64,

    /// Informational threshold for restocking.
    pub reorder_point: i64,

    /// Whether an image blob is stored for this item.
    pub has_image: bool,

    /// False once the item has been deactivated (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when stock has fallen to or below the reorder point.
    pub fn needs_reorder(&self) -> bool {
        self.stock_quantity <= self.reorder_point
    }
}

/// Payload for creating an inventory item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewInventoryItem {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub reorder_point: i64,
}

/// Payload for `PATCH /inventory/{id}/stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    /// Absolute quantity after the adjustment. Must be a whole number ≥ 0.
    pub new_quantity: i64,

    #[serde(default)]
    pub reason: String,
}

/// An image stored against an inventory item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// One entry of the stock audit trail. Never updated after insert.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockHistoryEntry {
    pub id: String,
    pub item_id: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockHistoryEntry {
    /// Signed change recorded by this entry.
    pub fn delta(&self) -> i64 {
        self.new_quantity - self.old_quantity
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale header.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Surrogate identifier (UUID v4).
    pub id: String,
    /// Caller-generated correlation identifier, unique across sales.
    pub transaction_id: String,
    pub customer_name: Option<String>,
    pub member_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of a committed sale.
///
/// Uses the snapshot pattern: `price_per_unit_cents` is frozen at the time of
/// sale and is independent of later price changes on the item.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    /// Position in the original request, starting at 0.
    pub line_number: i64,
    pub quantity: i64,
    pub price_per_unit_cents: i64,
    /// Line discount in basis points (1000 = 10 %).
    pub discount_bps: i64,
}

impl SaleLineItem {
    /// Returns the discounted line total as Money.
    pub fn line_total(&self) -> Money {
        money::line_total(
            Money::from_cents(self.price_per_unit_cents),
            self.quantity,
            self.discount_bps,
        )
    }
}

/// One requested line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub item_id: String,
    pub quantity: i64,
    pub price_per_unit_cents: i64,
    #[serde(default)]
    pub discount_bps: i64,
}

/// Loyalty details supplied by the till when a member is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    pub points_earned: i64,
    /// Balance the till expects after this sale. Checked, not trusted.
    pub new_total_points: i64,
}

/// Everything needed to commit one sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub transaction_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleLineRequest>,
    pub subtotal_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    pub total_cents: i64,
    #[serde(default)]
    pub member_details: Option<MemberDetails>,
}

/// Identifiers of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale_id: String,
    pub transaction_id: String,
}

// =============================================================================
// Members
// =============================================================================

/// Loyalty tier reference data.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTier {
    pub name: String,
    /// Points multiplier in basis points (10000 = 1.0×).
    pub points_multiplier_bps: i64,
}

impl MembershipTier {
    /// Points this tier earns for a purchase of `total`.
    pub fn points_for(&self, total: Money) -> i64 {
        money::points_for_spend(total, self.points_multiplier_bps)
    }
}

/// A loyalty member.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// `M` + zero-padded sequence, e.g. `M001`.
    pub member_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tier: String,
    pub points_balance: i64,
    #[ts(as = "String")]
    pub join_date: NaiveDate,
    pub total_spent_cents: i64,
}

/// Payload for `POST /members`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tier: String,
}

/// Payload for `PATCH /members/{id}/points`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PointsUpdate {
    pub points: i64,
}

/// Payload for `PATCH /members/{id}/tier`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TierChange {
    #[serde(default)]
    pub tier: String,
}

/// One loyalty ledger entry, written only by a sale commit.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PointsHistoryEntry {
    pub id: String,
    pub member_id: String,
    pub sale_id: String,
    pub points_earned: i64,
    /// Balance snapshot after this sale.
    pub balance_after: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
