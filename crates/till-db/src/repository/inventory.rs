//! # Inventory Repository (Stock Ledger)
//!
//! Inventory items and their append-only stock history.
//!
//! ## Stock Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust_stock(id, new_quantity, reason)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate: new_quantity ≥ 0, reason non-empty    ── Validation          │
//! │       │                                                                 │
//! │       ▼  unit of work                                                   │
//! │  SELECT stock_quantity → old                      ── NotFound           │
//! │  UPDATE ... SET stock_quantity = new                                    │
//! │         WHERE id = ? AND stock_quantity = old     (compare-and-swap)    │
//! │  INSERT stock_history (old, new, reason)                                │
//! │       │                                                                 │
//! │       ├── lost the race / database busy → rollback, re-read, retry      │
//! │       └── COMMIT → updated item                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every change to `stock_quantity` has exactly one history entry, written in
//! the same transaction. History rows are never updated or deleted.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::generate_id;
use crate::unit_of_work::UnitOfWork;
use till_core::validation::{validate_new_item, validate_reason, validate_stock_quantity};
use till_core::{
    CoreError, InventoryItem, ItemImage, NewInventoryItem, StockHistoryEntry, ValidationError,
    INITIAL_STOCK_REASON,
};

const ITEM_COLUMNS: &str = "id, sku, name, category, brand, price_cents, stock_quantity, \
     reorder_point, image_data IS NOT NULL AS has_image, is_active, created_at, updated_at";

/// Repository for inventory items and stock history.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: Database,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(db: Database) -> Self {
        InventoryRepository { db }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?");
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(item)
    }

    /// Gets an item by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = ?");
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(sku.trim())
            .fetch_optional(self.db.pool())
            .await?;

        Ok(item)
    }

    /// Active items whose stock is at or below their reorder point.
    pub async fn list_below_reorder_point(&self) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE is_active = 1 AND stock_quantity <= reorder_point \
             ORDER BY sku"
        );
        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .fetch_all(self.db.pool())
            .await?;

        Ok(items)
    }

    /// Counts active items (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE is_active = 1")
                .fetch_one(self.db.pool())
                .await?;

        Ok(count)
    }

    /// Stock history of an item, oldest first.
    pub async fn stock_history(&self, item_id: &str) -> DbResult<Vec<StockHistoryEntry>> {
        self.require_item(item_id).await?;

        let entries = sqlx::query_as::<_, StockHistoryEntry>(
            r#"
            SELECT id, item_id, old_quantity, new_quantity, reason, created_at
            FROM stock_history
            WHERE item_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(item_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(entries)
    }

    /// Gets the stored image of an item, if it has one.
    pub async fn get_image(&self, item_id: &str) -> DbResult<Option<ItemImage>> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> = sqlx::query_as(
            "SELECT image_data, image_content_type FROM inventory_items WHERE id = ?",
        )
        .bind(item_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            None => Err(DbError::not_found("InventoryItem", item_id)),
            Some((Some(data), Some(content_type))) => Ok(Some(ItemImage { content_type, data })),
            Some(_) => Ok(None),
        }
    }

    async fn require_item(&self, item_id: &str) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM inventory_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(self.db.pool())
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("InventoryItem", item_id))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates an item and records its opening stock in the history.
    ///
    /// ## Errors
    /// - `Validation` for a malformed payload
    /// - `UniqueViolation` when the SKU is taken
    pub async fn create_item(&self, item: &NewInventoryItem) -> DbResult<InventoryItem> {
        validate_new_item(item)?;

        let id = generate_id();
        let sku = item.sku.trim();
        debug!(id = %id, sku = %sku, "Creating inventory item");

        self.db
            .bounded("create_item", async {
                let mut uow = self.db.begin_unit("create_item").await?;
                let result = insert_item(&mut uow, &id, item).await;
                uow.finish(result).await
            })
            .await?;

        info!(id = %id, sku = %sku, stock = item.stock_quantity, "Inventory item created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("InventoryItem", &id))
    }

    /// Sets the absolute stock quantity of an item and records the change.
    ///
    /// ## Arguments
    /// * `item_id` - Item to adjust
    /// * `new_quantity` - Quantity after the adjustment, ≥ 0
    /// * `reason` - Free text kept on the history entry (recount, damage, delivery)
    ///
    /// ## Errors
    /// - `Validation` when the quantity is negative or the reason is empty
    /// - `NotFound` when the item does not exist
    /// - `RolledBack` when storage failed after the quantity was written
    pub async fn adjust_stock(
        &self,
        item_id: &str,
        new_quantity: i64,
        reason: &str,
    ) -> DbResult<InventoryItem> {
        validate_stock_quantity(new_quantity)?;
        validate_reason(reason)?;
        let reason = reason.trim();

        debug!(item_id = %item_id, new_quantity, reason = %reason, "Adjusting stock");

        let (old_quantity, item) = self
            .db
            .with_retries("adjust_stock", || {
                self.db
                    .bounded("adjust_stock", self.adjust_once(item_id, new_quantity, reason))
            })
            .await?;

        info!(
            item_id = %item_id,
            sku = %item.sku,
            old_quantity,
            new_quantity,
            "Stock adjusted"
        );
        Ok(item)
    }

    async fn adjust_once(
        &self,
        item_id: &str,
        new_quantity: i64,
        reason: &str,
    ) -> DbResult<(i64, InventoryItem)> {
        let mut uow = self.db.begin_unit("adjust_stock").await?;
        let result = set_quantity(&mut uow, item_id, new_quantity, reason).await;
        let result = match result {
            Ok(old) => fetch_item(&mut uow, item_id).await.map(|item| (old, item)),
            Err(e) => Err(e),
        };
        uow.finish(result).await
    }

    /// Stores an image blob on an item, replacing any previous one.
    pub async fn set_image(&self, item_id: &str, data: &[u8], content_type: &str) -> DbResult<()> {
        let content_type = content_type.trim();
        if !content_type.starts_with("image/") {
            return Err(ValidationError::InvalidFormat {
                field: "contentType".to_string(),
                reason: "must be an image/* media type".to_string(),
            }
            .into());
        }
        if data.is_empty() {
            return Err(ValidationError::required("image").into());
        }

        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET image_data = ?, image_content_type = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(data)
        .bind(content_type)
        .bind(Utc::now())
        .bind(item_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", item_id));
        }

        info!(item_id = %item_id, bytes = data.len(), "Item image stored");
        Ok(())
    }

    /// Soft-deletes an item. Sale lines and history keep referencing it.
    pub async fn deactivate(&self, item_id: &str) -> DbResult<()> {
        debug!(item_id = %item_id, "Deactivating item");

        let result =
            sqlx::query("UPDATE inventory_items SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(item_id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", item_id));
        }

        info!(item_id = %item_id, "Item deactivated");
        Ok(())
    }
}

// =============================================================================
// Unit-of-work steps
// =============================================================================

async fn insert_item(uow: &mut UnitOfWork, id: &str, item: &NewInventoryItem) -> DbResult<()> {
    let now = Utc::now();
    let sku = item.sku.trim();

    uow.execute(
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, sku, name, category, brand,
                price_cents, stock_quantity, reorder_point,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id)
        .bind(sku)
        .bind(item.name.trim())
        .bind(item.category.trim())
        .bind(item.brand.trim())
        .bind(item.price_cents)
        .bind(item.stock_quantity)
        .bind(item.reorder_point)
        .bind(now)
        .bind(now),
    )
    .await
    .map_err(|e| match e {
        DbError::UniqueViolation { .. } => DbError::duplicate("sku", sku),
        other => other,
    })?;

    append_history(uow, id, 0, item.stock_quantity, INITIAL_STOCK_REASON).await
}

/// Compare-and-swap write of a new quantity plus its history entry.
/// Returns the quantity that was replaced.
async fn set_quantity(
    uow: &mut UnitOfWork,
    item_id: &str,
    new_quantity: i64,
    reason: &str,
) -> DbResult<i64> {
    let old: i64 = sqlx::query_scalar("SELECT stock_quantity FROM inventory_items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(uow.conn())
        .await?
        .ok_or_else(|| DbError::not_found("InventoryItem", item_id))?;

    let result = uow
        .execute(
            sqlx::query(
                r#"
                UPDATE inventory_items
                SET stock_quantity = ?, updated_at = ?
                WHERE id = ? AND stock_quantity = ?
                "#,
            )
            .bind(new_quantity)
            .bind(Utc::now())
            .bind(item_id)
            .bind(old),
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Busy(format!(
            "stock of item {item_id} changed concurrently"
        )));
    }

    append_history(uow, item_id, old, new_quantity, reason).await?;
    Ok(old)
}

/// Takes `quantity` units of an item inside a sale's unit of work.
///
/// ## Errors
/// - `NotFound` when the item does not exist
/// - `Rule(InsufficientStock)` when fewer than `quantity` units are on hand
pub(crate) async fn decrement_for_sale(
    uow: &mut UnitOfWork,
    item_id: &str,
    quantity: i64,
    reason: &str,
) -> DbResult<()> {
    let (sku, old): (String, i64) =
        sqlx::query_as("SELECT sku, stock_quantity FROM inventory_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(uow.conn())
            .await?
            .ok_or_else(|| DbError::not_found("InventoryItem", item_id))?;

    if old < quantity {
        return Err(CoreError::InsufficientStock {
            sku,
            available: old,
            requested: quantity,
        }
        .into());
    }

    let new_quantity = old - quantity;
    let result = uow
        .execute(
            sqlx::query(
                r#"
                UPDATE inventory_items
                SET stock_quantity = ?, updated_at = ?
                WHERE id = ? AND stock_quantity = ?
                "#,
            )
            .bind(new_quantity)
            .bind(Utc::now())
            .bind(item_id)
            .bind(old),
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Busy(format!(
            "stock of item {item_id} changed concurrently"
        )));
    }

    append_history(uow, item_id, old, new_quantity, reason).await
}

async fn append_history(
    uow: &mut UnitOfWork,
    item_id: &str,
    old_quantity: i64,
    new_quantity: i64,
    reason: &str,
) -> DbResult<()> {
    uow.execute(
        sqlx::query(
            r#"
            INSERT INTO stock_history (id, item_id, old_quantity, new_quantity, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(generate_id())
        .bind(item_id)
        .bind(old_quantity)
        .bind(new_quantity)
        .bind(reason)
        .bind(Utc::now()),
    )
    .await?;

    Ok(())
}

async fn fetch_item(uow: &mut UnitOfWork, item_id: &str) -> DbResult<InventoryItem> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?");
    sqlx::query_as::<_, InventoryItem>(&sql)
        .bind(item_id)
        .fetch_optional(uow.conn())
        .await?
        .ok_or_else(|| DbError::not_found("InventoryItem", item_id))
}

// =============================================================================
// Unit Tests
// =============================================================================
