//! # Sale Repository (Sale Commit Engine)
//!
//! Commits a sale, its lines and its loyalty effects as one unit of work.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_sale(request)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_sale_request              ── Validation, nothing opened       │
//! │       │                                                                 │
//! │       ▼  ┌──────────────── one unit of work ─────────────────────┐      │
//! │          │ 1. member exists? items exist?  ── NotFound           │      │
//! │          │ 2. INSERT sales                 ── Conflict (txn id)  │      │
//! │          │ 3. INSERT sale_line_items × n   (line_number 0..n)    │      │
//! │          │ 4. members.total_spent += total                       │      │
//! │          │ 5. points_balance += earned RETURNING balance         │      │
//! │          │    INSERT points_history (earned, balance)            │      │
//! │          │ 6. [DecrementInSale] stock -= qty, history per line   │      │
//! │          └──────────────┬────────────────────────────────────────┘      │
//! │                         ├── all Ok  → COMMIT → SaleReceipt              │
//! │                         └── any Err → ROLLBACK: no sale, no lines,      │
//! │                                        no points, no stock change       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The points balance is computed by the database, not taken from the till.
//! `new_total_points` from the request is compared against the result and a
//! disagreement is logged; the stored value always comes from the update.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::{Database, StockPolicy};
use crate::repository::generate_id;
use crate::repository::inventory::decrement_for_sale;
use crate::unit_of_work::UnitOfWork;
use till_core::validation::validate_sale_request;
use till_core::{PointsHistoryEntry, Sale, SaleLineItem, SaleReceipt, SaleRequest};

const SALE_COLUMNS: &str = "id, transaction_id, customer_name, member_id, payment_method, \
     subtotal_cents, discount_cents, tax_cents, total_cents, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: Database,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(db: Database) -> Self {
        SaleRepository { db }
    }

    /// Commits a sale.
    ///
    /// ## Errors
    /// - `Validation` for a malformed request (nothing opened)
    /// - `NotFound` when `member_id` names no member or a line names no item
    /// - `UniqueViolation` when the transaction ID was already committed
    /// - `RolledBack` when a later step failed; `root()` gives the cause
    pub async fn commit_sale(&self, req: &SaleRequest) -> DbResult<SaleReceipt> {
        validate_sale_request(req)?;

        let sale_id = generate_id();
        let transaction_id = req.transaction_id.trim().to_string();
        let policy = self.db.stock_policy();

        debug!(
            sale_id = %sale_id,
            transaction_id = %transaction_id,
            lines = req.items.len(),
            total_cents = req.total_cents,
            "Committing sale"
        );

        let balance = self
            .db
            .bounded("commit_sale", async {
                let mut uow = self.db.begin_unit("commit_sale").await?;
                let result = write_sale(&mut uow, &sale_id, &transaction_id, req, policy).await;
                uow.finish(result).await
            })
            .await?;

        info!(
            sale_id = %sale_id,
            transaction_id = %transaction_id,
            member_id = req.member_id.as_deref().unwrap_or("-"),
            points_balance = ?balance,
            total_cents = req.total_cents,
            "Sale committed"
        );

        Ok(SaleReceipt {
            sale_id,
            transaction_id,
        })
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(sale)
    }

    /// Gets a sale by the till's transaction ID.
    pub async fn get_by_transaction_id(&self, transaction_id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE transaction_id = ?");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(transaction_id.trim())
            .fetch_optional(self.db.pool())
            .await?;

        Ok(sale)
    }

    /// Lines of a sale in their original order.
    pub async fn get_line_items(&self, sale_id: &str) -> DbResult<Vec<SaleLineItem>> {
        let lines = sqlx::query_as::<_, SaleLineItem>(
            r#"
            SELECT id, sale_id, item_id, line_number, quantity, price_per_unit_cents, discount_bps
            FROM sale_line_items
            WHERE sale_id = ?
            ORDER BY line_number
            "#,
        )
        .bind(sale_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(lines)
    }

    /// Loyalty ledger of a member, oldest first.
    pub async fn points_history(&self, member_id: &str) -> DbResult<Vec<PointsHistoryEntry>> {
        let entries = sqlx::query_as::<_, PointsHistoryEntry>(
            r#"
            SELECT id, member_id, sale_id, points_earned, balance_after, created_at
            FROM points_history
            WHERE member_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(member_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit-of-work steps
// =============================================================================

/// Every write of one sale. Returns the member's points balance when points
/// were applied.
async fn write_sale(
    uow: &mut UnitOfWork,
    sale_id: &str,
    transaction_id: &str,
    req: &SaleRequest,
    policy: StockPolicy,
) -> DbResult<Option<i64>> {
    let member_id = req
        .member_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    if let Some(member_id) = member_id {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM members WHERE member_id = ?")
            .bind(member_id)
            .fetch_optional(uow.conn())
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Member", member_id));
        }
    }

    for line in &req.items {
        let item_id = line.item_id.trim();
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM inventory_items WHERE id = ?")
                .bind(item_id)
                .fetch_optional(uow.conn())
                .await?;
        if exists.is_none() {
            return Err(DbError::not_found("InventoryItem", item_id));
        }
    }

    let now = Utc::now();

    uow.execute(
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, transaction_id, customer_name, member_id, payment_method,
                subtotal_cents, discount_cents, tax_cents, total_cents, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale_id)
        .bind(transaction_id)
        .bind(req.customer_name.as_deref().map(str::trim))
        .bind(member_id)
        .bind(req.payment_method)
        .bind(req.subtotal_cents)
        .bind(req.discount_cents)
        .bind(req.tax_cents)
        .bind(req.total_cents)
        .bind(now),
    )
    .await
    .map_err(|e| match e {
        DbError::UniqueViolation { .. } => DbError::duplicate("transactionId", transaction_id),
        other => other,
    })?;

    for (line_number, line) in req.items.iter().enumerate() {
        uow.execute(
            sqlx::query(
                r#"
                INSERT INTO sale_line_items (
                    id, sale_id, item_id, line_number,
                    quantity, price_per_unit_cents, discount_bps
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(generate_id())
            .bind(sale_id)
            .bind(line.item_id.trim())
            .bind(line_number as i64)
            .bind(line.quantity)
            .bind(line.price_per_unit_cents)
            .bind(line.discount_bps),
        )
        .await?;
    }

    let mut balance = None;

    if let Some(member_id) = member_id {
        uow.execute(
            sqlx::query(
                "UPDATE members SET total_spent_cents = total_spent_cents + ? WHERE member_id = ?",
            )
            .bind(req.total_cents)
            .bind(member_id),
        )
        .await?;

        if let Some(details) = &req.member_details {
            let new_balance: i64 = sqlx::query_scalar(
                r#"
                UPDATE members
                SET points_balance = points_balance + ?
                WHERE member_id = ?
                RETURNING points_balance
                "#,
            )
            .bind(details.points_earned)
            .bind(member_id)
            .fetch_one(uow.conn())
            .await?;
            uow.record_write();

            if new_balance != details.new_total_points {
                warn!(
                    member_id = %member_id,
                    transaction_id = %transaction_id,
                    expected = details.new_total_points,
                    actual = new_balance,
                    "Till's points total disagrees with stored balance; keeping stored value"
                );
            }

            uow.execute(
                sqlx::query(
                    r#"
                    INSERT INTO points_history (
                        id, member_id, sale_id, points_earned, balance_after, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(generate_id())
                .bind(member_id)
                .bind(sale_id)
                .bind(details.points_earned)
                .bind(new_balance)
                .bind(now),
            )
            .await?;

            balance = Some(new_balance);
        }
    }

    if policy == StockPolicy::DecrementInSale {
        let reason = format!("sale {transaction_id}");
        for line in &req.items {
            decrement_for_sale(uow, line.item_id.trim(), line.quantity, &reason).await?;
        }
    }

    Ok(balance)
}

// =============================================================================
// Unit Tests
// =============================================================================
