//! # Member Repository
//!
//! Loyalty members: identifier allocation, points balance and tier.
//!
//! ## Allocation Under Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller A                              caller B                         │
//! │  ────────                              ────────                         │
//! │  scan ids → max M041                   scan ids → max M041              │
//! │  INSERT M042 ✓ COMMIT                  INSERT M042 ✗ PRIMARY KEY        │
//! │                                        rollback, rescan → max M042      │
//! │                                        INSERT M043 ✓ COMMIT             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The scan alone promises nothing; `members.member_id` is the primary key and
//! the whole scan-and-insert is retried on conflict.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::unit_of_work::UnitOfWork;
use till_core::member_id::next_member_id;
use till_core::validation::{validate_new_member, validate_points};
use till_core::{Member, MembershipTier, NewMember, ValidationError};

const MEMBER_COLUMNS: &str =
    "member_id, name, email, phone, tier, points_balance, join_date, total_spent_cents";

/// Repository for loyalty members.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    db: Database,
}

impl MemberRepository {
    /// Creates a new MemberRepository.
    pub fn new(db: Database) -> Self {
        MemberRepository { db }
    }

    /// Gets a member by identifier.
    pub async fn get_by_id(&self, member_id: &str) -> DbResult<Option<Member>> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?");
        let member = sqlx::query_as::<_, Member>(&sql)
            .bind(member_id.trim())
            .fetch_optional(self.db.pool())
            .await?;

        Ok(member)
    }

    /// All membership tiers, lowest multiplier first.
    pub async fn list_tiers(&self) -> DbResult<Vec<MembershipTier>> {
        let tiers = sqlx::query_as::<_, MembershipTier>(
            "SELECT name, points_multiplier_bps FROM membership_tiers ORDER BY points_multiplier_bps, name",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(tiers)
    }

    /// The identifier the next created member would get right now.
    ///
    /// Advisory only: another caller may take it first.
    pub async fn next_member_id(&self) -> DbResult<String> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT member_id FROM members")
            .fetch_all(self.db.pool())
            .await?;

        Ok(next_member_id(ids))
    }

    /// Registers a member with a freshly allocated identifier.
    ///
    /// ## Errors
    /// - `Validation` for missing fields or an unknown tier
    /// - `UniqueViolation` when every retry lost the identifier race
    pub async fn create_member(&self, member: &NewMember) -> DbResult<Member> {
        validate_new_member(member)?;

        let created = self
            .db
            .with_retries("create_member", || {
                self.db
                    .bounded("create_member", self.create_once(member))
            })
            .await?;

        info!(member_id = %created.member_id, tier = %created.tier, "Member created");
        Ok(created)
    }

    async fn create_once(&self, member: &NewMember) -> DbResult<Member> {
        let mut uow = self.db.begin_unit("create_member").await?;
        let result = insert_member(&mut uow, member).await;
        uow.finish(result).await
    }

    /// Overwrites a member's points balance.
    pub async fn update_points(&self, member_id: &str, points: i64) -> DbResult<()> {
        validate_points("points", points)?;
        debug!(member_id = %member_id, points, "Updating points balance");

        let result = sqlx::query("UPDATE members SET points_balance = ? WHERE member_id = ?")
            .bind(points)
            .bind(member_id.trim())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Member", member_id));
        }

        info!(member_id = %member_id, points, "Points balance set");
        Ok(())
    }

    /// Moves a member to another tier.
    pub async fn change_tier(&self, member_id: &str, tier: &str) -> DbResult<Member> {
        let tier = tier.trim();
        if tier.is_empty() {
            return Err(ValidationError::required("tier").into());
        }

        let member = self
            .db
            .bounded("change_tier", async {
                let mut uow = self.db.begin_unit("change_tier").await?;
                let result = set_tier(&mut uow, member_id.trim(), tier).await;
                uow.finish(result).await
            })
            .await?;

        info!(member_id = %member.member_id, tier = %member.tier, "Member tier changed");
        Ok(member)
    }
}

// =============================================================================
// Unit-of-work steps
// =============================================================================

async fn insert_member(uow: &mut UnitOfWork, member: &NewMember) -> DbResult<Member> {
    let tier = member.tier.trim();
    ensure_tier(uow, tier).await?;

    let ids: Vec<String> = sqlx::query_scalar("SELECT member_id FROM members")
        .fetch_all(uow.conn())
        .await?;
    let member_id = next_member_id(ids);

    debug!(member_id = %member_id, "Allocated member identifier");

    uow.execute(
        sqlx::query(
            r#"
            INSERT INTO members (
                member_id, name, email, phone, tier,
                points_balance, join_date, total_spent_cents
            ) VALUES (?, ?, ?, ?, ?, 0, ?, 0)
            "#,
        )
        .bind(&member_id)
        .bind(member.name.trim())
        .bind(member.email.trim())
        .bind(member.phone.trim())
        .bind(tier)
        .bind(Utc::now().date_naive()),
    )
    .await
    .map_err(|e| match e {
        DbError::UniqueViolation { .. } => DbError::duplicate("memberId", &member_id),
        other => other,
    })?;

    fetch_member(uow, &member_id).await
}

async fn set_tier(uow: &mut UnitOfWork, member_id: &str, tier: &str) -> DbResult<Member> {
    ensure_tier(uow, tier).await?;

    let result = uow
        .execute(
            sqlx::query("UPDATE members SET tier = ? WHERE member_id = ?")
                .bind(tier)
                .bind(member_id),
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Member", member_id));
    }

    fetch_member(uow, member_id).await
}

async fn ensure_tier(uow: &mut UnitOfWork, tier: &str) -> DbResult<()> {
    let tiers: Vec<String> = sqlx::query_scalar("SELECT name FROM membership_tiers ORDER BY name")
        .fetch_all(uow.conn())
        .await?;

    if tiers.iter().any(|t| t == tier) {
        return Ok(());
    }

    Err(ValidationError::NotAllowed {
        field: "tier".to_string(),
        allowed: tiers,
    }
    .into())
}

async fn fetch_member(uow: &mut UnitOfWork, member_id: &str) -> DbResult<Member> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE member_id = ?");
    sqlx::query_as::<_, Member>(&sql)
        .bind(member_id)
        .fetch_optional(uow.conn())
        .await?
        .ok_or_else(|| DbError::not_found("Member", member_id))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{file_db, memory_db, new_member, remove_db_files};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_identifiers_count_up_from_m001() {
        let db = memory_db().await;
        let repo = db.members();

        assert_eq!(repo.next_member_id().await.unwrap(), "M001");

        let first = repo.create_member(&new_member("Ann")).await.unwrap();
        let second = repo.create_member(&new_member("Bob")).await.unwrap();

        assert_eq!(first.member_id, "M001");
        assert_eq!(second.member_id, "M002");
        assert_eq!(first.points_balance, 0);
        assert_eq!(first.total_spent_cents, 0);
        assert_eq!(first.join_date, Utc::now().date_naive());
        assert_eq!(first.tier, "Bronze");
    }

    #[tokio::test]
    async fn test_allocation_follows_the_highest_existing_id() {
        let db = memory_db().await;
        for id in ["M001", "M007", "M003"] {
            sqlx::query(
                "INSERT INTO members (member_id, name, email, phone, tier, join_date) \
                 VALUES (?, 'Legacy', 'l@example.com', '0812345678', 'Bronze', '2024-01-01')",
            )
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
        }

        assert_eq!(db.members().next_member_id().await.unwrap(), "M008");
        let created = db.members().create_member(&new_member("Dee")).await.unwrap();
        assert_eq!(created.member_id, "M008");
    }

    #[tokio::test]
    async fn test_unknown_tier_is_rejected() {
        let db = memory_db().await;
        let mut member = new_member("Eve");
        member.tier = "Diamond".to_string();

        let err = db.members().create_member(&member).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::NotAllowed { .. })
        ));
        assert_eq!(db.members().next_member_id().await.unwrap(), "M001");
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let db = memory_db().await;
        let mut member = new_member("Fay");
        member.email = "not-an-email".to_string();

        let err = db.members().create_member(&member).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db
            .members()
            .create_member(&NewMember::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_points() {
        let db = memory_db().await;
        let repo = db.members();
        let member = repo.create_member(&new_member("Gus")).await.unwrap();

        repo.update_points(&member.member_id, 250).await.unwrap();
        let member = repo.get_by_id(&member.member_id).await.unwrap().unwrap();
        assert_eq!(member.points_balance, 250);

        let err = repo.update_points(&member.member_id, -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = repo.update_points("M404", 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_change_tier() {
        let db = memory_db().await;
        let repo = db.members();
        let member = repo.create_member(&new_member("Hal")).await.unwrap();

        let member = repo.change_tier(&member.member_id, "Gold").await.unwrap();
        assert_eq!(member.tier, "Gold");

        let err = repo.change_tier(&member.member_id, "Tin").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = repo.change_tier("M404", "Gold").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_tiers() {
        let db = memory_db().await;
        let tiers = db.members().list_tiers().await.unwrap();

        let names: Vec<&str> = tiers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Bronze", "Silver", "Gold", "Platinum"]);
        assert_eq!(tiers[3].points_for(till_core::Money::from_cents(1050)), 21);
    }

    #[tokio::test]
    async fn test_concurrent_creation_never_duplicates_ids() {
        let (db, path) = file_db().await;

        let mut handles = Vec::new();
        for n in 0..10 {
            let repo = db.members();
            handles.push(tokio::spawn(async move {
                repo.create_member(&new_member(&format!("Racer{n}"))).await
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            let member = handle.await.unwrap().unwrap();
            assert!(ids.insert(member.member_id));
        }

        assert_eq!(ids.len(), 10);
        for n in 1..=10 {
            assert!(ids.contains(&format!("M{n:03}")));
        }

        remove_db_files(db, path).await;
    }
}
