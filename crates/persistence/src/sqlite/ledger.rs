//! Points ledger persistence operations
//!
//! Append is the only mutation; rows are never updated or deleted.

use chrono::{DateTime, Utc};
use fitforge_core::{Error, HistoryFilter, LedgerEntry, Result, TransactionKind};
use sqlx::Executor;

/// Ledger record stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    pub id: i64,
    pub member_id: i64,
    pub points: i64,
    pub kind: String,
    pub activity_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerRow {
    pub fn into_entry(self) -> Result<LedgerEntry> {
        let kind = TransactionKind::parse(&self.kind)
            .ok_or_else(|| Error::InvalidData(format!("unknown transaction kind '{}'", self.kind)))?;
        Ok(LedgerEntry {
            id: self.id,
            member_id: self.member_id,
            points: self.points,
            kind,
            activity_type: self.activity_type,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

/// Append one transaction. `points` must already be validated positive;
/// the kind carries the sign.
pub async fn append<'e, E>(
    executor: E,
    member_id: i64,
    points: i64,
    kind: TransactionKind,
    activity_type: &str,
    description: &str,
    created_at: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO ledger (member_id, points, kind, activity_type, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(member_id)
    .bind(points)
    .bind(kind.as_str())
    .bind(activity_type)
    .bind(description)
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Signed balance for a member, derived from the ledger on every call
pub async fn balance<'e, E>(executor: E, member_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN kind IN ('earned', 'adjusted') THEN points ELSE -points END
        ), 0)
        FROM ledger
        WHERE member_id = ?
        "#,
    )
    .bind(member_id)
    .fetch_one(executor)
    .await?;

    Ok(total)
}

/// Transaction history for a member, newest first, with optional filters
pub async fn history<'e, E>(
    executor: E,
    member_id: i64,
    filter: &HistoryFilter,
) -> Result<Vec<LedgerEntry>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let mut query = String::from(
        r#"
        SELECT id, member_id, points, kind, activity_type, description, created_at
        FROM ledger
        WHERE member_id = ?
        "#,
    );

    if filter.kind.is_some() {
        query.push_str(" AND kind = ?");
    }
    if filter.activity_type.is_some() {
        query.push_str(" AND activity_type = ?");
    }
    if filter.since.is_some() {
        query.push_str(" AND created_at >= ?");
    }
    if filter.until.is_some() {
        query.push_str(" AND created_at <= ?");
    }

    query.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");

    let mut builder = sqlx::query_as::<_, LedgerRow>(&query).bind(member_id);

    if let Some(kind) = filter.kind {
        builder = builder.bind(kind.as_str());
    }
    if let Some(activity_type) = &filter.activity_type {
        builder = builder.bind(activity_type);
    }
    if let Some(since) = filter.since {
        builder = builder.bind(since);
    }
    if let Some(until) = filter.until {
        builder = builder.bind(until);
    }

    let rows = builder
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(LedgerRow::into_entry).collect()
}

/// Total transaction count for a member
pub async fn count_transactions<'e, E>(executor: E, member_id: i64) -> Result<u32>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger WHERE member_id = ?")
        .bind(member_id)
        .fetch_one(executor)
        .await?;

    Ok(count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::{insert_member, Database};
    use chrono::TimeZone;
    use fitforge_core::{MembershipTier, NewMember};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, hour, 0, 0).unwrap()
    }

    async fn member(db: &Database) -> i64 {
        insert_member(
            db.pool(),
            &NewMember {
                username: "casey".to_string(),
                email: "casey@example.com".to_string(),
                tier: MembershipTier::Standard,
            },
            at(7),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_balance_is_signed_sum() {
        let db = Database::connect_in_memory().await.unwrap();
        let member_id = member(&db).await;

        append(db.pool(), member_id, 100, TransactionKind::Earned, "gym_visit", "Gym visit", at(8))
            .await
            .unwrap();
        append(db.pool(), member_id, 30, TransactionKind::Redeemed, "redemption", "smoothie", at(9))
            .await
            .unwrap();
        append(db.pool(), member_id, 10, TransactionKind::Expired, "expiration", "expiry", at(10))
            .await
            .unwrap();
        append(db.pool(), member_id, 5, TransactionKind::Adjusted, "manual_adjustment", "fix", at(11))
            .await
            .unwrap();

        assert_eq!(balance(db.pool(), member_id).await.unwrap(), 65);
        assert_eq!(count_transactions(db.pool(), member_id).await.unwrap(), 4);
        // Unknown members simply have an empty ledger
        assert_eq!(balance(db.pool(), member_id + 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_with_filters() {
        let db = Database::connect_in_memory().await.unwrap();
        let member_id = member(&db).await;

        append(db.pool(), member_id, 10, TransactionKind::Earned, "gym_visit", "Gym visit", at(8))
            .await
            .unwrap();
        append(db.pool(), member_id, 20, TransactionKind::Earned, "class_attendance", "Class", at(9))
            .await
            .unwrap();
        append(db.pool(), member_id, 5, TransactionKind::Redeemed, "redemption", "sticker", at(10))
            .await
            .unwrap();

        let all = history(db.pool(), member_id, &HistoryFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].activity_type, "redemption");
        assert_eq!(all[2].activity_type, "gym_visit");

        let earned_only = history(
            db.pool(),
            member_id,
            &HistoryFilter {
                kind: Some(TransactionKind::Earned),
                ..HistoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(earned_only.len(), 2);

        let late = history(
            db.pool(),
            member_id,
            &HistoryFilter {
                since: Some(at(9)),
                ..HistoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(late.len(), 2);

        let page = history(
            db.pool(),
            member_id,
            &HistoryFilter {
                limit: Some(1),
                offset: Some(1),
                ..HistoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].activity_type, "class_attendance");
    }
}
