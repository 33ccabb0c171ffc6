//! Activity log persistence operations

use chrono::{DateTime, Utc};
use fitforge_core::{ActivityContext, ActivityRecord, Error, Intensity, Result};
use sqlx::Executor;
use std::collections::HashMap;

/// Activity record stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub member_id: i64,
    pub activity_type: String,
    pub duration_minutes: Option<i64>,
    pub intensity: Option<String>,
    pub points_earned: i64,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityRow {
    pub fn into_record(self) -> Result<ActivityRecord> {
        let intensity = match self.intensity.as_deref() {
            None => None,
            Some(raw) => Some(
                Intensity::parse(raw)
                    .ok_or_else(|| Error::InvalidData(format!("unknown intensity '{raw}'")))?,
            ),
        };
        Ok(ActivityRecord {
            id: self.id,
            member_id: self.member_id,
            activity_type: self.activity_type,
            duration_minutes: self.duration_minutes,
            intensity,
            points_earned: self.points_earned,
            comments: self.comments,
            created_at: self.created_at,
        })
    }
}

/// Log a raw activity event
pub async fn insert_activity<'e, E>(
    executor: E,
    member_id: i64,
    activity_type: &str,
    context: &ActivityContext,
    points_earned: i64,
) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO activities
            (member_id, activity_type, duration_minutes, intensity, points_earned, comments, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(member_id)
    .bind(activity_type)
    .bind(context.duration_minutes)
    .bind(context.intensity.map(|i| i.as_str()))
    .bind(points_earned)
    .bind(context.comments.as_deref())
    .bind(context.occurred_at)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Per-type activity counts for a member (achievement fact input)
pub async fn activity_counts<'e, E>(executor: E, member_id: i64) -> Result<HashMap<String, i64>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT activity_type, COUNT(*)
        FROM activities
        WHERE member_id = ?
        GROUP BY activity_type
        "#,
    )
    .bind(member_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Recent activity events for a member, newest first
pub async fn recent_activities<'e, E>(
    executor: E,
    member_id: i64,
    limit: u32,
    offset: u32,
) -> Result<Vec<ActivityRecord>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT id, member_id, activity_type, duration_minutes, intensity,
               points_earned, comments, created_at
        FROM activities
        WHERE member_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(member_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(ActivityRow::into_record).collect()
}

/// Aggregate activity figures: (total activities, total duration, active days)
pub async fn activity_totals<'e, E>(executor: E, member_id: i64) -> Result<(i64, i64, i64)>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let row: (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(duration_minutes), 0),
               COUNT(DISTINCT DATE(created_at))
        FROM activities
        WHERE member_id = ?
        "#,
    )
    .bind(member_id)
    .fetch_one(executor)
    .await?;

    Ok(row)
}
