//! Leaderboard projection queries
//!
//! Scores are signed point sums over the ledger for a period window.
//! Ordering is fully deterministic: score descending, then earliest
//! transaction timestamp in the window, then member id.

use chrono::{DateTime, Utc};
use fitforge_core::Result;
use sqlx::Executor;

/// One scored member row, pre-ranking
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreRow {
    pub member_id: i64,
    pub username: String,
    pub score: i64,
    pub first_entry_at: Option<DateTime<Utc>>,
}

/// Scored active members within the window, ordered for ranking.
/// `since = None` means all-time.
pub async fn period_scores<'e, E>(
    executor: E,
    since: Option<DateTime<Utc>>,
    limit: u32,
    offset: u32,
) -> Result<Vec<ScoreRow>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let mut query = String::from(
        r#"
        SELECT m.id AS member_id,
               m.username AS username,
               COALESCE(SUM(
                   CASE WHEN l.kind IN ('earned', 'adjusted') THEN l.points ELSE -l.points END
               ), 0) AS score,
               MIN(l.created_at) AS first_entry_at
        FROM members m
        JOIN ledger l ON l.member_id = m.id
        WHERE m.status = 'active'
        "#,
    );

    if since.is_some() {
        query.push_str(" AND l.created_at >= ?");
    }

    query.push_str(
        r#"
        GROUP BY m.id
        HAVING score > 0
        ORDER BY score DESC, first_entry_at ASC, m.id ASC
        LIMIT ? OFFSET ?
        "#,
    );

    let mut builder = sqlx::query_as::<_, ScoreRow>(&query);
    if let Some(since) = since {
        builder = builder.bind(since);
    }

    let rows = builder
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

    Ok(rows)
}
