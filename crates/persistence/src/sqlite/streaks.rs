//! Workout streak persistence operations

use chrono::NaiveDate;
use fitforge_core::{Result, Streak};
use sqlx::Executor;

/// Streak record stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StreakRow {
    pub member_id: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: NaiveDate,
    pub streak_start_date: NaiveDate,
}

impl From<StreakRow> for Streak {
    fn from(row: StreakRow) -> Self {
        Streak {
            member_id: row.member_id,
            current_streak: row.current_streak,
            longest_streak: row.longest_streak,
            last_activity_date: row.last_activity_date,
            streak_start_date: row.streak_start_date,
        }
    }
}

/// Fetch a member's streak record
pub async fn get_streak<'e, E>(executor: E, member_id: i64) -> Result<Option<Streak>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query_as::<_, StreakRow>(
        r#"
        SELECT member_id, current_streak, longest_streak, last_activity_date, streak_start_date
        FROM streaks
        WHERE member_id = ?
        "#,
    )
    .bind(member_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Streak::from))
}

/// Insert or replace a member's streak state
pub async fn upsert_streak<'e, E>(executor: E, streak: &Streak) -> Result<()>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO streaks (member_id, current_streak, longest_streak, last_activity_date, streak_start_date)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(member_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_activity_date = excluded.last_activity_date,
            streak_start_date = excluded.streak_start_date
        "#,
    )
    .bind(streak.member_id)
    .bind(streak.current_streak)
    .bind(streak.longest_streak)
    .bind(streak.last_activity_date)
    .bind(streak.streak_start_date)
    .execute(executor)
    .await?;

    Ok(())
}
