//! Achievement catalog and unlock persistence
//!
//! Requirement trees cross the storage boundary as JSON text; everything
//! above this module works with the typed `Requirement` AST.

use chrono::{DateTime, Utc};
use fitforge_core::{
    Achievement, AchievementType, EarnedAchievement, Error, NewAchievement, Requirement, Result,
};
use sqlx::Executor;

/// Achievement record stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AchievementRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points_value: i64,
    pub requirements: String,
    pub achievement_type: String,
}

impl AchievementRow {
    pub fn into_achievement(self) -> Result<Achievement> {
        let requirements: Requirement = serde_json::from_str(&self.requirements)?;
        let achievement_type = AchievementType::parse(&self.achievement_type).ok_or_else(|| {
            Error::InvalidData(format!(
                "unknown achievement type '{}'",
                self.achievement_type
            ))
        })?;
        Ok(Achievement {
            id: self.id,
            name: self.name,
            description: self.description,
            points_value: self.points_value,
            requirements,
            achievement_type,
        })
    }
}

/// Create an achievement definition
pub async fn insert_achievement<'e, E>(executor: E, achievement: &NewAchievement) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let requirements = serde_json::to_string(&achievement.requirements)?;
    let result = sqlx::query(
        r#"
        INSERT INTO achievements (name, description, points_value, requirements, achievement_type)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&achievement.name)
    .bind(&achievement.description)
    .bind(achievement.points_value)
    .bind(requirements)
    .bind(achievement.achievement_type.as_str())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch one achievement definition
pub async fn get_achievement<'e, E>(executor: E, achievement_id: i64) -> Result<Option<Achievement>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query_as::<_, AchievementRow>(
        r#"
        SELECT id, name, description, points_value, requirements, achievement_type
        FROM achievements
        WHERE id = ?
        "#,
    )
    .bind(achievement_id)
    .fetch_optional(executor)
    .await?;

    row.map(AchievementRow::into_achievement).transpose()
}

/// Achievements the member has not unlocked yet
pub async fn unearned_achievements<'e, E>(executor: E, member_id: i64) -> Result<Vec<Achievement>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query_as::<_, AchievementRow>(
        r#"
        SELECT a.id, a.name, a.description, a.points_value, a.requirements, a.achievement_type
        FROM achievements a
        LEFT JOIN member_achievements ma
            ON a.id = ma.achievement_id AND ma.member_id = ?
        WHERE ma.id IS NULL
        ORDER BY a.id
        "#,
    )
    .bind(member_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter()
        .map(AchievementRow::into_achievement)
        .collect()
}

/// Record an unlock. Returns `false` when the member already holds the
/// achievement (the unique pair absorbs the duplicate as a no-op).
pub async fn insert_unlock<'e, E>(
    executor: E,
    member_id: i64,
    achievement_id: i64,
    earned_at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO member_achievements (member_id, achievement_id, earned_at)
        VALUES (?, ?, ?)
        ON CONFLICT(member_id, achievement_id) DO NOTHING
        "#,
    )
    .bind(member_id)
    .bind(achievement_id)
    .bind(earned_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Row shape for the unlock join query
#[derive(Debug, Clone, sqlx::FromRow)]
struct EarnedRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points_value: i64,
    pub requirements: String,
    pub achievement_type: String,
    pub earned_at: DateTime<Utc>,
}

/// All achievements a member has unlocked, most recent first
pub async fn member_achievements<'e, E>(
    executor: E,
    member_id: i64,
) -> Result<Vec<EarnedAchievement>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query_as::<_, EarnedRow>(
        r#"
        SELECT a.id, a.name, a.description, a.points_value, a.requirements,
               a.achievement_type, ma.earned_at
        FROM achievements a
        JOIN member_achievements ma ON a.id = ma.achievement_id
        WHERE ma.member_id = ?
        ORDER BY ma.earned_at DESC, a.id DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter()
        .map(|row| {
            let earned_at = row.earned_at;
            let achievement = AchievementRow {
                id: row.id,
                name: row.name,
                description: row.description,
                points_value: row.points_value,
                requirements: row.requirements,
                achievement_type: row.achievement_type,
            }
            .into_achievement()?;
            Ok(EarnedAchievement {
                achievement,
                earned_at,
            })
        })
        .collect()
}

/// Number of achievement definitions in the catalog
pub async fn achievement_count<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM achievements")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Count of unlocks for one member
pub async fn unlock_count<'e, E>(executor: E, member_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM member_achievements WHERE member_id = ?")
            .bind(member_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}
