//! Community goal persistence operations

use chrono::{DateTime, Utc};
use fitforge_core::{
    CommunityGoal, Error, GoalMetric, GoalParticipant, GoalStatus, NewGoal, Result,
};
use sqlx::{Executor, SqliteConnection};

/// Goal record stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GoalRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub metric: String,
    pub target_value: i64,
    pub current_value: i64,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub reward_points: i64,
    pub created_at: DateTime<Utc>,
}

impl GoalRow {
    pub fn into_goal(self) -> Result<CommunityGoal> {
        let metric = GoalMetric::parse(&self.metric)
            .ok_or_else(|| Error::InvalidData(format!("unknown goal metric '{}'", self.metric)))?;
        let status = GoalStatus::parse(&self.status)
            .ok_or_else(|| Error::InvalidData(format!("unknown goal status '{}'", self.status)))?;
        Ok(CommunityGoal {
            id: self.id,
            title: self.title,
            description: self.description,
            metric,
            target_value: self.target_value,
            current_value: self.current_value,
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            reward_points: self.reward_points,
            created_at: self.created_at,
        })
    }
}

const GOAL_COLUMNS: &str = "id, title, description, metric, target_value, current_value, \
                            status, start_date, end_date, reward_points, created_at";

/// Create a community goal
pub async fn insert_goal<'e, E>(executor: E, goal: &NewGoal, created_at: DateTime<Utc>) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO community_goals
            (title, description, metric, target_value, current_value, status,
             start_date, end_date, reward_points, created_at)
        VALUES (?, ?, ?, ?, 0, 'active', ?, ?, ?, ?)
        "#,
    )
    .bind(&goal.title)
    .bind(&goal.description)
    .bind(goal.metric.as_str())
    .bind(goal.target_value)
    .bind(goal.start_date)
    .bind(goal.end_date)
    .bind(goal.reward_points)
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch one goal
pub async fn get_goal<'e, E>(executor: E, goal_id: i64) -> Result<Option<CommunityGoal>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let query = format!("SELECT {GOAL_COLUMNS} FROM community_goals WHERE id = ?");
    let row = sqlx::query_as::<_, GoalRow>(&query)
        .bind(goal_id)
        .fetch_optional(executor)
        .await?;

    row.map(GoalRow::into_goal).transpose()
}

/// All currently active goals, newest first
pub async fn active_goals<'e, E>(executor: E) -> Result<Vec<CommunityGoal>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let query = format!(
        "SELECT {GOAL_COLUMNS} FROM community_goals WHERE status = 'active' ORDER BY start_date DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, GoalRow>(&query).fetch_all(executor).await?;
    rows.into_iter().map(GoalRow::into_goal).collect()
}

/// Active goals a member has joined
pub async fn active_goals_for_member<'e, E>(
    executor: E,
    member_id: i64,
) -> Result<Vec<CommunityGoal>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query_as::<_, GoalRow>(
        r#"
        SELECT g.id, g.title, g.description, g.metric, g.target_value, g.current_value,
               g.status, g.start_date, g.end_date, g.reward_points, g.created_at
        FROM community_goals g
        JOIN goal_participants p ON p.goal_id = g.id
        WHERE p.member_id = ? AND g.status = 'active'
        ORDER BY g.id
        "#,
    )
        .bind(member_id)
        .fetch_all(executor)
        .await?;
    rows.into_iter().map(GoalRow::into_goal).collect()
}

/// Record a member joining a goal. Returns `false` when the unique
/// (goal, member) pair already exists.
pub async fn insert_participant<'e, E>(
    executor: E,
    goal_id: i64,
    member_id: i64,
    joined_at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO goal_participants (goal_id, member_id, contribution_value, joined_at)
        VALUES (?, ?, 0, ?)
        ON CONFLICT(goal_id, member_id) DO NOTHING
        "#,
    )
    .bind(goal_id)
    .bind(member_id)
    .bind(joined_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Apply one contribution: the participant row and the goal total move by
/// the same amount, in the caller's transaction. Returns the goal's new
/// current value.
pub async fn apply_contribution(
    conn: &mut SqliteConnection,
    goal_id: i64,
    member_id: i64,
    amount: i64,
) -> Result<i64> {
    let updated = sqlx::query(
        r#"
        UPDATE goal_participants
        SET contribution_value = contribution_value + ?
        WHERE goal_id = ? AND member_id = ?
        "#,
    )
    .bind(amount)
    .bind(goal_id)
    .bind(member_id)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(Error::Validation(format!(
            "member {member_id} has not joined goal {goal_id}"
        )));
    }

    sqlx::query("UPDATE community_goals SET current_value = current_value + ? WHERE id = ?")
        .bind(amount)
        .bind(goal_id)
        .execute(&mut *conn)
        .await?;

    let new_total: i64 =
        sqlx::query_scalar("SELECT current_value FROM community_goals WHERE id = ?")
            .bind(goal_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(new_total)
}

/// Flip an active goal to completed. Returns `false` when the goal was no
/// longer active (a racing contribution already completed it).
pub async fn mark_completed<'e, E>(
    executor: E,
    goal_id: i64,
    completed_at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE community_goals
        SET status = 'completed', completed_at = ?
        WHERE id = ? AND status = 'active'
        "#,
    )
    .bind(completed_at)
    .bind(goal_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark an overdue active goal as failed (external sweep; idempotent)
pub async fn mark_failed<'e, E>(executor: E, goal_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "UPDATE community_goals SET status = 'failed' WHERE id = ? AND status = 'active'",
    )
    .bind(goal_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Ids of active goals whose end date has passed without reaching target
pub async fn overdue_active_goals<'e, E>(executor: E, now: DateTime<Utc>) -> Result<Vec<i64>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let ids: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM community_goals
        WHERE status = 'active'
          AND end_date IS NOT NULL
          AND end_date < ?
          AND current_value < target_value
        ORDER BY id
        "#,
    )
    .bind(now)
    .fetch_all(executor)
    .await?;

    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Participant row stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    pub goal_id: i64,
    pub member_id: i64,
    pub contribution_value: i64,
    pub joined_at: DateTime<Utc>,
}

impl From<ParticipantRow> for GoalParticipant {
    fn from(row: ParticipantRow) -> Self {
        GoalParticipant {
            goal_id: row.goal_id,
            member_id: row.member_id,
            contribution_value: row.contribution_value,
            joined_at: row.joined_at,
        }
    }
}

/// All participants of a goal, largest contribution first
pub async fn participants<'e, E>(executor: E, goal_id: i64) -> Result<Vec<GoalParticipant>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query_as::<_, ParticipantRow>(
        r#"
        SELECT goal_id, member_id, contribution_value, joined_at
        FROM goal_participants
        WHERE goal_id = ?
        ORDER BY contribution_value DESC, member_id ASC
        "#,
    )
    .bind(goal_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(GoalParticipant::from).collect())
}

/// Number of participants in a goal
pub async fn participant_count<'e, E>(executor: E, goal_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM goal_participants WHERE goal_id = ?")
        .bind(goal_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Goal participation counts for achievement facts:
/// (goals joined, goals completed)
pub async fn participation_counts<'e, E>(executor: E, member_id: i64) -> Result<(i64, i64)>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let row: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN g.status = 'completed' THEN 1 ELSE 0 END), 0)
        FROM goal_participants p
        JOIN community_goals g ON g.id = p.goal_id
        WHERE p.member_id = ?
        "#,
    )
    .bind(member_id)
    .fetch_one(executor)
    .await?;

    Ok(row)
}
