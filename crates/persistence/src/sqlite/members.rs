//! Member persistence operations

use chrono::{DateTime, Utc};
use fitforge_core::{Error, Member, MemberStatus, MembershipTier, NewMember, Result};
use sqlx::Executor;

/// Member record stored in database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub tier: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

impl MemberRow {
    pub fn into_member(self) -> Result<Member> {
        let tier = MembershipTier::parse(&self.tier)
            .ok_or_else(|| Error::InvalidData(format!("unknown membership tier '{}'", self.tier)))?;
        let status = MemberStatus::parse(&self.status)
            .ok_or_else(|| Error::InvalidData(format!("unknown member status '{}'", self.status)))?;
        Ok(Member {
            id: self.id,
            username: self.username,
            email: self.email,
            tier,
            status,
            joined_at: self.joined_at,
        })
    }
}

/// Register a new member
pub async fn insert_member<'e, E>(
    executor: E,
    member: &NewMember,
    joined_at: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO members (username, email, tier, status, joined_at)
        VALUES (?, ?, ?, 'active', ?)
        "#,
    )
    .bind(&member.username)
    .bind(&member.email)
    .bind(member.tier.as_str())
    .bind(joined_at)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a member by id
pub async fn get_member<'e, E>(executor: E, member_id: i64) -> Result<Option<Member>>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let row = sqlx::query_as::<_, MemberRow>(
        "SELECT id, username, email, tier, status, joined_at FROM members WHERE id = ?",
    )
    .bind(member_id)
    .fetch_optional(executor)
    .await?;

    row.map(MemberRow::into_member).transpose()
}

/// Change a member's status (soft state change; members are never deleted)
pub async fn set_member_status<'e, E>(
    executor: E,
    member_id: i64,
    status: MemberStatus,
) -> Result<()>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query("UPDATE members SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(member_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::MemberNotFound(member_id));
    }
    Ok(())
}
