//! Streak tracking over persistent state
//!
//! Applies the pure `Streak` state machine to the stored record. Callers
//! run this inside the per-member critical section, in the same database
//! transaction as the activity that advanced the streak.

use chrono::NaiveDate;
use fitforge_core::{Result, Streak, StreakChange};
use fitforge_persistence::sqlite as store;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

/// What recording one activity date did to the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakOutcome {
    /// First recorded activity for the member
    Started,
    /// Repeat activity on an already-counted day
    SameDay,
    Extended,
    Reset,
}

impl StreakOutcome {
    /// Whether the stored state changed (and an event should be emitted)
    pub fn changed(&self) -> bool {
        !matches!(self, StreakOutcome::SameDay)
    }
}

/// Record one activity date for a member. Backdated dates are rejected
/// with `StaleActivity` before anything is written.
pub async fn record_activity(
    conn: &mut SqliteConnection,
    member_id: i64,
    activity_date: NaiveDate,
) -> Result<(Streak, StreakOutcome)> {
    match store::get_streak(&mut *conn, member_id).await? {
        None => {
            let streak = Streak::started(member_id, activity_date);
            store::upsert_streak(&mut *conn, &streak).await?;
            Ok((streak, StreakOutcome::Started))
        }
        Some(mut streak) => {
            let change = streak.advance(activity_date)?;
            let outcome = match change {
                StreakChange::SameDay => StreakOutcome::SameDay,
                StreakChange::Extended => StreakOutcome::Extended,
                StreakChange::Reset => StreakOutcome::Reset,
            };
            if outcome.changed() {
                store::upsert_streak(&mut *conn, &streak).await?;
            }
            Ok((streak, outcome))
        }
    }
}
