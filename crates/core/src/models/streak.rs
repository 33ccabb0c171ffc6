//! Workout streak state machine
//!
//! The transition function is pure; the engine applies it under the member
//! lock and persists the result in the same transaction as the activity
//! that advanced it.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-member streak state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub member_id: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: NaiveDate,
    pub streak_start_date: NaiveDate,
}

/// Outcome of applying one activity date to an existing streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Another activity on an already-counted day; state untouched
    SameDay,
    /// Consecutive calendar day; current streak grew by one
    Extended,
    /// Gap of more than one day; streak restarted at one
    Reset,
}

impl Streak {
    /// Fresh streak for a member's first recorded activity
    pub fn started(member_id: i64, activity_date: NaiveDate) -> Self {
        Self {
            member_id,
            current_streak: 1,
            longest_streak: 1,
            last_activity_date: activity_date,
            streak_start_date: activity_date,
        }
    }

    /// Apply one activity date.
    ///
    /// Backdated events older than the last recorded date are rejected with
    /// `StaleActivity` and leave the state untouched.
    pub fn advance(&mut self, activity_date: NaiveDate) -> Result<StreakChange> {
        if activity_date < self.last_activity_date {
            return Err(Error::StaleActivity {
                activity_date,
                last_recorded: self.last_activity_date,
            });
        }

        if activity_date == self.last_activity_date {
            return Ok(StreakChange::SameDay);
        }

        let gap_days = (activity_date - self.last_activity_date).num_days();
        if gap_days == 1 {
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
            self.last_activity_date = activity_date;
            Ok(StreakChange::Extended)
        } else {
            // Streak broken; longest is preserved
            self.current_streak = 1;
            self.streak_start_date = activity_date;
            self.last_activity_date = activity_date;
            Ok(StreakChange::Reset)
        }
    }
}
