//! Domain events published to notification and analytics consumers
//!
//! Each core operation emits its event after the surrounding transaction
//! commits. Delivery is fire-and-forget; at-least-once is acceptable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by the progression engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    PointsAwarded {
        member_id: i64,
        points: i64,
        activity_type: String,
        transaction_id: i64,
    },
    PointsRedeemed {
        member_id: i64,
        points: i64,
        reason: String,
        transaction_id: i64,
    },
    PointsAdjusted {
        member_id: i64,
        points: i64,
        actor_id: Option<i64>,
        transaction_id: i64,
    },
    StreakUpdated {
        member_id: i64,
        current_streak: i64,
        longest_streak: i64,
        activity_date: chrono::NaiveDate,
    },
    AchievementAwarded {
        member_id: i64,
        achievement_id: i64,
        points_value: i64,
        earned_at: DateTime<Utc>,
    },
    GoalCompleted {
        goal_id: i64,
        final_value: i64,
        participant_count: usize,
        reward_points: i64,
    },
}
