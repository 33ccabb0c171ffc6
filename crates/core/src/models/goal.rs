//! Community goal models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Goal lifecycle. `Active -> Completed` is one-way and happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Failed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(GoalStatus::Active),
            "completed" => Some(GoalStatus::Completed),
            "failed" => Some(GoalStatus::Failed),
            _ => None,
        }
    }
}

/// What a goal counts: points earned, or activities logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    Points,
    Activities,
}

impl GoalMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalMetric::Points => "points",
            GoalMetric::Activities => "activities",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "points" => Some(GoalMetric::Points),
            "activities" => Some(GoalMetric::Activities),
            _ => None,
        }
    }
}

/// A shared target members contribute toward collectively.
///
/// Invariant: `current_value` equals the sum of all participant
/// contributions for the goal at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityGoal {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub metric: GoalMetric,
    pub target_value: i64,
    pub current_value: i64,
    pub status: GoalStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub reward_points: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub description: String,
    pub metric: GoalMetric,
    pub target_value: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub reward_points: i64,
}

/// One member's stake in a goal; unique per (goal, member)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalParticipant {
    pub goal_id: i64,
    pub member_id: i64,
    pub contribution_value: i64,
    pub joined_at: DateTime<Utc>,
}

/// Result of routing one contribution into a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub goal_id: i64,
    pub contributed: i64,
    pub new_total: i64,
    /// True when this contribution pushed the goal over its target
    pub completed: bool,
}

/// Read-model view for dashboards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: CommunityGoal,
    pub participant_count: i64,
    pub percent_complete: f64,
}

impl GoalProgress {
    pub fn new(goal: CommunityGoal, participant_count: i64) -> Self {
        let percent_complete = if goal.target_value > 0 {
            (goal.current_value as f64 / goal.target_value as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            goal,
            participant_count,
            percent_complete,
        }
    }
}
