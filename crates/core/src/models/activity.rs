//! Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved activity types the engine writes on its own behalf. These are
/// not in the configurable catalog; their point amounts come from special
/// rules or stored values.
pub mod activity_types {
    pub const STREAK_BONUS: &str = "streak_bonus";
    pub const REFERRAL: &str = "referral";
    pub const ACHIEVEMENT: &str = "achievement";
    pub const COMMUNITY_GOAL: &str = "community_goal";
    pub const REDEMPTION: &str = "redemption";
    pub const ADJUSTMENT: &str = "manual_adjustment";
    pub const EXPIRATION: &str = "expiration";
}

/// Class tier carried on class-attendance context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassTier {
    Standard,
    Premium,
}

/// Reported intensity of a logged session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Intensity::Low),
            "medium" => Some(Intensity::Medium),
            "high" => Some(Intensity::High),
            _ => None,
        }
    }
}

/// Context supplied with a logged activity. The clock is an input: callers
/// stamp `occurred_at`, the engine never samples time itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityContext {
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub class_tier: Option<ClassTier>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub intensity: Option<Intensity>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl ActivityContext {
    pub fn at(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            class_name: None,
            class_tier: None,
            duration_minutes: None,
            intensity: None,
            comments: None,
        }
    }
}

/// Raw activity event as stored in the activity log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub member_id: i64,
    pub activity_type: String,
    pub duration_minutes: Option<i64>,
    pub intensity: Option<Intensity>,
    pub points_earned: i64,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate activity figures for one member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberStats {
    pub total_activities: i64,
    pub total_duration_minutes: i64,
    pub active_days: i64,
    pub total_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
}
