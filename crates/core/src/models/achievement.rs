//! Achievement models and the requirement AST
//!
//! Requirements are structured data, not code: a small predicate tree
//! evaluated against a typed snapshot of member facts. JSON appears only at
//! the storage boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Achievement category (drives badge iconography upstream)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementType {
    Milestone,
    Streak,
    Activity,
    Points,
    Community,
    Special,
}

impl AchievementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementType::Milestone => "milestone",
            AchievementType::Streak => "streak",
            AchievementType::Activity => "activity",
            AchievementType::Points => "points",
            AchievementType::Community => "community",
            AchievementType::Special => "special",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "milestone" => Some(AchievementType::Milestone),
            "streak" => Some(AchievementType::Streak),
            "activity" => Some(AchievementType::Activity),
            "points" => Some(AchievementType::Points),
            "community" => Some(AchievementType::Community),
            "special" => Some(AchievementType::Special),
            _ => None,
        }
    }
}

/// A member fact a requirement can test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum Fact {
    TotalPoints,
    CurrentStreak,
    LongestStreak,
    ActivityCount { activity_type: String },
    GoalsJoined,
    GoalsCompleted,
}

/// Comparison operator for threshold requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
}

impl Cmp {
    fn test(&self, left: i64, right: i64) -> bool {
        match self {
            Cmp::Gte => left >= right,
            Cmp::Gt => left > right,
            Cmp::Lte => left <= right,
            Cmp::Lt => left < right,
            Cmp::Eq => left == right,
        }
    }
}

/// Requirement predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    Threshold {
        #[serde(flatten)]
        fact: Fact,
        cmp: Cmp,
        value: i64,
    },
    All {
        rules: Vec<Requirement>,
    },
    Any {
        rules: Vec<Requirement>,
    },
}

impl Requirement {
    /// Convenience constructor for the common "fact >= value" shape
    pub fn at_least(fact: Fact, value: i64) -> Self {
        Requirement::Threshold {
            fact,
            cmp: Cmp::Gte,
            value,
        }
    }

    pub fn evaluate(&self, facts: &FactSnapshot) -> bool {
        match self {
            Requirement::Threshold { fact, cmp, value } => cmp.test(facts.value_of(fact), *value),
            Requirement::All { rules } => rules.iter().all(|r| r.evaluate(facts)),
            Requirement::Any { rules } => rules.iter().any(|r| r.evaluate(facts)),
        }
    }
}

/// Point-in-time snapshot of the facts requirements evaluate against
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSnapshot {
    pub total_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub activity_counts: HashMap<String, i64>,
    pub goals_joined: i64,
    pub goals_completed: i64,
}

impl FactSnapshot {
    fn value_of(&self, fact: &Fact) -> i64 {
        match fact {
            Fact::TotalPoints => self.total_points,
            Fact::CurrentStreak => self.current_streak,
            Fact::LongestStreak => self.longest_streak,
            Fact::ActivityCount { activity_type } => {
                self.activity_counts.get(activity_type).copied().unwrap_or(0)
            }
            Fact::GoalsJoined => self.goals_joined,
            Fact::GoalsCompleted => self.goals_completed,
        }
    }
}

/// An admin-authored achievement definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points_value: i64,
    pub requirements: Requirement,
    pub achievement_type: AchievementType,
}

/// Payload for creating an achievement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAchievement {
    pub name: String,
    pub description: String,
    pub points_value: i64,
    pub requirements: Requirement,
    pub achievement_type: AchievementType,
}

/// An achievement a member has unlocked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub achievement: Achievement,
    pub earned_at: DateTime<Utc>,
}

/// Starter catalog for fresh installations
pub fn default_catalog() -> Vec<NewAchievement> {
    vec![
        NewAchievement {
            name: "First Visit".to_string(),
            description: "Log your first gym visit".to_string(),
            points_value: 25,
            requirements: Requirement::at_least(
                Fact::ActivityCount {
                    activity_type: "gym_visit".to_string(),
                },
                1,
            ),
            achievement_type: AchievementType::Milestone,
        },
        NewAchievement {
            name: "Week Warrior".to_string(),
            description: "Work out seven days in a row".to_string(),
            points_value: 100,
            requirements: Requirement::at_least(Fact::CurrentStreak, 7),
            achievement_type: AchievementType::Streak,
        },
        NewAchievement {
            name: "Comeback Kid".to_string(),
            description: "Reach a ten-day streak at any point".to_string(),
            points_value: 150,
            requirements: Requirement::at_least(Fact::LongestStreak, 10),
            achievement_type: AchievementType::Streak,
        },
        NewAchievement {
            name: "Point Collector".to_string(),
            description: "Accumulate 500 lifetime points".to_string(),
            points_value: 50,
            requirements: Requirement::at_least(Fact::TotalPoints, 500),
            achievement_type: AchievementType::Points,
        },
        NewAchievement {
            name: "Class Regular".to_string(),
            description: "Attend ten classes".to_string(),
            points_value: 75,
            requirements: Requirement::at_least(
                Fact::ActivityCount {
                    activity_type: "class_attendance".to_string(),
                },
                10,
            ),
            achievement_type: AchievementType::Activity,
        },
        NewAchievement {
            name: "Community Spirit".to_string(),
            description: "Join a community goal and keep a three-day streak".to_string(),
            points_value: 60,
            requirements: Requirement::All {
                rules: vec![
                    Requirement::at_least(Fact::GoalsJoined, 1),
                    Requirement::at_least(Fact::CurrentStreak, 3),
                ],
            },
            achievement_type: AchievementType::Community,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> FactSnapshot {
        let mut activity_counts = HashMap::new();
        activity_counts.insert("gym_visit".to_string(), 12);
        FactSnapshot {
            total_points: 340,
            current_streak: 4,
            longest_streak: 9,
            activity_counts,
            goals_joined: 1,
            goals_completed: 0,
        }
    }

    #[test]
    fn test_threshold_evaluation() {
        let facts = facts();
        assert!(Requirement::at_least(Fact::CurrentStreak, 3).evaluate(&facts));
        assert!(!Requirement::at_least(Fact::CurrentStreak, 5).evaluate(&facts));
        assert!(Requirement::at_least(
            Fact::ActivityCount {
                activity_type: "gym_visit".to_string()
            },
            10
        )
        .evaluate(&facts));
    }

    #[test]
    fn test_unknown_activity_counts_as_zero() {
        let req = Requirement::at_least(
            Fact::ActivityCount {
                activity_type: "swimming".to_string(),
            },
            1,
        );
        assert!(!req.evaluate(&facts()));
    }

    #[test]
    fn test_all_and_any_combinators() {
        let facts = facts();
        let both = Requirement::All {
            rules: vec![
                Requirement::at_least(Fact::GoalsJoined, 1),
                Requirement::at_least(Fact::TotalPoints, 1_000),
            ],
        };
        assert!(!both.evaluate(&facts));

        let either = Requirement::Any {
            rules: vec![
                Requirement::at_least(Fact::GoalsJoined, 1),
                Requirement::at_least(Fact::TotalPoints, 1_000),
            ],
        };
        assert!(either.evaluate(&facts));
    }

    #[test]
    fn test_requirement_json_shape() {
        // The storage boundary persists requirements as tagged JSON
        let raw = r#"{
            "type": "all",
            "rules": [
                {"type": "threshold", "fact": "current_streak", "cmp": "gte", "value": 7},
                {"type": "threshold", "fact": "activity_count", "activity_type": "gym_visit", "cmp": "gt", "value": 3}
            ]
        }"#;
        let req: Requirement = serde_json::from_str(raw).unwrap();
        let mut counts = HashMap::new();
        counts.insert("gym_visit".to_string(), 4);
        let facts = FactSnapshot {
            current_streak: 7,
            activity_counts: counts,
            ..FactSnapshot::default()
        };
        assert!(req.evaluate(&facts));
    }

    #[test]
    fn test_default_catalog_is_well_formed() {
        let catalog = default_catalog();
        assert!(!catalog.is_empty());
        for entry in &catalog {
            assert!(!entry.name.is_empty());
            assert!(entry.points_value >= 0);
        }
    }
}
