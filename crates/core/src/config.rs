//! Rule configuration for the points engine
//!
//! A `RuleBook` is built once at process start (from defaults or a JSON file)
//! and passed by reference into the services that need it.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Catalog entry describing one loggable activity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRule {
    /// Human-readable name shown in ledger descriptions
    pub name: String,
    /// Base points before any multiplier
    pub base_points: i64,
    #[serde(default)]
    pub requires_duration: bool,
    #[serde(default)]
    pub requires_intensity: bool,
}

/// Leaderboard refresh policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Invalidate the cached projection on every score-affecting write
    Eager,
    /// Serve the cached projection until the staleness window expires
    Lazy,
}

/// Full rule configuration for the progression engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBook {
    /// Activity catalog keyed by activity type (e.g. "gym_visit")
    pub activities: HashMap<String, ActivityRule>,
    /// Off-peak window, inclusive on both ends (hours 0-23)
    pub off_peak_start_hour: u32,
    pub off_peak_end_hour: u32,
    pub off_peak_multiplier: f64,
    /// Applied when the logged context carries a premium class tier
    pub premium_class_multiplier: f64,
    /// Applied when the member holds a premium membership
    pub premium_member_multiplier: f64,
    /// Flat award for a successful referral
    pub points_per_referral: i64,
    /// Streak bonus pays nothing below this many consecutive days
    pub minimum_streak_days: i64,
    pub streak_bonus_multiplier: f64,
    pub leaderboard_refresh: RefreshMode,
    pub leaderboard_staleness_secs: u64,
    /// Bound on per-member / per-goal lock acquisition
    pub lock_timeout_ms: u64,
}

impl Default for RuleBook {
    fn default() -> Self {
        let mut activities = HashMap::new();
        activities.insert(
            "gym_visit".to_string(),
            ActivityRule {
                name: "Gym Visit".to_string(),
                base_points: 10,
                requires_duration: false,
                requires_intensity: false,
            },
        );
        activities.insert(
            "class_attendance".to_string(),
            ActivityRule {
                name: "Class Attendance".to_string(),
                base_points: 20,
                requires_duration: true,
                requires_intensity: true,
            },
        );
        activities.insert(
            "personal_training".to_string(),
            ActivityRule {
                name: "Personal Training".to_string(),
                base_points: 30,
                requires_duration: true,
                requires_intensity: true,
            },
        );
        activities.insert(
            "cardio_session".to_string(),
            ActivityRule {
                name: "Cardio Session".to_string(),
                base_points: 15,
                requires_duration: true,
                requires_intensity: true,
            },
        );
        activities.insert(
            "strength_training".to_string(),
            ActivityRule {
                name: "Strength Training".to_string(),
                base_points: 15,
                requires_duration: true,
                requires_intensity: true,
            },
        );

        Self {
            activities,
            off_peak_start_hour: 10,
            off_peak_end_hour: 16,
            off_peak_multiplier: 1.5,
            premium_class_multiplier: 1.5,
            premium_member_multiplier: 1.2,
            points_per_referral: 50,
            minimum_streak_days: 3,
            streak_bonus_multiplier: 1.5,
            leaderboard_refresh: RefreshMode::Lazy,
            leaderboard_staleness_secs: 30,
            lock_timeout_ms: 5_000,
        }
    }
}

impl RuleBook {
    /// Load rules from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidData(format!("cannot read rule file: {e}")))?;
        let rules: RuleBook = serde_json::from_str(&raw)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.off_peak_start_hour > 23 || self.off_peak_end_hour > 23 {
            return Err(Error::Validation(
                "off-peak hours must be within 0-23".to_string(),
            ));
        }
        if self.off_peak_start_hour > self.off_peak_end_hour {
            return Err(Error::Validation(
                "off-peak window start must not be after its end".to_string(),
            ));
        }
        if let Some((key, rule)) = self.activities.iter().find(|(_, r)| r.base_points < 0) {
            return Err(Error::Validation(format!(
                "activity '{}' has negative base points ({})",
                key, rule.base_points
            )));
        }
        Ok(())
    }

    /// Base points for a cataloged activity type, `None` when unknown
    pub fn base_points(&self, activity_type: &str) -> Option<i64> {
        self.activities.get(activity_type).map(|r| r.base_points)
    }

    /// Display name for an activity type, falling back to the raw key
    pub fn activity_name<'a>(&'a self, activity_type: &'a str) -> &'a str {
        self.activities
            .get(activity_type)
            .map(|r| r.name.as_str())
            .unwrap_or(activity_type)
    }

    /// Whether the given hour falls in the inclusive off-peak window
    pub fn is_off_peak(&self, hour: u32) -> bool {
        hour >= self.off_peak_start_hour && hour <= self.off_peak_end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_has_gym_visit() {
        let rules = RuleBook::default();
        assert_eq!(rules.base_points("gym_visit"), Some(10));
        assert_eq!(rules.base_points("underwater_basket_weaving"), None);
    }

    #[test]
    fn test_off_peak_window_is_inclusive() {
        let rules = RuleBook::default();
        assert!(rules.is_off_peak(10));
        assert!(rules.is_off_peak(13));
        assert!(rules.is_off_peak(16));
        assert!(!rules.is_off_peak(9));
        assert!(!rules.is_off_peak(17));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let rules = RuleBook {
            off_peak_start_hour: 18,
            off_peak_end_hour: 6,
            ..RuleBook::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut rules = RuleBook::default();
        rules.off_peak_multiplier = 2.0;
        rules.minimum_streak_days = 5;

        let path = std::env::temp_dir().join("fitforge_rules_test.json");
        std::fs::write(&path, serde_json::to_string_pretty(&rules).unwrap()).unwrap();

        let loaded = RuleBook::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.off_peak_multiplier, 2.0);
        assert_eq!(loaded.minimum_streak_days, 5);
        assert_eq!(loaded.base_points("gym_visit"), Some(10));
    }
}
