//! Leaderboard models
//!
//! Leaderboards are derived read models projected from the ledger; nothing
//! here is authoritative.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Scoring window for a leaderboard projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::AllTime => "all_time",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "daily" => Some(Period::Daily),
            "weekly" => Some(Period::Weekly),
            "monthly" => Some(Period::Monthly),
            "all_time" => Some(Period::AllTime),
            _ => None,
        }
    }

    /// Inclusive start of the scoring window ending at `as_of`.
    /// `None` means unbounded (all-time).
    pub fn window_start(&self, as_of: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let midnight = |date: chrono::NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
        let today = as_of.date_naive();
        match self {
            Period::Daily => Some(midnight(today)),
            Period::Weekly => {
                let days_from_monday = today.weekday().num_days_from_monday() as i64;
                Some(midnight(today - Duration::days(days_from_monday)))
            }
            Period::Monthly => Some(midnight(today.with_day(1).unwrap_or(today))),
            Period::AllTime => None,
        }
    }
}

/// One ranked row. Rank is 1-based and contiguous: tied scores receive
/// distinct sequential ranks via the deterministic tie-break (earliest
/// period timestamp, then member id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub member_id: i64,
    pub username: String,
    pub score: i64,
    pub rank: u32,
}
