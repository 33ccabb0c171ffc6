//! Error types and Result alias for the FitForge engine

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the FitForge engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Member {member_id} already participates in goal {goal_id}")]
    AlreadyParticipating { member_id: i64, goal_id: i64 },

    #[error("Goal {0} is not active")]
    GoalNotActive(i64),

    #[error("Stale activity: {activity_date} is older than last recorded date {last_recorded}")]
    StaleActivity {
        activity_date: NaiveDate,
        last_recorded: NaiveDate,
    },

    #[error("Lock on {resource} timed out after {timeout_ms}ms")]
    ConcurrencyConflict { resource: String, timeout_ms: u64 },

    #[error("Member not found: {0}")]
    MemberNotFound(i64),

    #[error("Achievement not found: {0}")]
    AchievementNotFound(i64),

    #[error("Goal not found: {0}")]
    GoalNotFound(i64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Transient failures the caller may retry with backoff.
    /// The failed operation is guaranteed not to have partially applied.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict { .. })
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
