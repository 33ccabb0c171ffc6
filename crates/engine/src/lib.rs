//! FitForge Engine - Points, streaks, achievements, goals, and leaderboards
//!
//! Services are constructed once at process start and passed by reference;
//! there is no global state. `EngagementService` is the single entry point
//! surrounding layers call.

pub mod achievements;
pub mod bus;
pub mod calculator;
pub mod goals;
pub mod leaderboard;
pub mod locks;
pub mod service;
pub mod streaks;

pub use bus::EventBus;
pub use calculator::{MemberState, PointsCalculator};
pub use service::{ActivityOutcome, EngagementService};
pub use streaks::StreakOutcome;
