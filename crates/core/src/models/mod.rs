//! Data models for FitForge entities

mod achievement;
mod activity;
mod goal;
mod leaderboard;
mod ledger;
mod member;
mod streak;

pub use achievement::*;
pub use activity::*;
pub use goal::*;
pub use leaderboard::*;
pub use ledger::*;
pub use member::*;
pub use streak::*;
