//! SQLite database management

mod achievements;
mod activities;
mod connection;
mod goals;
mod leaderboards;
mod ledger;
mod members;
mod streaks;

pub use achievements::*;
pub use activities::*;
pub use connection::Database;
pub use goals::*;
pub use leaderboards::*;
pub use ledger::*;
pub use members::*;
pub use streaks::*;
