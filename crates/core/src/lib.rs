//! FitForge Core - Shared data models, rule configuration, and errors

pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod types;

pub use config::{ActivityRule, RefreshMode, RuleBook};
pub use errors::{Error, Result};
pub use events::DomainEvent;
pub use models::*;
pub use types::*;
