//! Member models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Membership tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    Standard,
    Premium,
    Student,
    Family,
}

impl MembershipTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipTier::Standard => "standard",
            MembershipTier::Premium => "premium",
            MembershipTier::Student => "student",
            MembershipTier::Family => "family",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "standard" => Some(MembershipTier::Standard),
            "premium" => Some(MembershipTier::Premium),
            "student" => Some(MembershipTier::Student),
            "family" => Some(MembershipTier::Family),
            _ => None,
        }
    }
}

/// Account status. Members are never hard-deleted while ledger rows
/// reference them; deactivation is a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Suspended => "suspended",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(MemberStatus::Active),
            "inactive" => Some(MemberStatus::Inactive),
            "suspended" => Some(MemberStatus::Suspended),
            _ => None,
        }
    }
}

/// A registered member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub tier: MembershipTier,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Only active members earn points or appear on leaderboards
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub username: String,
    pub email: String,
    pub tier: MembershipTier,
}
