//! Points ledger models
//!
//! The ledger is append-only: corrections are new offsetting rows, never
//! edits. A member's balance is the signed sum over their rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction kind, determining the sign of a row in the balance sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earned,
    Redeemed,
    Expired,
    Adjusted,
}

impl TransactionKind {
    /// Sign convention: earned/adjusted add, redeemed/expired subtract
    pub fn sign(&self) -> i64 {
        match self {
            TransactionKind::Earned | TransactionKind::Adjusted => 1,
            TransactionKind::Redeemed | TransactionKind::Expired => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Earned => "earned",
            TransactionKind::Redeemed => "redeemed",
            TransactionKind::Expired => "expired",
            TransactionKind::Adjusted => "adjusted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "earned" => Some(TransactionKind::Earned),
            "redeemed" => Some(TransactionKind::Redeemed),
            "expired" => Some(TransactionKind::Expired),
            "adjusted" => Some(TransactionKind::Adjusted),
            _ => None,
        }
    }
}

/// Immutable ledger row. `points` is stored positive; the kind carries
/// the sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub member_id: i64,
    pub points: i64,
    pub kind: TransactionKind,
    pub activity_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The row's contribution to the member balance
    pub fn signed_points(&self) -> i64 {
        self.points * self.kind.sign()
    }
}

/// Filters and paging for ledger history queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub kind: Option<TransactionKind>,
    pub activity_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl HistoryFilter {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}
