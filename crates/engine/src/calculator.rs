//! Points calculation rules
//!
//! Pure and deterministic: (activity type, context, member state) in,
//! integer points out. No I/O; everything configurable comes from the
//! `RuleBook`. Achievement and goal awards are NOT computed here — they
//! carry stored point values.

use chrono::Timelike;
use fitforge_core::activity_types;
use fitforge_core::{ActivityContext, ClassTier, MembershipTier, Multiplier, RuleBook};
use std::sync::Arc;
use tracing::debug;

/// The member facts the calculator consults
#[derive(Debug, Clone, Copy)]
pub struct MemberState {
    pub tier: MembershipTier,
    /// Current consecutive-day streak before this activity
    pub streak_days: i64,
}

/// Stateless rule evaluator
pub struct PointsCalculator {
    rules: Arc<RuleBook>,
}

impl PointsCalculator {
    pub fn new(rules: Arc<RuleBook>) -> Self {
        Self { rules }
    }

    /// Points for one activity. Unknown activity types award 0 — a no-op,
    /// not an error.
    pub fn calculate(
        &self,
        activity_type: &str,
        context: &ActivityContext,
        member: &MemberState,
    ) -> i64 {
        match activity_type {
            activity_types::STREAK_BONUS => self.streak_bonus(member),
            activity_types::REFERRAL => self.rules.points_per_referral,
            _ => self.catalog_points(activity_type, context, member),
        }
    }

    fn catalog_points(
        &self,
        activity_type: &str,
        context: &ActivityContext,
        member: &MemberState,
    ) -> i64 {
        let Some(base) = self.rules.base_points(activity_type) else {
            debug!(activity_type, "unknown activity type, awarding nothing");
            return 0;
        };

        let mut factor = 1.0;
        if self.rules.is_off_peak(context.occurred_at.hour()) {
            factor *= self.rules.off_peak_multiplier;
        }
        if context.class_tier == Some(ClassTier::Premium) {
            factor *= self.rules.premium_class_multiplier;
        }
        if member.tier == MembershipTier::Premium {
            factor *= self.rules.premium_member_multiplier;
        }

        Multiplier(factor).apply(base)
    }

    /// Streak bonus pays off the visit base rate once the member's streak
    /// clears the configured minimum; below it the bonus is 0.
    fn streak_bonus(&self, member: &MemberState) -> i64 {
        if member.streak_days < self.rules.minimum_streak_days {
            return 0;
        }
        let base = self.rules.base_points("gym_visit").unwrap_or(0);
        Multiplier(self.rules.streak_bonus_multiplier).apply(base)
    }
}
