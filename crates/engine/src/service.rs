//! Engagement service facade
//!
//! The single entry point surrounding layers call after authenticating a
//! request. One `EngagementService` is constructed at process start with
//! its dependencies injected; everything it owns is shared-state-free
//! apart from the keyed locks and the leaderboard cache.

use chrono::{DateTime, Utc};
use fitforge_core::{
    activity_types, Achievement, ActivityContext, ActivityRecord, CommunityGoal, DomainEvent,
    EarnedAchievement, Error, GoalMetric, GoalProgress, GoalUpdate, HistoryFilter,
    LeaderboardEntry, LedgerEntry, Member, MemberStats, MemberStatus, NewAchievement, NewGoal,
    NewMember, Period, RefreshMode, Result, RuleBook, Streak, TransactionKind,
};
use fitforge_persistence::{sqlite as store, Database};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

use crate::achievements::AchievementEngine;
use crate::bus::EventBus;
use crate::calculator::{MemberState, PointsCalculator};
use crate::goals::GoalEngine;
use crate::leaderboard::LeaderboardProjector;
use crate::locks::KeyedLocks;
use crate::streaks::{self, StreakOutcome};

/// Everything one logged activity produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutcome {
    /// Ledger row id, absent when the activity awarded no points
    pub transaction_id: Option<i64>,
    pub points_awarded: i64,
    pub streak: Streak,
    pub streak_outcome: StreakOutcome,
    pub new_achievements: Vec<i64>,
    pub goal_updates: Vec<GoalUpdate>,
}

/// Points & progression engine facade
pub struct EngagementService {
    db: Arc<Database>,
    rules: Arc<RuleBook>,
    calculator: PointsCalculator,
    locks: Arc<KeyedLocks>,
    bus: EventBus,
    achievements: AchievementEngine,
    goals: GoalEngine,
    leaderboard: LeaderboardProjector,
}

impl EngagementService {
    pub fn new(db: Arc<Database>, rules: RuleBook) -> Self {
        let rules = Arc::new(rules);
        let bus = EventBus::default();
        let locks = Arc::new(KeyedLocks::new(Duration::from_millis(rules.lock_timeout_ms)));
        let calculator = PointsCalculator::new(rules.clone());
        let achievements = AchievementEngine::new(db.clone(), bus.clone());
        let goals = GoalEngine::new(db.clone(), bus.clone(), locks.clone());
        let leaderboard = LeaderboardProjector::new(
            db.clone(),
            rules.leaderboard_refresh,
            Duration::from_secs(rules.leaderboard_staleness_secs),
        );

        Self {
            db,
            rules,
            calculator,
            locks,
            bus,
            achievements,
            goals,
            leaderboard,
        }
    }

    /// Register a subscriber for outbound domain events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.bus.subscribe()
    }

    // ── Inbound operations ─────────────────────────────────────────────

    /// Log one activity: points, streak, achievements, and goal progress
    /// in a single pass. The ledger append, activity record, and streak
    /// update commit atomically; a rejected activity writes nothing.
    pub async fn log_activity(
        &self,
        member_id: i64,
        activity_type: &str,
        context: ActivityContext,
    ) -> Result<ActivityOutcome> {
        let member = store::get_member(self.db.pool(), member_id)
            .await?
            .ok_or(Error::MemberNotFound(member_id))?;
        if !member.is_active() {
            return Err(Error::Validation(format!(
                "member {member_id} is not active"
            )));
        }
        self.validate_activity(activity_type, &context)?;

        let _guard = self.locks.acquire("member", member_id).await?;
        let mut tx = self.db.pool().begin().await?;

        // Streak days before this activity feed the streak-bonus rule
        let prior_streak = store::get_streak(&mut *tx, member_id).await?;
        let member_state = MemberState {
            tier: member.tier,
            streak_days: prior_streak.map(|s| s.current_streak).unwrap_or(0),
        };
        let points = self
            .calculator
            .calculate(activity_type, &context, &member_state);

        let mut transaction_id = None;
        if points > 0 {
            let description = self.describe(activity_type, &context, &member_state);
            let id = store::append(
                &mut *tx,
                member_id,
                points,
                TransactionKind::Earned,
                activity_type,
                &description,
                context.occurred_at,
            )
            .await?;
            transaction_id = Some(id);
        }

        store::insert_activity(&mut *tx, member_id, activity_type, &context, points).await?;

        // A stale (backdated) date errors here and rolls the whole unit back
        let (streak, streak_outcome) =
            streaks::record_activity(&mut *tx, member_id, context.occurred_at.date_naive()).await?;

        tx.commit().await?;

        if let Some(transaction_id) = transaction_id {
            info!(member_id, activity_type, points, "points awarded");
            self.bus.publish(DomainEvent::PointsAwarded {
                member_id,
                points,
                activity_type: activity_type.to_string(),
                transaction_id,
            });
        }
        if streak_outcome.changed() {
            self.bus.publish(DomainEvent::StreakUpdated {
                member_id,
                current_streak: streak.current_streak,
                longest_streak: streak.longest_streak,
                activity_date: streak.last_activity_date,
            });
        }

        // Downstream cascade: achievements re-evaluate, then joined goals
        let new_achievements = self
            .achievements
            .check_and_award(member_id, context.occurred_at)
            .await?;

        let mut goal_updates = Vec::new();
        for goal in store::active_goals_for_member(self.db.pool(), member_id).await? {
            let amount = match goal.metric {
                GoalMetric::Points => points,
                GoalMetric::Activities => 1,
            };
            if amount <= 0 {
                continue;
            }
            match self
                .goals
                .contribute(goal.id, member_id, amount, context.occurred_at)
                .await
            {
                Ok(update) => goal_updates.push(update),
                // A racing contribution may have just finished the goal
                Err(Error::GoalNotActive(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        self.invalidate_leaderboards();

        Ok(ActivityOutcome {
            transaction_id,
            points_awarded: points,
            streak,
            streak_outcome,
            new_achievements,
            goal_updates,
        })
    }

    /// Spend points. The balance check and the append are one atomic unit
    /// per member; overdraw fails with `InsufficientBalance` and writes
    /// nothing.
    pub async fn redeem_points(
        &self,
        member_id: i64,
        amount: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(Error::Validation(format!(
                "redemption amount must be positive, got {amount}"
            )));
        }
        store::get_member(self.db.pool(), member_id)
            .await?
            .ok_or(Error::MemberNotFound(member_id))?;

        let _guard = self.locks.acquire("member", member_id).await?;
        let mut tx = self.db.pool().begin().await?;

        let available = store::balance(&mut *tx, member_id).await?;
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let transaction_id = store::append(
            &mut *tx,
            member_id,
            amount,
            TransactionKind::Redeemed,
            activity_types::REDEMPTION,
            reason,
            at,
        )
        .await?;

        tx.commit().await?;

        info!(member_id, amount, "points redeemed");
        self.bus.publish(DomainEvent::PointsRedeemed {
            member_id,
            points: amount,
            reason: reason.to_string(),
            transaction_id,
        });
        self.invalidate_leaderboards();

        Ok(transaction_id)
    }

    /// Admin correction path: bypasses the calculator and appends a signed
    /// `adjusted` row (positive to grant, negative to revoke).
    pub async fn adjust_points(
        &self,
        member_id: i64,
        amount: i64,
        reason: &str,
        actor_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        if amount == 0 {
            return Err(Error::Validation(
                "adjustment amount must be nonzero".to_string(),
            ));
        }
        store::get_member(self.db.pool(), member_id)
            .await?
            .ok_or(Error::MemberNotFound(member_id))?;

        let actor = actor_id
            .map(|id| format!("admin {id}"))
            .unwrap_or_else(|| "system".to_string());
        let description = format!("Manual adjustment by {actor}: {reason}");

        let _guard = self.locks.acquire("member", member_id).await?;
        let transaction_id = store::append(
            self.db.pool(),
            member_id,
            amount,
            TransactionKind::Adjusted,
            activity_types::ADJUSTMENT,
            &description,
            at,
        )
        .await?;

        info!(member_id, amount, actor_id, "points adjusted");
        self.bus.publish(DomainEvent::PointsAdjusted {
            member_id,
            points: amount,
            actor_id,
            transaction_id,
        });
        self.invalidate_leaderboards();

        Ok(transaction_id)
    }

    /// Expire points from a member's balance. Intended for an external,
    /// idempotent expiry sweep.
    pub async fn expire_points(
        &self,
        member_id: i64,
        amount: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(Error::Validation(format!(
                "expiration amount must be positive, got {amount}"
            )));
        }

        let _guard = self.locks.acquire("member", member_id).await?;
        let mut tx = self.db.pool().begin().await?;

        let available = store::balance(&mut *tx, member_id).await?;
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let transaction_id = store::append(
            &mut *tx,
            member_id,
            amount,
            TransactionKind::Expired,
            activity_types::EXPIRATION,
            reason,
            at,
        )
        .await?;

        tx.commit().await?;
        self.invalidate_leaderboards();

        Ok(transaction_id)
    }

    // ── Member & catalog administration ────────────────────────────────

    pub async fn register_member(&self, member: &NewMember, at: DateTime<Utc>) -> Result<Member> {
        if member.username.trim().is_empty() {
            return Err(Error::Validation("username must not be empty".to_string()));
        }
        if !member.email.contains('@') {
            return Err(Error::Validation(format!(
                "'{}' is not a valid email address",
                member.email
            )));
        }

        let member_id = store::insert_member(self.db.pool(), member, at).await?;
        store::get_member(self.db.pool(), member_id)
            .await?
            .ok_or(Error::MemberNotFound(member_id))
    }

    pub async fn set_member_status(&self, member_id: i64, status: MemberStatus) -> Result<()> {
        store::set_member_status(self.db.pool(), member_id, status).await
    }

    pub async fn create_achievement(&self, achievement: &NewAchievement) -> Result<i64> {
        if achievement.name.trim().is_empty() {
            return Err(Error::Validation(
                "achievement name is required".to_string(),
            ));
        }
        if achievement.points_value < 0 {
            return Err(Error::Validation(
                "achievement points value must not be negative".to_string(),
            ));
        }
        store::insert_achievement(self.db.pool(), achievement).await
    }

    /// Install the starter achievement catalog on an empty installation.
    /// Returns the inserted ids, or nothing when achievements already
    /// exist.
    pub async fn seed_default_achievements(&self) -> Result<Vec<i64>> {
        if store::achievement_count(self.db.pool()).await? > 0 {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fitforge_core::default_catalog() {
            ids.push(store::insert_achievement(self.db.pool(), &entry).await?);
        }
        info!(count = ids.len(), "seeded default achievement catalog");
        Ok(ids)
    }

    pub async fn create_goal(&self, goal: &NewGoal, at: DateTime<Utc>) -> Result<i64> {
        if goal.title.trim().is_empty() {
            return Err(Error::Validation("goal title is required".to_string()));
        }
        if goal.target_value <= 0 {
            return Err(Error::Validation(
                "goal target value must be positive".to_string(),
            ));
        }
        if goal.reward_points < 0 {
            return Err(Error::Validation(
                "goal reward points must not be negative".to_string(),
            ));
        }
        store::insert_goal(self.db.pool(), goal, at).await
    }

    pub async fn join_goal(&self, member_id: i64, goal_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.goals.join_goal(member_id, goal_id, at).await
    }

    /// Direct contribution path (e.g. challenge check-ins recorded outside
    /// the activity log)
    pub async fn contribute_to_goal(
        &self,
        goal_id: i64,
        member_id: i64,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<GoalUpdate> {
        let update = self.goals.contribute(goal_id, member_id, amount, at).await?;
        if update.completed {
            // Completion paid rewards, which changed scores
            self.invalidate_leaderboards();
        }
        Ok(update)
    }

    pub async fn expire_overdue_goals(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        self.goals.expire_overdue(now).await
    }

    /// Re-evaluate achievements outside the activity flow (e.g. after an
    /// admin adjustment)
    pub async fn check_achievements(
        &self,
        member_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let newly = self.achievements.check_and_award(member_id, as_of).await?;
        if !newly.is_empty() {
            self.invalidate_leaderboards();
        }
        Ok(newly)
    }

    // ── Read queries ───────────────────────────────────────────────────

    pub async fn balance(&self, member_id: i64) -> Result<i64> {
        store::balance(self.db.pool(), member_id).await
    }

    pub async fn history(
        &self,
        member_id: i64,
        filter: &HistoryFilter,
    ) -> Result<Vec<LedgerEntry>> {
        store::history(self.db.pool(), member_id, filter).await
    }

    pub async fn streak(&self, member_id: i64) -> Result<Option<Streak>> {
        store::get_streak(self.db.pool(), member_id).await
    }

    pub async fn member(&self, member_id: i64) -> Result<Option<Member>> {
        store::get_member(self.db.pool(), member_id).await
    }

    pub async fn member_achievements(&self, member_id: i64) -> Result<Vec<EarnedAchievement>> {
        store::member_achievements(self.db.pool(), member_id).await
    }

    pub async fn achievement(&self, achievement_id: i64) -> Result<Achievement> {
        store::get_achievement(self.db.pool(), achievement_id)
            .await?
            .ok_or(Error::AchievementNotFound(achievement_id))
    }

    pub async fn recent_activities(
        &self,
        member_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ActivityRecord>> {
        store::recent_activities(self.db.pool(), member_id, limit, offset).await
    }

    pub async fn member_stats(&self, member_id: i64) -> Result<MemberStats> {
        let pool = self.db.pool();
        let (total_activities, total_duration_minutes, active_days) =
            store::activity_totals(pool, member_id).await?;
        let total_points = store::balance(pool, member_id).await?;
        let streak = store::get_streak(pool, member_id).await?;
        let (current_streak, longest_streak) = streak
            .map(|s| (s.current_streak, s.longest_streak))
            .unwrap_or((0, 0));

        Ok(MemberStats {
            total_activities,
            total_duration_minutes,
            active_days,
            total_points,
            current_streak,
            longest_streak,
        })
    }

    pub async fn leaderboard(
        &self,
        period: Period,
        as_of: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard.rank(period, as_of, limit, offset).await
    }

    pub async fn goal_progress(&self, goal_id: i64) -> Result<GoalProgress> {
        self.goals.progress(goal_id).await
    }

    pub async fn active_goals(&self) -> Result<Vec<CommunityGoal>> {
        store::active_goals(self.db.pool()).await
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn validate_activity(&self, activity_type: &str, context: &ActivityContext) -> Result<()> {
        if let Some(duration) = context.duration_minutes {
            if duration <= 0 {
                return Err(Error::Validation(format!(
                    "duration must be positive, got {duration}"
                )));
            }
        }

        match activity_type {
            activity_types::STREAK_BONUS | activity_types::REFERRAL => Ok(()),
            _ => {
                let Some(rule) = self.rules.activities.get(activity_type) else {
                    return Err(Error::Validation(format!(
                        "unknown activity type '{activity_type}'"
                    )));
                };
                if rule.requires_duration && context.duration_minutes.is_none() {
                    return Err(Error::Validation(format!(
                        "activity '{activity_type}' requires a duration"
                    )));
                }
                if rule.requires_intensity && context.intensity.is_none() {
                    return Err(Error::Validation(format!(
                        "activity '{activity_type}' requires an intensity level"
                    )));
                }
                Ok(())
            }
        }
    }

    fn describe(
        &self,
        activity_type: &str,
        context: &ActivityContext,
        member_state: &MemberState,
    ) -> String {
        match activity_type {
            "gym_visit" => "Gym visit".to_string(),
            "class_attendance" => match &context.class_name {
                Some(name) => format!("Attended {name} class"),
                None => "Class attendance".to_string(),
            },
            activity_types::REFERRAL => "New member referral".to_string(),
            activity_types::STREAK_BONUS => {
                format!("Streak bonus for {} days", member_state.streak_days)
            }
            other => self.rules.activity_name(other).to_string(),
        }
    }

    fn invalidate_leaderboards(&self) {
        if self.leaderboard.mode() == RefreshMode::Eager {
            self.leaderboard.invalidate();
        }
    }
}
