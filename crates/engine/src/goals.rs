//! Community goal progression
//!
//! Contributions move the participant row and the goal total by the same
//! amount in one transaction; the active→completed flip is guarded so a
//! racing contribution cannot trigger a second payout.

use chrono::{DateTime, Utc};
use fitforge_core::{
    activity_types, DomainEvent, Error, GoalProgress, GoalStatus, GoalUpdate, Result,
    TransactionKind,
};
use fitforge_persistence::{sqlite as store, Database};
use std::sync::Arc;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::locks::KeyedLocks;

/// Aggregates member contributions toward shared targets and fans out the
/// completion payout exactly once
pub struct GoalEngine {
    db: Arc<Database>,
    bus: EventBus,
    locks: Arc<KeyedLocks>,
}

impl GoalEngine {
    pub fn new(db: Arc<Database>, bus: EventBus, locks: Arc<KeyedLocks>) -> Self {
        Self { db, bus, locks }
    }

    /// Join an active goal. Duplicate joins and joins on finished goals
    /// are rejected.
    pub async fn join_goal(
        &self,
        member_id: i64,
        goal_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let _guard = self.locks.acquire("goal", goal_id).await?;
        let pool = self.db.pool();

        store::get_member(pool, member_id)
            .await?
            .ok_or(Error::MemberNotFound(member_id))?;
        let goal = store::get_goal(pool, goal_id)
            .await?
            .ok_or(Error::GoalNotFound(goal_id))?;
        if goal.status != GoalStatus::Active {
            return Err(Error::GoalNotActive(goal_id));
        }

        let inserted = store::insert_participant(pool, goal_id, member_id, at).await?;
        if !inserted {
            return Err(Error::AlreadyParticipating { member_id, goal_id });
        }

        info!(member_id, goal_id, "member joined community goal");
        Ok(())
    }

    /// Add a contribution from a joined member. When the total crosses the
    /// target this call completes the goal and pays every participant its
    /// reward, all in the same transaction.
    pub async fn contribute(
        &self,
        goal_id: i64,
        member_id: i64,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<GoalUpdate> {
        if amount <= 0 {
            return Err(Error::Validation(format!(
                "contribution amount must be positive, got {amount}"
            )));
        }

        let _guard = self.locks.acquire("goal", goal_id).await?;
        let mut tx = self.db.pool().begin().await?;

        let goal = store::get_goal(&mut *tx, goal_id)
            .await?
            .ok_or(Error::GoalNotFound(goal_id))?;
        if goal.status != GoalStatus::Active {
            return Err(Error::GoalNotActive(goal_id));
        }

        let new_total = store::apply_contribution(&mut *tx, goal_id, member_id, amount).await?;

        let mut completed = false;
        let mut participant_count = 0;
        let mut payouts = Vec::new();
        if new_total >= goal.target_value {
            // Guarded flip: zero rows affected means another contribution
            // already completed the goal, so this one must not pay out
            if store::mark_completed(&mut *tx, goal_id, at).await? {
                completed = true;
                let participants = store::participants(&mut *tx, goal_id).await?;
                participant_count = participants.len();
                if goal.reward_points > 0 {
                    for participant in &participants {
                        let transaction_id = store::append(
                            &mut *tx,
                            participant.member_id,
                            goal.reward_points,
                            TransactionKind::Earned,
                            activity_types::COMMUNITY_GOAL,
                            &format!("Completed community goal: {}", goal.title),
                            at,
                        )
                        .await?;
                        payouts.push((participant.member_id, transaction_id));
                    }
                }
            }
        }

        tx.commit().await?;

        if completed {
            info!(
                goal_id,
                final_value = new_total,
                participants = participant_count,
                "community goal completed"
            );
            self.bus.publish(DomainEvent::GoalCompleted {
                goal_id,
                final_value: new_total,
                participant_count,
                reward_points: goal.reward_points,
            });
        }
        for (member_id, transaction_id) in payouts {
            self.bus.publish(DomainEvent::PointsAwarded {
                member_id,
                points: goal.reward_points,
                activity_type: activity_types::COMMUNITY_GOAL.to_string(),
                transaction_id,
            });
        }

        Ok(GoalUpdate {
            goal_id,
            contributed: amount,
            new_total,
            completed,
        })
    }

    /// Fail active goals whose end date passed without reaching target.
    /// Safe to run repeatedly from an external scheduler.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        let pool = self.db.pool();
        let overdue = store::overdue_active_goals(pool, now).await?;

        let mut failed = Vec::new();
        for goal_id in overdue {
            if store::mark_failed(pool, goal_id).await? {
                warn!(goal_id, "community goal expired unmet");
                failed.push(goal_id);
            }
        }
        Ok(failed)
    }

    /// Progress view for dashboards
    pub async fn progress(&self, goal_id: i64) -> Result<GoalProgress> {
        let pool = self.db.pool();
        let goal = store::get_goal(pool, goal_id)
            .await?
            .ok_or(Error::GoalNotFound(goal_id))?;
        let participant_count = store::participant_count(pool, goal_id).await?;
        Ok(GoalProgress::new(goal, participant_count))
    }
}
