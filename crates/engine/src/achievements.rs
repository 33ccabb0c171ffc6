//! Achievement evaluation and awarding
//!
//! Unlocks are exactly-once: the unique (member, achievement) pair absorbs
//! duplicate inserts, and the unlock plus its cascading points award commit
//! or roll back together.

use chrono::{DateTime, Utc};
use fitforge_core::{
    activity_types, Achievement, DomainEvent, FactSnapshot, Result, TransactionKind,
};
use fitforge_persistence::{sqlite as store, Database};
use std::sync::Arc;
use tracing::info;

use crate::bus::EventBus;

/// Evaluates unlock requirements against member state and awards
/// achievements
pub struct AchievementEngine {
    db: Arc<Database>,
    bus: EventBus,
}

impl AchievementEngine {
    pub fn new(db: Arc<Database>, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Snapshot of the facts requirement predicates evaluate against
    pub async fn fact_snapshot(&self, member_id: i64) -> Result<FactSnapshot> {
        let pool = self.db.pool();
        let total_points = store::balance(pool, member_id).await?;
        let streak = store::get_streak(pool, member_id).await?;
        let activity_counts = store::activity_counts(pool, member_id).await?;
        let (goals_joined, goals_completed) = store::participation_counts(pool, member_id).await?;

        let (current_streak, longest_streak) = streak
            .map(|s| (s.current_streak, s.longest_streak))
            .unwrap_or((0, 0));

        Ok(FactSnapshot {
            total_points,
            current_streak,
            longest_streak,
            activity_counts,
            goals_joined,
            goals_completed,
        })
    }

    /// Evaluate every achievement the member does not yet hold and award
    /// the ones whose requirements pass. Returns newly unlocked ids.
    pub async fn check_and_award(
        &self,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let facts = self.fact_snapshot(member_id).await?;
        let candidates = store::unearned_achievements(self.db.pool(), member_id).await?;

        let mut newly_unlocked = Vec::new();
        for achievement in candidates {
            if !achievement.requirements.evaluate(&facts) {
                continue;
            }
            if self.award(member_id, &achievement, now).await? {
                newly_unlocked.push(achievement.id);
            }
        }
        Ok(newly_unlocked)
    }

    /// Unlock + cascading points award in one transaction. Returns `false`
    /// when the member already held the achievement (a no-op, not an
    /// error).
    async fn award(
        &self,
        member_id: i64,
        achievement: &Achievement,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let inserted = store::insert_unlock(&mut *tx, member_id, achievement.id, now).await?;
        if !inserted {
            // Already awarded, nothing to commit
            tx.rollback().await?;
            return Ok(false);
        }

        let mut transaction_id = None;
        if achievement.points_value > 0 {
            let id = store::append(
                &mut *tx,
                member_id,
                achievement.points_value,
                TransactionKind::Earned,
                activity_types::ACHIEVEMENT,
                &format!("Earned achievement: {}", achievement.name),
                now,
            )
            .await?;
            transaction_id = Some(id);
        }

        tx.commit().await?;

        info!(
            member_id,
            achievement_id = achievement.id,
            points = achievement.points_value,
            "achievement awarded"
        );
        self.bus.publish(DomainEvent::AchievementAwarded {
            member_id,
            achievement_id: achievement.id,
            points_value: achievement.points_value,
            earned_at: now,
        });
        if let Some(transaction_id) = transaction_id {
            self.bus.publish(DomainEvent::PointsAwarded {
                member_id,
                points: achievement.points_value,
                activity_type: activity_types::ACHIEVEMENT.to_string(),
                transaction_id,
            });
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fitforge_core::{
        Fact, HistoryFilter, MembershipTier, NewAchievement, NewMember, Requirement,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 9, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<Database>, AchievementEngine, i64) {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let engine = AchievementEngine::new(db.clone(), EventBus::default());
        let member_id = store::insert_member(
            db.pool(),
            &NewMember {
                username: "casey".to_string(),
                email: "casey@example.com".to_string(),
                tier: MembershipTier::Standard,
            },
            now(),
        )
        .await
        .unwrap();
        (db, engine, member_id)
    }

    fn points_achievement(threshold: i64, points_value: i64) -> NewAchievement {
        NewAchievement {
            name: "Point Collector".to_string(),
            description: "Accumulate points".to_string(),
            points_value,
            requirements: Requirement::at_least(Fact::TotalPoints, threshold),
            achievement_type: fitforge_core::AchievementType::Points,
        }
    }

    async fn fund(db: &Database, member_id: i64, points: i64) {
        store::append(
            db.pool(),
            member_id,
            points,
            TransactionKind::Earned,
            "gym_visit",
            "Gym visit",
            now(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unmet_requirements_award_nothing() {
        let (db, engine, member_id) = setup().await;
        store::insert_achievement(db.pool(), &points_achievement(100, 25))
            .await
            .unwrap();

        let unlocked = engine.check_and_award(member_id, now()).await.unwrap();
        assert!(unlocked.is_empty());
        assert_eq!(store::unlock_count(db.pool(), member_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_award_unlocks_once_and_cascades_points() {
        let (db, engine, member_id) = setup().await;
        let achievement_id = store::insert_achievement(db.pool(), &points_achievement(50, 25))
            .await
            .unwrap();
        fund(&db, member_id, 60).await;

        let unlocked = engine.check_and_award(member_id, now()).await.unwrap();
        assert_eq!(unlocked, vec![achievement_id]);
        assert_eq!(store::balance(db.pool(), member_id).await.unwrap(), 85);

        // Re-checking must not double-award
        let again = engine.check_and_award(member_id, now()).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(store::unlock_count(db.pool(), member_id).await.unwrap(), 1);

        let filter = HistoryFilter {
            activity_type: Some(activity_types::ACHIEVEMENT.to_string()),
            ..HistoryFilter::default()
        };
        let rows = store::history(db.pool(), member_id, &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 25);
    }

    #[tokio::test]
    async fn test_zero_point_achievement_writes_no_ledger_row() {
        let (db, engine, member_id) = setup().await;
        store::insert_achievement(db.pool(), &points_achievement(10, 0))
            .await
            .unwrap();
        fund(&db, member_id, 20).await;

        let unlocked = engine.check_and_award(member_id, now()).await.unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(store::balance(db.pool(), member_id).await.unwrap(), 20);
        assert_eq!(store::unlock_count(db.pool(), member_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_checks_award_exactly_once() {
        let (db, engine, member_id) = setup().await;
        let achievement_id = store::insert_achievement(db.pool(), &points_achievement(50, 25))
            .await
            .unwrap();
        fund(&db, member_id, 60).await;

        let engine = Arc::new(engine);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = engine.clone();
            handles.push(tokio::spawn(
                async move { engine.check_and_award(member_id, now()).await },
            ));
        }

        let mut total_awards = 0;
        for handle in handles {
            let unlocked = handle.await.unwrap().unwrap();
            total_awards += unlocked.len();
            for id in unlocked {
                assert_eq!(id, achievement_id);
            }
        }

        // Racing evaluators may all see the predicate pass, but the unique
        // pair lets exactly one unlock through
        assert_eq!(total_awards, 1);
        assert_eq!(store::unlock_count(db.pool(), member_id).await.unwrap(), 1);
        assert_eq!(store::balance(db.pool(), member_id).await.unwrap(), 85);
    }
}
