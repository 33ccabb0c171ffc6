//! Leaderboard projection with a TTL'd in-memory cache
//!
//! Rankings are derived from the ledger on demand. The cache serves pages
//! until they go stale (lazy mode) or until a score-affecting write
//! invalidates them (eager mode).

use chrono::{DateTime, Utc};
use fitforge_core::{LeaderboardEntry, Period, RefreshMode, Result};
use fitforge_persistence::{sqlite as store, Database};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cached page of ranked entries
struct CachedBoard {
    entries: Vec<LeaderboardEntry>,
    computed_at: Instant,
}

/// Derives ranked views from the ledger for a period
pub struct LeaderboardProjector {
    db: Arc<Database>,
    mode: RefreshMode,
    staleness: Duration,
    boards: RwLock<HashMap<(Period, u32, u32), CachedBoard>>,
}

impl LeaderboardProjector {
    pub fn new(db: Arc<Database>, mode: RefreshMode, staleness: Duration) -> Self {
        Self {
            db,
            mode,
            staleness,
            boards: RwLock::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Ranked page for a period, descending by score. Ties break by
    /// earliest transaction timestamp in the window, then member id, so
    /// rank is 1-based and contiguous with no shared ranks.
    pub async fn rank(
        &self,
        period: Period,
        as_of: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>> {
        if let Some(entries) = self.cached(period, limit, offset) {
            return Ok(entries);
        }

        let since = period.window_start(as_of);
        let rows = store::period_scores(self.db.pool(), since, limit, offset).await?;
        let entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                member_id: row.member_id,
                username: row.username,
                score: row.score,
                rank: offset + i as u32 + 1,
            })
            .collect();

        debug!(
            period = period.as_str(),
            entries = entries.len(),
            "leaderboard recomputed"
        );
        if let Ok(mut boards) = self.boards.write() {
            boards.insert(
                (period, limit, offset),
                CachedBoard {
                    entries: entries.clone(),
                    computed_at: Instant::now(),
                },
            );
        }

        Ok(entries)
    }

    fn cached(&self, period: Period, limit: u32, offset: u32) -> Option<Vec<LeaderboardEntry>> {
        let boards = self.boards.read().ok()?;
        let board = boards.get(&(period, limit, offset))?;
        let fresh = match self.mode {
            // Eager boards live until a write invalidates them
            RefreshMode::Eager => true,
            RefreshMode::Lazy => board.computed_at.elapsed() <= self.staleness,
        };
        fresh.then(|| board.entries.clone())
    }

    /// Drop every cached page. Eager mode calls this after each
    /// score-affecting write.
    pub fn invalidate(&self) {
        if let Ok(mut boards) = self.boards.write() {
            boards.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fitforge_core::{MemberStatus, MembershipTier, NewMember, TransactionKind};

    fn day(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    async fn member(db: &Database, username: &str) -> i64 {
        store::insert_member(
            db.pool(),
            &NewMember {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                tier: MembershipTier::Standard,
            },
            day(1, 8),
        )
        .await
        .unwrap()
    }

    async fn earn(db: &Database, member_id: i64, points: i64, at: DateTime<Utc>) {
        store::append(
            db.pool(),
            member_id,
            points,
            TransactionKind::Earned,
            "gym_visit",
            "Gym visit",
            at,
        )
        .await
        .unwrap();
    }

    fn projector(db: &Arc<Database>, mode: RefreshMode) -> LeaderboardProjector {
        LeaderboardProjector::new(db.clone(), mode, Duration::from_secs(0))
    }

    #[tokio::test]
    async fn test_ranks_are_contiguous_with_deterministic_tie_break() {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let ana = member(&db, "ana").await;
        let bo = member(&db, "bo").await;
        let cal = member(&db, "cal").await;

        // Ana and Bo tie on 30; Ana earned first and ranks ahead
        earn(&db, ana, 30, day(1, 9)).await;
        earn(&db, bo, 30, day(2, 9)).await;
        earn(&db, cal, 10, day(2, 10)).await;

        let board = projector(&db, RefreshMode::Lazy);
        let entries = board.rank(Period::AllTime, day(3, 12), 10, 0).await.unwrap();

        let summary: Vec<(i64, i64, u32)> =
            entries.iter().map(|e| (e.member_id, e.score, e.rank)).collect();
        assert_eq!(summary, vec![(ana, 30, 1), (bo, 30, 2), (cal, 10, 3)]);
    }

    #[tokio::test]
    async fn test_period_window_filters_scores() {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let ana = member(&db, "ana").await;
        let bo = member(&db, "bo").await;

        earn(&db, ana, 50, day(1, 9)).await;
        earn(&db, bo, 20, day(13, 9)).await;

        let board = projector(&db, RefreshMode::Lazy);

        // Daily board on day 13 sees only Bo's points
        let entries = board.rank(Period::Daily, day(13, 18), 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].member_id, bo);
        assert_eq!(entries[0].rank, 1);

        // All-time still has Ana on top
        let entries = board.rank(Period::AllTime, day(13, 18), 10, 0).await.unwrap();
        assert_eq!(entries[0].member_id, ana);
    }

    #[tokio::test]
    async fn test_inactive_members_are_excluded() {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let ana = member(&db, "ana").await;
        let bo = member(&db, "bo").await;

        earn(&db, ana, 50, day(1, 9)).await;
        earn(&db, bo, 20, day(1, 10)).await;
        store::set_member_status(db.pool(), ana, MemberStatus::Suspended)
            .await
            .unwrap();

        let board = projector(&db, RefreshMode::Lazy);
        let entries = board.rank(Period::AllTime, day(2, 12), 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].member_id, bo);
    }

    #[tokio::test]
    async fn test_eager_cache_serves_until_invalidated() {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let ana = member(&db, "ana").await;
        earn(&db, ana, 10, day(1, 9)).await;

        let board = projector(&db, RefreshMode::Eager);
        let before = board.rank(Period::AllTime, day(2, 12), 10, 0).await.unwrap();
        assert_eq!(before[0].score, 10);

        // A write lands but the cached page still serves...
        earn(&db, ana, 5, day(2, 9)).await;
        let cached = board.rank(Period::AllTime, day(2, 12), 10, 0).await.unwrap();
        assert_eq!(cached[0].score, 10);

        // ...until the writer invalidates
        board.invalidate();
        let after = board.rank(Period::AllTime, day(2, 12), 10, 0).await.unwrap();
        assert_eq!(after[0].score, 15);
    }

    #[tokio::test]
    async fn test_paging_offsets_rank() {
        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        for (i, name) in ["ana", "bo", "cal", "dee"].iter().enumerate() {
            let id = member(&db, name).await;
            earn(&db, id, 100 - i as i64 * 10, day(1, 9)).await;
        }

        let board = projector(&db, RefreshMode::Lazy);
        let page = board.rank(Period::AllTime, day(2, 12), 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].rank, 3);
        assert_eq!(page[1].rank, 4);
    }
}
