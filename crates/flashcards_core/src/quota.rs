//! crates/flashcards_core/src/quota.rs
//!
//! The per-user-per-day generation ledger and its plan-based limits.

use chrono::{Datelike, NaiveDate};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{BatchOutcome, CardPair, Plan, QuotaDecision, QuotaStatus, User};
use crate::ports::{DatabaseService, PortResult};

/// Daily limit for the `pro` plan, treated as effectively unlimited.
pub const PRO_DAILY_LIMIT: u32 = 999;
/// Daily limit for every other plan.
pub const DEFAULT_DAILY_LIMIT: u32 = 6;

pub fn daily_limit(plan: Plan) -> u32 {
    match plan {
        Plan::Pro => PRO_DAILY_LIMIT,
        Plan::Free | Plan::Admin => DEFAULT_DAILY_LIMIT,
    }
}

/// Builds the status snapshot for a count and a limit.
/// `remaining` saturates at zero: a downgraded plan may sit above its new limit.
pub fn quota_status(generated_today: u32, daily_limit: u32) -> QuotaStatus {
    QuotaStatus {
        generated_today,
        daily_limit,
        remaining: daily_limit.saturating_sub(generated_today),
    }
}

//=========================================================================================
// Clocks
//=========================================================================================

/// Source of the calendar day used to key ledger entries.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The server's local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    days_from_ce: AtomicI32,
}

impl ManualClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            days_from_ce: AtomicI32::new(day.num_days_from_ce()),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        self.days_from_ce
            .store(day.num_days_from_ce(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i32) {
        self.days_from_ce.fetch_add(days, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        let days = self.days_from_ce.load(Ordering::SeqCst);
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
    }
}

//=========================================================================================
// QuotaLedger
//=========================================================================================

/// Enforces the daily generation quota on top of the ledger storage.
#[derive(Clone)]
pub struct QuotaLedger {
    db: Arc<dyn DatabaseService>,
    clock: Arc<dyn Clock>,
}

impl QuotaLedger {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self::with_clock(db, Arc::new(LocalClock))
    }

    pub fn with_clock(db: Arc<dyn DatabaseService>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Read-only view of today's usage for `owner`.
    pub async fn remaining(&self, owner: &User) -> PortResult<QuotaStatus> {
        let used = self.db.get_generation_count(owner.id, self.today()).await?;
        Ok(quota_status(used, daily_limit(owner.plan)))
    }

    /// Atomically charges `n` generations to today's entry, or refuses without
    /// mutating anything when the charge would cross the plan limit.
    pub async fn try_consume(&self, owner: &User, n: u32) -> PortResult<QuotaDecision> {
        let limit = daily_limit(owner.plan);
        let decision = self
            .db
            .try_consume_generations(owner.id, self.today(), n, limit)
            .await?;
        log_decision(owner.id, n, limit, &decision);
        Ok(decision)
    }

    /// Persists a generated batch and charges its size in one transaction.
    pub async fn consume_with_batch(
        &self,
        owner: &User,
        collection_id: Uuid,
        pairs: &[CardPair],
    ) -> PortResult<BatchOutcome> {
        let limit = daily_limit(owner.plan);
        self.db
            .persist_generated_batch(owner.id, self.today(), limit, collection_id, pairs)
            .await
    }
}

fn log_decision(owner_id: Uuid, n: u32, limit: u32, decision: &QuotaDecision) {
    match decision {
        QuotaDecision::Allowed { used_today } => {
            debug!(%owner_id, n, used_today, limit, "Generation quota charged")
        }
        QuotaDecision::Exceeded { used_today } => {
            info!(%owner_id, n, used_today, limit, "Generation quota refused")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pro_plan_gets_the_large_limit() {
        assert_eq!(daily_limit(Plan::Pro), 999);
        assert_eq!(daily_limit(Plan::Free), 6);
        assert_eq!(daily_limit(Plan::Admin), 6);
    }

    #[test]
    fn status_saturates_when_over_limit() {
        let status = quota_status(10, 6);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.generated_today, 10);

        let status = quota_status(2, 6);
        assert_eq!(status.remaining, 4);
    }

    #[test]
    fn manual_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.today(), start);

        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        clock.set(start);
        assert_eq!(clock.today(), start);
    }
}
