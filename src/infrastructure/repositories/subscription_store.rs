use crate::domain::quota::gate::{self, Decision};
use crate::domain::subscription::{SubscriptionRecord, SubscriptionTier, TierCatalog, UsageState};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

/// Result of an atomic check-and-record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub tier: SubscriptionTier,
    pub decision: Decision,
    pub usage: UsageState,
}

/// A single mutation applied to a stored record while the store holds it
/// exclusively. Every change runs the day rollover first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChange {
    RollOver,
    RecordQuestion,
    RecordConversation,
    SetTier(SubscriptionTier),
}

impl RecordChange {
    pub(crate) fn applied_to(
        self,
        record: &SubscriptionRecord,
        now: DateTime<FixedOffset>,
    ) -> SubscriptionRecord {
        let usage = gate::roll_over(record.usage, now);
        let (tier, usage) = match self {
            RecordChange::RollOver => (record.tier, usage),
            RecordChange::RecordQuestion => (record.tier, gate::record_question(usage)),
            RecordChange::RecordConversation => (record.tier, gate::record_conversation(usage)),
            RecordChange::SetTier(tier) => (tier, usage),
        };

        SubscriptionRecord {
            tier,
            usage,
            updated_at: now.with_timezone(&Utc),
            ..record.clone()
        }
    }
}

/// Key-value persistence for per-user subscription records.
///
/// Implementations are responsible for:
/// - Creating a missing record as free tier with zero counts on first write
/// - Applying each `RecordChange` as a read-modify-write on the current
///   stored record, never on a copy the caller loaded earlier
/// - Running the rollover, limit check and increment of
///   `try_consume_question` as one atomic step per user, so that concurrent
///   callers can never both be allowed past the limit
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> AppResult<Option<SubscriptionRecord>>;

    /// Atomically apply `change` to the user's record and return the result.
    async fn apply(
        &self,
        user_id: Uuid,
        change: RecordChange,
        now: DateTime<FixedOffset>,
    ) -> AppResult<SubscriptionRecord>;

    /// Atomically roll over, check and (when allowed) record one question.
    /// A missing record is created as free tier with zero counts first.
    async fn try_consume_question(
        &self,
        user_id: Uuid,
        catalog: &TierCatalog,
        now: DateTime<FixedOffset>,
    ) -> AppResult<ConsumeOutcome>;

    /// Whether the backing storage is reachable
    async fn check_connection(&self) -> bool;
}

/// Record a store creates for a user it has never seen
pub(crate) fn first_contact_record(user_id: Uuid, now: DateTime<FixedOffset>) -> SubscriptionRecord {
    SubscriptionRecord::new(user_id, gate::date_of(now), now.with_timezone(&Utc))
}

/// Shared body of `try_consume_question` once a store holds the record
/// exclusively. Returns the outcome and the record to write back.
pub(crate) fn consume_locked(
    record: &SubscriptionRecord,
    catalog: &TierCatalog,
    now: DateTime<FixedOffset>,
) -> (ConsumeOutcome, SubscriptionRecord) {
    let policy = catalog.policy(record.tier);
    let (decision, usage) = gate::can_ask_question(policy, record.usage, now);
    let usage = if decision.allowed {
        gate::record_question(usage)
    } else {
        usage
    };

    let updated = SubscriptionRecord {
        usage,
        updated_at: now.with_timezone(&Utc),
        ..record.clone()
    };

    (
        ConsumeOutcome {
            tier: record.tier,
            decision,
            usage,
        },
        updated,
    )
}
