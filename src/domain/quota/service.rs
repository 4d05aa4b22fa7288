use super::clock::Clock;
use super::error::QuotaServiceError;
use super::gate::{self, Decision};
use crate::domain::subscription::{
    SubscriptionRecord, SubscriptionTier, TierCatalog, UsageLimits, UsageState, UsageStats,
    UsageSummary,
};
use crate::infrastructure::repositories::{RecordChange, SubscriptionStore};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub struct QuotaService {
    store: Arc<dyn SubscriptionStore>,
    catalog: TierCatalog,
    clock: Arc<dyn Clock>,
}

impl QuotaService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        catalog: TierCatalog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
        }
    }
}

#[async_trait]
pub trait QuotaServiceApi: Send + Sync {
    /// Decide whether the user may ask another question right now.
    ///
    /// Runs the day rollover first and writes a rolled-over state back to the
    /// store whatever the outcome. A failed write is logged and ignored.
    async fn check_quota(&self, user_id: Uuid) -> Result<Decision, QuotaServiceError>;

    /// Count one question against today's quota, without checking the limit.
    /// Callers are expected to have been allowed by `check_quota` first.
    async fn record_question(&self, user_id: Uuid) -> Result<UsageState, QuotaServiceError>;

    /// Check and record in one atomic step. Safe under concurrent requests
    /// for the same user.
    async fn ask_question(&self, user_id: Uuid) -> Result<Decision, QuotaServiceError>;

    async fn record_conversation(&self, user_id: Uuid) -> Result<UsageState, QuotaServiceError>;

    async fn get_usage(&self, user_id: Uuid) -> Result<UsageSummary, QuotaServiceError>;

    /// Store a tier chosen by the payment provider. Purchases are not validated here.
    async fn set_tier(&self, user_id: Uuid, tier: SubscriptionTier) -> Result<(), QuotaServiceError>;
}

#[async_trait]
impl QuotaServiceApi for QuotaService {
    async fn check_quota(&self, user_id: Uuid) -> Result<Decision, QuotaServiceError> {
        let now = self.clock.now();
        let (record, is_new) = self.load_or_create(user_id, now).await?;

        let policy = self.catalog.policy(record.tier);
        let (decision, usage) = gate::can_ask_question(policy, record.usage, now);

        if is_new || usage != record.usage {
            self.roll_over_best_effort(user_id, now).await;
        }

        tracing::info!(
            user_id = %user_id,
            tier = %record.tier,
            questions_today = usage.questions_today,
            allowed = decision.allowed,
            "Quota checked"
        );

        Ok(decision)
    }

    async fn record_question(&self, user_id: Uuid) -> Result<UsageState, QuotaServiceError> {
        let now = self.clock.now();
        let record = self
            .store
            .apply(user_id, RecordChange::RecordQuestion, now)
            .await?;

        tracing::debug!(
            user_id = %user_id,
            questions_today = record.usage.questions_today,
            "Question recorded"
        );

        Ok(record.usage)
    }

    async fn ask_question(&self, user_id: Uuid) -> Result<Decision, QuotaServiceError> {
        let now = self.clock.now();
        let outcome = self
            .store
            .try_consume_question(user_id, &self.catalog, now)
            .await?;

        if outcome.decision.allowed {
            tracing::info!(
                user_id = %user_id,
                tier = %outcome.tier,
                questions_today = outcome.usage.questions_today,
                "Question allowed"
            );
        } else {
            tracing::info!(
                user_id = %user_id,
                tier = %outcome.tier,
                questions_today = outcome.usage.questions_today,
                "Daily question limit reached"
            );
        }

        Ok(outcome.decision)
    }

    async fn record_conversation(&self, user_id: Uuid) -> Result<UsageState, QuotaServiceError> {
        let now = self.clock.now();
        let record = self
            .store
            .apply(user_id, RecordChange::RecordConversation, now)
            .await?;

        Ok(record.usage)
    }

    async fn get_usage(&self, user_id: Uuid) -> Result<UsageSummary, QuotaServiceError> {
        let now = self.clock.now();
        let (record, is_new) = self.load_or_create(user_id, now).await?;

        let usage = gate::roll_over(record.usage, now);
        if is_new || usage != record.usage {
            self.roll_over_best_effort(user_id, now).await;
        }

        Ok(self.build_usage_summary(record.tier, &usage, now))
    }

    async fn set_tier(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<(), QuotaServiceError> {
        let now = self.clock.now();
        let previous = self.store.load(user_id).await?.map(|record| record.tier);

        self.store
            .apply(user_id, RecordChange::SetTier(tier), now)
            .await?;

        tracing::info!(
            user_id = %user_id,
            from = ?previous,
            to = %tier,
            "Subscription tier changed"
        );

        Ok(())
    }
}

impl QuotaService {
    async fn load_or_create(
        &self,
        user_id: Uuid,
        now: DateTime<FixedOffset>,
    ) -> Result<(SubscriptionRecord, bool), QuotaServiceError> {
        Ok(match self.store.load(user_id).await? {
            Some(record) => (record, false),
            None => (
                SubscriptionRecord::new(user_id, gate::date_of(now), now.with_timezone(&Utc)),
                true,
            ),
        })
    }

    /// Rollover writes never fail the caller
    async fn roll_over_best_effort(&self, user_id: Uuid, now: DateTime<FixedOffset>) {
        if let Err(e) = self.store.apply(user_id, RecordChange::RollOver, now).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to persist usage rollover"
            );
        }
    }

    fn build_usage_summary(
        &self,
        tier: SubscriptionTier,
        usage: &UsageState,
        now: DateTime<FixedOffset>,
    ) -> UsageSummary {
        let policy = self.catalog.policy(tier);

        UsageSummary {
            tier,
            period: "daily".to_string(),
            usage: UsageStats {
                questions_today: usage.questions_today,
                questions_remaining: policy
                    .daily_question_limit
                    .map(|limit| limit.saturating_sub(usage.questions_today)),
                conversation_count: usage.conversation_count,
                conversations_retained: gate::retained_conversations(policy, usage),
                last_reset_date: usage.last_reset_date,
            },
            limits: UsageLimits {
                daily_questions: policy.wire_daily_limit(),
                conversation_retention: policy.conversation_retention,
                retention_period: policy.retention_period,
            },
            features: policy.features,
            resets_at: gate::start_of_next_day(now),
            resets_in: gate::format_reset_countdown(gate::reset_time_until(now)),
        }
    }
}
