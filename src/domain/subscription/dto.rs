use super::model::{FeatureFlags, RetentionPeriod, SubscriptionTier};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Request for PUT /api/users/:user_id/subscription
#[derive(Debug, Serialize, Deserialize)]
pub struct SetTierRequest {
    pub tier: SubscriptionTier,
}

/// Response for GET /api/users/:user_id/usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub tier: SubscriptionTier,
    pub period: String,
    pub usage: UsageStats,
    pub limits: UsageLimits,
    pub features: FeatureFlags,
    pub resets_at: DateTime<FixedOffset>,
    /// Countdown to `resets_at`, e.g. "5h 12m"
    pub resets_in: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub questions_today: u32,
    /// `None` on unlimited tiers
    pub questions_remaining: Option<u32>,
    pub conversation_count: u32,
    pub conversations_retained: u32,
    pub last_reset_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLimits {
    /// -1 means unlimited
    pub daily_questions: i64,
    pub conversation_retention: Option<u32>,
    pub retention_period: RetentionPeriod,
}
