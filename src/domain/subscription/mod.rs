pub mod dto;
pub mod model;

pub use dto::{SetTierRequest, UsageLimits, UsageStats, UsageSummary};
pub use model::{
    FeatureFlags, RetentionPeriod, SubscriptionRecord, SubscriptionTier, TierCatalog, TierPolicy,
    UsageState, DEFAULT_FREE_DAILY_QUESTION_LIMIT,
};
