use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_FREE_DAILY_QUESTION_LIMIT: u32 = 1000;

const FREE_CONVERSATION_RETENTION: u32 = 10;
const FREE_RETENTION_DAYS: u32 = 7;
const PREMIUM_RETENTION_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubscriptionTier {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "premium")]
    Premium,
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionTier::Free => write!(f, "free"),
            SubscriptionTier::Premium => write!(f, "premium"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("Unknown subscription tier: {}", other)),
        }
    }
}

/// How long conversations are kept around for a tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "unit", content = "amount", rename_all = "lowercase")]
pub enum RetentionPeriod {
    Days(u32),
    Months(u32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureFlags {
    pub voice_output: bool,
    pub cloud_backup: bool,
    pub unlimited_questions: bool,
}

/// Limits and features attached to a subscription tier.
///
/// `daily_question_limit` and `conversation_retention` are `None` when the
/// tier has no upper bound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierPolicy {
    pub tier: SubscriptionTier,
    pub daily_question_limit: Option<u32>,
    pub conversation_retention: Option<u32>,
    pub retention_period: RetentionPeriod,
    pub features: FeatureFlags,
}

impl TierPolicy {
    pub fn free(daily_question_limit: u32) -> Self {
        Self {
            tier: SubscriptionTier::Free,
            daily_question_limit: Some(daily_question_limit),
            conversation_retention: Some(FREE_CONVERSATION_RETENTION),
            retention_period: RetentionPeriod::Days(FREE_RETENTION_DAYS),
            features: FeatureFlags {
                voice_output: false,
                cloud_backup: false,
                unlimited_questions: false,
            },
        }
    }

    pub fn premium() -> Self {
        Self {
            tier: SubscriptionTier::Premium,
            daily_question_limit: None,
            conversation_retention: None,
            retention_period: RetentionPeriod::Months(PREMIUM_RETENTION_MONTHS),
            features: FeatureFlags {
                voice_output: true,
                cloud_backup: true,
                unlimited_questions: true,
            },
        }
    }

    /// Daily limit in the client wire format, where -1 means unlimited
    pub fn wire_daily_limit(&self) -> i64 {
        self.daily_question_limit.map(i64::from).unwrap_or(-1)
    }
}

/// The pair of policies a deployment hands out, indexed by tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierCatalog {
    free: TierPolicy,
    premium: TierPolicy,
}

impl TierCatalog {
    pub fn new(free_daily_question_limit: u32) -> Self {
        Self {
            free: TierPolicy::free(free_daily_question_limit),
            premium: TierPolicy::premium(),
        }
    }

    pub fn policy(&self, tier: SubscriptionTier) -> &TierPolicy {
        match tier {
            SubscriptionTier::Free => &self.free,
            SubscriptionTier::Premium => &self.premium,
        }
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_DAILY_QUESTION_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageState {
    pub questions_today: u32,
    pub conversation_count: u32,
    pub last_reset_date: NaiveDate,
}

impl UsageState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            questions_today: 0,
            conversation_count: 0,
            last_reset_date: today,
        }
    }
}

/// Per-user record held by the subscription store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub usage: UsageState,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// First-contact record: free tier, zero counts
    pub fn new(user_id: Uuid, today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            tier: SubscriptionTier::Free,
            usage: UsageState::new(today),
            updated_at: now,
        }
    }
}
