use crate::domain::subscription::{TierPolicy, UsageState};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<DateTime<FixedOffset>>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: None,
            reset_time: None,
        }
    }

    pub fn deny(limit: u32, now: DateTime<FixedOffset>) -> Self {
        Self {
            allowed: false,
            message: Some(limit_reached_message(limit)),
            reset_time: Some(start_of_next_day(now)),
        }
    }
}

pub fn limit_reached_message(limit: u32) -> String {
    format!(
        "You've reached your daily limit of {} questions. Upgrade to Premium for unlimited questions.",
        limit
    )
}

/// Calendar date of `now` in its own offset
pub fn date_of(now: DateTime<FixedOffset>) -> NaiveDate {
    now.date_naive()
}

/// Local midnight following `now`
pub fn start_of_next_day(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let tomorrow = date_of(now).succ_opt().unwrap_or(NaiveDate::MAX);
    now.offset()
        .from_local_datetime(&tomorrow.and_time(NaiveTime::MIN))
        .single()
        .unwrap_or_else(|| now + Duration::days(1))
}

/// Returns the state with the daily counter cleared if `now` falls on a later
/// calendar day than the last reset. Conversation count is left alone.
pub fn roll_over(usage: UsageState, now: DateTime<FixedOffset>) -> UsageState {
    let today = date_of(now);
    if usage.last_reset_date == today {
        return usage;
    }

    UsageState {
        questions_today: 0,
        last_reset_date: today,
        ..usage
    }
}

/// Decide whether one more question is allowed.
///
/// The returned state is the rolled-over usage the decision was made
/// against; callers persist it whether or not the question was allowed.
pub fn can_ask_question(
    policy: &TierPolicy,
    usage: UsageState,
    now: DateTime<FixedOffset>,
) -> (Decision, UsageState) {
    let usage = roll_over(usage, now);

    let Some(limit) = policy.daily_question_limit else {
        return (Decision::allow(), usage);
    };

    if usage.questions_today >= limit {
        return (Decision::deny(limit, now), usage);
    }

    (Decision::allow(), usage)
}

pub fn record_question(usage: UsageState) -> UsageState {
    UsageState {
        questions_today: usage.questions_today.saturating_add(1),
        ..usage
    }
}

pub fn record_conversation(usage: UsageState) -> UsageState {
    UsageState {
        conversation_count: usage.conversation_count.saturating_add(1),
        ..usage
    }
}

/// Number of conversations kept under the tier's retention cap
pub fn retained_conversations(policy: &TierPolicy, usage: &UsageState) -> u32 {
    match policy.conversation_retention {
        Some(cap) => usage.conversation_count.min(cap),
        None => usage.conversation_count,
    }
}

/// Time left until the daily counter resets
pub fn reset_time_until(now: DateTime<FixedOffset>) -> Duration {
    start_of_next_day(now) - now
}

/// Renders a reset countdown as "Xh Ym"
pub fn format_reset_countdown(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
