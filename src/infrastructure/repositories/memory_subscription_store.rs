use super::subscription_store::{
    consume_locked, first_contact_record, ConsumeOutcome, RecordChange, SubscriptionStore,
};
use crate::domain::subscription::{SubscriptionRecord, TierCatalog};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Process-local store. Records are lost on restart.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: Mutex<HashMap<Uuid, SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn load(&self, user_id: Uuid) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self.records.lock().get(&user_id).cloned())
    }

    async fn apply(
        &self,
        user_id: Uuid,
        change: RecordChange,
        now: DateTime<FixedOffset>,
    ) -> AppResult<SubscriptionRecord> {
        let mut records = self.records.lock();
        let record = records
            .entry(user_id)
            .or_insert_with(|| first_contact_record(user_id, now));

        *record = change.applied_to(record, now);

        Ok(record.clone())
    }

    async fn try_consume_question(
        &self,
        user_id: Uuid,
        catalog: &TierCatalog,
        now: DateTime<FixedOffset>,
    ) -> AppResult<ConsumeOutcome> {
        let mut records = self.records.lock();
        let record = records
            .entry(user_id)
            .or_insert_with(|| first_contact_record(user_id, now));

        let (outcome, updated) = consume_locked(record, catalog, now);
        *record = updated;

        Ok(outcome)
    }

    async fn check_connection(&self) -> bool {
        true
    }
}
