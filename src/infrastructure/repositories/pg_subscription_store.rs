use super::subscription_store::{
    consume_locked, first_contact_record, ConsumeOutcome, RecordChange, SubscriptionStore,
};
use crate::domain::subscription::{SubscriptionRecord, TierCatalog, UsageState};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::{check_connection, DbPool};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    user_id: Uuid,
    tier: String,
    questions_today: i32,
    conversation_count: i32,
    last_reset_date: NaiveDate,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_record(self) -> AppResult<SubscriptionRecord> {
        Ok(SubscriptionRecord {
            user_id: self.user_id,
            tier: self.tier.parse().map_err(AppError::Internal)?,
            usage: UsageState {
                questions_today: self.questions_today.max(0) as u32,
                conversation_count: self.conversation_count.max(0) as u32,
                last_reset_date: self.last_reset_date,
            },
            updated_at: self.updated_at,
        })
    }
}

fn to_db_count(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

pub struct PgSubscriptionStore {
    pool: Arc<DbPool>,
}

impl PgSubscriptionStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl PgSubscriptionStore {
    /// Create the row if it is missing, then lock it for the rest of the transaction
    async fn lock_record(
        conn: &mut PgConnection,
        user_id: Uuid,
        now: DateTime<FixedOffset>,
    ) -> AppResult<SubscriptionRecord> {
        let fresh = first_contact_record(user_id, now);

        sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, tier, questions_today, conversation_count, last_reset_date, updated_at)
            VALUES ($1, $2, 0, 0, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(fresh.tier.to_string())
        .bind(fresh.usage.last_reset_date)
        .bind(fresh.updated_at)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, tier, questions_today, conversation_count, last_reset_date, updated_at
            FROM subscriptions
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        row.into_record()
    }

    /// Write back a record locked by `lock_record`; a no-op when nothing changed
    async fn write_locked(
        conn: &mut PgConnection,
        before: &SubscriptionRecord,
        after: &SubscriptionRecord,
    ) -> AppResult<()> {
        if before.tier == after.tier && before.usage == after.usage {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET tier = $1, questions_today = $2, conversation_count = $3,
                last_reset_date = $4, updated_at = $5
            WHERE user_id = $6
            "#,
        )
        .bind(after.tier.to_string())
        .bind(to_db_count(after.usage.questions_today))
        .bind(to_db_count(after.usage.conversation_count))
        .bind(after.usage.last_reset_date)
        .bind(after.updated_at)
        .bind(after.user_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn load(&self, user_id: Uuid) -> AppResult<Option<SubscriptionRecord>> {
        let pool = self.pool.as_ref();

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT user_id, tier, questions_today, conversation_count, last_reset_date, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        row.map(SubscriptionRow::into_record).transpose()
    }

    async fn apply(
        &self,
        user_id: Uuid,
        change: RecordChange,
        now: DateTime<FixedOffset>,
    ) -> AppResult<SubscriptionRecord> {
        let mut tx = self.pool.begin().await?;

        let record = Self::lock_record(&mut tx, user_id, now).await?;
        let updated = change.applied_to(&record, now);
        Self::write_locked(&mut tx, &record, &updated).await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn try_consume_question(
        &self,
        user_id: Uuid,
        catalog: &TierCatalog,
        now: DateTime<FixedOffset>,
    ) -> AppResult<ConsumeOutcome> {
        let mut tx = self.pool.begin().await?;

        let record = Self::lock_record(&mut tx, user_id, now).await?;
        let (outcome, updated) = consume_locked(&record, catalog, now);
        Self::write_locked(&mut tx, &record, &updated).await?;

        tx.commit().await?;

        Ok(outcome)
    }

    async fn check_connection(&self) -> bool {
        check_connection(&self.pool).await.is_ok()
    }
}
