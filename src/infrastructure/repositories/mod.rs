pub mod memory_subscription_store;
pub mod pg_subscription_store;
pub mod subscription_store;

pub use memory_subscription_store::InMemorySubscriptionStore;
pub use pg_subscription_store::PgSubscriptionStore;
pub use subscription_store::{ConsumeOutcome, RecordChange, SubscriptionStore};
