use chrono::{DateTime, FixedOffset};
use innervoice_backend::controllers::quota::QuotaController;
use innervoice_backend::domain::quota::{ManualClock, QuotaService};
use innervoice_backend::domain::subscription::TierCatalog;
use innervoice_backend::infrastructure::http::build_router;
use innervoice_backend::infrastructure::repositories::InMemorySubscriptionStore;
use std::sync::Arc;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;
use uuid::Uuid;


use api_client::TestClient;

/// Free-tier daily limit used by every e2e test
pub const FREE_LIMIT: u32 = 3;

pub const START_TIME: &str = "2024-01-01T10:00:00Z";

pub fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).expect("valid RFC 3339 timestamp")
}

pub struct TestContext {
    pub client: TestClient,
    pub clock: Arc<ManualClock>,
    #[allow(dead_code)]
    pub store: Arc<InMemorySubscriptionStore>,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let store = Arc::new(InMemorySubscriptionStore::new());
            let clock = Arc::new(ManualClock::new(at(START_TIME)));

            let quota_service = Arc::new(QuotaService::new(
                store.clone(),
                TierCatalog::new(FREE_LIMIT),
                clock.clone(),
            ));
            let quota_controller = Arc::new(QuotaController::new(quota_service));
            let app = build_router(store.clone(), quota_controller);

            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                client: TestClient::new(&base_url),
                clock,
                store,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }
}

pub fn user_path(user_id: &Uuid, suffix: &str) -> String {
    format!("/api/users/{}/{}", user_id, suffix)
}
