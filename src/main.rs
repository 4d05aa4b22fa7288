use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use innervoice_backend::controllers::quota::QuotaController;
use innervoice_backend::domain::quota::{QuotaService, SystemClock};
use innervoice_backend::domain::subscription::TierCatalog;
use innervoice_backend::infrastructure::config::{Config, LogFormat, StorageBackend};
use innervoice_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use innervoice_backend::infrastructure::http::{build_router, start_http_server};
use innervoice_backend::infrastructure::repositories::{
    InMemorySubscriptionStore, PgSubscriptionStore, SubscriptionStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        development = config.is_development(),
        "Starting InnerVoice Backend on {}:{}",
        config.host,
        config.port
    );

    let store = create_store(&config).await?;

    let catalog = TierCatalog::new(config.free_daily_question_limit);
    let clock = Arc::new(SystemClock::new(config.quota_offset()?));
    tracing::info!(
        free_daily_question_limit = config.free_daily_question_limit,
        utc_offset_minutes = config.quota_utc_offset_minutes,
        "Quota policy loaded"
    );

    // === DEPENDENCY INJECTION SETUP ===
    let quota_service = Arc::new(QuotaService::new(store.clone(), catalog, clock));
    let quota_controller = Arc::new(QuotaController::new(quota_service));

    let app = build_router(store, quota_controller);
    start_http_server(Arc::new(config), app).await?;

    Ok(())
}

async fn create_store(config: &Config) -> anyhow::Result<Arc<dyn SubscriptionStore>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory subscription store; usage is lost on restart");
            Ok(Arc::new(InMemorySubscriptionStore::new()))
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;

            let pool = create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            check_connection(&pool).await?;
            tracing::info!("Database connection verified");

            run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgSubscriptionStore::new(Arc::new(pool))))
        }
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "innervoice_backend=debug,tower_http=debug".into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
