mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use application::advice_ledger::AdviceLedger;
use application::auth_service::AuthService;
use application::user_directory::UserDirectory;
use data::advice_repository::{AdviceRepository, PostgresAdviceRepository};
use data::seed::demo_snapshot;
use data::snapshot_store::{JsonFileBackend, MemoryBackend, SnapshotBackend, SnapshotStore};
use data::user_repository::{PostgresUserRepository, UserRepository};
use infrastructure::config::{AppConfig, StorageKind};
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::logging::init_logging;
use infrastructure::security::{AdminKeyValidator, JwtKeys, PasswordHasher};

type Repositories = (Arc<dyn UserRepository>, Arc<dyn AdviceRepository>);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let hasher = PasswordHasher::new();
    let (users, advices) = build_repositories(&config, &hasher).await?;

    if config.admin_key.is_none() {
        info!("ADMIN_KEY not set; admin registration is disabled");
    }

    let directory = UserDirectory::new(users, hasher, config.store_timeout);
    let auth_service = AuthService::new(
        directory,
        AdminKeyValidator::new(config.admin_key.clone()),
        JwtKeys::new(config.jwt_secret.clone()),
    );
    let advice_ledger = AdviceLedger::new(advices, config.store_timeout);

    utils::start_rest_server(config, auth_service, advice_ledger).await
}

async fn build_repositories(
    config: &AppConfig,
    hasher: &PasswordHasher,
) -> anyhow::Result<Repositories> {
    match config.storage {
        StorageKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = create_pool(url, config.store_timeout)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool.clone()));
            let advices: Arc<dyn AdviceRepository> = Arc::new(PostgresAdviceRepository::new(pool));
            Ok((users, advices))
        }
        StorageKind::File => {
            let backend = JsonFileBackend::open(&config.data_dir)
                .await
                .with_context(|| format!("cannot open data dir {}", config.data_dir.display()))?;
            info!(data_dir = %config.data_dir.display(), "using JSON file storage");
            Ok(snapshot_repositories(backend))
        }
        StorageKind::Memory => {
            let backend = if config.seed_demo_data {
                let (users, advices) = demo_snapshot(hasher)?;
                info!(users = users.len(), advices = advices.len(), "seeded demo data");
                MemoryBackend::seeded(users, advices)
            } else {
                MemoryBackend::new()
            };
            info!("using in-memory storage; data is lost on restart");
            Ok(snapshot_repositories(backend))
        }
    }
}

fn snapshot_repositories<B: SnapshotBackend + 'static>(backend: B) -> Repositories {
    let store = Arc::new(SnapshotStore::new(backend));
    let users: Arc<dyn UserRepository> = store.clone();
    let advices: Arc<dyn AdviceRepository> = store;
    (users, advices)
}
