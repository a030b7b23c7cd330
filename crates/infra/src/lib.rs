mod config;
mod repos;
mod services;
mod store;
mod system;

use anyhow::{bail, Context};
use booking_rules_domain::StoreCapabilities;
pub use config::Config;
pub use repos::{DeleteResult, IRuleRepo, ITaskRepo, Repos};
pub use services::*;
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, MySqlPool, PgPool};
use std::sync::Arc;
pub use store::{
    render, Dialect, IConcernedRowsStore, InMemoryRowsStore, MySqlRowsStore, PostgresRowsStore,
    RenderError, RenderedQuery,
};
pub use system::{ISys, RealSys, StaticTimeSys};
use tracing::info;

#[derive(Clone)]
pub struct BookingRulesContext {
    pub repos: Repos,
    /// Executes the composed queries of the rules
    pub store: Arc<dyn IConcernedRowsStore>,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub mailer: Arc<dyn IMailer>,
    pub failure_reporter: Arc<dyn IFailureReporter>,
}

enum Database {
    Postgres(PgPool),
    MySql(MySqlPool),
}

fn database_url(config: &Config) -> anyhow::Result<&str> {
    match &config.database_url {
        Some(url) => Ok(url),
        None => bail!("DATABASE_URL env var to be present."),
    }
}

async fn connect(config: &Config) -> anyhow::Result<Database> {
    let url = database_url(config)?;
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .context("Failed to connect to postgres")?;
        Ok(Database::Postgres(pool))
    } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
        let url = url.replacen("mariadb://", "mysql://", 1);
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .context("Failed to connect to mysql")?;
        Ok(Database::MySql(pool))
    } else {
        bail!("DATABASE_URL must start with postgres:// or mysql://")
    }
}

impl BookingRulesContext {
    async fn create(config: Config) -> anyhow::Result<Self> {
        let (repos, store): (Repos, Arc<dyn IConcernedRowsStore>) = match connect(&config).await? {
            Database::Postgres(pool) => (
                Repos::create_postgres(pool.clone()),
                Arc::new(PostgresRowsStore::new(pool)),
            ),
            Database::MySql(pool) => {
                let store = MySqlRowsStore::connect(pool.clone(), config.database_server_version).await?;
                (Repos::create_mysql(pool), Arc::new(store))
            }
        };
        info!("Store capabilities: {:?}", store.capabilities());
        Ok(Self {
            repos,
            store,
            config,
            sys: Arc::new(RealSys {}),
            mailer: Arc::new(LogMailer {}),
            failure_reporter: Arc::new(TracingFailureReporter {}),
        })
    }

    /// Context backed by memory only: in-memory repositories and store,
    /// recording mailer and failure reporter. Replace the fields to get
    /// hold of the concrete test doubles.
    pub fn create_inmemory() -> Self {
        Self::create_inmemory_with(StoreCapabilities::postgres())
    }

    pub fn create_inmemory_with(capabilities: StoreCapabilities) -> Self {
        Self {
            repos: Repos::create_inmemory(),
            store: Arc::new(InMemoryRowsStore::new(capabilities)),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
            mailer: Arc::new(InMemoryMailer::new()),
            failure_reporter: Arc::new(InMemoryFailureReporter::new()),
        }
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<BookingRulesContext> {
    BookingRulesContext::create(Config::new()).await
}

pub async fn run_migration() -> anyhow::Result<()> {
    match connect(&Config::new()).await? {
        Database::Postgres(pool) => sqlx::migrate!("./migrations/postgres").run(&pool).await?,
        Database::MySql(pool) => sqlx::migrate!("./migrations/mysql").run(&pool).await?,
    }
    Ok(())
}
