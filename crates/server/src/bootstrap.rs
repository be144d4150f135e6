use std::sync::Arc;

use axum::Router;
use customer_api_core::config::AppConfig;
use customer_api_core::{CustomerService, CustomerStore};
use customer_api_db::{connect_with_config, migrations, DbPool, SqlCustomerRepository};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::customers::{self, SharedCustomerService};
use crate::health;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub customers: SharedCustomerService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl Application {
    pub fn router(&self) -> Router {
        customers::router(self.customers.clone())
            .merge(health::router(self.db_pool.clone()))
            .layer(TraceLayer::new_for_http())
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store: Arc<dyn CustomerStore> = Arc::new(SqlCustomerRepository::new(db_pool.clone()));
    let customers = Arc::new(CustomerService::new(store));

    Ok(Application { config, db_pool, customers })
}
