//! Mail repository factory

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::postgres::PostgresPool;

use super::memory_repository::MemoryMailRepository;
use super::postgres_repository::PostgresMailRepository;
use super::repository::MailRepository;

/// Create a mail repository based on configuration.
///
/// - `"postgres"`: a `PostgresMailRepository` if a pool is provided
/// - `"memory"` (default): a `MemoryMailRepository`
pub fn create_mail_repository(
    config: &DatabaseConfig,
    postgres_pool: Option<Arc<PostgresPool>>,
) -> Arc<dyn MailRepository> {
    match config.backend.as_str() {
        "postgres" => {
            if let Some(pool) = postgres_pool {
                tracing::info!(
                    backend = "postgres",
                    database = %pool.database_url_masked(),
                    "Creating PostgreSQL mail repository"
                );
                Arc::new(PostgresMailRepository::new(pool.pool().clone()))
            } else {
                tracing::warn!(
                    "PostgreSQL backend requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryMailRepository::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory mail repository");
            Arc::new(MemoryMailRepository::new())
        }
    }
}
