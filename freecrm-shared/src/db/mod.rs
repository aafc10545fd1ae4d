/// Database layer for FreeCRM
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded migration runner (files live in `migrations/` at the workspace root)
///
/// Models are in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use freecrm_shared::db::pool::{create_pool, DatabaseConfig};
/// use freecrm_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
