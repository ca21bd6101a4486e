/// Database layer for TaskFlow
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded sqlx migrations (users, groups, tasks)
///
/// The pool is created once at startup, handed to the API state, and closed
/// on shutdown. Models live in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::db::{migrations::run_migrations, pool::{close_pool, create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     close_pool(pool).await;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
