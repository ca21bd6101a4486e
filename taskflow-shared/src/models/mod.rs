/// Database models for TaskFlow
///
/// Each model owns its queries as associated async functions taking a
/// `&PgPool`.
///
/// # Models
///
/// - `user`: accounts and display summaries
/// - `group`: groups with their embedded roster
/// - `task`: personal and group tasks
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::user::{CreateUser, User};
/// use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Grace Hopper".to_string(),
///     email: "grace@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod group;
pub mod task;
pub mod user;
