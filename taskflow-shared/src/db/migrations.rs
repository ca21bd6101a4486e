/// Database migration runner
///
/// Migrations live in `migrations/` at the workspace root and are embedded
/// into the binary at compile time:
///
/// - `..._create_users.sql`: users (CITEXT email)
/// - `..._create_groups.sql`: groups with embedded JSONB roster and version
/// - `..._create_tasks.sql`: tasks with priority/status enums

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{info, warn};

/// Embedded migrations for the TaskFlow schema
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Runs all pending migrations
///
/// # Errors
///
/// Returns an error if any migration fails to apply. Each migration runs in
/// its own transaction, so a failure leaves the previous ones applied.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Starting database migrations"
    );

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions.len(), 3);
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_group_migration_declares_unique_invitation_code() {
        let groups = MIGRATOR
            .iter()
            .find(|m| m.description.contains("groups"))
            .expect("groups migration should be embedded");

        assert!(groups.sql.contains("groups_invitation_code_key"));
        assert!(groups.sql.contains("version BIGINT"));
    }
}
